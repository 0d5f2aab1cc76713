use std::path::Path;

use serde::Deserialize;

use crate::error::GradingError;

/// Recognizer output as returned by a speech-to-text service.
/// Only the fields needed to rebuild the hypothesis transcript are kept.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecognitionResponse {
    #[serde(default)]
    pub results: Vec<RecognitionResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Alternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl RecognitionResponse {
    pub fn load(path: &Path) -> Result<Self, GradingError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| GradingError::io("read recognition response", e))?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, GradingError> {
        serde_json::from_str(data).map_err(|e| GradingError::json("parse recognition response", e))
    }

    /// Top alternative of every result, concatenated in order.
    /// Results carry their own leading whitespace, so no separator is added.
    pub fn hypothesis_text(&self) -> String {
        self.results
            .iter()
            .filter_map(|result| result.alternatives.first())
            .map(|alt| alt.transcript.as_str())
            .collect()
    }
}
