use std::path::Path;

use crate::alignment::tokenization::PreprocessRule;
use crate::error::GradingError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraderConfig {
    pub preprocess_rule: PreprocessRule,
    /// Raw phrase text; tokenized with `preprocess_rule` when the grader is built.
    pub key_phrases: Vec<String>,
}

impl GraderConfig {
    /// Reads a JSON config of the form
    /// `{"preprocess_rule": "normalize", "key_phrases": ["ahmed"]}`.
    /// Both fields are optional.
    pub fn load(path: &Path) -> Result<Self, GradingError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| GradingError::io("read grader config", e))?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, GradingError> {
        let file: GraderConfigFile = serde_json::from_str(data)
            .map_err(|e| GradingError::json("parse grader config", e))?;
        file.resolve()
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GraderConfigFile {
    #[serde(default)]
    pub preprocess_rule: Option<String>,
    #[serde(default)]
    pub key_phrases: Vec<String>,
}

impl GraderConfigFile {
    pub(crate) fn resolve(self) -> Result<GraderConfig, GradingError> {
        let preprocess_rule = match self.preprocess_rule.as_deref() {
            Some(name) => name.parse()?,
            None => PreprocessRule::default(),
        };
        Ok(GraderConfig {
            preprocess_rule,
            key_phrases: self.key_phrases,
        })
    }
}
