use crate::alignment::keyphrase::{dedup_phrases, KeyPhrase};
use crate::config::GraderConfig;
use crate::error::GradingError;
use crate::pipeline::defaults::{EditDistanceAligner, RuleTokenizer};
use crate::pipeline::runtime::{Grader, GraderParts};
use crate::pipeline::traits::{SequenceAligner, Tokenizer};

pub struct GraderBuilder {
    config: GraderConfig,
    tokenizer: Option<Box<dyn Tokenizer>>,
    sequence_aligner: Option<Box<dyn SequenceAligner>>,
}

impl GraderBuilder {
    pub fn new(config: GraderConfig) -> Self {
        Self {
            config,
            tokenizer: None,
            sequence_aligner: None,
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn with_sequence_aligner(mut self, sequence_aligner: Box<dyn SequenceAligner>) -> Self {
        self.sequence_aligner = Some(sequence_aligner);
        self
    }

    /// Fails when a configured key phrase is empty after preprocessing.
    pub fn build(self) -> Result<Grader, GradingError> {
        let tokenizer = self.tokenizer.unwrap_or_else(|| Box::new(RuleTokenizer));
        let rule = self.config.preprocess_rule;

        let key_phrases = self
            .config
            .key_phrases
            .iter()
            .map(|text| KeyPhrase::from_tokens(text, tokenizer.tokenize(text, rule), rule))
            .collect::<Result<Vec<_>, _>>()?;
        let key_phrases = dedup_phrases(key_phrases);

        tracing::debug!(
            preprocess_rule = %rule,
            key_phrases = key_phrases.len(),
            "grader built"
        );

        Ok(Grader::from_parts(GraderParts {
            preprocess_rule: rule,
            raw_key_phrases: self.config.key_phrases,
            key_phrases,
            tokenizer,
            sequence_aligner: self
                .sequence_aligner
                .unwrap_or_else(|| Box::new(EditDistanceAligner)),
        }))
    }
}
