use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradingError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("word error rate is undefined: the reference has no tokens")]
    EmptyReference,
    #[error("key phrase '{phrase}' never occurs in the reference after preprocessing")]
    MismatchedKeyPhrase { phrase: String },
    #[error("unknown preprocessing rule '{name}' (expected one of: {expected})")]
    InvalidPreprocessingRule {
        name: String,
        expected: &'static str,
    },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl GradingError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn mismatched_key_phrase(phrase: impl Into<String>) -> Self {
        Self::MismatchedKeyPhrase {
            phrase: phrase.into(),
        }
    }
}
