use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::GradingError;
use crate::types::{Token, TokenSequence};

const RULE_NAMES: &str = "identity, normalize, remove-comments";

/// Text preprocessing applied identically to hypothesis, reference and key
/// phrases before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PreprocessRule {
    /// Whitespace split only.
    Identity,
    /// Lowercase, strip sentence punctuation at word edges, drop quotes and
    /// brackets.
    Normalize,
    /// Remove `[...]` annotations, then [`PreprocessRule::Normalize`].
    #[default]
    RemoveComments,
}

impl PreprocessRule {
    pub const ALL: [PreprocessRule; 3] = [Self::Identity, Self::Normalize, Self::RemoveComments];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Normalize => "normalize",
            Self::RemoveComments => "remove-comments",
        }
    }

    pub fn apply(self, text: &str) -> String {
        match self {
            Self::Identity => text.to_string(),
            Self::Normalize => normalize_text(text),
            Self::RemoveComments => normalize_text(&comment_regex().replace_all(text, " ")),
        }
    }
}

impl FromStr for PreprocessRule {
    type Err = GradingError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "identity" | "none" => Ok(Self::Identity),
            "normalize" => Ok(Self::Normalize),
            "remove-comments" => Ok(Self::RemoveComments),
            _ => Err(GradingError::InvalidPreprocessingRule {
                name: name.to_string(),
                expected: RULE_NAMES,
            }),
        }
    }
}

impl fmt::Display for PreprocessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PreprocessRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

pub fn tokenize(text: &str, rule: PreprocessRule) -> TokenSequence {
    let cleaned = rule.apply(text);
    let tokens = cleaned.split_whitespace().map(Token::new).collect();
    TokenSequence::from_tokens(tokens)
}

/// Resolves `rule_name` first so an unknown selector fails before any text
/// is touched.
pub fn tokenize_named(text: &str, rule_name: &str) -> Result<TokenSequence, GradingError> {
    let rule = rule_name.parse::<PreprocessRule>()?;
    Ok(tokenize(text, rule))
}

fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase().replace(['\t', '\n', '\r'], " ");
    let trailing = trailing_punct_regex().replace_all(&lowered, " ");
    let leading = leading_punct_regex().replace_all(&trailing, " ");
    quote_regex().replace_all(&leading, "").into_owned()
}

fn comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\[\]]*\]").expect("comment pattern is valid"))
}

fn trailing_punct_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[,.?!]+(?:\s|$)").expect("trailing punctuation pattern is valid")
    })
}

fn leading_punct_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|\s)[,.?!]+").expect("leading punctuation pattern is valid")
    })
}

fn quote_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["()\[\]]"#).expect("quote pattern is valid"))
}
