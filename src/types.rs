use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GradingError;

/// A single comparable word after preprocessing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub(crate) fn new(word: impl Into<String>) -> Self {
        Self(word.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSequence {
    tokens: Vec<Token>,
}

impl TokenSequence {
    /// Builds a sequence from words that are already normalized.
    /// Words are taken verbatim; empty strings are skipped.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens = words
            .into_iter()
            .map(Into::into)
            .filter(|word| !word.is_empty())
            .map(Token::new)
            .collect();
        Self { tokens }
    }

    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(Token::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Match,
    Substitution,
    Insertion,
    Deletion,
}

impl OpKind {
    pub fn as_char(self) -> char {
        match self {
            Self::Match => 'M',
            Self::Substitution => 'S',
            Self::Insertion => 'I',
            Self::Deletion => 'D',
        }
    }

    pub fn is_error(self) -> bool {
        !matches!(self, Self::Match)
    }
}

/// One aligned position. Indices point into the hypothesis and reference
/// sequences and are `None` exactly when the matching token is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignmentOp {
    pub kind: OpKind,
    pub hypothesis: Option<Token>,
    pub reference: Option<Token>,
    pub hypothesis_index: Option<usize>,
    pub reference_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alignment {
    ops: Vec<AlignmentOp>,
    hypothesis_len: usize,
    reference_len: usize,
}

impl Alignment {
    pub(crate) fn new(ops: Vec<AlignmentOp>, hypothesis_len: usize, reference_len: usize) -> Self {
        debug_assert_eq!(
            ops.iter().filter(|op| op.hypothesis.is_some()).count(),
            hypothesis_len,
            "alignment must cover every hypothesis token"
        );
        debug_assert_eq!(
            ops.iter().filter(|op| op.reference.is_some()).count(),
            reference_len,
            "alignment must cover every reference token"
        );
        Self {
            ops,
            hypothesis_len,
            reference_len,
        }
    }

    /// Checked constructor for alignments produced outside this crate.
    ///
    /// Each op must carry the tokens its kind implies, indices must be present
    /// exactly when the token is, a match must pair equal tokens, and each side
    /// must be indexed `0..len` in order.
    pub fn from_ops(
        ops: Vec<AlignmentOp>,
        hypothesis_len: usize,
        reference_len: usize,
    ) -> Result<Self, GradingError> {
        let mut next_hypothesis = 0;
        let mut next_reference = 0;
        for (position, op) in ops.iter().enumerate() {
            let (needs_hypothesis, needs_reference) = match op.kind {
                OpKind::Match | OpKind::Substitution => (true, true),
                OpKind::Insertion => (true, false),
                OpKind::Deletion => (false, true),
            };
            if op.hypothesis.is_some() != needs_hypothesis
                || op.reference.is_some() != needs_reference
            {
                return Err(GradingError::invalid_input(format!(
                    "op {position} ({:?}) carries the wrong tokens",
                    op.kind
                )));
            }
            if op.kind == OpKind::Match && op.hypothesis != op.reference {
                return Err(GradingError::invalid_input(format!(
                    "op {position} is a match between different tokens"
                )));
            }
            check_index(
                position,
                "hypothesis",
                op.hypothesis_index,
                needs_hypothesis,
                &mut next_hypothesis,
            )?;
            check_index(
                position,
                "reference",
                op.reference_index,
                needs_reference,
                &mut next_reference,
            )?;
        }
        if next_hypothesis != hypothesis_len || next_reference != reference_len {
            return Err(GradingError::invalid_input(format!(
                "alignment covers {next_hypothesis}/{hypothesis_len} hypothesis and \
                 {next_reference}/{reference_len} reference tokens"
            )));
        }
        Ok(Self {
            ops,
            hypothesis_len,
            reference_len,
        })
    }

    pub fn ops(&self) -> &[AlignmentOp] {
        &self.ops
    }

    pub fn hypothesis_len(&self) -> usize {
        self.hypothesis_len
    }

    pub fn reference_len(&self) -> usize {
        self.reference_len
    }

    pub fn hypothesis_tokens(&self) -> impl Iterator<Item = &Token> {
        self.ops.iter().filter_map(|op| op.hypothesis.as_ref())
    }

    pub fn reference_tokens(&self) -> impl Iterator<Item = &Token> {
        self.ops.iter().filter_map(|op| op.reference.as_ref())
    }

    pub fn edit_count(&self) -> usize {
        self.ops.iter().filter(|op| op.kind.is_error()).count()
    }

    /// Compact edit string, e.g. `MMSMD`.
    pub fn edit_string(&self) -> String {
        self.ops.iter().map(|op| op.kind.as_char()).collect()
    }
}

fn check_index(
    position: usize,
    side: &str,
    index: Option<usize>,
    expected: bool,
    next: &mut usize,
) -> Result<(), GradingError> {
    match index {
        Some(index) if expected && index == *next => {
            *next += 1;
            Ok(())
        }
        None if !expected => Ok(()),
        Some(index) if expected => Err(GradingError::invalid_input(format!(
            "op {position} has {side} index {index}, expected {next}"
        ))),
        _ => Err(GradingError::invalid_input(format!(
            "op {position} has a {side} index that does not match its token"
        ))),
    }
}

/// One hypothesis/reference pair submitted for grading.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreInput {
    pub id: String,
    pub hypothesis: String,
    pub reference: String,
    /// Per-item override of the grader's preprocessing rule selector.
    #[serde(default)]
    pub preprocess_rule: Option<String>,
}

impl ScoreInput {
    pub fn new(
        id: impl Into<String>,
        hypothesis: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            hypothesis: hypothesis.into(),
            reference: reference.into(),
            preprocess_rule: None,
        }
    }

    pub fn with_preprocess_rule(mut self, rule: impl Into<String>) -> Self {
        self.preprocess_rule = Some(rule.into());
        self
    }
}
