use std::ops::{Add, AddAssign};

use serde::Serialize;

use crate::alignment::tokenization::{tokenize, PreprocessRule};
use crate::error::GradingError;
use crate::types::{Alignment, OpKind, Token, TokenSequence};

/// A word or short phrase whose recognition is tracked separately from WER.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPhrase {
    text: String,
    tokens: TokenSequence,
}

impl KeyPhrase {
    /// Tokenizes `text` with the same rule used for hypothesis and reference.
    pub fn new(text: &str, rule: PreprocessRule) -> Result<Self, GradingError> {
        Self::from_tokens(text, tokenize(text, rule), rule)
    }

    /// Wraps tokens produced by a caller-supplied tokenizer.
    pub(crate) fn from_tokens(
        text: &str,
        tokens: TokenSequence,
        rule: PreprocessRule,
    ) -> Result<Self, GradingError> {
        if tokens.is_empty() {
            return Err(GradingError::invalid_input(format!(
                "key phrase '{text}' is empty after '{rule}' preprocessing"
            )));
        }
        Ok(Self {
            text: tokens.words().collect::<Vec<_>>().join(" "),
            tokens,
        })
    }

    /// Normalized phrase text, tokens joined by single spaces.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &TokenSequence {
        &self.tokens
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhraseCounts {
    pub reference_occurrences: u32,
    /// Reference occurrences whose tokens aligned as consecutive matches.
    pub hits: u32,
    /// Reference occurrences touched by a substitution, deletion or an
    /// insertion inside the span.
    pub misses: u32,
    pub hypothesis_occurrences: u32,
}

impl PhraseCounts {
    pub fn precision(&self) -> Option<f64> {
        ratio(self.hits, self.hypothesis_occurrences)
    }

    pub fn recall(&self) -> Option<f64> {
        ratio(self.hits, self.reference_occurrences)
    }

    pub fn f1(&self) -> Option<f64> {
        let precision = self.precision()?;
        let recall = self.recall()?;
        if precision + recall <= 0.0 {
            return Some(0.0);
        }
        Some(2.0 * precision * recall / (precision + recall))
    }
}

impl Add for PhraseCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            reference_occurrences: self.reference_occurrences + rhs.reference_occurrences,
            hits: self.hits + rhs.hits,
            misses: self.misses + rhs.misses,
            hypothesis_occurrences: self.hypothesis_occurrences + rhs.hypothesis_occurrences,
        }
    }
}

impl AddAssign for PhraseCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for PhraseCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyPhraseStats {
    pub phrase: String,
    #[serde(flatten)]
    pub counts: PhraseCounts,
}

impl KeyPhraseStats {
    pub fn empty(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            counts: PhraseCounts::default(),
        }
    }

    /// The phrase never occurred in the reference, so its accuracy says
    /// nothing about the recognizer.
    pub fn is_mismatched(&self) -> bool {
        self.counts.reference_occurrences == 0
    }

    pub fn diagnostic(&self) -> Option<GradingError> {
        self.is_mismatched()
            .then(|| GradingError::mismatched_key_phrase(self.phrase.clone()))
    }
}

/// Counts reference occurrences of `phrase` and classifies each one as a hit
/// or a miss from the alignment ops covering its reference tokens.
///
/// A hit needs every reference token aligned as a match and no inserted
/// hypothesis token inside the span, so each hit is also an occurrence in the
/// hypothesis and `hits <= hypothesis_occurrences` always holds.
pub fn key_phrase_stats(alignment: &Alignment, phrase: &KeyPhrase) -> KeyPhraseStats {
    let needle = phrase.tokens().tokens();

    // Reference tokens in order, with the kind and position of their op.
    let mut reference_tokens: Vec<&Token> = Vec::with_capacity(alignment.reference_len());
    let mut reference_ops: Vec<(OpKind, usize)> = Vec::with_capacity(alignment.reference_len());
    for (position, op) in alignment.ops().iter().enumerate() {
        if let Some(token) = op.reference.as_ref() {
            reference_tokens.push(token);
            reference_ops.push((op.kind, position));
        }
    }
    let hypothesis_tokens: Vec<&Token> = alignment.hypothesis_tokens().collect();

    let mut counts = PhraseCounts::default();
    for start in find_occurrences(&reference_tokens, needle) {
        counts.reference_occurrences += 1;
        let span = &reference_ops[start..start + needle.len()];
        if is_clean_match(span) {
            counts.hits += 1;
        } else {
            counts.misses += 1;
        }
    }
    counts.hypothesis_occurrences = to_u32(find_occurrences(&hypothesis_tokens, needle).len());

    KeyPhraseStats {
        phrase: phrase.text().to_string(),
        counts,
    }
}

/// All matches, on consecutive ops.
fn is_clean_match(span: &[(OpKind, usize)]) -> bool {
    let all_matched = span.iter().all(|(kind, _)| *kind == OpKind::Match);
    let contiguous = match (span.first(), span.last()) {
        (Some((_, first)), Some((_, last))) => last - first + 1 == span.len(),
        _ => false,
    };
    all_matched && contiguous
}

/// Drops phrases whose normalized text repeats an earlier one, keeping order.
pub(crate) fn dedup_phrases(phrases: Vec<KeyPhrase>) -> Vec<KeyPhrase> {
    let mut unique: Vec<KeyPhrase> = Vec::with_capacity(phrases.len());
    for phrase in phrases {
        if unique.iter().any(|kept| kept.text == phrase.text) {
            tracing::debug!(phrase = %phrase.text, "duplicate key phrase ignored");
            continue;
        }
        unique.push(phrase);
    }
    unique
}

/// Non-overlapping, left-to-right occurrences of `needle` in `haystack`.
fn find_occurrences(haystack: &[&Token], needle: &[Token]) -> Vec<usize> {
    let mut starts = Vec::new();
    if needle.is_empty() || haystack.len() < needle.len() {
        return starts;
    }
    let mut pos = 0usize;
    while pos + needle.len() <= haystack.len() {
        let window = &haystack[pos..pos + needle.len()];
        if window.iter().zip(needle).all(|(a, b)| *a == b) {
            starts.push(pos);
            pos += needle.len();
        } else {
            pos += 1;
        }
    }
    starts
}

fn ratio(numerator: u32, denominator: u32) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
