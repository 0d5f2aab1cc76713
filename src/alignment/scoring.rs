use std::ops::{Add, AddAssign};

use serde::Serialize;

use crate::alignment::keyphrase::{key_phrase_stats, KeyPhrase, KeyPhraseStats, PhraseCounts};
use crate::error::GradingError;
use crate::types::{Alignment, OpKind};

/// Raw per-kind counters. Combining them is plain addition, so per-item
/// counters can be reduced in any order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorCounts {
    pub matches: u64,
    pub substitutions: u64,
    pub insertions: u64,
    pub deletions: u64,
    pub reference_len: u64,
    pub hypothesis_len: u64,
}

impl ErrorCounts {
    pub fn from_alignment(alignment: &Alignment) -> Self {
        let mut counts = Self {
            reference_len: alignment.reference_len() as u64,
            hypothesis_len: alignment.hypothesis_len() as u64,
            ..Self::default()
        };
        for op in alignment.ops() {
            match op.kind {
                OpKind::Match => counts.matches += 1,
                OpKind::Substitution => counts.substitutions += 1,
                OpKind::Insertion => counts.insertions += 1,
                OpKind::Deletion => counts.deletions += 1,
            }
        }
        counts
    }

    pub fn errors(&self) -> u64 {
        self.substitutions + self.insertions + self.deletions
    }

    /// `(S + I + D) / N`. Insertions can push this above 1.0.
    pub fn wer(&self) -> Result<f64, GradingError> {
        self.rate(self.errors())
    }

    pub fn substitution_rate(&self) -> Result<f64, GradingError> {
        self.rate(self.substitutions)
    }

    pub fn insertion_rate(&self) -> Result<f64, GradingError> {
        self.rate(self.insertions)
    }

    pub fn deletion_rate(&self) -> Result<f64, GradingError> {
        self.rate(self.deletions)
    }

    fn rate(&self, numerator: u64) -> Result<f64, GradingError> {
        if self.reference_len == 0 {
            return Err(GradingError::EmptyReference);
        }
        Ok(numerator as f64 / self.reference_len as f64)
    }
}

impl Add for ErrorCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            matches: self.matches + rhs.matches,
            substitutions: self.substitutions + rhs.substitutions,
            insertions: self.insertions + rhs.insertions,
            deletions: self.deletions + rhs.deletions,
            reference_len: self.reference_len + rhs.reference_len,
            hypothesis_len: self.hypothesis_len + rhs.hypothesis_len,
        }
    }
}

impl AddAssign for ErrorCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for ErrorCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub counts: ErrorCounts,
    pub key_phrases: Vec<KeyPhraseStats>,
}

impl ScoreSummary {
    pub fn wer(&self) -> Result<f64, GradingError> {
        self.counts.wer()
    }

    pub fn wer_or_none(&self) -> Option<f64> {
        self.counts.wer().ok()
    }

    /// Key-phrase counters pooled over every tracked phrase.
    pub fn key_phrase_totals(&self) -> PhraseCounts {
        self.key_phrases.iter().map(|stats| stats.counts).sum()
    }

    /// Non-fatal findings: one `MismatchedKeyPhrase` per phrase that never
    /// occurs in the reference.
    pub fn diagnostics(&self) -> Vec<GradingError> {
        self.key_phrases
            .iter()
            .filter_map(KeyPhraseStats::diagnostic)
            .collect()
    }
}

/// Phrases sharing the same normalized text are reported once.
pub fn score(alignment: &Alignment, key_phrases: &[KeyPhrase]) -> ScoreSummary {
    let counts = ErrorCounts::from_alignment(alignment);
    let mut phrase_stats: Vec<KeyPhraseStats> = Vec::with_capacity(key_phrases.len());
    for phrase in key_phrases {
        if phrase_stats.iter().all(|seen| seen.phrase != phrase.text()) {
            phrase_stats.push(key_phrase_stats(alignment, phrase));
        }
    }
    let key_phrases = phrase_stats;

    for stats in key_phrases.iter().filter(|stats| stats.is_mismatched()) {
        tracing::warn!(phrase = %stats.phrase, "key phrase does not occur in reference");
    }

    ScoreSummary {
        counts,
        key_phrases,
    }
}

/// Running aggregate over a batch. WER is pooled from the summed counters,
/// never averaged over per-item rates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchAggregate {
    pub item_count: u64,
    pub counts: ErrorCounts,
    pub key_phrases: Vec<KeyPhraseStats>,
}

impl BatchAggregate {
    /// Starts an empty aggregate that already lists every tracked phrase, so
    /// phrases without any occurrence still show up in the report.
    pub fn new(key_phrases: &[KeyPhrase]) -> Self {
        let mut aggregate = Self::default();
        for phrase in key_phrases {
            aggregate.add_phrase(&KeyPhraseStats::empty(phrase.text()));
        }
        aggregate
    }

    pub fn add(&mut self, summary: &ScoreSummary) {
        self.item_count += 1;
        self.counts += summary.counts;
        for stats in &summary.key_phrases {
            self.add_phrase(stats);
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.item_count += other.item_count;
        self.counts += other.counts;
        for stats in &other.key_phrases {
            self.add_phrase(stats);
        }
        self
    }

    pub fn wer(&self) -> Result<f64, GradingError> {
        self.counts.wer()
    }

    pub fn wer_or_none(&self) -> Option<f64> {
        self.counts.wer().ok()
    }

    pub fn key_phrase_totals(&self) -> PhraseCounts {
        self.key_phrases.iter().map(|stats| stats.counts).sum()
    }

    pub fn diagnostics(&self) -> Vec<GradingError> {
        self.key_phrases
            .iter()
            .filter_map(KeyPhraseStats::diagnostic)
            .collect()
    }

    fn add_phrase(&mut self, stats: &KeyPhraseStats) {
        match self
            .key_phrases
            .iter_mut()
            .find(|existing| existing.phrase == stats.phrase)
        {
            Some(existing) => existing.counts += stats.counts,
            None => self.key_phrases.push(stats.clone()),
        }
    }
}

impl<'a> FromIterator<&'a ScoreSummary> for BatchAggregate {
    fn from_iter<I: IntoIterator<Item = &'a ScoreSummary>>(iter: I) -> Self {
        let mut aggregate = Self::default();
        for summary in iter {
            aggregate.add(summary);
        }
        aggregate
    }
}

/// Output of grading one hypothesis/reference pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPair {
    pub id: String,
    pub alignment: Alignment,
    pub summary: ScoreSummary,
}

/// A batch item that could not be graded. Recorded, never fatal to the batch.
#[derive(Debug)]
pub struct FailedItem {
    pub id: String,
    pub error: GradingError,
}
