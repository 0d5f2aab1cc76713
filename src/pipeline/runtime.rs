use rayon::prelude::*;

use crate::alignment::keyphrase::{dedup_phrases, KeyPhrase};
use crate::alignment::scoring::{score, BatchAggregate, FailedItem, ScoredPair};
use crate::alignment::tokenization::PreprocessRule;
use crate::error::GradingError;
use crate::pipeline::traits::{SequenceAligner, Tokenizer};
use crate::types::ScoreInput;

pub struct Grader {
    preprocess_rule: PreprocessRule,
    raw_key_phrases: Vec<String>,
    key_phrases: Vec<KeyPhrase>,
    tokenizer: Box<dyn Tokenizer>,
    sequence_aligner: Box<dyn SequenceAligner>,
}

pub(crate) struct GraderParts {
    pub preprocess_rule: PreprocessRule,
    pub raw_key_phrases: Vec<String>,
    pub key_phrases: Vec<KeyPhrase>,
    pub tokenizer: Box<dyn Tokenizer>,
    pub sequence_aligner: Box<dyn SequenceAligner>,
}

/// Result of grading a batch. `items` and `failures` keep input order.
#[derive(Debug)]
pub struct BatchOutcome {
    pub items: Vec<ScoredPair>,
    pub aggregate: BatchAggregate,
    pub failures: Vec<FailedItem>,
}

impl Grader {
    pub(crate) fn from_parts(parts: GraderParts) -> Self {
        Self {
            preprocess_rule: parts.preprocess_rule,
            raw_key_phrases: parts.raw_key_phrases,
            key_phrases: parts.key_phrases,
            tokenizer: parts.tokenizer,
            sequence_aligner: parts.sequence_aligner,
        }
    }

    pub fn preprocess_rule(&self) -> PreprocessRule {
        self.preprocess_rule
    }

    pub fn key_phrases(&self) -> &[KeyPhrase] {
        &self.key_phrases
    }

    /// Grades one pair with the configured rule.
    pub fn score(&self, id: &str, hypothesis: &str, reference: &str) -> ScoredPair {
        self.score_prepared(id, hypothesis, reference, self.preprocess_rule, &self.key_phrases)
    }

    /// Grades one pair with `rule`. Key phrases are re-tokenized when `rule`
    /// differs from the configured one.
    pub fn score_with_rule(
        &self,
        id: &str,
        hypothesis: &str,
        reference: &str,
        rule: PreprocessRule,
    ) -> Result<ScoredPair, GradingError> {
        if rule == self.preprocess_rule {
            return Ok(self.score(id, hypothesis, reference));
        }
        let key_phrases = self
            .raw_key_phrases
            .iter()
            .map(|text| KeyPhrase::from_tokens(text, self.tokenizer.tokenize(text, rule), rule))
            .collect::<Result<Vec<_>, _>>()?;
        let key_phrases = dedup_phrases(key_phrases);
        Ok(self.score_prepared(id, hypothesis, reference, rule, &key_phrases))
    }

    pub fn score_input(&self, input: &ScoreInput) -> Result<ScoredPair, GradingError> {
        match input.preprocess_rule.as_deref() {
            Some(name) => {
                let rule = name.parse::<PreprocessRule>()?;
                self.score_with_rule(&input.id, &input.hypothesis, &input.reference, rule)
            }
            None => Ok(self.score(&input.id, &input.hypothesis, &input.reference)),
        }
    }

    /// Grades every input in parallel. A failing item is recorded in
    /// `failures` and left out of the aggregate; the rest of the batch still
    /// completes.
    pub fn score_batch(&self, inputs: &[ScoreInput]) -> BatchOutcome {
        self.score_batch_with_progress(inputs, |_| {})
    }

    /// Like [`Grader::score_batch`], calling `on_item` once per finished item
    /// from whichever worker finished it.
    pub fn score_batch_with_progress<F>(&self, inputs: &[ScoreInput], on_item: F) -> BatchOutcome
    where
        F: Fn(&str) + Send + Sync,
    {
        let results: Vec<Result<ScoredPair, GradingError>> = inputs
            .par_iter()
            .map(|input| {
                let result = self.score_input(input);
                on_item(&input.id);
                result
            })
            .collect();

        let mut aggregate = BatchAggregate::new(&self.key_phrases);
        let mut items = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (input, result) in inputs.iter().zip(results) {
            match result {
                Ok(pair) => {
                    aggregate.add(&pair.summary);
                    items.push(pair);
                }
                Err(error) => {
                    tracing::warn!(id = %input.id, error = %error, "skipping batch item");
                    failures.push(FailedItem {
                        id: input.id.clone(),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            items = items.len(),
            failed = failures.len(),
            reference_words = aggregate.counts.reference_len,
            "batch graded"
        );

        BatchOutcome {
            items,
            aggregate,
            failures,
        }
    }

    fn score_prepared(
        &self,
        id: &str,
        hypothesis: &str,
        reference: &str,
        rule: PreprocessRule,
        key_phrases: &[KeyPhrase],
    ) -> ScoredPair {
        let hypothesis = self.tokenizer.tokenize(hypothesis, rule);
        let reference = self.tokenizer.tokenize(reference, rule);
        if reference.is_empty() {
            tracing::debug!(id, "reference is empty after preprocessing");
        }
        let alignment = self.sequence_aligner.align(&hypothesis, &reference);
        let summary = score(&alignment, key_phrases);
        ScoredPair {
            id: id.to_string(),
            alignment,
            summary,
        }
    }
}
