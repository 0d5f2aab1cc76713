use crate::alignment::edit_distance::align;
use crate::alignment::tokenization::{tokenize, PreprocessRule};
use crate::pipeline::traits::{SequenceAligner, Tokenizer};
use crate::types::{Alignment, TokenSequence};

pub struct RuleTokenizer;

impl Tokenizer for RuleTokenizer {
    fn tokenize(&self, text: &str, rule: PreprocessRule) -> TokenSequence {
        tokenize(text, rule)
    }
}

pub struct EditDistanceAligner;

impl SequenceAligner for EditDistanceAligner {
    fn align(&self, hypothesis: &TokenSequence, reference: &TokenSequence) -> Alignment {
        align(hypothesis, reference)
    }
}
