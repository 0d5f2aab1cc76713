use crate::alignment::tokenization::PreprocessRule;
use crate::types::{Alignment, TokenSequence};

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str, rule: PreprocessRule) -> TokenSequence;
}

pub trait SequenceAligner: Send + Sync {
    fn align(&self, hypothesis: &TokenSequence, reference: &TokenSequence) -> Alignment;
}
