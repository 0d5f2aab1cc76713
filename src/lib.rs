pub mod alignment;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod recognition;
pub mod types;

pub use alignment::edit_distance::{align, edit_distance};
pub use alignment::keyphrase::{key_phrase_stats, KeyPhrase, KeyPhraseStats, PhraseCounts};
pub use alignment::report::{render, render_batch, Report};
pub use alignment::scoring::{
    score, BatchAggregate, ErrorCounts, FailedItem, ScoreSummary, ScoredPair,
};
pub use alignment::tokenization::{tokenize, tokenize_named, PreprocessRule};
pub use config::GraderConfig;
pub use error::GradingError;
pub use pipeline::builder::GraderBuilder;
pub use pipeline::runtime::{BatchOutcome, Grader};
pub use pipeline::traits::{SequenceAligner, Tokenizer};
pub use recognition::RecognitionResponse;
pub use types::{Alignment, AlignmentOp, OpKind, ScoreInput, Token, TokenSequence};
