pub mod edit_distance;
pub mod keyphrase;
pub mod report;
pub mod scoring;
pub mod tokenization;
