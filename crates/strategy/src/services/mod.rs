pub mod scoring;

pub use scoring::{CONFIDENCE_BAND, ScoringEngine, Verdict};
