//! Feature engineering
//!
//! Converts raw per-round records into model-ready feature vectors.

pub mod assembler;
pub mod difficulty;
pub mod form;
pub mod scaling;

pub use assembler::{ExclusionReport, FeatureAssembler, FeatureVector};
pub use difficulty::{DifficultyConfig, DifficultyEngine};
pub use form::{FormAggregator, PlayerForm};
pub use scaling::NormalizationParams;
