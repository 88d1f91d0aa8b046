//! Model training and hyperparameter search

pub mod metrics;
pub mod search;
pub mod trainer;

pub use metrics::{Metrics, TrainingHistory};
pub use search::{candidate_grid, select_best, ModelSearch, SearchCandidate, SearchResult};
pub use trainer::{TrainOptions, Trainer};
