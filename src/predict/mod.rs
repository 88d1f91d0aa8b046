//! Inference and prediction output

pub mod inference;

pub use inference::{format_predictions, norm_sidecar_path, write_predictions_csv, Predictor};
