//! Grid search over model hyperparameters
//!
//! Every candidate trains on the same split with the same seed, so the
//! only varying factor is the hyperparameters themselves.

use burn::tensor::backend::AutodiffBackend;

use crate::data::SequenceDataset;
use crate::model::PointsNetConfig;
use crate::training::trainer::{TrainOptions, Trainer};
use crate::{Config, Result, SearchConfig};

/// One point in the hyperparameter grid
#[derive(Debug, Clone)]
pub struct SearchCandidate {
    pub hidden_size: usize,
    pub dense_size: usize,
    pub dropout: f64,
    pub learning_rate: f64,
}

impl SearchCandidate {
    pub fn model_config(&self) -> PointsNetConfig {
        PointsNetConfig {
            input_dim: crate::features::FeatureVector::DIM,
            hidden_size: self.hidden_size,
            dense_size: self.dense_size,
            dropout: self.dropout,
        }
    }
}

/// Outcome of training one candidate
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub candidate: SearchCandidate,
    /// Best validation loss reached during the candidate's run
    pub val_loss: f64,
    pub param_count: usize,
}

/// Full cross product of the configured value lists
pub fn candidate_grid(search: &SearchConfig) -> Vec<SearchCandidate> {
    let mut grid = Vec::new();
    for &hidden_size in &search.hidden_sizes {
        for &dense_size in &search.dense_sizes {
            for &dropout in &search.dropouts {
                for &learning_rate in &search.learning_rates {
                    grid.push(SearchCandidate {
                        hidden_size,
                        dense_size,
                        dropout,
                        learning_rate,
                    });
                }
            }
        }
    }
    grid
}

/// Pick the winner: lowest validation loss, then fewest parameters
///
/// Candidates with a non-finite loss never win.
pub fn select_best(results: &[SearchResult]) -> Option<&SearchResult> {
    results
        .iter()
        .filter(|r| r.val_loss.is_finite())
        .min_by(|a, b| {
            a.val_loss
                .partial_cmp(&b.val_loss)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.param_count.cmp(&b.param_count))
        })
}

/// Hyperparameter search runner
pub struct ModelSearch<B: AutodiffBackend> {
    device: B::Device,
}

impl<B: AutodiffBackend> ModelSearch<B>
where
    B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
    B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
{
    pub fn new(device: B::Device) -> Self {
        ModelSearch { device }
    }

    /// Train every grid candidate and collect validation results
    ///
    /// The backend is reseeded before each candidate so weight
    /// initialization does not depend on grid position.
    pub fn run(
        &self,
        train: &SequenceDataset,
        val: &SequenceDataset,
        config: &Config,
        target_std: f32,
    ) -> Result<Vec<SearchResult>> {
        let grid = candidate_grid(&config.search);
        let total = grid.len();
        log::info!("Searching {} hyperparameter candidates", total);

        let options = TrainOptions {
            epochs: config.search.epochs,
            batch_size: config.training.batch_size,
            patience: config.training.early_stopping_patience,
            seed: config.training.seed,
            target_std,
        };

        let mut results = Vec::with_capacity(total);
        for (i, candidate) in grid.into_iter().enumerate() {
            log::info!(
                "Candidate {}/{}: hidden={}, dense={}, dropout={}, lr={}",
                i + 1,
                total,
                candidate.hidden_size,
                candidate.dense_size,
                candidate.dropout,
                candidate.learning_rate
            );

            B::seed(config.training.seed);
            let model_config = candidate.model_config();
            let param_count = model_config.param_count();

            let trainer =
                Trainer::<B>::new(self.device.clone(), model_config, candidate.learning_rate);
            let (_, history) = trainer.train(train.clone(), val.clone(), &options)?;

            log::info!(
                "  val loss {:.4} at epoch {} ({} params)",
                history.best_val_loss,
                history.best_epoch + 1,
                param_count
            );

            results.push(SearchResult {
                candidate,
                val_loss: history.best_val_loss,
                param_count,
            });
        }

        Ok(results)
    }
}
