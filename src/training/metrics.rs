//! Training metrics and evaluation

use std::fmt;

/// Regression metrics accumulated over batches
///
/// Loss stays in normalized space; MAE is reported in original points via
/// the target standard deviation.
#[derive(Debug, Clone)]
pub struct Metrics {
    /// Sum of per-batch MSE losses
    pub loss_sum: f64,
    /// Sum of absolute errors, normalized space, weighted by batch size
    pub abs_err_sum: f64,
    /// Total predictions seen
    pub total_predictions: usize,
    /// Number of batches accumulated
    pub batch_count: usize,
    /// Target std for converting MAE to original points
    pub target_std: f32,
}

impl Metrics {
    pub fn new(target_std: f32) -> Self {
        Metrics {
            loss_sum: 0.0,
            abs_err_sum: 0.0,
            total_predictions: 0,
            batch_count: 0,
            target_std,
        }
    }

    /// Update with one batch's loss and mean absolute error
    pub fn update(&mut self, loss: f32, abs_err: f32, batch_size: usize) {
        self.loss_sum += loss as f64;
        self.abs_err_sum += abs_err as f64 * batch_size as f64;
        self.total_predictions += batch_size;
        self.batch_count += 1;
    }

    /// Average MSE loss (normalized space)
    pub fn avg_loss(&self) -> f64 {
        if self.batch_count == 0 {
            0.0
        } else {
            self.loss_sum / self.batch_count as f64
        }
    }

    /// Mean absolute error in original fantasy points
    pub fn mae(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            (self.abs_err_sum / self.total_predictions as f64) * self.target_std as f64
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Loss: {:.4} | MAE: {:.2} pts", self.avg_loss(), self.mae())
    }
}

/// Training history for tracking progress
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub train_losses: Vec<f64>,
    pub val_losses: Vec<f64>,
    pub train_maes: Vec<f64>,
    pub val_maes: Vec<f64>,
    pub best_val_loss: f64,
    pub best_epoch: usize,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self {
            best_val_loss: f64::INFINITY,
            ..Default::default()
        }
    }

    /// Record metrics for an epoch
    ///
    /// Returns true when this epoch improved the best validation loss.
    pub fn record_epoch(&mut self, epoch: usize, train: &Metrics, val: &Metrics) -> bool {
        self.train_losses.push(train.avg_loss());
        self.val_losses.push(val.avg_loss());
        self.train_maes.push(train.mae());
        self.val_maes.push(val.mae());

        if val.avg_loss() < self.best_val_loss {
            self.best_val_loss = val.avg_loss();
            self.best_epoch = epoch;
            true
        } else {
            false
        }
    }

    /// Check if we should early stop
    pub fn should_early_stop(&self, patience: usize) -> bool {
        if self.val_losses.len() < patience {
            return false;
        }
        let current_epoch = self.val_losses.len() - 1;
        current_epoch - self.best_epoch >= patience
    }
}
