//! Training loop for the points model

use burn::data::dataloader::DataLoaderBuilder;
use burn::module::AutodiffModule;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;

use crate::data::{SequenceBatcher, SequenceDataset};
use crate::model::{PointsNet, PointsNetConfig};
use crate::training::metrics::{Metrics, TrainingHistory};
use crate::{FplError, Result, TrainingConfig};

/// Per-run training knobs, decoupled from the full config so the search
/// loop can shorten the epoch budget per candidate
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub patience: usize,
    pub seed: u64,
    /// Target std for reporting MAE in original points
    pub target_std: f32,
}

impl TrainOptions {
    pub fn from_config(training: &TrainingConfig, target_std: f32) -> Self {
        TrainOptions {
            epochs: training.epochs,
            batch_size: training.batch_size,
            patience: training.early_stopping_patience,
            seed: training.seed,
            target_std,
        }
    }
}

/// Trainer for the points model
pub struct Trainer<B: AutodiffBackend> {
    model: PointsNet<B>,
    optimizer: burn::optim::adaptor::OptimizerAdaptor<Adam, PointsNet<B>, B>,
    learning_rate: f64,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B>
where
    B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
    B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Create a new trainer
    pub fn new(device: B::Device, config: PointsNetConfig, learning_rate: f64) -> Self {
        let model = PointsNet::new(&device, config);
        let optimizer = AdamConfig::new().init();

        Trainer {
            model,
            optimizer,
            learning_rate,
            device,
        }
    }

    /// Train with early stopping, returning the best-by-validation model
    ///
    /// The returned model is the snapshot from the best validation epoch,
    /// not the final one.
    pub fn train(
        mut self,
        train_dataset: SequenceDataset,
        val_dataset: SequenceDataset,
        options: &TrainOptions,
    ) -> Result<(PointsNet<B>, TrainingHistory)> {
        use burn::data::dataset::Dataset;

        if train_dataset.is_empty() {
            return Err(FplError::Config(
                "no training sequences - not enough player history".to_string(),
            ));
        }
        if val_dataset.is_empty() {
            return Err(FplError::Config(
                "no validation sequences - not enough player history".to_string(),
            ));
        }

        let batcher_train = SequenceBatcher::<B>::new(self.device.clone());
        let batcher_val = SequenceBatcher::<B::InnerBackend>::new(self.device.clone());

        let train_loader = DataLoaderBuilder::new(batcher_train)
            .batch_size(options.batch_size)
            .shuffle(options.seed)
            .build(train_dataset);

        // Validation in one full batch
        let val_loader = DataLoaderBuilder::new(batcher_val)
            .batch_size(val_dataset.len())
            .build(val_dataset);

        let mut history = TrainingHistory::new();
        let mut best_model = self.model.clone();

        log::info!(
            "Starting training: {} epochs, batch size {}, patience {}",
            options.epochs,
            options.batch_size,
            options.patience
        );

        for epoch in 0..options.epochs {
            let mut train_metrics = Metrics::new(options.target_std);

            for batch in train_loader.iter() {
                let batch_size = batch.targets.dims()[0];
                let targets = batch.targets.unsqueeze_dim(1);

                let predictions = self.model.forward(batch.inputs);
                let diff = predictions - targets;

                let loss = diff.clone().powf_scalar(2.0).mean();
                let loss_val: f32 = loss.clone().into_scalar().elem();
                let abs_err: f32 = diff.abs().mean().into_scalar().elem();

                let grads = loss.backward();
                let grads_params = GradientsParams::from_grads(grads, &self.model);
                self.model = self.optimizer.step(self.learning_rate, self.model, grads_params);

                train_metrics.update(loss_val, abs_err, batch_size);
            }

            // Validation on the inner backend: no autodiff, dropout inactive
            let mut val_metrics = Metrics::new(options.target_std);
            let val_model = self.model.valid();
            for batch in val_loader.iter() {
                let batch_size = batch.targets.dims()[0];
                let targets = batch.targets.unsqueeze_dim(1);

                let predictions = val_model.forward(batch.inputs);
                let diff = predictions - targets;

                let loss_val: f32 = diff.clone().powf_scalar(2.0).mean().into_scalar().elem();
                let abs_err: f32 = diff.abs().mean().into_scalar().elem();

                val_metrics.update(loss_val, abs_err, batch_size);
            }

            let improved = history.record_epoch(epoch, &train_metrics, &val_metrics);
            if improved {
                best_model = self.model.clone();
            }

            if epoch % 5 == 0 || epoch == options.epochs - 1 || improved {
                log::info!(
                    "Epoch {}/{}: train [{}] val [{}]{}",
                    epoch + 1,
                    options.epochs,
                    train_metrics,
                    val_metrics,
                    if improved { " *" } else { "" }
                );
            }

            if history.should_early_stop(options.patience) {
                log::info!(
                    "Early stopping at epoch {} (best epoch {}, val loss {:.4})",
                    epoch + 1,
                    history.best_epoch + 1,
                    history.best_val_loss
                );
                break;
            }
        }

        Ok((best_model, history))
    }
}
