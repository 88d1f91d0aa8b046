//! LSTM regression model for next-round points
//!
//! Processes a player's recent-round sequence and outputs one normalized
//! points value.

use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Lstm, LstmConfig};
use burn::record::{FullPrecisionSettings, Recorder};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Configuration for the points model
#[derive(Debug, Clone)]
pub struct PointsNetConfig {
    /// Input feature dimension (FeatureVector::DIM)
    pub input_dim: usize,
    /// LSTM hidden size
    pub hidden_size: usize,
    /// Dense layer width after the LSTM
    pub dense_size: usize,
    /// Dropout rate
    pub dropout: f64,
}

impl Default for PointsNetConfig {
    fn default() -> Self {
        PointsNetConfig {
            input_dim: crate::features::FeatureVector::DIM,
            hidden_size: 64,
            dense_size: 32,
            dropout: 0.2,
        }
    }
}

impl PointsNetConfig {
    /// Create configuration from the model config section
    pub fn from_config(model: &crate::ModelConfig) -> Self {
        PointsNetConfig {
            input_dim: crate::features::FeatureVector::DIM,
            hidden_size: model.hidden_size,
            dense_size: model.dense_size,
            dropout: model.dropout,
        }
    }

    /// Number of trainable parameters this configuration produces
    ///
    /// Used as the tie-breaker between search candidates with equal
    /// validation loss.
    pub fn param_count(&self) -> usize {
        let i = self.input_dim;
        let h = self.hidden_size;
        let d = self.dense_size;

        // Four gates, each with input weights, recurrent weights, and two biases
        let lstm = 4 * (i * h + h * h + 2 * h);
        let fc1 = h * d + d;
        let output = d + 1;

        lstm + fc1 + output
    }
}

/// LSTM points model
///
/// Architecture:
/// 1. Sequence through LSTM, take final hidden state
/// 2. Dropout
/// 3. Dense + relu
/// 4. Dropout
/// 5. Linear output (one value per player)
#[derive(Module, Debug)]
pub struct PointsNet<B: Backend> {
    lstm: Lstm<B>,
    dropout: Dropout,
    fc1: Linear<B>,
    output: Linear<B>,
    /// Stored for reshaping the final hidden state
    hidden_size: usize,
}

impl<B: Backend> PointsNet<B> {
    pub fn new(device: &B::Device, config: PointsNetConfig) -> Self {
        let lstm = LstmConfig::new(config.input_dim, config.hidden_size, true).init(device);
        let dropout = DropoutConfig::new(config.dropout).init();
        let fc1 = LinearConfig::new(config.hidden_size, config.dense_size).init(device);
        let output = LinearConfig::new(config.dense_size, 1).init(device);

        PointsNet {
            lstm,
            dropout,
            fc1,
            output,
            hidden_size: config.hidden_size,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `sequences` - Player history windows [batch, seq_len, features]
    ///
    /// # Returns
    /// Normalized points predictions [batch, 1]
    pub fn forward(&self, sequences: Tensor<B, 3>) -> Tensor<B, 2> {
        let batch_size = sequences.dims()[0];

        // LSTM returns (output, state); the final hidden state summarizes
        // the whole window
        let (_, state) = self.lstm.forward(sequences, None);
        let repr = state.hidden.reshape([batch_size, self.hidden_size]);

        let x = self.dropout.forward(repr);
        let x = burn::tensor::activation::relu(self.fc1.forward(x));
        let x = self.dropout.forward(x);

        self.output.forward(x)
    }

    /// Save model to file
    pub fn save(&self, path: &str) -> crate::Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.clone().into_record(), path.into())
            .map_err(|e| crate::FplError::Io(std::io::Error::other(e.to_string())))
    }

    /// Load model from file
    pub fn load(device: &B::Device, path: &str, config: PointsNetConfig) -> crate::Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.into(), device)
            .map_err(|e| crate::FplError::Io(std::io::Error::other(e.to_string())))?;

        let model = Self::new(device, config);
        Ok(model.load_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_points_net_shapes() {
        let device = Default::default();
        let config = PointsNetConfig::default();
        let input_dim = config.input_dim;
        let model = PointsNet::<TestBackend>::new(&device, config);

        let batch_size = 4;
        let seq_len = 5;
        let sequences = Tensor::random(
            [batch_size, seq_len, input_dim],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );

        let predictions = model.forward(sequences);
        assert_eq!(predictions.dims(), [batch_size, 1]);
    }

    #[test]
    fn test_config_from_model_section() {
        let model = crate::ModelConfig {
            sequence_window: 5,
            hidden_size: 48,
            dense_size: 24,
            dropout: 0.3,
        };

        let config = PointsNetConfig::from_config(&model);
        assert_eq!(config.hidden_size, 48);
        assert_eq!(config.dense_size, 24);
        assert_eq!(config.dropout, 0.3);
        assert_eq!(config.input_dim, crate::features::FeatureVector::DIM);
    }

    #[test]
    fn test_param_count_ordering() {
        let small = PointsNetConfig {
            input_dim: 8,
            hidden_size: 32,
            dense_size: 16,
            dropout: 0.2,
        };
        let large = PointsNetConfig {
            input_dim: 8,
            hidden_size: 128,
            dense_size: 64,
            dropout: 0.2,
        };

        assert!(small.param_count() < large.param_count());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let device = Default::default();
        let config = PointsNetConfig {
            input_dim: 8,
            hidden_size: 16,
            dense_size: 8,
            dropout: 0.0,
        };

        let model = PointsNet::<TestBackend>::new(&device, config.clone());
        let input = Tensor::random(
            [2, 5, 8],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let before: Vec<f32> = model
            .forward(input.clone())
            .into_data()
            .as_slice()
            .unwrap()
            .to_vec();

        let path = std::env::temp_dir().join("fpl_points_net_test");
        let path = path.to_str().unwrap();
        model.save(path).unwrap();

        let restored = PointsNet::<TestBackend>::load(&device, path, config).unwrap();
        let after: Vec<f32> = restored
            .forward(input)
            .into_data()
            .as_slice()
            .unwrap()
            .to_vec();

        for (a, b) in before.iter().zip(after.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
