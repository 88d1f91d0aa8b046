//! Model inference for next-round predictions

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::data::SequenceBuilder;
use crate::features::{FeatureVector, NormalizationParams};
use crate::model::{PointsNet, PointsNetConfig};
use crate::{FplError, Player, PlayerId, PredictionRow, Result};

/// Path of the normalization sidecar stored next to a model artifact
pub fn norm_sidecar_path(model_path: &str) -> String {
    format!("{}.norm.json", model_path)
}

/// Predictor for estimating next-round points
///
/// Bundles the trained model with the normalization parameters it was
/// trained under; the two are saved and loaded together.
pub struct Predictor<B: Backend> {
    model: PointsNet<B>,
    norm: NormalizationParams,
    device: B::Device,
    /// Sequence window length the model expects
    window: usize,
}

impl<B: Backend> Predictor<B>
where
    B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
    B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
{
    pub fn new(
        model: PointsNet<B>,
        norm: NormalizationParams,
        device: B::Device,
        window: usize,
    ) -> Self {
        Predictor {
            model,
            norm,
            device,
            window,
        }
    }

    /// Load predictor from a saved model and its sidecar
    pub fn load(
        model_path: &str,
        config: PointsNetConfig,
        window: usize,
        device: B::Device,
    ) -> Result<Self> {
        let norm = NormalizationParams::load(&norm_sidecar_path(model_path))
            .map_err(|_| FplError::NoModel)?;
        let model =
            PointsNet::load(&device, model_path, config).map_err(|_| FplError::NoModel)?;

        Ok(Self::new(model, norm, device, window))
    }

    /// Save the model and its normalization sidecar
    pub fn save(&self, model_path: &str) -> Result<()> {
        if let Some(parent) = std::path::Path::new(model_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.model.save(model_path)?;
        self.norm.save(&norm_sidecar_path(model_path))
    }

    /// Predict next-round points for one player from their full history
    ///
    /// History must hold at least `window` gap-free trailing rounds.
    pub fn predict_player(&self, player: PlayerId, history: &[FeatureVector]) -> Result<f32> {
        let builder = SequenceBuilder::new(self.window);
        let raw_window = builder
            .latest_window(history)
            .ok_or(FplError::InsufficientHistory {
                player,
                rounds: history.len(),
                required: self.window,
            })?;

        Ok(self.forward_windows(&[raw_window])[0])
    }

    /// Predict for every eligible player, sorted by predicted points
    ///
    /// Players without enough trailing history are absent from the output,
    /// never zero-filled; the skip count is returned alongside.
    pub fn predict_all(
        &self,
        vectors: &[FeatureVector],
        players: &[Player],
    ) -> (Vec<PredictionRow>, usize) {
        let builder = SequenceBuilder::new(self.window);
        let by_player = SequenceBuilder::group_by_player(vectors);

        let names: std::collections::HashMap<PlayerId, &str> =
            players.iter().map(|p| (p.id, p.name.as_str())).collect();

        let mut eligible = Vec::new();
        let mut windows = Vec::new();
        let mut skipped = 0;

        for (player, history) in &by_player {
            match builder.latest_window(history) {
                Some(window) => {
                    eligible.push((*player, history.last().map(|v| v.price).unwrap_or(0.0)));
                    windows.push(window);
                }
                None => {
                    log::debug!(
                        "Skipping {}: {} rounds, need {} contiguous",
                        player,
                        history.len(),
                        self.window
                    );
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            log::info!("Skipped {} players with insufficient history", skipped);
        }

        if eligible.is_empty() {
            return (Vec::new(), skipped);
        }

        let predictions = self.forward_windows(&windows);

        let mut rows: Vec<PredictionRow> = eligible
            .into_iter()
            .zip(predictions)
            .map(|((player, price), predicted_points)| PredictionRow {
                player,
                name: names.get(&player).unwrap_or(&"").to_string(),
                predicted_points,
                price,
            })
            .collect();

        // Highest expected points first; player id keeps ties stable
        rows.sort_by(|a, b| {
            b.predicted_points
                .partial_cmp(&a.predicted_points)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.player.cmp(&b.player))
        });

        (rows, skipped)
    }

    /// Normalize raw windows, run one batched forward pass, and invert
    /// the outputs back to points
    fn forward_windows(&self, windows: &[Vec<Vec<f32>>]) -> Vec<f32> {
        let n = windows.len();
        let data: Vec<f32> = windows
            .iter()
            .flat_map(|w| w.iter().flat_map(|row| self.norm.apply(row)))
            .collect();

        let input = Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([
            n,
            self.window,
            FeatureVector::DIM,
        ]);

        let output = self.model.forward(input);
        let normalized: Vec<f32> = output.into_data().as_slice().unwrap().to_vec();

        normalized
            .into_iter()
            .map(|v| self.norm.invert_target(v))
            .collect()
    }
}

/// Write predictions as CSV, prices in display units
pub fn write_predictions_csv(rows: &[PredictionRow], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["player_id", "name", "predicted_points", "price"])?;

    for row in rows {
        writer.write_record([
            row.player.0.to_string(),
            row.name.clone(),
            format!("{:.2}", row.predicted_points),
            format!("{:.1}", row.price / 10.0),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Format the top predictions as a display table
pub fn format_predictions(rows: &[PredictionRow], limit: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<6} {:<24} {:>8} {:>7}\n",
        "Rank", "Player", "Points", "Price"
    ));

    for (i, row) in rows.iter().take(limit).enumerate() {
        out.push_str(&format!(
            "{:<6} {:<24} {:>8.2} {:>7.1}\n",
            i + 1,
            row.name,
            row.predicted_points,
            row.price / 10.0
        ));
    }

    out
}
