//! Feature normalization
//!
//! Z-score parameters fitted on the training partition and reused verbatim
//! for validation and inference. Kept alongside the trained model: the two
//! travel together.

use crate::{FplError, Result};
use serde::{Deserialize, Serialize};

/// Per-feature location/scale statistics plus the target's own pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
    pub target_mean: f32,
    pub target_std: f32,
}

/// Below this, a feature is treated as constant and left unscaled
const MIN_STD: f32 = 1e-6;

impl NormalizationParams {
    /// Fit from training feature rows and targets
    ///
    /// A zero-variance feature gets std = 1.0 so `apply` stays finite and
    /// `invert` stays exact.
    pub fn fit(rows: &[Vec<f32>], targets: &[f32]) -> Self {
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        let n = rows.len().max(1) as f32;

        let mut sum = vec![0.0f32; dim];
        let mut sum_sq = vec![0.0f32; dim];
        for row in rows {
            for (j, v) in row.iter().enumerate() {
                sum[j] += v;
                sum_sq[j] += v * v;
            }
        }

        let mean: Vec<f32> = sum.iter().map(|s| s / n).collect();
        let std: Vec<f32> = sum_sq
            .iter()
            .zip(mean.iter())
            .map(|(sq, m)| {
                let s = (sq / n - m * m).max(0.0).sqrt();
                if s < MIN_STD {
                    1.0
                } else {
                    s
                }
            })
            .collect();

        let (target_mean, target_std) = scalar_stats(targets);

        NormalizationParams {
            mean,
            std,
            target_mean,
            target_std,
        }
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Normalize one feature row
    pub fn apply(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    /// Recover an original feature value from its normalized form
    pub fn invert_feature(&self, index: usize, normalized: f32) -> f32 {
        normalized * self.std[index] + self.mean[index]
    }

    pub fn normalize_target(&self, target: f32) -> f32 {
        (target - self.target_mean) / self.target_std
    }

    pub fn invert_target(&self, normalized: f32) -> f32 {
        normalized * self.target_std + self.target_mean
    }

    /// Write the sidecar file stored next to the model artifact
    pub fn save(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| FplError::Parse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| FplError::Parse(e.to_string()))
    }
}

fn scalar_stats(values: &[f32]) -> (f32, f32) {
    let n = values.len().max(1) as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    let std = variance.sqrt();
    (mean, if std < MIN_STD { 1.0 } else { std })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> (Vec<Vec<f32>>, Vec<f32>) {
        let rows = vec![
            vec![1.0, 10.0, 5.0],
            vec![2.0, 20.0, 5.0],
            vec![3.0, 30.0, 5.0],
            vec![4.0, 40.0, 5.0],
        ];
        let targets = vec![2.0, 4.0, 6.0, 8.0];
        (rows, targets)
    }

    #[test]
    fn test_apply_invert_roundtrip() {
        let (rows, targets) = sample_rows();
        let params = NormalizationParams::fit(&rows, &targets);

        for row in &rows {
            let normalized = params.apply(row);
            for (j, v) in row.iter().enumerate() {
                let back = params.invert_feature(j, normalized[j]);
                assert!((back - v).abs() < 1e-4, "feature {} round trip", j);
            }
        }

        for t in &targets {
            let back = params.invert_target(params.normalize_target(*t));
            assert!((back - t).abs() < 1e-4);
        }
    }

    #[test]
    fn test_constant_feature_no_division_by_zero() {
        let (rows, targets) = sample_rows();
        let params = NormalizationParams::fit(&rows, &targets);

        // Third feature is constant: no-op scale
        assert_eq!(params.std[2], 1.0);
        let normalized = params.apply(&rows[0]);
        assert!(normalized.iter().all(|v| v.is_finite()));
        assert_eq!(normalized[2], 0.0);
    }

    #[test]
    fn test_constant_targets() {
        let rows = vec![vec![1.0], vec![2.0]];
        let params = NormalizationParams::fit(&rows, &[3.0, 3.0]);

        assert_eq!(params.target_std, 1.0);
        assert!(params.normalize_target(3.0).is_finite());
        assert!((params.invert_target(params.normalize_target(7.0)) - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_normalized_train_stats() {
        let (rows, targets) = sample_rows();
        let params = NormalizationParams::fit(&rows, &targets);

        // Normalized training data should be centered
        let sums: Vec<f32> = (0..3)
            .map(|j| rows.iter().map(|r| params.apply(r)[j]).sum::<f32>())
            .collect();
        for s in sums {
            assert!(s.abs() < 1e-4);
        }
    }
}
