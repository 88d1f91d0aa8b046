//! Sequence dataset for training
//!
//! Slides a fixed-length window over each player's chronological feature
//! vectors and exposes the result as a burn dataset.

use crate::features::{FeatureVector, NormalizationParams};
use crate::PlayerId;
use burn::data::dataset::Dataset;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// One training example: W consecutive rounds and the following round's points
///
/// Raw (original units) when produced by the builder; normalized once a
/// dataset is assembled with fitted parameters.
#[derive(Debug, Clone)]
pub struct SequenceSample {
    pub player: PlayerId,
    /// W rows of FeatureVector::DIM values each
    pub window: Vec<Vec<f32>>,
    pub target: f32,
}

/// Builds fixed-length windows from per-player chronological features
pub struct SequenceBuilder {
    /// Sequence window length (W)
    window: usize,
}

impl SequenceBuilder {
    pub fn new(window: usize) -> Self {
        SequenceBuilder { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Group feature vectors per player, ordered by round
    ///
    /// BTreeMap keeps player iteration order deterministic across runs.
    pub fn group_by_player(vectors: &[FeatureVector]) -> BTreeMap<PlayerId, Vec<FeatureVector>> {
        let mut by_player: BTreeMap<PlayerId, Vec<FeatureVector>> = BTreeMap::new();
        for vector in vectors {
            by_player.entry(vector.player).or_default().push(vector.clone());
        }
        for history in by_player.values_mut() {
            history.sort_by_key(|v| v.round);
        }
        by_player
    }

    /// Emit one raw sample per valid window start
    ///
    /// A window is valid when its W rounds plus the target round are
    /// contiguous. Players with fewer than W+1 usable rounds contribute
    /// nothing; a round gap splits a player's history into separate runs.
    pub fn build(&self, vectors: &[FeatureVector]) -> Vec<SequenceSample> {
        let mut samples = Vec::new();

        for (player, history) in Self::group_by_player(vectors) {
            if history.len() <= self.window {
                continue;
            }

            for start in 0..history.len() - self.window {
                let slice = &history[start..=start + self.window];
                if !is_contiguous(slice) {
                    continue;
                }

                samples.push(SequenceSample {
                    player,
                    window: slice[..self.window].iter().map(|v| v.to_vec()).collect(),
                    target: slice[self.window].points,
                });
            }
        }

        samples
    }

    /// The final W contiguous rounds of one player's history, for inference
    ///
    /// Returns None when the player has fewer than W rounds or the last W
    /// rounds contain a gap.
    pub fn latest_window(&self, history: &[FeatureVector]) -> Option<Vec<Vec<f32>>> {
        if history.len() < self.window {
            return None;
        }

        let tail = &history[history.len() - self.window..];
        if !is_contiguous(tail) {
            return None;
        }

        Some(tail.iter().map(|v| v.to_vec()).collect())
    }
}

fn is_contiguous(slice: &[FeatureVector]) -> bool {
    slice.windows(2).all(|w| w[1].round == w[0].round + 1)
}

/// Shuffle samples with a seeded RNG and split by ratio
///
/// Deterministic given the same seed and input order, so search candidates
/// all see the identical split.
pub fn split_with_seed(
    mut samples: Vec<SequenceSample>,
    train_ratio: f32,
    seed: u64,
) -> (Vec<SequenceSample>, Vec<SequenceSample>) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let n_train = (samples.len() as f32 * train_ratio) as usize;
    let val = samples.split_off(n_train);
    (samples, val)
}

/// Normalized sequence dataset, paired with the parameters that produced it
#[derive(Clone)]
pub struct SequenceDataset {
    samples: Vec<SequenceSample>,
}

impl SequenceDataset {
    /// Normalize raw samples with parameters fitted on the training partition
    pub fn from_samples(raw: &[SequenceSample], params: &NormalizationParams) -> Self {
        let samples = raw
            .iter()
            .map(|s| SequenceSample {
                player: s.player,
                window: s.window.iter().map(|row| params.apply(row)).collect(),
                target: params.normalize_target(s.target),
            })
            .collect();

        SequenceDataset { samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Dataset<SequenceSample> for SequenceDataset {
    fn get(&self, index: usize) -> Option<SequenceSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Batch of sequences for training
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: burn::tensor::backend::Backend> {
    /// Input sequences: [batch, seq_len, features]
    pub inputs: burn::tensor::Tensor<B, 3>,
    /// Normalized targets: [batch]
    pub targets: burn::tensor::Tensor<B, 1>,
}

/// Batcher for creating training batches
#[derive(Clone)]
pub struct SequenceBatcher<B: burn::tensor::backend::Backend> {
    device: B::Device,
}

impl<B: burn::tensor::backend::Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        SequenceBatcher { device }
    }
}

impl<B: burn::tensor::backend::Backend>
    burn::data::dataloader::batcher::Batcher<B, SequenceSample, SequenceBatch<B>>
    for SequenceBatcher<B>
{
    fn batch(&self, items: Vec<SequenceSample>, _device: &B::Device) -> SequenceBatch<B> {
        let batch_size = items.len();
        let seq_len = items.first().map(|s| s.window.len()).unwrap_or(0);
        let feature_dim = FeatureVector::DIM;

        let mut input_data = Vec::with_capacity(batch_size * seq_len * feature_dim);
        let mut target_data = Vec::with_capacity(batch_size);

        for sample in &items {
            for row in &sample.window {
                input_data.extend(row.iter().copied());
            }
            target_data.push(sample.target);
        }

        let inputs =
            burn::tensor::Tensor::<B, 1>::from_floats(input_data.as_slice(), &self.device)
                .reshape([batch_size, seq_len, feature_dim]);

        let targets =
            burn::tensor::Tensor::<B, 1>::from_floats(target_data.as_slice(), &self.device);

        SequenceBatch { inputs, targets }
    }
}
