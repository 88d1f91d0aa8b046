//! Fantasy football points prediction using deep learning
//!
//! An LSTM over per-round player feature sequences predicting next-round
//! fantasy points.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub u32);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Unique identifier for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player({})", self.0)
    }
}

/// A team in the competition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}

/// A scheduled match between two teams in a given round
///
/// Goals are present once the fixture has been played.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub round: u32,
    pub home: TeamId,
    pub away: TeamId,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
}

impl Fixture {
    /// True once both scores are recorded
    pub fn is_finished(&self) -> bool {
        self.home_goals.is_some() && self.away_goals.is_some()
    }

    /// Check whether a team plays in this fixture
    pub fn involves(&self, team: TeamId) -> bool {
        self.home == team || self.away == team
    }

    /// Get the opponent for a given team
    pub fn opponent_of(&self, team: TeamId) -> Option<TeamId> {
        if team == self.home {
            Some(self.away)
        } else if team == self.away {
            Some(self.home)
        } else {
            None
        }
    }

    /// Goals conceded by a team in this fixture, if played
    pub fn conceded_by(&self, team: TeamId) -> Option<u32> {
        if team == self.home {
            self.away_goals
        } else if team == self.away {
            self.home_goals
        } else {
            None
        }
    }
}

/// A registered player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: TeamId,
    /// Price in tenths of a currency unit, as the source data encodes it
    pub price: f32,
}

impl Player {
    /// Price in display units
    pub fn display_price(&self) -> f32 {
        self.price / 10.0
    }
}

/// One player's raw statistics for one round
///
/// The team id may change across rounds via transfers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRound {
    pub player: PlayerId,
    pub team: TeamId,
    pub round: u32,
    pub points: f32,
    pub minutes: f32,
    pub goals: f32,
    pub assists: f32,
    pub price: f32,
}

/// A next-round points estimate for one player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRow {
    pub player: PlayerId,
    pub name: String,
    pub predicted_points: f32,
    /// Latest observed price, in tenths
    pub price: f32,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FplError {
    #[error("Missing required column '{column}' in {table} table")]
    Schema {
        table: &'static str,
        column: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown team: {0}")]
    UnknownTeam(TeamId),

    #[error("Model not trained - run `fpl run` or `fpl train` first")]
    NoModel,

    #[error("Insufficient history for {player}: has {rounds} rounds, need {required}")]
    InsufficientHistory {
        player: PlayerId,
        rounds: usize,
        required: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, FplError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub features: FeatureConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub search: SearchConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Trailing rounds used for opponent defensive strength (N)
    pub difficulty_window: usize,
    /// Trailing rounds used for player form (M)
    pub form_window: usize,
    /// Lower clip for the difficulty score
    pub difficulty_min: f32,
    /// Upper clip for the difficulty score
    pub difficulty_max: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Consecutive rounds per input sequence (W)
    pub sequence_window: usize,
    pub hidden_size: usize,
    pub dense_size: usize,
    pub dropout: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub early_stopping_patience: usize,
    /// Fraction of sequences used for training (rest is validation)
    pub train_ratio: f32,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub hidden_sizes: Vec<usize>,
    pub dense_sizes: Vec<usize>,
    pub dropouts: Vec<f64>,
    pub learning_rates: Vec<f64>,
    /// Epoch budget per search candidate
    pub epochs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub data_dir: String,
    pub model_path: String,
    pub predictions_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            features: FeatureConfig {
                difficulty_window: 6,
                form_window: 4,
                difficulty_min: 0.5,
                difficulty_max: 2.0,
            },
            model: ModelConfig {
                sequence_window: 5,
                hidden_size: 64,
                dense_size: 32,
                dropout: 0.2,
            },
            training: TrainingConfig {
                epochs: 50,
                batch_size: 32,
                learning_rate: 1e-3,
                early_stopping_patience: 10,
                train_ratio: 0.8,
                seed: 42,
            },
            search: SearchConfig {
                hidden_sizes: vec![32, 64],
                dense_sizes: vec![16, 32],
                dropouts: vec![0.1, 0.2],
                learning_rates: vec![1e-3, 5e-3],
                epochs: 30,
            },
            data: DataConfig {
                data_dir: "data".to_string(),
                model_path: "model/points_net".to_string(),
                predictions_path: "predictions.csv".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FplError::Config(format!("Failed to read config file {}: {}", path, e)))?;
        toml::from_str(&content)
            .map_err(|e| FplError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FplError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_helpers() {
        let fixture = Fixture {
            round: 3,
            home: TeamId(1),
            away: TeamId(2),
            home_goals: Some(2),
            away_goals: Some(1),
        };

        assert!(fixture.is_finished());
        assert_eq!(fixture.opponent_of(TeamId(1)), Some(TeamId(2)));
        assert_eq!(fixture.opponent_of(TeamId(3)), None);
        // Home conceded the away side's goals
        assert_eq!(fixture.conceded_by(TeamId(1)), Some(1));
        assert_eq!(fixture.conceded_by(TeamId(2)), Some(2));
    }

    #[test]
    fn test_unfinished_fixture() {
        let fixture = Fixture {
            round: 10,
            home: TeamId(1),
            away: TeamId(2),
            home_goals: None,
            away_goals: None,
        };

        assert!(!fixture.is_finished());
        assert_eq!(fixture.conceded_by(TeamId(1)), None);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model.sequence_window, config.model.sequence_window);
        assert_eq!(
            parsed.features.difficulty_window,
            config.features.difficulty_window
        );
    }
}
