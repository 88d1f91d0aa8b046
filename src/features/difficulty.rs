//! Opponent difficulty scoring
//!
//! Derives a dynamic difficulty signal from each team's trailing
//! goals-conceded history.

use crate::{Fixture, TeamId};
use std::collections::HashMap;

/// Difficulty scoring configuration
#[derive(Debug, Clone)]
pub struct DifficultyConfig {
    /// Number of trailing completed rounds to average over (N)
    pub window: usize,
    /// Lower clip for the score
    pub min_score: f32,
    /// Upper clip for the score
    pub max_score: f32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        DifficultyConfig {
            window: 6,
            min_score: 0.5,
            max_score: 2.0,
        }
    }
}

/// Neutral score returned when a team has too little history
pub const NEUTRAL_DIFFICULTY: f32 = 1.0;

/// Computes opponent difficulty from trailing defensive records
///
/// Built once per run from the finished fixtures. All queries for round t
/// read goals-conceded entries from rounds strictly before t.
pub struct DifficultyEngine {
    config: DifficultyConfig,
    /// Per-team chronological (round, goals conceded) entries
    conceded: HashMap<TeamId, Vec<(u32, f32)>>,
    /// All (round, goals conceded) entries across the league, chronological
    league: Vec<(u32, f32)>,
}

impl DifficultyEngine {
    /// Build from the fixture list; unfinished fixtures are ignored
    pub fn from_fixtures(fixtures: &[Fixture], config: DifficultyConfig) -> Self {
        let mut sorted: Vec<&Fixture> = fixtures.iter().filter(|f| f.is_finished()).collect();
        sorted.sort_by_key(|f| f.round);

        let mut conceded: HashMap<TeamId, Vec<(u32, f32)>> = HashMap::new();
        let mut league = Vec::new();

        for fixture in sorted {
            for team in [fixture.home, fixture.away] {
                // conceded_by is Some for finished fixtures
                if let Some(goals) = fixture.conceded_by(team) {
                    conceded
                        .entry(team)
                        .or_default()
                        .push((fixture.round, goals as f32));
                    league.push((fixture.round, goals as f32));
                }
            }
        }

        DifficultyEngine {
            config,
            conceded,
            league,
        }
    }

    /// Average goals conceded by a team over its last N rounds before `round`
    ///
    /// Returns None when the team has fewer than N completed rounds, so
    /// callers fall back to the league average rather than a noisy partial
    /// window.
    pub fn trailing_conceded(&self, team: TeamId, round: u32) -> Option<f32> {
        let entries = self.conceded.get(&team)?;
        let prior: Vec<f32> = entries
            .iter()
            .filter(|(r, _)| *r < round)
            .map(|(_, g)| *g)
            .collect();

        if prior.len() < self.config.window {
            return None;
        }

        let recent = &prior[prior.len() - self.config.window..];
        Some(recent.iter().sum::<f32>() / recent.len() as f32)
    }

    /// League-wide average goals conceded before `round`
    pub fn league_average(&self, round: u32) -> Option<f32> {
        let prior: Vec<f32> = self
            .league
            .iter()
            .filter(|(r, _)| *r < round)
            .map(|(_, g)| *g)
            .collect();

        if prior.is_empty() {
            return None;
        }
        Some(prior.iter().sum::<f32>() / prior.len() as f32)
    }

    /// Difficulty of facing `opponent` in `round`
    ///
    /// A team that concedes less than the league average is harder than
    /// neutral (score > 1), one that concedes more is easier (score < 1).
    /// Clipped so a single very weak opponent cannot dominate downstream
    /// normalization.
    pub fn score(&self, opponent: TeamId, round: u32) -> f32 {
        let league_avg = match self.league_average(round) {
            Some(avg) if avg > 0.0 => avg,
            _ => return NEUTRAL_DIFFICULTY,
        };

        let opp_avg = match self.trailing_conceded(opponent, round) {
            Some(avg) => avg.max(0.1),
            None => return NEUTRAL_DIFFICULTY,
        };

        (league_avg / opp_avg).clamp(self.config.min_score, self.config.max_score)
    }

    /// Difficulty for each side of a fixture: (home facing away, away facing home)
    pub fn fixture_scores(&self, fixture: &Fixture) -> (f32, f32) {
        (
            self.score(fixture.away, fixture.round),
            self.score(fixture.home, fixture.round),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_fixture(round: u32, home: u32, away: u32, hg: u32, ag: u32) -> Fixture {
        Fixture {
            round,
            home: TeamId(home),
            away: TeamId(away),
            home_goals: Some(hg),
            away_goals: Some(ag),
        }
    }

    /// Team 1 concedes 1 goal every round, team 2 concedes 3
    fn league_fixtures(rounds: u32) -> Vec<Fixture> {
        (1..=rounds)
            .map(|r| make_fixture(r, 1, 2, 3, 1))
            .collect()
    }

    #[test]
    fn test_trailing_conceded_window() {
        let engine = DifficultyEngine::from_fixtures(
            &league_fixtures(10),
            DifficultyConfig {
                window: 3,
                ..Default::default()
            },
        );

        assert_eq!(engine.trailing_conceded(TeamId(1), 8), Some(1.0));
        assert_eq!(engine.trailing_conceded(TeamId(2), 8), Some(3.0));
        // Fewer than window prior rounds
        assert_eq!(engine.trailing_conceded(TeamId(1), 3), None);
    }

    #[test]
    fn test_no_lookahead() {
        // A blowout in round 8 must not change round 8's own score
        let mut fixtures = league_fixtures(10);
        let base = DifficultyEngine::from_fixtures(&fixtures, DifficultyConfig::default());
        let before = base.score(TeamId(1), 8);

        fixtures[7].away_goals = Some(9);
        let perturbed = DifficultyEngine::from_fixtures(&fixtures, DifficultyConfig::default());
        assert_eq!(perturbed.score(TeamId(1), 8), before);
        // But it does change later rounds
        assert_ne!(perturbed.score(TeamId(1), 9), base.score(TeamId(1), 9));
    }

    #[test]
    fn test_new_team_falls_back_to_neutral() {
        let engine = DifficultyEngine::from_fixtures(
            &league_fixtures(10),
            DifficultyConfig::default(),
        );

        let score = engine.score(TeamId(99), 5);
        assert_eq!(score, NEUTRAL_DIFFICULTY);
        assert!(score.is_finite());
    }

    #[test]
    fn test_empty_league_is_neutral() {
        let engine = DifficultyEngine::from_fixtures(&[], DifficultyConfig::default());
        assert_eq!(engine.score(TeamId(1), 1), NEUTRAL_DIFFICULTY);
    }

    #[test]
    fn test_score_direction_and_clipping() {
        let engine = DifficultyEngine::from_fixtures(
            &league_fixtures(10),
            DifficultyConfig {
                window: 3,
                min_score: 0.5,
                max_score: 2.0,
            },
        );

        // League average is 2.0: team 1 (concedes 1) is hard, team 2 easy
        let hard = engine.score(TeamId(1), 8);
        let easy = engine.score(TeamId(2), 8);
        assert!(hard > NEUTRAL_DIFFICULTY);
        assert!(easy < NEUTRAL_DIFFICULTY);
        assert!(hard <= 2.0);
        assert!(easy >= 0.5);
    }

    #[test]
    fn test_fixture_scores_sides() {
        let engine = DifficultyEngine::from_fixtures(
            &league_fixtures(10),
            DifficultyConfig {
                window: 3,
                ..Default::default()
            },
        );

        let upcoming = Fixture {
            round: 8,
            home: TeamId(1),
            away: TeamId(2),
            home_goals: None,
            away_goals: None,
        };
        let (home_side, away_side) = engine.fixture_scores(&upcoming);
        // Home faces the leaky team 2, away faces the solid team 1
        assert!(home_side < away_side);
    }
}
