//! Player form computation
//!
//! Trailing averages of per-round performance over a configurable window.

use crate::{PlayerId, PlayerRound};
use std::collections::HashMap;

/// Trailing averages for one player at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerForm {
    pub points_avg: f32,
    pub minutes_avg: f32,
}

/// Computes trailing form from chronological per-player histories
pub struct FormAggregator {
    /// Window size (M), may differ from the model's sequence window
    window: usize,
    /// Per-player chronological (round, points, minutes) entries
    history: HashMap<PlayerId, Vec<(u32, f32, f32)>>,
}

impl FormAggregator {
    /// Build from all per-round records
    pub fn from_rounds(rounds: &[PlayerRound], window: usize) -> Self {
        let mut history: HashMap<PlayerId, Vec<(u32, f32, f32)>> = HashMap::new();

        for record in rounds {
            history
                .entry(record.player)
                .or_default()
                .push((record.round, record.points, record.minutes));
        }
        for entries in history.values_mut() {
            entries.sort_by_key(|(r, _, _)| *r);
        }

        FormAggregator { window, history }
    }

    /// Form going into `round`, from rounds strictly before it
    ///
    /// Partial histories average over however many prior rounds exist; a
    /// player with no prior rounds gets the neutral default.
    pub fn form(&self, player: PlayerId, round: u32) -> PlayerForm {
        let prior: Vec<(f32, f32)> = match self.history.get(&player) {
            Some(entries) => entries
                .iter()
                .filter(|(r, _, _)| *r < round)
                .map(|(_, p, m)| (*p, *m))
                .collect(),
            None => return PlayerForm::default(),
        };

        if prior.is_empty() {
            return PlayerForm::default();
        }

        let recent = &prior[prior.len().saturating_sub(self.window)..];
        let n = recent.len() as f32;

        PlayerForm {
            points_avg: recent.iter().map(|(p, _)| p).sum::<f32>() / n,
            minutes_avg: recent.iter().map(|(_, m)| m).sum::<f32>() / n,
        }
    }

    /// Number of rounds a player has on record before `round`
    pub fn rounds_before(&self, player: PlayerId, round: u32) -> usize {
        self.history
            .get(&player)
            .map(|entries| entries.iter().filter(|(r, _, _)| *r < round).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TeamId;

    fn make_round(player: u32, round: u32, points: f32, minutes: f32) -> PlayerRound {
        PlayerRound {
            player: PlayerId(player),
            team: TeamId(1),
            round,
            points,
            minutes,
            goals: 0.0,
            assists: 0.0,
            price: 50.0,
        }
    }

    #[test]
    fn test_trailing_average() {
        let rounds: Vec<_> = (1..=6)
            .map(|r| make_round(1, r, r as f32, 90.0))
            .collect();
        let form = FormAggregator::from_rounds(&rounds, 3);

        // Going into round 6: rounds 3, 4, 5
        let f = form.form(PlayerId(1), 6);
        assert!((f.points_avg - 4.0).abs() < 1e-6);
        assert!((f.minutes_avg - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_history() {
        let rounds = vec![make_round(1, 1, 8.0, 90.0), make_round(1, 2, 2.0, 45.0)];
        let form = FormAggregator::from_rounds(&rounds, 4);

        // Only one prior round exists going into round 2
        let f = form.form(PlayerId(1), 2);
        assert!((f.points_avg - 8.0).abs() < 1e-6);

        // Two prior rounds going into round 3
        let f = form.form(PlayerId(1), 3);
        assert!((f.points_avg - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_history_is_neutral_default() {
        let rounds = vec![make_round(1, 5, 8.0, 90.0)];
        let form = FormAggregator::from_rounds(&rounds, 4);

        assert_eq!(form.form(PlayerId(1), 5), PlayerForm::default());
        assert_eq!(form.form(PlayerId(2), 5), PlayerForm::default());
    }

    #[test]
    fn test_no_lookahead() {
        let mut rounds: Vec<_> = (1..=6)
            .map(|r| make_round(1, r, 2.0, 90.0))
            .collect();
        let base = FormAggregator::from_rounds(&rounds, 3).form(PlayerId(1), 4);

        // Perturb round 4's own stats
        rounds[3].points = 99.0;
        let perturbed = FormAggregator::from_rounds(&rounds, 3).form(PlayerId(1), 4);
        assert_eq!(base, perturbed);
    }

    #[test]
    fn test_unsorted_input() {
        let rounds = vec![
            make_round(1, 3, 3.0, 90.0),
            make_round(1, 1, 1.0, 90.0),
            make_round(1, 2, 2.0, 90.0),
        ];
        let form = FormAggregator::from_rounds(&rounds, 2);

        // Rounds 2 and 3 going into round 4
        let f = form.form(PlayerId(1), 4);
        assert!((f.points_avg - 2.5).abs() < 1e-6);
    }
}
