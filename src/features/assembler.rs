//! Feature assembly
//!
//! Joins raw per-round records with difficulty and form signals into one
//! feature vector per (player, round).

use crate::features::difficulty::DifficultyEngine;
use crate::features::form::FormAggregator;
use crate::{Fixture, PlayerId, PlayerRound, Team, TeamId};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Model input features for one player in one round, in original units
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub player: PlayerId,
    pub team: TeamId,
    pub round: u32,

    pub points: f32,
    pub minutes: f32,
    pub goals: f32,
    pub assists: f32,
    pub price: f32,
    pub form_points: f32,
    pub form_minutes: f32,
    pub difficulty: f32,
}

impl FeatureVector {
    pub const DIM: usize = 8;

    pub fn to_vec(&self) -> Vec<f32> {
        vec![
            self.points,
            self.minutes,
            self.goals,
            self.assists,
            self.price,
            self.form_points,
            self.form_minutes,
            self.difficulty,
        ]
    }
}

/// Counts of records dropped during assembly
///
/// Referential problems are isolated per record and summarized at the end
/// of the run; they never abort it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExclusionReport {
    /// Records referencing a team id not in the teams table
    pub unknown_team: usize,
    /// Records whose round has no fixture for their team
    pub missing_fixture: usize,
}

impl ExclusionReport {
    pub fn total(&self) -> usize {
        self.unknown_team + self.missing_fixture
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for ExclusionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records dropped ({} unknown team, {} missing fixture)",
            self.total(),
            self.unknown_team,
            self.missing_fixture
        )
    }
}

/// Why one record was left out of assembly
enum Exclusion {
    UnknownTeam,
    MissingFixture,
}

/// Merges records, difficulty, and form into feature vectors
pub struct FeatureAssembler<'a> {
    known_teams: HashSet<TeamId>,
    /// Fixture lookup by (round, participating team)
    fixtures: HashMap<(u32, TeamId), &'a Fixture>,
    difficulty: &'a DifficultyEngine,
    form: &'a FormAggregator,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(
        teams: &[Team],
        fixtures: &'a [Fixture],
        difficulty: &'a DifficultyEngine,
        form: &'a FormAggregator,
    ) -> Self {
        let known_teams = teams.iter().map(|t| t.id).collect();

        let mut by_round_team = HashMap::new();
        for fixture in fixtures {
            by_round_team.insert((fixture.round, fixture.home), fixture);
            by_round_team.insert((fixture.round, fixture.away), fixture);
        }

        FeatureAssembler {
            known_teams,
            fixtures: by_round_team,
            difficulty,
            form,
        }
    }

    /// Assemble one vector per valid record, dropping and counting the rest
    pub fn assemble(&self, rounds: &[PlayerRound]) -> (Vec<FeatureVector>, ExclusionReport) {
        let mut vectors = Vec::with_capacity(rounds.len());
        let mut report = ExclusionReport::default();

        for record in rounds {
            match self.assemble_one(record) {
                Ok(vector) => vectors.push(vector),
                Err(Exclusion::UnknownTeam) => {
                    log::debug!(
                        "Dropping {} round {}: unknown {}",
                        record.player,
                        record.round,
                        record.team
                    );
                    report.unknown_team += 1;
                }
                Err(Exclusion::MissingFixture) => {
                    log::debug!(
                        "Dropping {} round {}: no fixture for {}",
                        record.player,
                        record.round,
                        record.team
                    );
                    report.missing_fixture += 1;
                }
            }
        }

        if !report.is_empty() {
            log::warn!("Feature assembly: {}", report);
        }

        (vectors, report)
    }

    fn assemble_one(&self, record: &PlayerRound) -> std::result::Result<FeatureVector, Exclusion> {
        if !self.known_teams.contains(&record.team) {
            return Err(Exclusion::UnknownTeam);
        }

        let fixture = self
            .fixtures
            .get(&(record.round, record.team))
            .ok_or(Exclusion::MissingFixture)?;

        let opponent = fixture
            .opponent_of(record.team)
            .ok_or(Exclusion::MissingFixture)?;
        let difficulty = self.difficulty.score(opponent, record.round);
        let form = self.form.form(record.player, record.round);

        Ok(FeatureVector {
            player: record.player,
            team: record.team,
            round: record.round,
            points: record.points,
            minutes: record.minutes,
            goals: record.goals,
            assists: record.assists,
            price: record.price,
            form_points: form.points_avg,
            form_minutes: form.minutes_avg,
            difficulty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::difficulty::DifficultyConfig;

    fn make_team(id: u32) -> Team {
        Team {
            id: TeamId(id),
            name: format!("Team {}", id),
        }
    }

    fn make_fixture(round: u32, home: u32, away: u32) -> Fixture {
        Fixture {
            round,
            home: TeamId(home),
            away: TeamId(away),
            home_goals: Some(1),
            away_goals: Some(1),
        }
    }

    fn make_record(player: u32, team: u32, round: u32) -> PlayerRound {
        PlayerRound {
            player: PlayerId(player),
            team: TeamId(team),
            round,
            points: 5.0,
            minutes: 90.0,
            goals: 1.0,
            assists: 0.0,
            price: 75.0,
        }
    }

    struct Setup {
        teams: Vec<Team>,
        fixtures: Vec<Fixture>,
    }

    fn setup() -> Setup {
        Setup {
            teams: vec![make_team(1), make_team(2)],
            fixtures: (1..=6).map(|r| make_fixture(r, 1, 2)).collect(),
        }
    }

    #[test]
    fn test_assemble_valid_records() {
        let s = setup();
        let records: Vec<_> = (1..=6).map(|r| make_record(10, 1, r)).collect();

        let difficulty = DifficultyEngine::from_fixtures(&s.fixtures, DifficultyConfig::default());
        let form = FormAggregator::from_rounds(&records, 4);
        let assembler = FeatureAssembler::new(&s.teams, &s.fixtures, &difficulty, &form);

        let (vectors, report) = assembler.assemble(&records);
        assert_eq!(vectors.len(), 6);
        assert!(report.is_empty());
        assert_eq!(vectors[0].to_vec().len(), FeatureVector::DIM);
    }

    #[test]
    fn test_unknown_team_dropped_not_zero_filled() {
        let s = setup();
        let records = vec![make_record(10, 1, 1), make_record(11, 99, 1)];

        let difficulty = DifficultyEngine::from_fixtures(&s.fixtures, DifficultyConfig::default());
        let form = FormAggregator::from_rounds(&records, 4);
        let assembler = FeatureAssembler::new(&s.teams, &s.fixtures, &difficulty, &form);

        let (vectors, report) = assembler.assemble(&records);
        assert_eq!(vectors.len(), 1);
        assert_eq!(report.unknown_team, 1);
        assert!(vectors.iter().all(|v| v.player == PlayerId(10)));
    }

    #[test]
    fn test_missing_fixture_dropped() {
        let s = setup();
        // Round 40 has no fixture
        let records = vec![make_record(10, 1, 40)];

        let difficulty = DifficultyEngine::from_fixtures(&s.fixtures, DifficultyConfig::default());
        let form = FormAggregator::from_rounds(&records, 4);
        let assembler = FeatureAssembler::new(&s.teams, &s.fixtures, &difficulty, &form);

        let (vectors, report) = assembler.assemble(&records);
        assert!(vectors.is_empty());
        assert_eq!(report.missing_fixture, 1);
    }

    #[test]
    fn test_transfer_keeps_per_round_team() {
        // Player moves from team 1 to team 3 at round 4
        let teams = vec![make_team(1), make_team(2), make_team(3), make_team(4)];
        let mut fixtures: Vec<Fixture> = (1..=6).map(|r| make_fixture(r, 1, 2)).collect();
        fixtures.extend((1..=6).map(|r| make_fixture(r, 3, 4)));

        let records: Vec<_> = (1..=6)
            .map(|r| make_record(10, if r < 4 { 1 } else { 3 }, r))
            .collect();

        let difficulty = DifficultyEngine::from_fixtures(&fixtures, DifficultyConfig::default());
        let form = FormAggregator::from_rounds(&records, 4);
        let assembler = FeatureAssembler::new(&teams, &fixtures, &difficulty, &form);

        let (vectors, report) = assembler.assemble(&records);
        assert!(report.is_empty());
        assert_eq!(vectors.len(), 6);
        for v in &vectors {
            let expected = if v.round < 4 { TeamId(1) } else { TeamId(3) };
            assert_eq!(v.team, expected, "round {} misattributed", v.round);
        }
    }
}
