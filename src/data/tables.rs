//! CSV table ingestion
//!
//! The ingestion collaborator drops four CSV files in the data directory;
//! this module validates their schemas and converts rows into domain types.
//! A missing required column aborts the run before any computation.

use crate::{Fixture, FplError, Player, PlayerId, PlayerRound, Result, Team, TeamId};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct TeamRow {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct FixtureRow {
    round: u32,
    home_team: u32,
    away_team: u32,
    home_goals: Option<u32>,
    away_goals: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PlayerRow {
    id: u32,
    name: String,
    team: u32,
    price: f32,
}

#[derive(Debug, Deserialize)]
struct PlayerRoundRow {
    player_id: u32,
    team: u32,
    round: u32,
    points: f32,
    minutes: f32,
    goals: f32,
    assists: f32,
    price: f32,
}

/// All input tables for one pipeline run
#[derive(Debug, Clone)]
pub struct Tables {
    pub teams: Vec<Team>,
    pub fixtures: Vec<Fixture>,
    pub players: Vec<Player>,
    pub rounds: Vec<PlayerRound>,
}

impl Tables {
    /// Load and validate all tables from a data directory
    pub fn load(dir: &str) -> Result<Self> {
        let dir = Path::new(dir);

        let teams: Vec<TeamRow> =
            read_table(&dir.join("teams.csv"), "teams", &["id", "name"])?;
        let fixtures: Vec<FixtureRow> = read_table(
            &dir.join("fixtures.csv"),
            "fixtures",
            &["round", "home_team", "away_team"],
        )?;
        let players: Vec<PlayerRow> = read_table(
            &dir.join("players.csv"),
            "players",
            &["id", "name", "team", "price"],
        )?;
        let rounds: Vec<PlayerRoundRow> = read_table(
            &dir.join("player_rounds.csv"),
            "player_rounds",
            &[
                "player_id",
                "team",
                "round",
                "points",
                "minutes",
                "goals",
                "assists",
                "price",
            ],
        )?;

        log::info!(
            "Loaded {} teams, {} fixtures, {} players, {} player-round records",
            teams.len(),
            fixtures.len(),
            players.len(),
            rounds.len()
        );

        Ok(Tables {
            teams: teams
                .into_iter()
                .map(|r| Team {
                    id: TeamId(r.id),
                    name: r.name,
                })
                .collect(),
            fixtures: fixtures
                .into_iter()
                .map(|r| Fixture {
                    round: r.round,
                    home: TeamId(r.home_team),
                    away: TeamId(r.away_team),
                    home_goals: r.home_goals,
                    away_goals: r.away_goals,
                })
                .collect(),
            players: players
                .into_iter()
                .map(|r| Player {
                    id: PlayerId(r.id),
                    name: r.name,
                    team: TeamId(r.team),
                    price: r.price,
                })
                .collect(),
            rounds: rounds
                .into_iter()
                .map(|r| PlayerRound {
                    player: PlayerId(r.player_id),
                    team: TeamId(r.team),
                    round: r.round,
                    points: r.points,
                    minutes: r.minutes,
                    goals: r.goals,
                    assists: r.assists,
                    price: r.price,
                })
                .collect(),
        })
    }

    /// Latest round with any player-round record
    pub fn latest_round(&self) -> Option<u32> {
        self.rounds.iter().map(|r| r.round).max()
    }
}

/// Read a CSV file after checking its header carries the required columns
fn read_table<T: DeserializeOwned>(
    path: &Path,
    table: &'static str,
    required: &[&str],
) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        if e.is_io_error() {
            FplError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} table not found at {}", table, path.display()),
            ))
        } else {
            FplError::Csv(e)
        }
    })?;

    let headers = reader.headers()?.clone();
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(FplError::Schema {
                table,
                column: column.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    fn write_valid_tables(dir: &Path) {
        write_file(dir, "teams.csv", "id,name\n1,Arsenal\n2,Chelsea\n");
        write_file(
            dir,
            "fixtures.csv",
            "round,home_team,away_team,home_goals,away_goals\n1,1,2,2,1\n2,2,1,,\n",
        );
        write_file(dir, "players.csv", "id,name,team,price\n10,Saka,1,95\n");
        write_file(
            dir,
            "player_rounds.csv",
            "player_id,team,round,points,minutes,goals,assists,price\n10,1,1,8,90,1,0,95\n",
        );
    }

    #[test]
    fn test_load_valid_tables() {
        let dir = std::env::temp_dir().join("fpl_tables_valid");
        std::fs::create_dir_all(&dir).unwrap();
        write_valid_tables(&dir);

        let tables = Tables::load(dir.to_str().unwrap()).unwrap();
        assert_eq!(tables.teams.len(), 2);
        assert_eq!(tables.fixtures.len(), 2);
        assert!(tables.fixtures[0].is_finished());
        assert!(!tables.fixtures[1].is_finished());
        assert_eq!(tables.rounds[0].player, PlayerId(10));
        assert_eq!(tables.latest_round(), Some(1));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let dir = std::env::temp_dir().join("fpl_tables_schema");
        std::fs::create_dir_all(&dir).unwrap();
        write_valid_tables(&dir);
        // Overwrite teams with a broken header
        write_file(&dir, "teams.csv", "id\n1\n");

        let err = Tables::load(dir.to_str().unwrap()).unwrap_err();
        match err {
            FplError::Schema { table, column } => {
                assert_eq!(table, "teams");
                assert_eq!(column, "name");
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = std::env::temp_dir().join("fpl_tables_missing");
        std::fs::create_dir_all(&dir).unwrap();

        let err = Tables::load(dir.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, FplError::Io(_)));
    }
}
