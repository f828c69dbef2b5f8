//! Scenario loading and configuration.
//!
//! A scenario fixes everything a scripted match needs: the seed, the
//! roster with a policy per player, an optional tuning file and a tick
//! limit. Scenarios are RON files:
//!
//! ```ron
//! Scenario(
//!     name: "Duel",
//!     seed: 7,
//!     max_ticks: 7200,
//!     roster: [
//!         (id: 1, team: defender, policy: Rush),
//!         (id: 2, team: raider, policy: Random),
//!     ],
//! )
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use raid_core::components::{PlayerId, Team};
use raid_core::error::GameError;
use raid_core::simulation::Simulation;
use raid_core::tuning::Tuning;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::{Policy, PolicyKind};

/// Tick limit when a scenario does not set one: past the end of the storm
/// shrink with some time to fight at minimum radius.
pub const DEFAULT_MAX_TICKS: u64 = 7200;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario lists no players.
    #[error("Scenario '{0}' has an empty roster")]
    EmptyRoster(String),
    /// Building the match failed (bad tuning, duplicate id).
    #[error(transparent)]
    Game(#[from] GameError),
}

/// One rostered player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Player id.
    pub id: PlayerId,
    /// Side.
    pub team: Team,
    /// Who drives the player.
    #[serde(default)]
    pub policy: PolicyKind,
}

impl RosterEntry {
    /// Create a roster entry.
    #[must_use]
    pub const fn new(id: PlayerId, team: Team, policy: PolicyKind) -> Self {
        Self { id, team, policy }
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Match seed.
    #[serde(default)]
    pub seed: u64,
    /// Stop after this many ticks if nobody has won.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Tuning file; the built-in tuning when absent. Relative paths are
    /// resolved against the scenario file.
    #[serde(default)]
    pub tuning: Option<PathBuf>,
    /// Players and their policies.
    pub roster: Vec<RosterEntry>,
}

fn default_max_ticks() -> u64 {
    DEFAULT_MAX_TICKS
}

impl Default for Scenario {
    fn default() -> Self {
        Self::duel_1v1()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let mut scenario = Self::from_ron_str(&contents)?;
        if let (Some(tuning), Some(dir)) = (scenario.tuning.as_mut(), path.parent()) {
            if tuning.is_relative() {
                *tuning = dir.join(&*tuning);
            }
        }
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Look up a built-in scenario by name (`duel_1v1`, `raid_3v3`,
    /// `raid_NvN`), falling back to loading `name` as a file.
    pub fn resolve(name: &str) -> Result<Self, ScenarioError> {
        if name == "duel_1v1" {
            return Ok(Self::duel_1v1());
        }
        let per_team = name
            .strip_prefix("raid_")
            .and_then(|rest| rest.split_once('v'))
            .filter(|(a, b)| a == b)
            .and_then(|(a, _)| a.parse::<u32>().ok());
        match per_team {
            Some(n) if n > 0 => Ok(Self::raid(n)),
            _ => Self::load(name),
        }
    }

    /// One defender against one raider.
    #[must_use]
    pub fn duel_1v1() -> Self {
        Self {
            name: "duel_1v1".to_string(),
            description: "A rushing defender against a random raider".to_string(),
            seed: 0,
            max_ticks: DEFAULT_MAX_TICKS,
            tuning: None,
            roster: vec![
                RosterEntry::new(1, Team::Defender, PolicyKind::Rush),
                RosterEntry::new(2, Team::Raider, PolicyKind::Random),
            ],
        }
    }

    /// `per_team` players a side. Raiders rush the base, defenders split
    /// between rushing and random play.
    #[must_use]
    pub fn raid(per_team: u32) -> Self {
        let mut roster = Vec::new();
        for i in 0..per_team {
            let defender = if i % 2 == 0 {
                PolicyKind::Rush
            } else {
                PolicyKind::Random
            };
            roster.push(RosterEntry::new(i * 2 + 1, Team::Defender, defender));
            roster.push(RosterEntry::new(i * 2 + 2, Team::Raider, PolicyKind::Rush));
        }
        Self {
            name: format!("raid_{per_team}v{per_team}"),
            description: format!("{per_team} raiders storm the base against {per_team} defenders"),
            seed: 0,
            max_ticks: DEFAULT_MAX_TICKS,
            tuning: None,
            roster,
        }
    }

    /// Replace the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Tuning for this scenario.
    pub fn load_tuning(&self) -> Result<Tuning, ScenarioError> {
        match &self.tuning {
            Some(path) => Ok(Tuning::load(path)?),
            None => Ok(Tuning::default()),
        }
    }

    /// Build the match: tuning, roster, first reset.
    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        if self.roster.is_empty() {
            return Err(ScenarioError::EmptyRoster(self.name.clone()));
        }
        let mut sim = Simulation::new(self.load_tuning()?, self.seed)?;
        for entry in &self.roster {
            sim.add_player(entry.id, entry.team)?;
        }
        sim.reset();
        tracing::debug!(scenario = %self.name, seed = self.seed, "Scenario built");
        Ok(sim)
    }

    /// One scripted policy per roster entry.
    #[must_use]
    pub fn policies(&self) -> BTreeMap<PlayerId, Policy> {
        self.roster
            .iter()
            .map(|e| (e.id, Policy::new(e.policy, self.seed, e.id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario() {
        let scenario = Scenario::default();
        assert_eq!(scenario.roster.len(), 2);
        assert_eq!(scenario.roster[0].team, Team::Defender);
        assert_eq!(scenario.roster[1].team, Team::Raider);
    }

    #[test]
    fn test_raid_scenario() {
        let scenario = Scenario::raid(3);
        assert_eq!(scenario.name, "raid_3v3");
        assert_eq!(scenario.roster.len(), 6);
        let raiders = scenario
            .roster
            .iter()
            .filter(|e| e.team == Team::Raider)
            .count();
        assert_eq!(raiders, 3);
    }

    #[test]
    fn test_resolve_builtins() {
        assert_eq!(Scenario::resolve("duel_1v1").unwrap().roster.len(), 2);
        assert_eq!(Scenario::resolve("raid_4v4").unwrap().roster.len(), 8);
        assert!(matches!(
            Scenario::resolve("raid_2v3"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Test",
                seed: 11,
                roster: [
                    (id: 5, team: raider, policy: Random),
                    (id: 6, team: defender),
                ],
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Test");
        assert_eq!(scenario.max_ticks, DEFAULT_MAX_TICKS);
        assert_eq!(scenario.roster[1].policy, PolicyKind::Idle);
        assert!(scenario.tuning.is_none());
    }

    #[test]
    fn test_build_spawns_roster() {
        let sim = Scenario::raid(2).with_seed(3).build().unwrap();
        assert_eq!(sim.seed(), 3);
        assert_eq!(sim.team_counts(), (2, 2));
        assert_eq!(sim.world().players.len(), 4);
        assert_eq!(sim.world().tick, 0);
    }

    #[test]
    fn test_empty_roster_rejected() {
        let mut scenario = Scenario::duel_1v1();
        scenario.roster.clear();
        assert!(matches!(scenario.build(), Err(ScenarioError::EmptyRoster(_))));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut scenario = Scenario::duel_1v1();
        scenario.roster[1].id = 1;
        assert!(matches!(
            scenario.build(),
            Err(ScenarioError::Game(GameError::DuplicatePlayer(1)))
        ));
    }

    #[test]
    fn test_load_resolves_tuning_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let tuning_path = dir.path().join("fast.ron");
        let mut tuning = Tuning::default();
        tuning.player.speed = 6;
        std::fs::write(&tuning_path, tuning.to_ron_string().unwrap()).unwrap();

        let scenario_path = dir.path().join("fast_duel.ron");
        std::fs::write(
            &scenario_path,
            r#"Scenario(name: "fast", tuning: Some("fast.ron"), roster: [(id: 1, team: raider)])"#,
        )
        .unwrap();

        let scenario = Scenario::load(&scenario_path).unwrap();
        assert_eq!(scenario.tuning.as_deref(), Some(tuning_path.as_path()));
        assert_eq!(scenario.load_tuning().unwrap().player.speed, 6);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("/nonexistent/scenario.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}
