//! Match metrics collection for balance analysis.
//!
//! [`MatchMetrics`] accumulates per-team tallies from the per-player event
//! counters every tick; [`BatchSummary`] aggregates many matches.

use std::collections::BTreeMap;

use raid_core::components::Team;
use raid_core::math::Fixed;
use raid_core::simulation::{Simulation, Termination};
use serde::{Deserialize, Serialize};

/// Key used for a team in metrics maps.
#[must_use]
pub const fn team_name(team: Team) -> &'static str {
    match team {
        Team::Defender => "defender",
        Team::Raider => "raider",
    }
}

/// Complete metrics for a single match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchMetrics {
    /// Unique match identifier.
    pub match_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Seed used.
    pub seed: u64,
    /// Ticks played.
    pub duration_ticks: u64,
    /// Winning team (None = draw or time limit).
    pub winner: Option<String>,
    /// How the match ended; `time_limit` if nobody won.
    pub win_condition: String,
    /// Per-team tallies.
    pub teams: BTreeMap<String, TeamMetrics>,
    /// Base health when the match stopped.
    pub final_base_health: f64,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

/// Tallies for one team over a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMetrics {
    /// Rostered players.
    pub players: u32,
    /// Enemy players killed.
    pub kills: u32,
    /// Own players lost.
    pub deaths: u32,
    /// Food gathered (gains only).
    pub food_gathered: i64,
    /// Wood gathered (gains only).
    pub wood_gathered: i64,
    /// Stone gathered (gains only).
    pub stone_gathered: i64,
    /// Health removed from enemy players.
    pub damage_to_players: f64,
    /// Damage dealt to enemy structures.
    pub damage_to_structures: f64,
    /// Damage this team dealt to the base (own-team damage counts negative).
    pub base_damage: f64,
    /// Tick of the first hit on an enemy player.
    pub first_blood_tick: Option<u64>,
}

impl MatchMetrics {
    /// Create empty metrics for a match over `sim`'s roster.
    #[must_use]
    pub fn new(scenario: impl Into<String>, sim: &Simulation) -> Self {
        let scenario = scenario.into();
        let mut teams: BTreeMap<String, TeamMetrics> = [Team::Defender, Team::Raider]
            .into_iter()
            .map(|t| (team_name(t).to_string(), TeamMetrics::default()))
            .collect();
        for team in sim.roster().values() {
            if let Some(metrics) = teams.get_mut(team_name(*team)) {
                metrics.players += 1;
            }
        }
        Self {
            match_id: format!("{scenario}_{}", sim.seed()),
            scenario,
            seed: sim.seed(),
            teams,
            ..Default::default()
        }
    }

    /// Fold in the per-player counters of the tick that just ran.
    pub fn record_tick(&mut self, sim: &Simulation) {
        let tick = sim.world().tick;
        for player in sim.world().players.values() {
            let Some(team) = self.teams.get_mut(team_name(player.team)) else {
                continue;
            };
            let events = &player.events;
            team.kills += events.killed_enemy_player;
            team.deaths += u32::from(events.died);
            team.food_gathered += events.change_food.max(0);
            team.wood_gathered += events.change_wood.max(0);
            team.stone_gathered += events.change_stone.max(0);
            team.damage_to_players += (-events.change_health_enemy_player).to_num::<f64>();
            team.damage_to_structures += events.damage_dealt_enemy_structure.to_num::<f64>();
            team.base_damage += events.self_damage_dealt_base.to_num::<f64>();
            if team.first_blood_tick.is_none() && events.change_health_enemy_player < Fixed::ZERO
            {
                team.first_blood_tick = Some(tick);
            }
        }
    }

    /// Record how the match stopped.
    pub fn finalize(&mut self, sim: &Simulation) {
        let termination = sim.termination();
        self.duration_ticks = sim.world().tick;
        self.winner = termination.and_then(winner_of).map(|t| team_name(t).to_string());
        self.win_condition = match termination {
            Some(Termination::BaseDestroyed { .. }) => "base_destroyed",
            Some(Termination::TeamEliminated { .. }) => "team_eliminated",
            Some(Termination::MutualElimination) => "mutual_elimination",
            None => "time_limit",
        }
        .to_string();
        self.final_base_health = sim.world().base.health.current.to_num();
        self.final_state_hash = sim.state_hash();
    }
}

/// Winning team of a finished match.
#[must_use]
pub const fn winner_of(termination: Termination) -> Option<Team> {
    match termination {
        Termination::BaseDestroyed { owner } => Some(owner.opponent()),
        Termination::TeamEliminated { team } => Some(team.opponent()),
        Termination::MutualElimination => None,
    }
}

/// Aggregate statistics for a batch of matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total matches played.
    pub total_games: u32,
    /// Matches won by each team.
    pub wins_by_team: BTreeMap<String, u32>,
    /// Win rates by team.
    pub win_rates: BTreeMap<String, f64>,
    /// Matches with no winner.
    pub draws: u32,
    /// How matches ended.
    pub win_conditions: BTreeMap<String, u32>,
    /// Average match duration in ticks.
    pub avg_duration_ticks: f64,
    /// Shortest match.
    pub min_duration_ticks: u64,
    /// Longest match.
    pub max_duration_ticks: u64,
    /// Average kills per match by team.
    pub avg_kills: BTreeMap<String, f64>,
    /// Average resources gathered per match by team.
    pub avg_resources_gathered: BTreeMap<String, f64>,
}

impl BatchSummary {
    /// Calculate summary from a list of match metrics.
    #[must_use]
    pub fn from_games(games: &[MatchMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let total = u32::try_from(games.len()).unwrap_or(u32::MAX);
        let mut summary = Self {
            total_games: total,
            min_duration_ticks: u64::MAX,
            ..Default::default()
        };

        let mut duration_sum = 0u64;
        let mut kills: BTreeMap<String, u64> = BTreeMap::new();
        let mut gathered: BTreeMap<String, i64> = BTreeMap::new();

        for game in games {
            duration_sum += game.duration_ticks;
            summary.min_duration_ticks = summary.min_duration_ticks.min(game.duration_ticks);
            summary.max_duration_ticks = summary.max_duration_ticks.max(game.duration_ticks);

            match &game.winner {
                Some(winner) => *summary.wins_by_team.entry(winner.clone()).or_default() += 1,
                None => summary.draws += 1,
            }
            *summary
                .win_conditions
                .entry(game.win_condition.clone())
                .or_default() += 1;

            for (team, metrics) in &game.teams {
                *kills.entry(team.clone()).or_default() += u64::from(metrics.kills);
                *gathered.entry(team.clone()).or_default() +=
                    metrics.food_gathered + metrics.wood_gathered + metrics.stone_gathered;
            }
        }

        let n = f64::from(total);
        summary.avg_duration_ticks = duration_sum as f64 / n;
        for (team, wins) in &summary.wins_by_team {
            summary.win_rates.insert(team.clone(), f64::from(*wins) / n);
        }
        for (team, k) in kills {
            summary.avg_kills.insert(team, k as f64 / n);
        }
        for (team, g) in gathered {
            summary.avg_resources_gathered.insert(team, g as f64 / n);
        }
        summary
    }

    /// Whether neither team wins more than `0.5 + threshold` of matches.
    #[must_use]
    pub fn is_balanced(&self, threshold: f64) -> bool {
        self.win_rates.values().all(|rate| *rate <= 0.5 + threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(winner: Option<&str>, ticks: u64, condition: &str) -> MatchMetrics {
        let mut teams = BTreeMap::new();
        teams.insert(
            "raider".to_string(),
            TeamMetrics {
                kills: 2,
                wood_gathered: 30,
                ..Default::default()
            },
        );
        MatchMetrics {
            duration_ticks: ticks,
            winner: winner.map(String::from),
            win_condition: condition.to_string(),
            teams,
            ..Default::default()
        }
    }

    #[test]
    fn test_winner_of() {
        assert_eq!(
            winner_of(Termination::BaseDestroyed {
                owner: Team::Defender
            }),
            Some(Team::Raider)
        );
        assert_eq!(
            winner_of(Termination::TeamEliminated { team: Team::Raider }),
            Some(Team::Defender)
        );
        assert_eq!(winner_of(Termination::MutualElimination), None);
    }

    #[test]
    fn test_summary_from_games() {
        let games = vec![
            game(Some("raider"), 100, "base_destroyed"),
            game(Some("defender"), 300, "team_eliminated"),
            game(Some("raider"), 200, "base_destroyed"),
            game(None, 400, "time_limit"),
        ];
        let summary = BatchSummary::from_games(&games);
        assert_eq!(summary.total_games, 4);
        assert_eq!(summary.wins_by_team["raider"], 2);
        assert_eq!(summary.draws, 1);
        assert_eq!(summary.win_conditions["base_destroyed"], 2);
        assert!((summary.win_rates["raider"] - 0.5).abs() < 1e-9);
        assert!((summary.avg_duration_ticks - 250.0).abs() < 1e-9);
        assert_eq!(summary.min_duration_ticks, 100);
        assert_eq!(summary.max_duration_ticks, 400);
        assert!((summary.avg_kills["raider"] - 2.0).abs() < 1e-9);
        assert!((summary.avg_resources_gathered["raider"] - 30.0).abs() < 1e-9);
        assert!(summary.is_balanced(0.1));
    }

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::from_games(&[]);
        assert_eq!(summary.total_games, 0);
        assert!(summary.win_rates.is_empty());
    }

    #[test]
    fn test_new_counts_roster() {
        let sim = crate::scenario::Scenario::raid(3).build().unwrap();
        let metrics = MatchMetrics::new("raid_3v3", &sim);
        assert_eq!(metrics.teams["defender"].players, 3);
        assert_eq!(metrics.teams["raider"].players, 3);
        assert_eq!(metrics.match_id, "raid_3v3_0");
    }
}
