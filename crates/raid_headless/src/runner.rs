//! Scripted match execution.
//!
//! Runs a [`Scenario`] to completion with its policies, collecting
//! [`MatchMetrics`] and optionally recording a [`Replay`].
//!
//! All loops are bounded: a match stops at the scenario's tick limit even
//! if nobody wins.

use std::time::Instant;

use raid_core::action::ActionMap;
use raid_core::components::Team;
use raid_core::replay::Replay;
use raid_core::simulation::Simulation;
use tracing::{debug, info};

use crate::metrics::MatchMetrics;
use crate::scenario::{Scenario, ScenarioError};

/// Progress logging interval (ticks).
const PROGRESS_LOG_INTERVAL: u64 = 1000;

/// What to run.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Scenario; its seed is the match seed.
    pub scenario: Scenario,
    /// Overrides the scenario's tick limit when set.
    pub max_ticks: Option<u64>,
    /// Record a replay alongside the metrics.
    pub record: bool,
}

impl MatchConfig {
    /// Run `scenario` as written, without recording.
    #[must_use]
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            max_ticks: None,
            record: false,
        }
    }

    /// Record a replay.
    #[must_use]
    pub fn recording(mut self) -> Self {
        self.record = true;
        self
    }

    /// Override the tick limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }
}

/// Result of running a match.
#[derive(Debug)]
pub struct MatchResult {
    /// Collected metrics.
    pub metrics: MatchMetrics,
    /// Replay, when recording was requested.
    pub replay: Option<Replay>,
    /// Wall-clock time spent stepping.
    pub elapsed_secs: f64,
}

/// Run a scripted match to termination or the tick limit.
///
/// # Errors
///
/// Returns an error if the scenario cannot be built or a step is rejected.
pub fn run_match(config: &MatchConfig) -> Result<MatchResult, ScenarioError> {
    let scenario = &config.scenario;
    let max_ticks = config.max_ticks.unwrap_or(scenario.max_ticks);
    let mut sim = scenario.build()?;
    let mut policies = scenario.policies();
    let mut metrics = MatchMetrics::new(&scenario.name, &sim);
    let mut replay = if config.record {
        Some(Replay::new(&scenario.name, &sim)?)
    } else {
        None
    };

    info!(
        scenario = %scenario.name,
        seed = scenario.seed,
        players = scenario.roster.len(),
        max_ticks,
        "Match starting"
    );

    let start = Instant::now();
    let mut actions = ActionMap::new();
    while !sim.is_done() && sim.world().tick < max_ticks {
        actions.clear();
        for (&id, policy) in &mut policies {
            actions.insert(id, policy.act(sim.world(), id));
        }
        sim.step(&actions)?;
        if let Some(replay) = replay.as_mut() {
            replay.record(&actions);
        }
        metrics.record_tick(&sim);

        let tick = sim.world().tick;
        if tick % PROGRESS_LOG_INTERVAL == 0 {
            let (alive_defenders, alive_raiders) = alive_counts(&sim);
            debug!(
                tick,
                alive_defenders,
                alive_raiders,
                base_health = sim.world().base.health.current.to_num::<f64>(),
                "Match progress"
            );
        }
    }
    let elapsed_secs = start.elapsed().as_secs_f64();

    metrics.finalize(&sim);
    if let Some(replay) = replay.as_mut() {
        replay.finalize(sim.world().tick, metrics.final_state_hash);
    }

    info!(
        scenario = %scenario.name,
        seed = scenario.seed,
        ticks = metrics.duration_ticks,
        winner = ?metrics.winner,
        condition = %metrics.win_condition,
        "Match finished"
    );

    Ok(MatchResult {
        metrics,
        replay,
        elapsed_secs,
    })
}

fn alive_counts(sim: &Simulation) -> (usize, usize) {
    let world = sim.world();
    let alive = |team| {
        world
            .players
            .values()
            .filter(|p| p.team == team && p.is_alive())
            .count()
    };
    (alive(Team::Defender), alive(Team::Raider))
}
