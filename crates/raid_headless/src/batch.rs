//! Batch match runner for balance testing and determinism checks.
//!
//! Runs many scripted matches in parallel using rayon. Each match owns its
//! simulation outright, so parallel runs cannot influence each other.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::metrics::{BatchSummary, MatchMetrics};
use crate::runner::{run_match, MatchConfig};
use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario to run; its seed is replaced per match
    pub scenario: Scenario,
    /// Number of matches to run
    pub game_count: u32,
    /// Maximum parallel matches (0 = use rayon default)
    pub parallel_games: u32,
    /// Seed of the first match; match `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Tick limit override (None = scenario's own)
    pub max_ticks: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::duel_1v1(),
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            max_ticks: None,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: Scenario, game_count: u32) -> Self {
        Self {
            scenario,
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the tick limit
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Set the parallelism
    pub fn with_parallel(mut self, parallel_games: u32) -> Self {
        self.parallel_games = parallel_games;
        self
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual match metrics, in seed order
    pub games: Vec<MatchMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Match index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Run `f` on a pool of `threads` workers, or rayon's global pool for 0.
fn with_pool<T: Send>(threads: u32, f: impl FnOnce() -> T + Send) -> T {
    if threads == 0 {
        return f();
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads as usize)
        .build()
    {
        Ok(pool) => pool.install(f),
        Err(e) => {
            warn!(error = %e, "Falling back to the global thread pool");
            f()
        }
    }
}

fn config_for(base: &BatchConfig, seed: u64) -> MatchConfig {
    let mut config = MatchConfig::new(base.scenario.clone().with_seed(seed));
    config.max_ticks = base.max_ticks;
    config
}

/// Run a batch of matches
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();

    info!(
        "Starting batch run: {} matches of '{}'",
        config.game_count, config.scenario.name
    );

    let results: Vec<Result<MatchMetrics, BatchError>> = with_pool(config.parallel_games, || {
        (0..config.game_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                run_match(&config_for(&config, seed))
                    .map(|result| result.metrics)
                    .map_err(|e| {
                        warn!("Match {} failed: {}", i, e);
                        BatchError {
                            game_index: i,
                            seed,
                            message: e.to_string(),
                        }
                    })
            })
            .collect()
    });

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<MatchMetrics> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} matches in {:.1}s ({:.1} matches/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(0.001)
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Outcome of running one seed several times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterminismReport {
    /// Scenario name.
    pub scenario: String,
    /// Seed checked.
    pub seed: u64,
    /// `(ticks, final hash)` of every run, in run order.
    pub runs: Vec<(u64, u64)>,
    /// Failures, if any run errored.
    pub errors: Vec<String>,
}

impl DeterminismReport {
    /// Whether every run finished with the same tick and hash.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.errors.is_empty() && self.runs.windows(2).all(|w| w[0] == w[1])
    }
}

/// Run the same seed `runs` times in parallel and compare the outcomes.
pub fn verify_determinism(
    scenario: &Scenario,
    seed: u64,
    runs: u32,
    max_ticks: Option<u64>,
) -> DeterminismReport {
    let base = BatchConfig {
        scenario: scenario.clone(),
        max_ticks,
        ..Default::default()
    };
    let outcomes: Vec<Result<(u64, u64), String>> = (0..runs)
        .into_par_iter()
        .map(|_| {
            run_match(&config_for(&base, seed))
                .map(|r| (r.metrics.duration_ticks, r.metrics.final_state_hash))
                .map_err(|e| e.to_string())
        })
        .collect();

    let mut report = DeterminismReport {
        scenario: scenario.name.clone(),
        seed,
        runs: Vec::new(),
        errors: Vec::new(),
    };
    for outcome in outcomes {
        match outcome {
            Ok(run) => report.runs.push(run),
            Err(e) => report.errors.push(e),
        }
    }
    report
}

/// Default location of batch output inside `dir`.
#[must_use]
pub fn results_path(dir: &Path) -> PathBuf {
    dir.join("batch_results.json")
}
