//! Headless arena match runner.
//!
//! This binary runs matches without graphics, controlled via JSON on
//! stdin/stdout. Designed for bot training, CI testing, and replay
//! verification.
//!
//! # Usage
//!
//! ```bash
//! # Protocol mode - read commands from stdin
//! cargo run -p raid_headless
//!
//! # Run a single scripted match and print its metrics
//! cargo run -p raid_headless -- run --scenario raid_3v3 --seed 9
//!
//! # Run a batch of matches for balance numbers
//! cargo run -p raid_headless -- batch --scenario scenarios/raid_3v3.ron --count 200 --output results/
//!
//! # Record and check a replay
//! cargo run -p raid_headless -- run --scenario duel_1v1 --record duel.replay
//! cargo run -p raid_headless -- replay duel.replay --verify
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use raid_core::action::ActionMap;
use raid_core::components::Team;
use raid_core::replay::{Replay, ReplayPlayer};
use raid_core::simulation::Simulation;
use raid_core::tuning::Tuning;
use raid_headless::batch::{results_path, run_batch, verify_determinism, BatchConfig};
use raid_headless::runner::{run_match, MatchConfig};
use raid_headless::scenario::Scenario;
use raid_headless::session::Session;

#[derive(Parser)]
#[command(name = "raid_headless")]
#[command(about = "Headless arena match runner for bots and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON-lines protocol on stdin/stdout
    Serve {
        /// Scenario whose roster to enrol (name or RON file)
        #[arg(short, long)]
        scenario: Option<String>,

        /// Match seed (overrides the scenario's)
        #[arg(long)]
        seed: Option<u64>,

        /// Tuning file, when no scenario is given
        #[arg(short, long)]
        tuning: Option<PathBuf>,

        /// Write a replay of the session here on exit
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run one scripted match and print its metrics as JSON
    Run {
        /// Scenario name or RON file
        #[arg(short, long, default_value = "duel_1v1")]
        scenario: String,

        /// Match seed (overrides the scenario's)
        #[arg(long)]
        seed: Option<u64>,

        /// Tick limit (overrides the scenario's)
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Write a replay of the match here
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run a batch of scripted matches
    Batch {
        /// Scenario name or RON file
        #[arg(short, long, default_value = "duel_1v1")]
        scenario: String,

        /// Number of matches to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = all cores)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Seed of the first match
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick limit (overrides the scenario's)
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Output directory for results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running the same seed several times
    Verify {
        /// Scenario name or RON file
        #[arg(short, long, default_value = "duel_1v1")]
        scenario: String,

        /// Seed to use
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of runs to compare
        #[arg(short, long, default_value = "4")]
        runs: u32,

        /// Tick limit (overrides the scenario's)
        #[arg(long)]
        max_ticks: Option<u64>,
    },

    /// Play back or verify a recorded replay
    Replay {
        /// Replay file
        file: PathBuf,

        /// Verify the final state hash instead of just playing
        #[arg(long)]
        verify: bool,
    },

    /// Benchmark simulation performance
    Benchmark {
        /// Number of ticks to run
        #[arg(short, long, default_value = "2000")]
        ticks: u64,

        /// Scenario name or RON file
        #[arg(short, long, default_value = "raid_8v8")]
        scenario: String,
    },

    /// Print the built-in tuning as RON
    Tuning {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for protocol and reports
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Serve {
            scenario,
            seed,
            tuning,
            record,
        }) => cmd_serve(scenario, seed, tuning, record),
        Some(Commands::Run {
            scenario,
            seed,
            max_ticks,
            record,
        }) => cmd_run(&scenario, seed, max_ticks, record),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            seed,
            max_ticks,
            output,
        }) => cmd_batch(&scenario, count, parallel, seed, max_ticks, output),
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
            max_ticks,
        }) => cmd_verify(&scenario, seed, runs, max_ticks),
        Some(Commands::Replay { file, verify }) => cmd_replay(&file, verify),
        Some(Commands::Benchmark { ticks, scenario }) => cmd_benchmark(ticks, &scenario),
        Some(Commands::Tuning { output }) => cmd_tuning(output),
        None => cmd_serve(None, None, None, None),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    tracing::error!("{message}");
    eprintln!("FATAL: {message}");
    std::process::exit(1);
}

fn load_scenario(name: &str, seed: Option<u64>) -> Scenario {
    let scenario = Scenario::resolve(name).unwrap_or_else(|e| fail(e));
    match seed {
        Some(seed) => scenario.with_seed(seed),
        None => scenario,
    }
}

/// Serve the protocol on stdin/stdout
fn cmd_serve(
    scenario: Option<String>,
    seed: Option<u64>,
    tuning: Option<PathBuf>,
    record: Option<PathBuf>,
) {
    let simulation = if let Some(name) = scenario {
        load_scenario(&name, seed)
            .build()
            .unwrap_or_else(|e| fail(e))
    } else {
        let tuning = match tuning {
            Some(path) => Tuning::load(&path).unwrap_or_else(|e| fail(e)),
            None => Tuning::default(),
        };
        Simulation::new(tuning, seed.unwrap_or(0)).unwrap_or_else(|e| fail(e))
    };
    tracing::info!(seed = simulation.seed(), "Starting protocol session");

    let mut session = Session::new(simulation);
    if record.is_some() {
        session = session
            .with_recording("session")
            .unwrap_or_else(|e| fail(e));
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(e) = session.serve(stdin.lock(), stdout.lock()) {
        fail(format!("Session failed: {e}"));
    }

    if let (Some(path), Some(replay)) = (record, session.finish_recording()) {
        match replay.save(&path) {
            Ok(()) => eprintln!("Replay saved to: {}", path.display()),
            Err(e) => fail(e),
        }
    }
}

/// Run a single scripted match
fn cmd_run(scenario: &str, seed: Option<u64>, max_ticks: Option<u64>, record: Option<PathBuf>) {
    let mut config = MatchConfig::new(load_scenario(scenario, seed));
    config.max_ticks = max_ticks;
    config.record = record.is_some();

    let result = run_match(&config).unwrap_or_else(|e| fail(e));

    match serde_json::to_string_pretty(&result.metrics) {
        Ok(json) => println!("{json}"),
        Err(e) => fail(e),
    }
    eprintln!(
        "Match finished after {} ticks in {:.2}s",
        result.metrics.duration_ticks, result.elapsed_secs
    );

    if let (Some(path), Some(replay)) = (record, result.replay) {
        match replay.save(&path) {
            Ok(()) => eprintln!("Replay saved to: {}", path.display()),
            Err(e) => fail(e),
        }
    }
}

/// Run batch of matches for balance testing
fn cmd_batch(
    scenario: &str,
    count: u32,
    parallel: u32,
    seed: u64,
    max_ticks: Option<u64>,
    output: Option<PathBuf>,
) {
    let mut config = BatchConfig::new(load_scenario(scenario, None), count)
        .with_seed(seed)
        .with_parallel(parallel);
    config.max_ticks = max_ticks;

    let results = run_batch(config);

    if let Some(dir) = output {
        let path = results_path(&dir);
        if let Err(e) = results.save(&path) {
            fail(format!("Failed to save results: {e}"));
        }
        eprintln!("Results saved to: {}", path.display());
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Matches played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Matches FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("Average length: {:.0} ticks", summary.avg_duration_ticks);
    eprintln!("\nWin Rates:");
    for (team, rate) in &summary.win_rates {
        eprintln!("  {}: {:.1}%", team, rate * 100.0);
    }
    eprintln!("  draws: {}", summary.draws);

    if !results.errors.is_empty() {
        eprintln!("\nMATCH FAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!(
                "  Match {} (seed {}): {}",
                error.game_index, error.seed, error.message
            );
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    match serde_json::to_string_pretty(summary) {
        Ok(json) => println!("{json}"),
        Err(e) => fail(e),
    }
}

/// Verify determinism
fn cmd_verify(scenario: &str, seed: u64, runs: u32, max_ticks: Option<u64>) {
    let scenario = load_scenario(scenario, None);
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    let report = verify_determinism(&scenario, seed, runs, max_ticks);

    if report.is_deterministic() {
        let (ticks, hash) = report.runs.first().copied().unwrap_or_default();
        eprintln!("PASS: All {runs} runs ended at tick {ticks} with hash {hash:016x}");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (i, (ticks, hash)) in report.runs.iter().enumerate() {
            eprintln!("  run {i}: tick {ticks}, hash {hash:016x}");
        }
        for error in &report.errors {
            eprintln!("  error: {error}");
        }
        std::process::exit(1);
    }
}

/// Replay a recorded match
fn cmd_replay(file: &Path, verify: bool) {
    if verify {
        tracing::info!("Verifying replay: {}", file.display());
    } else {
        tracing::info!("Playing replay: {}", file.display());
    }

    let replay = Replay::load(file).unwrap_or_else(|e| fail(format!("Failed to load replay: {e}")));

    eprintln!("Loaded replay:");
    eprintln!("  Scenario: {}", replay.scenario_id);
    eprintln!("  Seed: {}", replay.seed);
    eprintln!("  Duration: {} ticks", replay.duration());

    let mut player =
        ReplayPlayer::new(replay).unwrap_or_else(|e| fail(format!("Failed to start replay: {e}")));

    if verify {
        eprintln!("Verifying replay...");
        match player.verify() {
            Ok(()) => {
                eprintln!("PASS: Replay verification successful");
                eprintln!("  Hash: {:016x}", player.replay().final_hash);
            }
            Err(e) => {
                eprintln!("FAIL: {e}");
                std::process::exit(1);
            }
        }
    } else {
        let mut last_percent = 0;
        loop {
            match player.advance() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => fail(format!("Replay stopped at frame {}: {e}", player.current_frame())),
            }
            // progress_percent is within 0..=100
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let percent = player.progress_percent() as u32;
            if percent > last_percent && percent % 10 == 0 {
                eprintln!("Progress: {percent}%");
                last_percent = percent;
            }
        }

        let sim = player.simulation();
        eprintln!("Replay complete at tick {}", sim.world().tick);
        eprintln!("Final state hash: {:016x}", sim.state_hash());
        eprintln!("  Termination: {:?}", sim.termination());
        eprintln!(
            "  Live players: {} defenders, {} raiders",
            sim.world().alive_count(Team::Defender),
            sim.world().alive_count(Team::Raider)
        );
    }
}

/// Run benchmark
fn cmd_benchmark(ticks: u64, scenario: &str) {
    let scenario = load_scenario(scenario, None);
    tracing::info!("Running {} tick benchmark on {}", ticks, scenario.name);

    let mut sim = scenario.build().unwrap_or_else(|e| fail(e));
    let mut policies = scenario.policies();

    eprintln!("Starting benchmark with {} players", sim.roster().len());
    eprintln!("Running {ticks} ticks...");

    let mut actions = ActionMap::new();
    let start = Instant::now();
    let mut ran = 0u64;
    for _ in 0..ticks {
        if sim.is_done() {
            break;
        }
        actions.clear();
        for (&id, policy) in &mut policies {
            actions.insert(id, policy.act(sim.world(), id));
        }
        if let Err(e) = sim.step(&actions) {
            fail(e);
        }
        ran += 1;
    }
    let elapsed = start.elapsed();
    let tps = ran as f64 / elapsed.as_secs_f64().max(1e-9);

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BENCHMARK RESULTS");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Ticks: {ran}");
    eprintln!("Duration: {:.3}s", elapsed.as_secs_f64());
    eprintln!("Ticks/second: {tps:.1}");
    eprintln!("ms/tick: {:.4}", elapsed.as_secs_f64() * 1000.0 / ran.max(1) as f64);
    eprintln!("Final objects: {}", sim.render_snapshot().len());
    eprintln!("State hash: {:016x}", sim.state_hash());
}

/// Print the default tuning
fn cmd_tuning(output: Option<PathBuf>) {
    let text = Tuning::default()
        .to_ron_string()
        .unwrap_or_else(|e| fail(e));
    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, &text) {
                fail(format!("Failed to write tuning: {e}"));
            }
            eprintln!("Tuning written to: {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            if writeln!(stdout, "{text}").is_err() {
                std::process::exit(1);
            }
        }
    }
}
