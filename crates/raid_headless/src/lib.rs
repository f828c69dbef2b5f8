//! Headless match runner for bot training and CI verification.
//!
//! This crate drives a [`raid_core::simulation::Simulation`] without any
//! graphics. External controllers talk to it over JSON lines, and the
//! binary adds batch, determinism, replay and benchmark subcommands.
//!
//! - **Bot training**: a controller joins players, steps the match with raw
//!   action bins and reads back observations and rewards
//! - **CI verification**: scripted matches checked for identical state
//!   hashes across runs
//! - **Replay verification**: recorded matches re-simulated and compared
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: commands from the controller (join, step, query, ...)
//! - **stdout**: responses (JSON)
//! - **stderr**: logs (human-readable)
//!
//! See the [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Serve the protocol on stdin/stdout
//! echo '{"cmd":"join","id":1,"team":"raider"}' | cargo run -p raid_headless
//!
//! # Run a scripted match from a scenario
//! cargo run -p raid_headless -- run --scenario scenarios/raid_3v3.ron
//!
//! # Check determinism across parallel runs
//! cargo run -p raid_headless -- verify --scenario scenarios/duel_1v1.ron --runs 8
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod batch;
pub mod metrics;
pub mod policy;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod session;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, DeterminismReport};
pub use metrics::{BatchSummary, MatchMetrics, TeamMetrics};
pub use policy::{Policy, PolicyKind};
pub use protocol::{Command, ProtocolError, Response};
pub use runner::{run_match, MatchConfig, MatchResult};
pub use scenario::{RosterEntry, Scenario, ScenarioError};
pub use session::Session;
