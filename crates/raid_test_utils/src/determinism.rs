//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Training runs and replays depend on bit-identical re-simulation.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`raid_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Every world collection is a `BTreeMap`.
//!
//! - **System randomness**: deposit and spawn placement use the seeded
//!   world RNG only.

use std::thread;

use raid_core::action::ActionMap;
use raid_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for tick in 0..ticks {
            step(&mut state, tick);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Advance a match one tick with scripted actions. Finished matches are
/// left alone.
pub fn step_scripted<Script>(sim: &mut Simulation, script: &Script, tick: u64)
where
    Script: Fn(&Simulation, u64) -> ActionMap,
{
    if sim.is_done() {
        return;
    }
    let actions = script(sim, tick);
    if let Err(e) = sim.step(&actions) {
        panic!("scripted step {tick} rejected: {e}");
    }
}

/// Run a match twice with the same setup and script and compare the
/// final state hashes.
pub fn verify_simulation_determinism<Setup, Script>(
    setup: Setup,
    script: Script,
    num_ticks: u64,
) -> bool
where
    Setup: Fn() -> Simulation,
    Script: Fn(&Simulation, u64) -> ActionMap,
{
    verify_determinism(
        2,
        num_ticks,
        &setup,
        |sim, tick| step_scripted(sim, &script, tick),
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }
}

/// Run N copies of a match on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under different memory
/// layouts or thread scheduling.
pub fn run_parallel_simulations<Setup, Script>(
    setup: Setup,
    script: Script,
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    Setup: Fn() -> Simulation + Sync,
    Script: Fn(&Simulation, u64) -> ActionMap + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup();
                    for tick in 0..num_ticks {
                        step_scripted(&mut sim, &script, tick);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs agree, `Some(tick)` at the first mismatch.
pub fn find_first_divergence<Setup, Script>(
    setup: Setup,
    script: Script,
    num_ticks: u64,
) -> Option<u64>
where
    Setup: Fn() -> Simulation,
    Script: Fn(&Simulation, u64) -> ActionMap,
{
    let mut sim1 = setup();
    let mut sim2 = setup();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 0..num_ticks {
        step_scripted(&mut sim1, &script, tick);
        step_scripted(&mut sim2, &script, tick);

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick + 1);
        }
    }

    None
}

/// Verify that a serialization round-trip mid-match changes nothing:
/// the restored copy must keep agreeing with the original afterwards.
pub fn verify_serialization_determinism<Setup, Script>(
    setup: Setup,
    script: Script,
    num_ticks: u64,
) -> bool
where
    Setup: Fn() -> Simulation,
    Script: Fn(&Simulation, u64) -> ActionMap,
{
    let mut sim = setup();
    for tick in 0..num_ticks {
        step_scripted(&mut sim, &script, tick);
    }

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = Simulation::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != sim.state_hash() {
        return false;
    }

    for tick in num_ticks..num_ticks * 2 {
        step_scripted(&mut sim, &script, tick);
        step_scripted(&mut restored, &script, tick);
    }
    restored.state_hash() == sim.state_hash()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{duel, populated_match, scripted_actions};

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n, _| *n += 1, |n| *n);
        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_idle_match_determinism() {
        assert!(verify_simulation_determinism(
            || populated_match(7, 2),
            |_, _| ActionMap::new(),
            200,
        ));
    }

    #[test]
    fn test_scripted_match_determinism() {
        assert!(verify_simulation_determinism(
            || populated_match(8, 3),
            scripted_actions,
            400,
        ));
    }

    #[test]
    fn test_no_divergence_in_duel() {
        assert_eq!(find_first_divergence(duel, scripted_actions, 300), None);
    }

    #[test]
    fn test_parallel_runs_agree() {
        let result = run_parallel_simulations(|| populated_match(9, 2), scripted_actions, 4, 200);
        assert!(result.is_deterministic());
        assert_eq!(result.hashes.len(), 4);
    }

    #[test]
    fn test_serialization_round_trip_keeps_agreeing() {
        assert!(verify_serialization_determinism(
            || populated_match(10, 2),
            scripted_actions,
            150,
        ));
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = populated_match(1, 1).state_hash();
        let b = populated_match(2, 1).state_hash();
        assert_ne!(a, b);
    }
}
