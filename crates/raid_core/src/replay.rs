//! Recording and re-simulating matches.
//!
//! A replay stores the serialized starting match and the action map of
//! every tick. Because stepping is deterministic, that is enough to
//! rebuild any later state and check it against the recorded final hash.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action::ActionMap;
use crate::error::{GameError, Result};
use crate::simulation::Simulation;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Scenario identifier or name.
    pub scenario_id: String,
    /// Seed the match was reset with.
    pub seed: u64,
    /// Serialized starting match.
    pub initial_state: Vec<u8>,
    /// Action map of each tick, starting with the first tick after
    /// `initial_state`.
    pub frames: Vec<ActionMap>,
    /// Final tick when recording stopped.
    pub final_tick: u64,
    /// Final state hash for verification.
    pub final_hash: u64,
}

impl Replay {
    /// Start recording from a match's current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the match cannot be serialized.
    pub fn new(scenario_id: impl Into<String>, initial_state: &Simulation) -> Result<Self> {
        Ok(Self {
            version: REPLAY_VERSION,
            scenario_id: scenario_id.into(),
            seed: initial_state.seed(),
            initial_state: initial_state.serialize()?,
            frames: Vec::new(),
            final_tick: initial_state.world().tick,
            final_hash: initial_state.state_hash(),
        })
    }

    /// Append the action map applied on the next tick.
    pub fn record(&mut self, actions: &ActionMap) {
        self.frames.push(actions.clone());
    }

    /// Finalize the replay with end-of-recording state.
    pub fn finalize(&mut self, final_tick: u64, final_hash: u64) {
        self.final_tick = final_tick;
        self.final_hash = final_hash;
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {e}")))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if file reading or deserialization fails, or the
    /// file was written by an incompatible version.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {e}")))?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }

        Ok(replay)
    }

    /// Rebuild the starting match.
    ///
    /// # Errors
    ///
    /// Returns an error if state deserialization fails.
    pub fn restore_initial_state(&self) -> Result<Simulation> {
        Simulation::deserialize(&self.initial_state)
    }

    /// Number of recorded ticks.
    #[must_use]
    pub fn duration(&self) -> u64 {
        self.frames.len() as u64
    }
}

/// Re-simulates a [`Replay`] tick by tick.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    simulation: Simulation,
    frame: usize,
}

impl ReplayPlayer {
    /// Create a player positioned at the start of the replay.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial state cannot be restored.
    pub fn new(replay: Replay) -> Result<Self> {
        let simulation = replay.restore_initial_state()?;
        Ok(Self {
            replay,
            simulation,
            frame: 0,
        })
    }

    /// Apply the next recorded frame.
    ///
    /// Returns `Ok(true)` while frames remain.
    ///
    /// # Errors
    ///
    /// Returns the step error if a recorded frame no longer applies (the
    /// match ended early or an action is invalid).
    pub fn advance(&mut self) -> Result<bool> {
        let Some(actions) = self.replay.frames.get(self.frame) else {
            return Ok(false);
        };
        self.simulation.step(actions)?;
        self.frame += 1;
        Ok(!self.is_finished())
    }

    /// Jump to `frame` ticks after the start, re-simulating from the
    /// beginning when seeking backwards.
    ///
    /// # Errors
    ///
    /// Returns an error if state restoration or a step fails.
    pub fn seek(&mut self, frame: usize) -> Result<()> {
        if frame < self.frame {
            self.simulation = self.replay.restore_initial_state()?;
            self.frame = 0;
        }
        while self.frame < frame && !self.is_finished() {
            self.advance()?;
        }
        Ok(())
    }

    /// Frames applied so far.
    #[must_use]
    pub const fn current_frame(&self) -> usize {
        self.frame
    }

    /// Current match state.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// The replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Whether every frame has been applied.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.frame >= self.replay.frames.len()
    }

    /// Re-simulate to the end and compare tick and hash with the recording.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DesyncDetected`] on mismatch, or the underlying
    /// error if the replay cannot be re-simulated.
    pub fn verify(&mut self) -> Result<()> {
        self.seek(self.replay.frames.len())?;
        let tick = self.simulation.world().tick;
        let local_hash = self.simulation.state_hash();
        if tick != self.replay.final_tick || local_hash != self.replay.final_hash {
            return Err(GameError::DesyncDetected {
                tick,
                local_hash,
                remote_hash: self.replay.final_hash,
            });
        }
        Ok(())
    }

    /// Progress as a percentage (0-100).
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.replay.frames.is_empty() {
            100.0
        } else {
            self.frame as f64 / self.replay.frames.len() as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::PlayerAction;
    use crate::components::{Team, Tool};
    use crate::tuning::Tuning;

    fn create_test_simulation() -> Simulation {
        let mut sim = Simulation::new(Tuning::default(), 12345).unwrap();
        sim.add_player(1, Team::Defender).unwrap();
        sim.add_player(2, Team::Raider).unwrap();
        sim.reset();
        sim
    }

    fn record(sim: &mut Simulation, ticks: u32) -> Replay {
        let mut replay = Replay::new("test_scenario", sim).unwrap();
        for tick in 0..ticks {
            let mut actions = ActionMap::new();
            let turn = u8::try_from(tick % 5).unwrap();
            actions.insert(1, PlayerAction::idle().with_move(1, 0).with_turn(turn));
            actions.insert(
                2,
                PlayerAction::idle()
                    .with_tool(Tool::Bow)
                    .with_trigger(tick % 3 == 0),
            );
            sim.step(&actions).unwrap();
            replay.record(&actions);
        }
        replay.finalize(sim.world().tick, sim.state_hash());
        replay
    }

    #[test]
    fn test_replay_create() {
        let sim = create_test_simulation();
        let replay = Replay::new("test_scenario", &sim).unwrap();
        assert_eq!(replay.version, REPLAY_VERSION);
        assert_eq!(replay.scenario_id, "test_scenario");
        assert_eq!(replay.seed, 12345);
        assert!(replay.frames.is_empty());
        assert_eq!(replay.final_hash, sim.state_hash());
    }

    #[test]
    fn test_replay_save_load() {
        let mut sim = create_test_simulation();
        let replay = record(&mut sim, 20);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match.replay");
        replay.save(&path).unwrap();

        let loaded = Replay::load(&path).unwrap();
        assert_eq!(loaded.scenario_id, "test_scenario");
        assert_eq!(loaded.duration(), 20);
        assert_eq!(loaded.final_tick, 20);
        assert_eq!(loaded.final_hash, replay.final_hash);
    }

    #[test]
    fn test_replay_version_mismatch_rejected() {
        let sim = create_test_simulation();
        let mut replay = Replay::new("test_scenario", &sim).unwrap();
        replay.version = REPLAY_VERSION + 1;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.replay");
        replay.save(&path).unwrap();
        assert!(matches!(Replay::load(&path), Err(GameError::InvalidState(_))));
    }

    #[test]
    fn test_replay_verify() {
        let mut sim = create_test_simulation();
        let replay = record(&mut sim, 60);
        let mut player = ReplayPlayer::new(replay).unwrap();
        player.verify().unwrap();
        assert!(player.is_finished());
        assert_eq!(player.simulation().state_hash(), sim.state_hash());
    }

    #[test]
    fn test_replay_detects_tampering() {
        let mut sim = create_test_simulation();
        let mut replay = record(&mut sim, 30);
        replay.frames[5].insert(1, PlayerAction::idle().with_move(-1, -1));

        let mut player = ReplayPlayer::new(replay).unwrap();
        assert!(matches!(player.verify(), Err(GameError::DesyncDetected { .. })));
    }

    #[test]
    fn test_replay_player_seek() {
        let mut sim = create_test_simulation();
        let replay = record(&mut sim, 40);
        let mut player = ReplayPlayer::new(replay).unwrap();

        player.seek(25).unwrap();
        assert_eq!(player.current_frame(), 25);
        assert_eq!(player.simulation().world().tick, 25);
        assert!((player.progress_percent() - 62.5).abs() < 0.01);

        player.seek(10).unwrap();
        assert_eq!(player.current_frame(), 10);
        assert_eq!(player.simulation().world().tick, 10);
    }

    #[test]
    fn test_replay_player_advance_to_end() {
        let mut sim = create_test_simulation();
        let replay = record(&mut sim, 5);
        let mut player = ReplayPlayer::new(replay).unwrap();
        let mut steps = 0;
        while player.advance().unwrap() {
            steps += 1;
        }
        assert_eq!(steps, 4);
        assert!(player.is_finished());
        assert!(!player.advance().unwrap());
    }
}
