//! Protocol session: one match driven by an external controller.
//!
//! [`Session::serve`] reads JSON command lines from any [`BufRead`] and
//! writes one JSON response line per command to any [`Write`], so the same
//! loop serves stdin/stdout in the binary and in-memory buffers in tests.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use raid_core::replay::Replay;
use raid_core::simulation::{Simulation, StepOutcome};
use tracing::{debug, info, warn};

use crate::protocol::{decode_actions, Command, ProtocolError, Response};

/// A match plus optional replay recording.
///
/// A recording covers the frames since the last roster change or reset:
/// joins and leaves alter the world outside of recorded actions, so they
/// restart it from the current state.
#[derive(Debug)]
pub struct Session {
    simulation: Simulation,
    scenario_id: String,
    recording: Option<Replay>,
    finished: bool,
}

impl Session {
    /// Wrap a match.
    #[must_use]
    pub fn new(simulation: Simulation) -> Self {
        Self {
            simulation,
            scenario_id: "session".to_string(),
            recording: None,
            finished: false,
        }
    }

    /// Record a replay under `scenario_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the current state cannot be serialized.
    pub fn with_recording(mut self, scenario_id: impl Into<String>) -> Result<Self, ProtocolError> {
        self.scenario_id = scenario_id.into();
        self.recording = Some(Replay::new(&self.scenario_id, &self.simulation)?);
        Ok(self)
    }

    /// The match being served.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Whether `quit` was received.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// The response announcing the session.
    #[must_use]
    pub fn ready(&self) -> Response {
        Response::ready(self.simulation.world().tick, self.simulation.seed())
    }

    /// Handle one input line. Blank lines produce no response.
    pub fn handle_line(&mut self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match Command::from_json(line) {
            Ok(cmd) => Some(self.handle(cmd)),
            Err(e) => {
                warn!(error = %e, "Unparseable command");
                Some(Response::error(ProtocolError::from(e).to_string(), None))
            }
        }
    }

    /// Execute a command, turning failures into `error` responses.
    pub fn handle(&mut self, cmd: Command) -> Response {
        let name = cmd.name();
        match self.execute(cmd) {
            Ok(response) => response,
            Err(e) => {
                debug!(cmd = name, error = %e, "Command failed");
                Response::error(e.to_string(), Some(name))
            }
        }
    }

    fn execute(&mut self, cmd: Command) -> Result<Response, ProtocolError> {
        match cmd {
            Command::Join { id, team } => {
                self.simulation.add_player(id, team)?;
                self.restart_recording()?;
                Ok(Response::Joined { id, team })
            }
            Command::Leave { id } => {
                let removed = self.simulation.remove_player(id);
                self.restart_recording()?;
                Ok(Response::Left { id, removed })
            }
            Command::Reset => {
                let observations = self.simulation.reset();
                self.restart_recording()?;
                Ok(Response::Observations {
                    tick: self.simulation.world().tick,
                    rewards: self.simulation.roster().keys().map(|&id| (id, 0)).collect(),
                    observations,
                    done: false,
                    termination: None,
                    events: None,
                })
            }
            Command::Step { actions, events } => {
                let actions = decode_actions(&actions)?;
                let outcome = self.simulation.step(&actions)?;
                if let Some(replay) = self.recording.as_mut() {
                    replay.record(&actions);
                }
                Ok(self.observations_response(outcome, events))
            }
            Command::Query { id } => {
                let observations = match id {
                    Some(id) => {
                        let obs = self
                            .simulation
                            .observe(id)
                            .ok_or(raid_core::error::GameError::UnknownPlayer(id))?;
                        BTreeMap::from([(id, obs)])
                    }
                    None => self.simulation.observations(),
                };
                let termination = self.simulation.termination();
                let rewards = self
                    .simulation
                    .roster()
                    .iter()
                    .map(|(&id, &team)| (id, termination.map_or(0, |t| t.reward_for(team))))
                    .collect();
                Ok(Response::Observations {
                    tick: self.simulation.world().tick,
                    observations,
                    rewards,
                    done: termination.is_some(),
                    termination,
                    events: None,
                })
            }
            Command::Snapshot => Ok(Response::Snapshot {
                tick: self.simulation.world().tick,
                entities: self.simulation.render_snapshot(),
            }),
            Command::Hash => Ok(Response::StateHash {
                tick: self.simulation.world().tick,
                hash: self.simulation.state_hash(),
            }),
            Command::Quit => {
                self.finished = true;
                Ok(Response::Bye)
            }
        }
    }

    fn observations_response(&self, outcome: StepOutcome, with_events: bool) -> Response {
        Response::Observations {
            tick: self.simulation.world().tick,
            observations: outcome.observations,
            rewards: outcome.rewards,
            done: outcome.done,
            termination: outcome.termination,
            events: with_events.then_some(outcome.events),
        }
    }

    fn restart_recording(&mut self) -> Result<(), ProtocolError> {
        if self.recording.is_some() {
            self.recording = Some(Replay::new(&self.scenario_id, &self.simulation)?);
        }
        Ok(())
    }

    /// Close the recording with the current tick and hash.
    pub fn finish_recording(&mut self) -> Option<Replay> {
        let mut replay = self.recording.take()?;
        replay.finalize(self.simulation.world().tick, self.simulation.state_hash());
        Some(replay)
    }

    /// Serve commands until `quit` or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O failures; bad commands are answered
    /// with `error` responses.
    pub fn serve<R: BufRead, W: Write>(
        &mut self,
        reader: R,
        mut writer: W,
    ) -> Result<(), ProtocolError> {
        writer.write_all(self.ready().to_json_line().as_bytes())?;
        writer.flush()?;

        for line in reader.lines() {
            let line = line?;
            if let Some(response) = self.handle_line(&line) {
                writer.write_all(response.to_json_line().as_bytes())?;
                writer.flush()?;
            }
            if self.finished {
                break;
            }
        }

        if !self.finished {
            self.finished = true;
            writer.write_all(Response::Bye.to_json_line().as_bytes())?;
            writer.flush()?;
        }
        info!(tick = self.simulation.world().tick, "Session closed");
        Ok(())
    }
}
