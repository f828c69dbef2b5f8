//! JSON protocol for headless match control.
//!
//! The runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** commands from the controller
//! **Output (stdout):** one response per command
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0",...}`
//! 2. Controller enrols players with `join`, then `reset`
//! 3. Each `step` carries raw five-bin actions and answers with
//!    observations, rewards and the done flag
//! 4. `quit` (or end of input) ends the session with `bye`
//!
//! Action bins are `[move_x, move_y, tool, trigger, turn]`. They may be
//! sent as JSON floats but must hold whole numbers; anything else, or a
//! bin out of range, rejects the whole step and leaves the match untouched.
//!
//! Fixed-point values in observations are raw `I32F32` bit patterns
//! (divide by 2^32 for world units).
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0,"seed":7}
//! -> {"cmd":"join","id":1,"team":"defender"}
//! <- {"type":"joined","id":1,"team":"defender"}
//! -> {"cmd":"join","id":2,"team":"raider"}
//! <- {"type":"joined","id":2,"team":"raider"}
//! -> {"cmd":"reset"}
//! <- {"type":"observations","tick":0,"observations":{...},"rewards":{...},"done":false,...}
//! -> {"cmd":"step","actions":{"1":[2,1,0,1,2],"2":[0,1,2,0,2]}}
//! <- {"type":"observations","tick":1,...}
//! -> {"cmd":"hash"}
//! <- {"type":"hash","tick":1,"hash":1234567890}
//! -> {"cmd":"quit"}
//! <- {"type":"bye"}
//! ```

use std::collections::BTreeMap;

use raid_core::action::{ActionMap, PlayerAction};
use raid_core::components::{PlayerId, Team};
use raid_core::error::GameError;
use raid_core::events::TickEvents;
use raid_core::observation::{EntityView, Observation};
use raid_core::simulation::Termination;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol version reported in the `ready` line.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Error type for protocol handling.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A line was not a valid command.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// An action bin was not a whole number.
    #[error("Player {player}: action bin {index} is not an integer ({value})")]
    NonIntegralBin {
        /// Player the action was for.
        player: PlayerId,
        /// Bin position, 0..5.
        index: usize,
        /// Offending value.
        value: f64,
    },
    /// An action key was not a player id.
    #[error("Invalid player id in actions: {0:?}")]
    BadPlayerId(String),
    /// The simulation refused the command.
    #[error(transparent)]
    Game(#[from] GameError),
    /// Reading stdin or writing stdout failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Enrol a player and spawn them into the current match.
    Join {
        /// Caller-chosen player id.
        id: PlayerId,
        /// Side to play on.
        team: Team,
    },

    /// Remove a player from the roster.
    Leave {
        /// Player to remove.
        id: PlayerId,
    },

    /// Start a fresh match with the current roster.
    Reset,

    /// Advance one tick. Players without an entry idle.
    Step {
        /// Raw bins keyed by player id, parsed in [`decode_actions`].
        #[serde(default)]
        actions: BTreeMap<String, [f64; 5]>,
        /// Include the tick's cue events in the response.
        #[serde(default)]
        events: bool,
    },

    /// Observations without advancing time. `id` limits the answer to one
    /// player.
    Query {
        /// Optional single player.
        #[serde(default)]
        id: Option<PlayerId>,
    },

    /// Every live entity, for external renderers.
    Snapshot,

    /// Current state hash (for determinism verification).
    Hash,

    /// End the session.
    Quit,
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for error reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Reset => "reset",
            Self::Step { .. } => "step",
            Self::Query { .. } => "query",
            Self::Snapshot => "snapshot",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}

/// Convert raw wire bins into a validated action map.
///
/// # Errors
///
/// [`ProtocolError::BadPlayerId`] for keys that are not ids,
/// [`ProtocolError::NonIntegralBin`] for fractional or non-finite bins,
/// [`ProtocolError::Game`] with [`GameError::InvalidAction`] for bins out
/// of range.
pub fn decode_actions(raw: &BTreeMap<String, [f64; 5]>) -> Result<ActionMap, ProtocolError> {
    let mut actions = ActionMap::new();
    for (key, bins) in raw {
        let player: PlayerId = key
            .trim()
            .parse()
            .map_err(|_| ProtocolError::BadPlayerId(key.clone()))?;
        let mut whole = [0i64; 5];
        for (index, (slot, &value)) in whole.iter_mut().zip(bins).enumerate() {
            if !value.is_finite() || value.fract() != 0.0 || value.abs() > 1e9 {
                return Err(ProtocolError::NonIntegralBin {
                    player,
                    index,
                    value,
                });
            }
            #[allow(clippy::cast_possible_truncation)]
            {
                *slot = value as i64;
            }
        }
        actions.insert(player, PlayerAction::from_bins(player, whole)?);
    }
    Ok(actions)
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Current tick.
        tick: u64,
        /// Match seed.
        seed: u64,
    },

    /// A player was enrolled.
    Joined {
        /// Player id.
        id: PlayerId,
        /// Their team.
        team: Team,
    },

    /// A player was removed (`removed` is false if they were unknown).
    Left {
        /// Player id.
        id: PlayerId,
        /// Whether they were on the roster.
        removed: bool,
    },

    /// Per-player observations after a reset, step or query.
    Observations {
        /// Current tick.
        tick: u64,
        /// Observation per live rostered player.
        observations: BTreeMap<PlayerId, Observation>,
        /// Terminal reward per rostered player (0 while running).
        rewards: BTreeMap<PlayerId, i32>,
        /// Whether the match is over.
        done: bool,
        /// Why it ended.
        #[serde(skip_serializing_if = "Option::is_none")]
        termination: Option<Termination>,
        /// Cue events of the tick, when requested.
        #[serde(skip_serializing_if = "Option::is_none")]
        events: Option<TickEvents>,
    },

    /// Render snapshot.
    Snapshot {
        /// Current tick.
        tick: u64,
        /// Every live entity.
        entities: Vec<EntityView>,
    },

    /// State hash for determinism verification.
    #[serde(rename = "hash")]
    StateHash {
        /// Current tick.
        tick: u64,
        /// Hash of the full match state.
        hash: u64,
    },

    /// Error processing a command.
    Error {
        /// Human-readable reason.
        message: String,
        /// Command that failed, if it parsed.
        #[serde(skip_serializing_if = "Option::is_none")]
        cmd: Option<String>,
    },

    /// Goodbye message before shutdown.
    Bye,
}

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64, seed: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
            seed,
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join_command() {
        let cmd = Command::from_json(r#"{"cmd":"join","id":3,"team":"raider"}"#).unwrap();
        assert!(matches!(
            cmd,
            Command::Join {
                id: 3,
                team: Team::Raider
            }
        ));
    }

    #[test]
    fn test_parse_step_with_string_keys() {
        let json = r#"{"cmd":"step","actions":{"1":[2,1,0,1,2],"7":[0.0,2.0,9.0,0.0,4.0]}}"#;
        let Command::Step { actions, events } = Command::from_json(json).unwrap() else {
            panic!("expected step");
        };
        assert!(!events);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions["7"], [0.0, 2.0, 9.0, 0.0, 4.0]);
    }

    #[test]
    fn test_step_defaults_to_no_actions() {
        let cmd = Command::from_json(r#"{"cmd":"step"}"#).unwrap();
        assert!(matches!(cmd, Command::Step { actions, .. } if actions.is_empty()));
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Command::from_json(r#"{"cmd":"spawn"}"#).is_err());
    }

    #[test]
    fn test_decode_actions() {
        let mut raw = BTreeMap::new();
        raw.insert("1".to_string(), [2.0, 0.0, 3.0, 1.0, 4.0]);
        let actions = decode_actions(&raw).unwrap();
        assert_eq!(actions[&1].bins(), [2, 0, 3, 1, 4]);
    }

    #[test]
    fn test_decode_rejects_fraction() {
        let mut raw = BTreeMap::new();
        raw.insert("4".to_string(), [1.0, 1.0, 0.5, 0.0, 2.0]);
        let err = decode_actions(&raw).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::NonIntegralBin {
                player: 4,
                index: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_rejects_out_of_range() {
        let mut raw = BTreeMap::new();
        raw.insert("2".to_string(), [1.0, 1.0, 0.0, 0.0, 5.0]);
        let err = decode_actions(&raw).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Game(GameError::InvalidAction {
                player: 2,
                field: "turn",
                value: 5
            })
        ));
    }

    #[test]
    fn test_decode_rejects_bad_key() {
        let mut raw = BTreeMap::new();
        raw.insert("alice".to_string(), [1.0; 5]);
        assert!(matches!(
            decode_actions(&raw),
            Err(ProtocolError::BadPlayerId(key)) if key == "alice"
        ));
    }

    #[test]
    fn test_serialize_hash_response() {
        let json = Response::StateHash { tick: 9, hash: 42 }.to_json_line();
        assert!(json.contains(r#""type":"hash""#));
        assert!(json.contains(r#""tick":9"#));
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn test_error_omits_missing_cmd() {
        let json = Response::error("nope", None).to_json_line();
        assert!(json.contains(r#""type":"error""#));
        assert!(!json.contains("cmd"));
    }
}
