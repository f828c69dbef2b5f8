//! Error types for the arena simulation.

use thiserror::Error;

use crate::components::PlayerId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
///
/// Gameplay refusals (not enough wood, blocked placement) are never errors;
/// they leave the world unchanged and show up in the next observation.
#[derive(Debug, Error)]
pub enum GameError {
    /// An action field was outside its declared bin range.
    #[error("Invalid action for player {player}: {field} = {value}")]
    InvalidAction {
        /// Player that submitted the action.
        player: PlayerId,
        /// Name of the offending field.
        field: &'static str,
        /// Submitted value.
        value: i64,
    },

    /// An action or query referenced a player that is not on the roster.
    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    /// A player with this id already joined the match.
    #[error("Player {0} already joined")]
    DuplicatePlayer(PlayerId),

    /// Tuning file failed to parse or validate.
    #[error("Failed to load tuning '{path}': {message}")]
    TuningParse {
        /// Path of the tuning file (or `<inline>`).
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Two simulations that should agree produced different hashes.
    #[error("Desync detected at tick {tick}: local hash {local_hash}, remote hash {remote_hash}")]
    DesyncDetected {
        /// Tick where desync occurred.
        tick: u64,
        /// Local simulation hash.
        local_hash: u64,
        /// Remote simulation hash.
        remote_hash: u64,
    },
}
