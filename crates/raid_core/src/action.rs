//! Discrete per-tick player input.
//!
//! An action is five bins: horizontal move, vertical move, tool select,
//! trigger, and turn rate. Out-of-range bins are a contract violation and
//! reject the whole tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{PlayerId, Tool};
use crate::error::{GameError, Result};

/// One action per controlled player, committed atomically for a tick.
pub type ActionMap = BTreeMap<PlayerId, PlayerAction>;

/// Raw five-bin action.
///
/// | field | bins | meaning |
/// |---|---|---|
/// | `move_x` | 0..=2 | -1, 0, +1 horizontal |
/// | `move_y` | 0..=2 | -1, 0, +1 vertical |
/// | `tool` | 0..=9 | 0 keeps the active slot |
/// | `trigger` | 0..=1 | attack / use held |
/// | `turn` | 0..=4 | -4, -1, 0, +1, +4 heading steps |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerAction {
    /// Horizontal move bin.
    pub move_x: u8,
    /// Vertical move bin.
    pub move_y: u8,
    /// Tool slot, 0 for no change.
    pub tool: u8,
    /// Trigger bin.
    pub trigger: u8,
    /// Turn bin.
    pub turn: u8,
}

impl Default for PlayerAction {
    fn default() -> Self {
        Self::idle()
    }
}

const BIN_LIMITS: [(&str, u8); 5] = [
    ("move_x", 2),
    ("move_y", 2),
    ("tool", 9),
    ("trigger", 1),
    ("turn", 4),
];

impl PlayerAction {
    /// Stand still, keep the tool, no trigger, no turn.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            move_x: 1,
            move_y: 1,
            tool: 0,
            trigger: 0,
            turn: 2,
        }
    }

    /// Build from raw bins, validating each.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidAction`] naming the first bin outside
    /// its range.
    pub fn from_bins(player: PlayerId, bins: [i64; 5]) -> Result<Self> {
        let mut checked = [0u8; 5];
        for (slot, (&value, (field, max))) in checked.iter_mut().zip(bins.iter().zip(BIN_LIMITS)) {
            *slot = u8::try_from(value)
                .ok()
                .filter(|v| *v <= max)
                .ok_or(GameError::InvalidAction {
                    player,
                    field,
                    value,
                })?;
        }
        Ok(Self {
            move_x: checked[0],
            move_y: checked[1],
            tool: checked[2],
            trigger: checked[3],
            turn: checked[4],
        })
    }

    /// Raw bins in wire order.
    #[must_use]
    pub const fn bins(&self) -> [u8; 5] {
        [self.move_x, self.move_y, self.tool, self.trigger, self.turn]
    }

    /// Check every bin is in range (for actions built field by field).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidAction`] for the first bad bin.
    pub fn validate(&self, player: PlayerId) -> Result<()> {
        for (value, (field, max)) in self.bins().into_iter().zip(BIN_LIMITS) {
            if value > max {
                return Err(GameError::InvalidAction {
                    player,
                    field,
                    value: i64::from(value),
                });
            }
        }
        Ok(())
    }

    /// Horizontal direction, -1..=1.
    #[must_use]
    pub fn dx(&self) -> i32 {
        i32::from(self.move_x) - 1
    }

    /// Vertical direction, -1..=1.
    #[must_use]
    pub fn dy(&self) -> i32 {
        i32::from(self.move_y) - 1
    }

    /// Selected tool, `None` for "keep current".
    #[must_use]
    pub const fn selected_tool(&self) -> Option<Tool> {
        Tool::from_slot(self.tool)
    }

    /// Whether the trigger is held.
    #[must_use]
    pub const fn trigger_held(&self) -> bool {
        self.trigger == 1
    }

    /// Heading steps to rotate: the centred bin, squared with its sign.
    #[must_use]
    pub fn turn_steps(&self) -> i32 {
        let centred = i32::from(self.turn) - 2;
        centred * centred.abs()
    }

    /// Set the move bins from directions in -1..=1.
    #[must_use]
    pub fn with_move(mut self, dx: i8, dy: i8) -> Self {
        self.move_x = u8::try_from(dx.clamp(-1, 1) + 1).unwrap_or(1);
        self.move_y = u8::try_from(dy.clamp(-1, 1) + 1).unwrap_or(1);
        self
    }

    /// Select a tool slot.
    #[must_use]
    pub const fn with_tool(mut self, tool: Tool) -> Self {
        self.tool = tool.slot();
        self
    }

    /// Hold or release the trigger.
    #[must_use]
    pub const fn with_trigger(mut self, held: bool) -> Self {
        self.trigger = held as u8;
        self
    }

    /// Set the raw turn bin (clamped to 0..=4).
    #[must_use]
    pub fn with_turn(mut self, bin: u8) -> Self {
        self.turn = bin.min(4);
        self
    }
}
