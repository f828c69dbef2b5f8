//! Shared building blocks for entities.
//!
//! Identifiers, teams, health and resource counters used by every entity
//! kind in [`crate::entities`] and by players in [`crate::player`].

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};

/// Unique identifier for a world entity (structure, projectile, effect).
pub type EntityId = u64;

/// Identifier of a player, chosen by whoever adds the player to the match.
pub type PlayerId = u32;

/// One of the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Team 1, spawns near the base and must keep it standing.
    Defender,
    /// Team 2, spawns on the outer ring.
    Raider,
}

impl Team {
    /// Team number as reported in observations (1 or 2).
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Defender => 1,
            Self::Raider => 2,
        }
    }

    /// The opposing team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Defender => Self::Raider,
            Self::Raider => Self::Defender,
        }
    }
}

/// Health component.
///
/// Damage never drives `current` below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health.
    #[serde(with = "fixed_serde")]
    pub current: Fixed,
    /// Health at creation.
    #[serde(with = "fixed_serde")]
    pub max: Fixed,
}

impl Health {
    /// Create health at full.
    #[must_use]
    pub fn new(max: u32) -> Self {
        let max = Fixed::from_num(max);
        Self { current: max, max }
    }

    /// Apply damage, returning the amount actually removed.
    pub fn apply_damage(&mut self, amount: Fixed) -> Fixed {
        let applied = amount.max(Fixed::ZERO).min(self.current);
        self.current -= applied;
        applied
    }

    /// Add a signed change and clamp the result at zero.
    ///
    /// Returns the change actually applied.
    pub fn adjust(&mut self, delta: Fixed) -> Fixed {
        let before = self.current;
        self.current = (self.current + delta).max(Fixed::ZERO);
        self.current - before
    }

    /// Check if dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= Fixed::ZERO
    }
}

/// Food, wood and stone counters.
///
/// Counters are unsigned; spending is all-or-nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resources {
    /// Food, spent on heals.
    pub food: u32,
    /// Wood, spent on arrows and wooden structures.
    pub wood: u32,
    /// Stone, spent on frags and stone structures.
    pub stone: u32,
}

impl Resources {
    /// Create a resource bundle.
    #[must_use]
    pub const fn new(food: u32, wood: u32, stone: u32) -> Self {
        Self { food, wood, stone }
    }

    /// Whether every counter covers `cost`.
    #[must_use]
    pub const fn covers(&self, cost: &Self) -> bool {
        self.food >= cost.food && self.wood >= cost.wood && self.stone >= cost.stone
    }

    /// Deduct `cost` if affordable. Leaves the bundle untouched otherwise.
    pub fn try_spend(&mut self, cost: &Self) -> bool {
        if !self.covers(cost) {
            return false;
        }
        self.food -= cost.food;
        self.wood -= cost.wood;
        self.stone -= cost.stone;
        true
    }

    /// Add a bundle, saturating at `u32::MAX`.
    pub fn add(&mut self, gain: &Self) {
        self.food = self.food.saturating_add(gain.food);
        self.wood = self.wood.saturating_add(gain.wood);
        self.stone = self.stone.saturating_add(gain.stone);
    }
}

/// Per-tick tally of what happened to and because of a player.
///
/// Reset at the start of every tick; external reward shaping reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerEvents {
    /// Net food change.
    pub change_food: i64,
    /// Net wood change.
    pub change_wood: i64,
    /// Net stone change.
    pub change_stone: i64,
    /// Net own health change.
    #[serde(with = "fixed_serde")]
    pub change_health: Fixed,
    /// Health removed from enemy players (negative).
    #[serde(with = "fixed_serde")]
    pub change_health_enemy_player: Fixed,
    /// Health removed from or restored to teammates.
    #[serde(with = "fixed_serde")]
    pub change_health_team_player: Fixed,
    /// Damage dealt to enemy structures.
    #[serde(with = "fixed_serde")]
    pub damage_dealt_enemy_structure: Fixed,
    /// Damage dealt to own-team structures.
    #[serde(with = "fixed_serde")]
    pub damage_dealt_team_structure: Fixed,
    /// Enemy players killed.
    pub killed_enemy_player: u32,
    /// Whether the player died this tick.
    pub died: bool,
    /// Base damage this player caused (negative for own-team damage).
    #[serde(with = "fixed_serde")]
    pub self_damage_dealt_base: Fixed,
    /// Base damage suffered by anyone, signed from this player's side.
    #[serde(with = "fixed_serde")]
    pub damage_dealt_base: Fixed,
}

/// Tool slot selected by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// Slot 1, fast melee.
    Sword,
    /// Slot 2, fires arrows.
    Bow,
    /// Slot 3, heavy melee with bonuses against structures.
    Hammer,
    /// Slot 4, throws a frag grenade.
    Frag,
    /// Slot 5.
    WoodWall,
    /// Slot 6.
    StoneWall,
    /// Slot 7.
    Spike,
    /// Slot 8.
    Turret,
    /// Slot 9, transient: reverts after use.
    Heal,
}

impl Tool {
    /// Tool for a 1-based slot number; `0` and out-of-range give `None`.
    #[must_use]
    pub const fn from_slot(slot: u8) -> Option<Self> {
        match slot {
            1 => Some(Self::Sword),
            2 => Some(Self::Bow),
            3 => Some(Self::Hammer),
            4 => Some(Self::Frag),
            5 => Some(Self::WoodWall),
            6 => Some(Self::StoneWall),
            7 => Some(Self::Spike),
            8 => Some(Self::Turret),
            9 => Some(Self::Heal),
            _ => None,
        }
    }

    /// 1-based slot number.
    #[must_use]
    pub const fn slot(self) -> u8 {
        match self {
            Self::Sword => 1,
            Self::Bow => 2,
            Self::Hammer => 3,
            Self::Frag => 4,
            Self::WoodWall => 5,
            Self::StoneWall => 6,
            Self::Spike => 7,
            Self::Turret => 8,
            Self::Heal => 9,
        }
    }

    /// Whether the tool starts a timed attack.
    #[must_use]
    pub const fn is_weapon(self) -> bool {
        matches!(self, Self::Sword | Self::Bow | Self::Hammer | Self::Frag)
    }

    /// Whether the weapon hit-scans in front of the player.
    #[must_use]
    pub const fn is_melee(self) -> bool {
        matches!(self, Self::Sword | Self::Hammer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage_clamps() {
        let mut health = Health::new(15);
        assert_eq!(health.apply_damage(Fixed::from_num(9)), Fixed::from_num(9));
        assert_eq!(health.current, Fixed::from_num(6));
        assert_eq!(health.apply_damage(Fixed::from_num(9)), Fixed::from_num(6));
        assert_eq!(health.current, Fixed::ZERO);
        assert!(health.is_dead());
    }

    #[test]
    fn test_health_negative_damage_is_ignored() {
        let mut health = Health::new(10);
        assert_eq!(health.apply_damage(Fixed::from_num(-5)), Fixed::ZERO);
        assert_eq!(health.current, Fixed::from_num(10));
    }

    #[test]
    fn test_health_adjust_clamps_at_zero() {
        let mut health = Health::new(5);
        assert_eq!(health.adjust(Fixed::from_num(-8)), Fixed::from_num(-5));
        assert_eq!(health.current, Fixed::ZERO);
    }

    #[test]
    fn test_spend_is_all_or_nothing() {
        let mut wallet = Resources::new(0, 12, 5);
        assert!(!wallet.try_spend(&Resources::new(0, 12, 12)));
        assert_eq!(wallet, Resources::new(0, 12, 5));
        assert!(wallet.try_spend(&Resources::new(0, 10, 0)));
        assert_eq!(wallet, Resources::new(0, 2, 5));
    }

    #[test]
    fn test_tool_slots_roundtrip() {
        for slot in 1..=9 {
            let tool = Tool::from_slot(slot).unwrap();
            assert_eq!(tool.slot(), slot);
        }
        assert_eq!(Tool::from_slot(0), None);
        assert_eq!(Tool::from_slot(10), None);
    }

    #[test]
    fn test_team_numbers() {
        assert_eq!(Team::Defender.number(), 1);
        assert_eq!(Team::Raider.number(), 2);
        assert_eq!(Team::Raider.opponent(), Team::Defender);
    }
}
