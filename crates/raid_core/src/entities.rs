//! Closed set of world entity kinds.
//!
//! Every entity lives in exactly one collection owned by
//! [`World`](crate::world::World):
//!
//! - [`StaticObject`]s (resource nodes and walls) never move and are also
//!   indexed in the [`SpatialGrid`](crate::grid::SpatialGrid).
//! - [`DynamicObject`]s (spikes, turrets, projectiles, frags, explosions)
//!   are scanned in full every tick.
//! - [`Effect`]s are non-colliding influence volumes.
//! - The single [`Base`] is a field of the world.
//!
//! Players live in their own map and are described in [`crate::player`].

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, Health, PlayerId, Team};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::tuning::{ResourceStats, Tuning};

/// Kind of a grid-indexed static object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticKind {
    /// Food node.
    Bush,
    /// Wood node.
    Tree,
    /// Stone node.
    Stone,
    /// Team-owned wooden wall.
    WoodWall,
    /// Team-owned stone wall.
    StoneWall,
}

impl StaticKind {
    /// Whether this is a harvestable resource node.
    #[must_use]
    pub const fn is_resource(self) -> bool {
        matches!(self, Self::Bush | Self::Tree | Self::Stone)
    }

    /// Whether this is a placed wall.
    #[must_use]
    pub const fn is_wall(self) -> bool {
        matches!(self, Self::WoodWall | Self::StoneWall)
    }

    /// Size and health table for resource nodes.
    #[must_use]
    pub fn resource_stats(self, tuning: &Tuning) -> Option<ResourceStats> {
        match self {
            Self::Bush => Some(tuning.structures.bush),
            Self::Tree => Some(tuning.structures.tree),
            Self::Stone => Some(tuning.structures.stone),
            Self::WoodWall | Self::StoneWall => None,
        }
    }
}

/// Resource node or wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaticObject {
    /// Entity id.
    pub id: EntityId,
    /// What this is.
    pub kind: StaticKind,
    /// Centre, fixed for the object's lifetime.
    pub position: Vec2Fixed,
    /// Collision radius (resource nodes shrink as they are harvested).
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Health.
    pub health: Health,
    /// Owning team for walls, `None` for resource nodes.
    pub team: Option<Team>,
    /// Set when the object took a hit this tick.
    pub hit: bool,
}

impl StaticObject {
    /// A full-size resource node.
    #[must_use]
    pub fn resource(id: EntityId, kind: StaticKind, position: Vec2Fixed, stats: ResourceStats) -> Self {
        Self {
            id,
            kind,
            position,
            radius: Fixed::from_num(stats.radius),
            health: Health::new(stats.health),
            team: None,
            hit: false,
        }
    }

    /// A freshly placed wall.
    #[must_use]
    pub fn wall(
        id: EntityId,
        kind: StaticKind,
        position: Vec2Fixed,
        team: Team,
        tuning: &Tuning,
    ) -> Self {
        let stats = if kind == StaticKind::StoneWall {
            &tuning.structures.stone_wall
        } else {
            &tuning.structures.wood_wall
        };
        Self {
            id,
            kind,
            position,
            radius: Fixed::from_num(stats.radius),
            health: Health::new(stats.health),
            team: Some(team),
            hit: false,
        }
    }

    /// Recompute a resource node's radius from its remaining health.
    pub fn shrink(&mut self, stats: ResourceStats) {
        let full = Fixed::from_num(stats.radius);
        let shrink = Fixed::from_num(stats.shrink);
        let fraction = self.health.current / Fixed::from_num(stats.shrink_reference);
        self.radius = full - shrink * (Fixed::ONE - fraction);
    }
}

/// Team-owned spike trap that pulses damage at enemies touching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spike {
    /// Entity id.
    pub id: EntityId,
    /// Centre.
    pub position: Vec2Fixed,
    /// Owning team.
    pub team: Team,
    /// Player that placed it.
    pub owner: PlayerId,
    /// Health.
    pub health: Health,
    /// Ticks until the next pulse.
    pub countdown: u32,
    /// Set when the spike took a hit this tick.
    pub hit: bool,
}

/// Team-owned auto-turret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Turret {
    /// Entity id.
    pub id: EntityId,
    /// Centre.
    pub position: Vec2Fixed,
    /// Owning team.
    pub team: Team,
    /// Player that placed it.
    pub owner: PlayerId,
    /// Health.
    pub health: Health,
    /// Ticks until it may fire.
    pub reload: u32,
    /// Unit vector toward the last target.
    pub aim: Vec2Fixed,
    /// Set when the turret took a hit this tick.
    pub hit: bool,
}

/// Straight-flying projectile kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    /// Bow shot.
    Arrow,
    /// Bow shot after holding the trigger.
    ChargedArrow,
    /// Turret round.
    Bullet,
}

/// Arrow, charged arrow or bullet in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projectile {
    /// Entity id.
    pub id: EntityId,
    /// Kind.
    pub kind: ProjectileKind,
    /// Centre.
    pub position: Vec2Fixed,
    /// Unit direction of travel.
    pub direction: Vec2Fixed,
    /// Team of whoever fired it.
    pub team: Team,
    /// Player credited with the damage.
    pub owner: Option<PlayerId>,
    /// Ticks left in flight.
    pub lifetime: u32,
}

/// Thrown grenade, slowing down until it detonates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frag {
    /// Entity id.
    pub id: EntityId,
    /// Centre.
    pub position: Vec2Fixed,
    /// Unit direction of travel.
    pub direction: Vec2Fixed,
    /// Current distance per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Thrower's team.
    pub team: Team,
    /// Thrower.
    pub owner: Option<PlayerId>,
    /// Fuse ticks left.
    pub lifetime: u32,
}

/// One-tick blast left by a frag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Explosion {
    /// Entity id.
    pub id: EntityId,
    /// Centre.
    pub position: Vec2Fixed,
    /// Thrower's team.
    pub team: Team,
    /// Thrower.
    pub owner: Option<PlayerId>,
}

/// Non-indexed world object, stepped every tick in id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DynamicObject {
    /// Spike trap.
    Spike(Spike),
    /// Auto-turret.
    Turret(Turret),
    /// Arrow, charged arrow or bullet.
    Projectile(Projectile),
    /// Frag grenade.
    Frag(Frag),
    /// Frag blast.
    Explosion(Explosion),
}

impl DynamicObject {
    /// Entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        match self {
            Self::Spike(s) => s.id,
            Self::Turret(t) => t.id,
            Self::Projectile(p) => p.id,
            Self::Frag(f) => f.id,
            Self::Explosion(e) => e.id,
        }
    }

    /// Centre.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        match self {
            Self::Spike(s) => s.position,
            Self::Turret(t) => t.position,
            Self::Projectile(p) => p.position,
            Self::Frag(f) => f.position,
            Self::Explosion(e) => e.position,
        }
    }

    /// Owning team.
    #[must_use]
    pub const fn team(&self) -> Team {
        match self {
            Self::Spike(s) => s.team,
            Self::Turret(t) => t.team,
            Self::Projectile(p) => p.team,
            Self::Frag(f) => f.team,
            Self::Explosion(e) => e.team,
        }
    }
}

/// Periodic heal zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Heal {
    /// Entity id.
    pub id: EntityId,
    /// Centre.
    pub position: Vec2Fixed,
    /// Player that placed it.
    pub owner: PlayerId,
    /// Owner's team.
    pub team: Team,
    /// Ticks until the next pulse.
    pub countdown: u32,
    /// Ticks before the zone expires.
    pub lifetime: u32,
}

/// Non-colliding effect volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Heal zone.
    Heal(Heal),
}

impl Effect {
    /// Entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        match self {
            Self::Heal(h) => h.id,
        }
    }
}

/// The objective at the map centre, owned by the defending team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Base {
    /// Centre.
    pub position: Vec2Fixed,
    /// Owning team.
    pub team: Team,
    /// Collision radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Health; the match ends when it reaches zero.
    pub health: Health,
    /// Set when the base took a hit this tick.
    pub hit: bool,
}

impl Base {
    /// Fresh base at the map centre.
    #[must_use]
    pub fn new(tuning: &Tuning) -> Self {
        let stats = &tuning.structures.base;
        Self {
            position: tuning.center(),
            team: Team::Defender,
            radius: Fixed::from_num(stats.radius),
            health: Health::new(stats.health),
            hit: false,
        }
    }

    /// Whether the base still stands.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_shrinks_with_health() {
        let tuning = Tuning::default();
        let stats = tuning.structures.stone;
        let mut stone =
            StaticObject::resource(1, StaticKind::Stone, Vec2Fixed::from_int(500, 500), stats);
        stone.shrink(stats);
        assert_eq!(stone.radius, Fixed::from_num(40));

        stone.health.apply_damage(Fixed::from_num(25));
        stone.shrink(stats);
        assert_eq!(stone.radius, Fixed::from_num(30));

        stone.health.apply_damage(Fixed::from_num(25));
        stone.shrink(stats);
        assert_eq!(stone.radius, Fixed::from_num(20));
    }

    #[test]
    fn test_bush_shrink_reference_exceeds_health() {
        // bushes spawn below the reference health, so they start smaller
        let tuning = Tuning::default();
        let stats = tuning.structures.bush;
        let mut bush =
            StaticObject::resource(1, StaticKind::Bush, Vec2Fixed::from_int(500, 500), stats);
        bush.shrink(stats);
        assert!(bush.radius < Fixed::from_num(20));
        assert!(bush.radius > Fixed::from_num(17));
    }

    #[test]
    fn test_wall_ownership() {
        let tuning = Tuning::default();
        let wall = StaticObject::wall(
            3,
            StaticKind::StoneWall,
            Vec2Fixed::from_int(10, 10),
            Team::Raider,
            &tuning,
        );
        assert_eq!(wall.team, Some(Team::Raider));
        assert_eq!(wall.health.current, Fixed::from_num(75));
        assert!(wall.kind.is_wall());
        assert!(!wall.kind.is_resource());
    }

    #[test]
    fn test_base_starts_alive_at_centre() {
        let tuning = Tuning::default();
        let base = Base::new(&tuning);
        assert!(base.is_alive());
        assert_eq!(base.position, Vec2Fixed::from_int(1000, 1000));
        assert_eq!(base.team, Team::Defender);
    }
}
