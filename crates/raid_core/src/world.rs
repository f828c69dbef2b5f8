//! Entity storage for one match.
//!
//! The [`World`] owns every entity. Entity logic never holds a reference
//! back to it; instead each step or hit function takes `&mut World` as an
//! explicit context and calls back into the storage helpers here to spawn,
//! remove, and emit cues.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, PlayerId, Resources, Team};
use crate::entities::{Base, DynamicObject, Effect, StaticKind, StaticObject};
use crate::events::{CueKind, TickEvents};
use crate::grid::SpatialGrid;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::player::Player;
use crate::rng::MatchRng;
use crate::tuning::Tuning;

/// Reference to anything that can be hit.
///
/// Used as the key of a swing's hit-once set, so it orders players first,
/// then the base, then static and dynamic objects by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetRef {
    /// A player.
    Player(PlayerId),
    /// The base.
    Base,
    /// A resource node or wall.
    Static(EntityId),
    /// A spike or turret.
    Dynamic(EntityId),
}

/// Broad collision category of a [`Collider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColliderClass {
    /// Living player.
    Player,
    /// Bush, tree or stone.
    Resource,
    /// Wood or stone wall.
    Wall,
    /// Spike trap.
    Spike,
    /// Turret.
    Turret,
    /// The base.
    Base,
}

impl ColliderClass {
    /// Whether the collider is a team-owned building.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(self, Self::Wall | Self::Spike | Self::Turret | Self::Base)
    }
}

/// Circle snapshot of something solid, taken before a collision pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collider {
    /// What to hit.
    pub target: TargetRef,
    /// Centre.
    pub position: Vec2Fixed,
    /// Radius.
    pub radius: Fixed,
    /// Category.
    pub class: ColliderClass,
    /// Owning team, `None` for resource nodes.
    pub team: Option<Team>,
}

impl Collider {
    /// Whether a circle at `position` with `radius` overlaps this collider,
    /// allowing `tolerance` of interpenetration.
    #[must_use]
    pub fn overlaps(&self, position: Vec2Fixed, radius: Fixed, tolerance: Fixed) -> bool {
        position.within(self.position, self.radius + radius - tolerance)
    }
}

/// Complete mutable state of a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    tuning: Tuning,
    /// Ticks simulated since reset.
    pub tick: u64,
    /// Current storm radius around the map centre.
    #[serde(with = "fixed_serde")]
    pub zone_radius: Fixed,
    next_id: EntityId,
    /// Every rostered player, alive or dead.
    pub players: BTreeMap<PlayerId, Player>,
    /// Resource nodes and walls (also indexed in `grid`).
    pub statics: BTreeMap<EntityId, StaticObject>,
    /// Spikes, turrets and everything in flight.
    pub dynamics: BTreeMap<EntityId, DynamicObject>,
    /// Heal zones.
    pub effects: BTreeMap<EntityId, Effect>,
    /// The objective.
    pub base: Base,
    /// Index over `statics`.
    pub grid: SpatialGrid,
    /// Match randomness.
    pub rng: MatchRng,
    /// Output of the tick in progress.
    #[serde(skip)]
    pub events: TickEvents,
}

impl World {
    /// Empty arena: base at the centre, no deposits, no players.
    #[must_use]
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        let grid = SpatialGrid::new(tuning.map.width, tuning.map.height, tuning.map.grid_cell);
        let base = Base::new(&tuning);
        let zone_radius = tuning.zone.max_radius;
        Self {
            tuning,
            tick: 0,
            zone_radius,
            next_id: 1,
            players: BTreeMap::new(),
            statics: BTreeMap::new(),
            dynamics: BTreeMap::new(),
            effects: BTreeMap::new(),
            base,
            grid,
            rng: MatchRng::new(seed),
            events: TickEvents::default(),
        }
    }

    /// Gameplay constants.
    #[must_use]
    pub const fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Hand out the next entity id.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Emit a presentation cue for this tick.
    pub fn cue(&mut self, kind: CueKind, position: Vec2Fixed) {
        self.events.cue(kind, position);
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Player by id.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Mutable player by id.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Living members of a team.
    #[must_use]
    pub fn alive_count(&self, team: Team) -> usize {
        self.players
            .values()
            .filter(|p| p.team == team && p.is_alive())
            .count()
    }

    /// Give resources to a player and record the gain in their events.
    pub fn grant(&mut self, id: PlayerId, gain: Resources) {
        if let Some(player) = self.players.get_mut(&id) {
            player.resources.add(&gain);
            player.events.change_food += i64::from(gain.food);
            player.events.change_wood += i64::from(gain.wood);
            player.events.change_stone += i64::from(gain.stone);
        }
    }

    // ------------------------------------------------------------------
    // Static objects
    // ------------------------------------------------------------------

    /// Store and index a static object.
    ///
    /// Returns `false` (storing nothing) if its position is off the grid.
    pub fn add_static(&mut self, object: StaticObject) -> bool {
        if !self.grid.add(object.id, object.position) {
            return false;
        }
        self.statics.insert(object.id, object);
        self.events.spawned.push(object.id);
        true
    }

    /// Create a full-size resource node.
    pub fn spawn_resource(&mut self, kind: StaticKind, position: Vec2Fixed) -> Option<EntityId> {
        let stats = kind.resource_stats(&self.tuning)?;
        let id = self.allocate_id();
        self.add_static(StaticObject::resource(id, kind, position, stats))
            .then_some(id)
    }

    /// Create a wall owned by `team`.
    pub fn spawn_wall(&mut self, kind: StaticKind, position: Vec2Fixed, team: Team) -> Option<EntityId> {
        let id = self.allocate_id();
        let wall = StaticObject::wall(id, kind, position, team, &self.tuning);
        self.add_static(wall).then_some(id)
    }

    /// Remove a static object and its grid entry. Absent ids are a no-op.
    pub fn remove_static(&mut self, id: EntityId) -> Option<StaticObject> {
        let object = self.statics.remove(&id)?;
        self.grid.remove(id, object.position);
        Some(object)
    }

    // ------------------------------------------------------------------
    // Dynamic objects and effects
    // ------------------------------------------------------------------

    /// Store a dynamic object under its own id.
    pub fn add_dynamic(&mut self, object: DynamicObject) {
        let id = object.id();
        self.dynamics.insert(id, object);
        self.events.spawned.push(id);
    }

    /// Remove a dynamic object. Absent ids are a no-op.
    pub fn remove_dynamic(&mut self, id: EntityId) -> Option<DynamicObject> {
        self.dynamics.remove(&id)
    }

    /// Store an effect under its own id.
    pub fn add_effect(&mut self, effect: Effect) {
        let id = effect.id();
        self.effects.insert(id, effect);
        self.events.spawned.push(id);
    }

    /// Remove an effect. Absent ids are a no-op.
    pub fn remove_effect(&mut self, id: EntityId) -> Option<Effect> {
        self.effects.remove(&id)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Everything solid near `position`.
    ///
    /// Static objects come from the grid block of the given `ring`; living
    /// players, the standing base, spikes and turrets are scanned in full.
    #[must_use]
    pub fn colliders_near(&self, position: Vec2Fixed, ring: i32) -> Vec<Collider> {
        let mut colliders: Vec<Collider> = self
            .grid
            .query_near(position, ring)
            .into_iter()
            .filter_map(|id| self.statics.get(&id))
            .map(|object| Collider {
                target: TargetRef::Static(object.id),
                position: object.position,
                radius: object.radius,
                class: if object.kind.is_wall() {
                    ColliderClass::Wall
                } else {
                    ColliderClass::Resource
                },
                team: object.team,
            })
            .collect();

        let player_radius = Fixed::from_num(self.tuning.player.radius);
        colliders.extend(self.players.values().filter(|p| p.is_alive()).map(|p| Collider {
            target: TargetRef::Player(p.id),
            position: p.position,
            radius: player_radius,
            class: ColliderClass::Player,
            team: Some(p.team),
        }));

        if self.base.is_alive() {
            colliders.push(Collider {
                target: TargetRef::Base,
                position: self.base.position,
                radius: self.base.radius,
                class: ColliderClass::Base,
                team: Some(self.base.team),
            });
        }

        let spike_radius = Fixed::from_num(self.tuning.structures.spike.radius);
        let turret_radius = Fixed::from_num(self.tuning.structures.turret.radius);
        colliders.extend(self.dynamics.values().filter_map(|object| match object {
            DynamicObject::Spike(spike) => Some(Collider {
                target: TargetRef::Dynamic(spike.id),
                position: spike.position,
                radius: spike_radius,
                class: ColliderClass::Spike,
                team: Some(spike.team),
            }),
            DynamicObject::Turret(turret) => Some(Collider {
                target: TargetRef::Dynamic(turret.id),
                position: turret.position,
                radius: turret_radius,
                class: ColliderClass::Turret,
                team: Some(turret.team),
            }),
            _ => None,
        }));

        colliders
    }

    /// Whether a circle would overlap a resource node, wall, spike or
    /// turret. Used to refuse placements and to pick spawn points.
    #[must_use]
    pub fn blocked_for_placement(&self, position: Vec2Fixed, radius: Fixed) -> bool {
        let tolerance = self.tuning.player.collision_tolerance;
        self.colliders_near(position, 1).iter().any(|c| {
            matches!(
                c.class,
                ColliderClass::Resource
                    | ColliderClass::Wall
                    | ColliderClass::Spike
                    | ColliderClass::Turret
            ) && c.overlaps(position, radius, tolerance)
        })
    }

    /// Whether a point is on the map.
    #[must_use]
    pub fn within_bounds(&self, position: Vec2Fixed) -> bool {
        self.grid.within_bounds(position)
    }
}
