//! Per-player observation records and the render snapshot.
//!
//! An [`Observation`] is the only view a controller gets of the match: a
//! metadata block, the player's own full state, and one list per entity
//! category holding everything inside a square window around the player.
//! Positions in the lists are relative to the observing player. Enemy
//! resource counters are redacted.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, PlayerId, Resources, Team};
use crate::entities::{DynamicObject, Effect, ProjectileKind, StaticKind};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::player::Player;
use crate::tuning::Tuning;
use crate::world::World;

/// Match-wide facts included in every observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationMeta {
    /// Map width.
    pub map_width: u32,
    /// Map height.
    pub map_height: u32,
    /// Current tick.
    pub tick: u64,
    /// Storm radius.
    #[serde(with = "fixed_serde")]
    pub zone_radius: Fixed,
    /// Observer's team number (1 or 2).
    pub team: u8,
    /// Observer's team colour.
    pub team_color: [u8; 3],
    /// Opposing team colour.
    pub enemy_color: [u8; 3],
}

/// A player as seen by an observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Roster id.
    pub id: PlayerId,
    /// Team number.
    pub team: u8,
    /// Absolute for the observer's own view, relative otherwise.
    pub position: Vec2Fixed,
    /// Heading step, `0..64`.
    pub heading: u8,
    /// Health.
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Resource counters; `None` for enemies.
    pub resources: Option<Resources>,
    /// Active tool slot.
    pub tool: u8,
    /// -1 idle, 0 attack winding up or recovering, 1 strike window.
    pub attack_state: i8,
    /// Took a hit this tick.
    pub hit: bool,
    /// Movement is slowed.
    pub slowed: bool,
}

/// A wall, spike, resource node or the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureView {
    /// Entity id (0 for the base).
    pub id: EntityId,
    /// Relative position.
    pub position: Vec2Fixed,
    /// Collision radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Health.
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Owning team number, `None` for resource nodes.
    pub team: Option<u8>,
    /// Took a hit this tick.
    pub hit: bool,
}

/// A turret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurretView {
    /// Entity id.
    pub id: EntityId,
    /// Relative position.
    pub position: Vec2Fixed,
    /// Health.
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Owning team number.
    pub team: u8,
    /// Unit aim direction.
    pub aim: Vec2Fixed,
    /// Ticks until it may fire.
    pub reload: u32,
}

/// An arrow, bullet or frag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileView {
    /// Entity id.
    pub id: EntityId,
    /// Relative position.
    pub position: Vec2Fixed,
    /// Unit direction of travel.
    pub direction: Vec2Fixed,
    /// Team number of whoever fired it.
    pub team: u8,
}

/// An explosion or heal zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaView {
    /// Entity id.
    pub id: EntityId,
    /// Relative position.
    pub position: Vec2Fixed,
    /// Effect radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Owning team number.
    pub team: u8,
}

/// Everything one player is allowed to know this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Match-wide facts.
    pub meta: ObservationMeta,
    /// The observer.
    pub own: PlayerView,
    /// Base, if in view and standing.
    pub base: Vec<StructureView>,
    /// Spikes.
    pub spike: Vec<StructureView>,
    /// Stone walls.
    pub stone_wall: Vec<StructureView>,
    /// Wood walls.
    pub wood_wall: Vec<StructureView>,
    /// Turrets.
    pub turret: Vec<TurretView>,
    /// Stone nodes.
    pub stone: Vec<StructureView>,
    /// Trees.
    pub tree: Vec<StructureView>,
    /// Bushes.
    pub bush: Vec<StructureView>,
    /// Explosions.
    pub explosion: Vec<AreaView>,
    /// Frags.
    pub frag: Vec<ProjectileView>,
    /// Bullets.
    pub bullet: Vec<ProjectileView>,
    /// Charged arrows.
    pub charged_arrow: Vec<ProjectileView>,
    /// Arrows.
    pub arrow: Vec<ProjectileView>,
    /// Heal zones.
    pub heal: Vec<AreaView>,
    /// Other living players.
    pub player: Vec<PlayerView>,
}

fn player_view(player: &Player, tuning: &Tuning, origin: Vec2Fixed, reveal: bool) -> PlayerView {
    PlayerView {
        id: player.id,
        team: player.team.number(),
        position: player.position - origin,
        heading: player.heading.step(),
        health: player.health.current,
        resources: reveal.then_some(player.resources),
        tool: player.tool.slot(),
        attack_state: player.attack_state(tuning),
        hit: player.hit,
        slowed: player.slow_ticks > 0,
    }
}

impl World {
    /// Build the observation for one player, `None` if not rostered.
    #[must_use]
    pub fn observe(&self, id: PlayerId) -> Option<Observation> {
        let me = self.players.get(&id)?;
        let tuning = self.tuning();
        let origin = me.position;
        let half = Fixed::from_num(tuning.map.observation_half_width);
        let visible = |p: Vec2Fixed| (p.x - origin.x).abs() <= half && (p.y - origin.y).abs() <= half;

        let mut obs = Observation {
            meta: ObservationMeta {
                map_width: tuning.map.width,
                map_height: tuning.map.height,
                tick: self.tick,
                zone_radius: self.zone_radius,
                team: me.team.number(),
                team_color: tuning.kit(me.team).color,
                enemy_color: tuning.kit(me.team.opponent()).color,
            },
            own: player_view(me, tuning, Vec2Fixed::ZERO, true),
            base: Vec::new(),
            spike: Vec::new(),
            stone_wall: Vec::new(),
            wood_wall: Vec::new(),
            turret: Vec::new(),
            stone: Vec::new(),
            tree: Vec::new(),
            bush: Vec::new(),
            explosion: Vec::new(),
            frag: Vec::new(),
            bullet: Vec::new(),
            charged_arrow: Vec::new(),
            arrow: Vec::new(),
            heal: Vec::new(),
            player: Vec::new(),
        };

        for object_id in self.grid.query_near(origin, tuning.map.observation_ring) {
            let Some(object) = self.statics.get(&object_id) else {
                continue;
            };
            if !visible(object.position) {
                continue;
            }
            let view = StructureView {
                id: object.id,
                position: object.position - origin,
                radius: object.radius,
                health: object.health.current,
                team: object.team.map(Team::number),
                hit: object.hit,
            };
            match object.kind {
                StaticKind::Bush => obs.bush.push(view),
                StaticKind::Tree => obs.tree.push(view),
                StaticKind::Stone => obs.stone.push(view),
                StaticKind::WoodWall => obs.wood_wall.push(view),
                StaticKind::StoneWall => obs.stone_wall.push(view),
            }
        }

        if self.base.is_alive() && visible(self.base.position) {
            obs.base.push(StructureView {
                id: 0,
                position: self.base.position - origin,
                radius: self.base.radius,
                health: self.base.health.current,
                team: Some(self.base.team.number()),
                hit: self.base.hit,
            });
        }

        let structures = &tuning.structures;
        for object in self.dynamics.values() {
            if !visible(object.position()) {
                continue;
            }
            let position = object.position() - origin;
            match object {
                DynamicObject::Spike(spike) => obs.spike.push(StructureView {
                    id: spike.id,
                    position,
                    radius: Fixed::from_num(structures.spike.radius),
                    health: spike.health.current,
                    team: Some(spike.team.number()),
                    hit: spike.hit,
                }),
                DynamicObject::Turret(turret) => obs.turret.push(TurretView {
                    id: turret.id,
                    position,
                    health: turret.health.current,
                    team: turret.team.number(),
                    aim: turret.aim,
                    reload: turret.reload,
                }),
                DynamicObject::Projectile(projectile) => {
                    let view = ProjectileView {
                        id: projectile.id,
                        position,
                        direction: projectile.direction,
                        team: projectile.team.number(),
                    };
                    match projectile.kind {
                        ProjectileKind::Arrow => obs.arrow.push(view),
                        ProjectileKind::ChargedArrow => obs.charged_arrow.push(view),
                        ProjectileKind::Bullet => obs.bullet.push(view),
                    }
                }
                DynamicObject::Frag(frag) => obs.frag.push(ProjectileView {
                    id: frag.id,
                    position,
                    direction: frag.direction,
                    team: frag.team.number(),
                }),
                DynamicObject::Explosion(explosion) => obs.explosion.push(AreaView {
                    id: explosion.id,
                    position,
                    radius: Fixed::from_num(tuning.projectiles.explosion.radius),
                    team: explosion.team.number(),
                }),
            }
        }

        for effect in self.effects.values() {
            let Effect::Heal(heal) = effect;
            if visible(heal.position) {
                obs.heal.push(AreaView {
                    id: heal.id,
                    position: heal.position - origin,
                    radius: Fixed::from_num(structures.heal.radius),
                    team: heal.team.number(),
                });
            }
        }

        for other in self.players.values() {
            if other.id == id || !other.is_alive() || !visible(other.position) {
                continue;
            }
            obs.player
                .push(player_view(other, tuning, origin, other.team == me.team));
        }

        Some(obs)
    }
}

/// Category of a render snapshot entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A player.
    Player,
    /// The base.
    Base,
    /// Resource node or wall.
    Static(StaticKind),
    /// Spike trap.
    Spike,
    /// Turret.
    Turret,
    /// Arrow, charged arrow or bullet.
    Projectile(ProjectileKind),
    /// Frag grenade.
    Frag,
    /// Explosion.
    Explosion,
    /// Heal zone.
    Heal,
}

/// Read-only drawing data for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityView {
    /// Category.
    pub kind: EntityKind,
    /// Absolute position.
    pub position: Vec2Fixed,
    /// Health, `None` for things that cannot be damaged.
    #[serde(with = "fixed_serde::option")]
    pub health: Option<Fixed>,
    /// Facing or travel direction.
    pub facing: Vec2Fixed,
    /// Took a hit this tick.
    pub hit: bool,
    /// Owning team.
    pub team: Option<Team>,
}

impl World {
    /// Snapshot of every live entity for drawing and sound placement.
    #[must_use]
    pub fn render_snapshot(&self) -> Vec<EntityView> {
        let mut views = Vec::new();
        for player in self.players.values().filter(|p| p.is_alive()) {
            views.push(EntityView {
                kind: EntityKind::Player,
                position: player.position,
                health: Some(player.health.current),
                facing: player.heading.unit(),
                hit: player.hit,
                team: Some(player.team),
            });
        }
        if self.base.is_alive() {
            views.push(EntityView {
                kind: EntityKind::Base,
                position: self.base.position,
                health: Some(self.base.health.current),
                facing: Vec2Fixed::ZERO,
                hit: self.base.hit,
                team: Some(self.base.team),
            });
        }
        for object in self.statics.values() {
            views.push(EntityView {
                kind: EntityKind::Static(object.kind),
                position: object.position,
                health: Some(object.health.current),
                facing: Vec2Fixed::ZERO,
                hit: object.hit,
                team: object.team,
            });
        }
        for object in self.dynamics.values() {
            let (kind, health, facing, hit) = match object {
                DynamicObject::Spike(s) => (EntityKind::Spike, Some(s.health.current), Vec2Fixed::ZERO, s.hit),
                DynamicObject::Turret(t) => (EntityKind::Turret, Some(t.health.current), t.aim, t.hit),
                DynamicObject::Projectile(p) => (EntityKind::Projectile(p.kind), None, p.direction, false),
                DynamicObject::Frag(f) => (EntityKind::Frag, None, f.direction, false),
                DynamicObject::Explosion(_) => (EntityKind::Explosion, None, Vec2Fixed::ZERO, false),
            };
            views.push(EntityView {
                kind,
                position: object.position(),
                health,
                facing,
                hit,
                team: Some(object.team()),
            });
        }
        for effect in self.effects.values() {
            let Effect::Heal(heal) = effect;
            views.push(EntityView {
                kind: EntityKind::Heal,
                position: heal.position,
                health: None,
                facing: Vec2Fixed::ZERO,
                hit: false,
                team: Some(heal.team),
            });
        }
        views
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_players() -> World {
        let mut world = World::new(Tuning::default(), 2);
        let tuning = world.tuning().clone();
        for (id, team, x, y) in [
            (1, Team::Defender, 900, 900),
            (2, Team::Defender, 950, 900),
            (3, Team::Raider, 1000, 1100),
            (4, Team::Raider, 1500, 1500),
        ] {
            world
                .players
                .insert(id, Player::new(id, team, Vec2Fixed::from_int(x, y), &tuning));
        }
        world
    }

    #[test]
    fn test_observation_window_and_self_exclusion() {
        let world = world_with_players();
        let obs = world.observe(1).unwrap();
        let ids: Vec<_> = obs.player.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(obs.own.position, Vec2Fixed::from_int(900, 900));
        assert_eq!(obs.player[0].position, Vec2Fixed::from_int(50, 0));
        assert_eq!(obs.base.len(), 1);
        assert_eq!(obs.base[0].position, Vec2Fixed::from_int(100, 100));
    }

    #[test]
    fn test_enemy_resources_redacted() {
        let world = world_with_players();
        let obs = world.observe(1).unwrap();
        assert!(obs.own.resources.is_some());
        assert!(obs.player[0].resources.is_some());
        assert!(obs.player[1].resources.is_none());
    }

    #[test]
    fn test_dead_players_hidden() {
        let mut world = world_with_players();
        world.player_mut(2).unwrap().health.current = Fixed::ZERO;
        let obs = world.observe(1).unwrap();
        assert!(obs.player.iter().all(|p| p.id != 2));
        // the dead player still gets its own observation
        assert!(world.observe(2).is_some());
    }

    #[test]
    fn test_resources_categorised() {
        let mut world = world_with_players();
        world
            .spawn_resource(StaticKind::Tree, Vec2Fixed::from_int(800, 900))
            .unwrap();
        world
            .spawn_resource(StaticKind::Bush, Vec2Fixed::from_int(1300, 900))
            .unwrap();
        let obs = world.observe(1).unwrap();
        assert_eq!(obs.tree.len(), 1);
        assert!(obs.bush.is_empty());
        assert_eq!(obs.tree[0].team, None);
    }

    #[test]
    fn test_meta_block() {
        let world = world_with_players();
        let obs = world.observe(3).unwrap();
        assert_eq!(obs.meta.team, 2);
        assert_eq!(obs.meta.team_color, [240, 140, 80]);
        assert_eq!(obs.meta.map_width, 2000);
        assert!(world.observe(99).is_none());
    }

    #[test]
    fn test_render_snapshot_lists_everything_alive() {
        let world = world_with_players();
        let snapshot = world.render_snapshot();
        assert_eq!(
            snapshot.iter().filter(|v| v.kind == EntityKind::Player).count(),
            4
        );
        assert!(snapshot.iter().any(|v| v.kind == EntityKind::Base));
    }
}
