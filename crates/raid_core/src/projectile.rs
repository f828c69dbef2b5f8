//! Sub-stepped motion for fast movers.
//!
//! A projectile's per-tick displacement is split into equal sub-steps and
//! the overlap test runs after each one, so a 45-unit charged arrow cannot
//! skip over a 20-unit wall. Collision candidates are gathered once per
//! tick from the starting position.
//!
//! Step functions take the object by value, mutate the copy, and write it
//! back only if it survives.

use crate::combat::{Hit, HitKind};
use crate::components::Team;
use crate::entities::{DynamicObject, Explosion, Frag, Projectile, ProjectileKind};
use crate::events::CueKind;
use crate::math::{Fixed, Vec2Fixed};
use crate::world::{Collider, ColliderClass, World};

/// Whether a straight projectile fired by `team` stops on this collider.
///
/// Resource nodes stop everything, walls stop enemy shots, spikes never
/// block, and players, turrets and the base are hit only by the other team.
#[must_use]
pub fn stops_projectile(collider: &Collider, team: Team) -> bool {
    match collider.class {
        ColliderClass::Resource => true,
        ColliderClass::Spike => false,
        ColliderClass::Wall
        | ColliderClass::Player
        | ColliderClass::Turret
        | ColliderClass::Base => collider.team != Some(team),
    }
}

/// Whether a frag thrown by `team` detonates on this collider.
///
/// Frags pass over players and friendly buildings.
#[must_use]
pub fn stops_frag(collider: &Collider, team: Team) -> bool {
    match collider.class {
        ColliderClass::Player => false,
        ColliderClass::Resource => true,
        ColliderClass::Wall | ColliderClass::Spike | ColliderClass::Turret | ColliderClass::Base => {
            collider.team != Some(team)
        }
    }
}

impl World {
    /// Advance an arrow, charged arrow or bullet by one tick.
    pub fn step_projectile(&mut self, mut projectile: Projectile) {
        if projectile.lifetime == 0 {
            self.remove_dynamic(projectile.id);
            return;
        }
        projectile.lifetime -= 1;

        let tuning = self.tuning();
        let (stats, hit_kind, impact) = match projectile.kind {
            ProjectileKind::Arrow => (tuning.projectiles.arrow, HitKind::Arrow, CueKind::ArrowImpact),
            ProjectileKind::ChargedArrow => (
                tuning.projectiles.charged_arrow,
                HitKind::Arrow,
                CueKind::ArrowImpact,
            ),
            ProjectileKind::Bullet => {
                (tuning.projectiles.bullet, HitKind::Bullet, CueKind::BulletImpact)
            }
        };
        let tolerance = tuning.player.collision_tolerance;
        let radius = Fixed::from_num(stats.radius);
        let delta = projectile
            .direction
            .scale(Fixed::from_num(stats.speed) / Fixed::from_num(stats.sub_steps));

        let candidates: Vec<Collider> = self
            .colliders_near(projectile.position, 1)
            .into_iter()
            .filter(|c| stops_projectile(c, projectile.team))
            .collect();

        for _ in 0..stats.sub_steps {
            projectile.position += delta;
            if !self.within_bounds(projectile.position) {
                self.remove_dynamic(projectile.id);
                return;
            }
            if let Some(collider) = candidates
                .iter()
                .find(|c| c.overlaps(projectile.position, radius, tolerance))
            {
                let hit = Hit {
                    kind: hit_kind,
                    origin: projectile.position,
                    damage: Fixed::from_num(stats.damage),
                    attacker: projectile.owner,
                    team: Some(projectile.team),
                };
                self.apply_hit(collider.target, &hit);
                self.remove_dynamic(projectile.id);
                self.cue(impact, projectile.position);
                return;
            }
        }

        self.dynamics
            .insert(projectile.id, DynamicObject::Projectile(projectile));
    }

    /// Advance a frag by one tick, detonating it on fuse expiry or impact.
    pub fn step_frag(&mut self, mut frag: Frag) {
        if frag.lifetime == 0 {
            self.detonate(&frag);
            return;
        }
        frag.lifetime -= 1;

        let stats = self.tuning().projectiles.frag;
        let tolerance = self.tuning().player.collision_tolerance;
        let radius = Fixed::from_num(stats.radius);
        let delta = frag
            .direction
            .scale(frag.speed / Fixed::from_num(stats.sub_steps));

        let candidates: Vec<Collider> = self
            .colliders_near(frag.position, 1)
            .into_iter()
            .filter(|c| stops_frag(c, frag.team))
            .collect();

        for _ in 0..stats.sub_steps {
            let next = frag.position + delta;
            if !self.within_bounds(next) {
                frag.speed = Fixed::ZERO;
                break;
            }
            frag.position = next;
            if candidates
                .iter()
                .any(|c| c.overlaps(frag.position, radius, tolerance))
            {
                self.detonate(&frag);
                return;
            }
        }

        frag.speed *= stats.friction;
        self.dynamics.insert(frag.id, DynamicObject::Frag(frag));
    }

    fn detonate(&mut self, frag: &Frag) {
        self.remove_dynamic(frag.id);
        let id = self.allocate_id();
        self.add_dynamic(DynamicObject::Explosion(Explosion {
            id,
            position: frag.position,
            team: frag.team,
            owner: frag.owner,
        }));
        self.cue(CueKind::Explosion, frag.position);
    }

    /// Apply an explosion's damage to everything in its radius, then remove
    /// it. Friendly fire applies.
    pub fn step_explosion(&mut self, explosion: Explosion) {
        let stats = self.tuning().projectiles.explosion;
        let reach = Fixed::from_num(stats.radius);
        let hit = Hit {
            kind: HitKind::Explosion,
            origin: explosion.position,
            damage: Fixed::from_num(stats.damage),
            attacker: explosion.owner,
            team: Some(explosion.team),
        };
        let targets: Vec<_> = self
            .colliders_near(explosion.position, 1)
            .into_iter()
            .filter(|c| explosion.position.within(c.position, c.radius + reach))
            .map(|c| c.target)
            .collect();
        for target in targets {
            self.apply_hit(target, &hit);
        }
        self.remove_dynamic(explosion.id);
    }
}

/// Unit direction from `from` toward `to`, zero if they coincide.
#[must_use]
pub fn aim(from: Vec2Fixed, to: Vec2Fixed) -> Vec2Fixed {
    (to - from).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::PlayerId;
    use crate::entities::StaticKind;
    use crate::player::Player;
    use crate::tuning::Tuning;

    fn arena() -> World {
        World::new(Tuning::default(), 11)
    }

    fn spawn(world: &mut World, id: PlayerId, team: Team, x: i32, y: i32) {
        let player = Player::new(id, team, Vec2Fixed::from_int(x, y), world.tuning());
        world.players.insert(id, player);
    }

    fn arrow(world: &mut World, x: i32, y: i32, team: Team) -> Projectile {
        let id = world.allocate_id();
        let projectile = Projectile {
            id,
            kind: ProjectileKind::Arrow,
            position: Vec2Fixed::from_int(x, y),
            direction: Vec2Fixed::from_int(1, 0),
            team,
            owner: Some(1),
            lifetime: 30,
        };
        world.add_dynamic(DynamicObject::Projectile(projectile));
        projectile
    }

    fn step_all(world: &mut World) {
        let ids: Vec<_> = world.dynamics.keys().copied().collect();
        for id in ids {
            match world.dynamics.get(&id).copied() {
                Some(DynamicObject::Projectile(p)) => world.step_projectile(p),
                Some(DynamicObject::Frag(f)) => world.step_frag(f),
                Some(DynamicObject::Explosion(e)) => world.step_explosion(e),
                _ => {}
            }
        }
    }

    #[test]
    fn test_arrow_flies_and_expires() {
        let mut world = arena();
        let a = arrow(&mut world, 300, 300, Team::Raider);
        step_all(&mut world);
        match world.dynamics[&a.id] {
            DynamicObject::Projectile(p) => {
                assert_eq!(p.position, Vec2Fixed::from_int(325, 300));
                assert_eq!(p.lifetime, 29);
            }
            other => panic!("unexpected {other:?}"),
        }
        for _ in 0..30 {
            step_all(&mut world);
        }
        assert!(world.dynamics.is_empty());
    }

    #[test]
    fn test_arrow_hits_enemy_once() {
        let mut world = arena();
        spawn(&mut world, 1, Team::Raider, 280, 300);
        spawn(&mut world, 2, Team::Defender, 330, 300);
        arrow(&mut world, 300, 300, Team::Raider);
        step_all(&mut world);
        assert!(world.dynamics.is_empty());
        assert_eq!(world.player(2).unwrap().health.current, Fixed::from_num(17));
        assert_eq!(world.events.count(CueKind::ArrowImpact), 1);
    }

    #[test]
    fn test_arrow_passes_teammates_and_friendly_walls() {
        let mut world = arena();
        spawn(&mut world, 2, Team::Raider, 330, 300);
        world
            .spawn_wall(StaticKind::WoodWall, Vec2Fixed::from_int(360, 300), Team::Raider)
            .unwrap();
        let a = arrow(&mut world, 300, 300, Team::Raider);
        step_all(&mut world);
        step_all(&mut world);
        assert!(world.dynamics.contains_key(&a.id));
        assert_eq!(world.player(2).unwrap().health.current, Fixed::from_num(20));
    }

    #[test]
    fn test_sub_steps_catch_thin_targets() {
        let mut world = arena();
        spawn(&mut world, 2, Team::Defender, 318, 300);
        let id = world.allocate_id();
        let charged = Projectile {
            id,
            kind: ProjectileKind::ChargedArrow,
            position: Vec2Fixed::from_int(290, 300),
            direction: Vec2Fixed::from_int(1, 0),
            team: Team::Raider,
            owner: None,
            lifetime: 30,
        };
        world.add_dynamic(DynamicObject::Projectile(charged));
        step_all(&mut world);
        assert_eq!(world.player(2).unwrap().health.current, Fixed::from_num(17));
    }

    #[test]
    fn test_projectile_leaving_map_is_removed() {
        let mut world = arena();
        arrow(&mut world, 1990, 300, Team::Raider);
        step_all(&mut world);
        assert!(world.dynamics.is_empty());
    }

    #[test]
    fn test_frag_detonates_on_wall_then_explodes_next_tick() {
        let mut world = arena();
        let wall = world
            .spawn_wall(StaticKind::WoodWall, Vec2Fixed::from_int(340, 300), Team::Defender)
            .unwrap();
        let id = world.allocate_id();
        world.add_dynamic(DynamicObject::Frag(Frag {
            id,
            position: Vec2Fixed::from_int(300, 300),
            direction: Vec2Fixed::from_int(1, 0),
            speed: Fixed::from_num(15),
            team: Team::Raider,
            owner: None,
            lifetime: 40,
        }));
        step_all(&mut world);
        assert!(!world.dynamics.contains_key(&id));
        assert!(world
            .dynamics
            .values()
            .any(|d| matches!(d, DynamicObject::Explosion(_))));
        assert!(world.statics.contains_key(&wall));

        step_all(&mut world);
        assert!(world.dynamics.is_empty());
        // 8 x 4 against 25 health
        assert!(!world.statics.contains_key(&wall));
    }

    #[test]
    fn test_frag_slows_and_stops_at_edge() {
        let mut world = arena();
        let id = world.allocate_id();
        world.add_dynamic(DynamicObject::Frag(Frag {
            id,
            position: Vec2Fixed::from_int(1990, 300),
            direction: Vec2Fixed::from_int(1, 0),
            speed: Fixed::from_num(15),
            team: Team::Raider,
            owner: None,
            lifetime: 40,
        }));
        step_all(&mut world);
        match world.dynamics[&id] {
            DynamicObject::Frag(f) => {
                assert_eq!(f.speed, Fixed::ZERO);
                assert!(f.position.x <= Fixed::from_num(1999));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_explosion_hurts_thrower_too() {
        let mut world = arena();
        spawn(&mut world, 1, Team::Raider, 300, 300);
        let id = world.allocate_id();
        world.add_dynamic(DynamicObject::Explosion(Explosion {
            id,
            position: Vec2Fixed::from_int(330, 300),
            team: Team::Raider,
            owner: Some(1),
        }));
        step_all(&mut world);
        assert_eq!(world.player(1).unwrap().health.current, Fixed::from_num(12));
        assert!(world.dynamics.is_empty());
    }

    #[test]
    fn test_aim_is_unit() {
        let dir = aim(Vec2Fixed::from_int(0, 0), Vec2Fixed::from_int(0, 10));
        assert_eq!(dir, Vec2Fixed::from_int(0, 1));
    }
}
