//! Per-tick behaviour of placed structures, the base and heal zones.

use crate::combat::{Hit, HitKind};
use crate::components::EntityId;
use crate::entities::{DynamicObject, Effect, Heal, Projectile, ProjectileKind, Spike, Turret};
use crate::events::CueKind;
use crate::math::{Fixed, Vec2Fixed};
use crate::projectile::aim;
use crate::world::{TargetRef, World};

impl World {
    /// Regenerate the base while it stands.
    pub fn step_base(&mut self) {
        let regen = self.tuning().structures.base.regen;
        let base = &mut self.base;
        if base.is_alive() {
            base.health.current = (base.health.current + regen).min(base.health.max);
        }
    }

    /// Count down and pulse damage at enemies touching the spike.
    pub fn step_spike(&mut self, mut spike: Spike) {
        let stats = self.tuning().structures.spike.clone();
        spike.countdown = spike.countdown.saturating_sub(1);
        if spike.countdown == 0 {
            let reach = Fixed::from_num(self.tuning().player.radius + stats.radius + stats.reach);
            let victims: Vec<_> = self
                .players
                .values()
                .filter(|p| p.is_alive() && p.team != spike.team)
                .filter(|p| p.position.distance_squared(spike.position) < reach * reach)
                .map(|p| p.id)
                .collect();
            let hit = Hit {
                kind: HitKind::Spike,
                origin: spike.position,
                damage: Fixed::from_num(stats.damage),
                attacker: Some(spike.owner),
                team: Some(spike.team),
            };
            for victim in victims {
                self.apply_hit(TargetRef::Player(victim), &hit);
            }
            spike.countdown = stats.cadence;
        }
        self.write_back(spike.id, DynamicObject::Spike(spike));
    }

    /// Track the nearest enemy in range and fire on reload.
    ///
    /// Players are preferred over enemy turrets. With nothing in range the
    /// turret idles and its reload does not advance.
    pub fn step_turret(&mut self, mut turret: Turret) {
        let stats = self.tuning().structures.turret.clone();
        let bullet = self.tuning().projectiles.bullet;
        let range = Fixed::from_num(stats.range);
        let range_sq = range * range;

        let nearest = |candidates: &mut dyn Iterator<Item = Vec2Fixed>| {
            let mut best: Option<(Fixed, Vec2Fixed)> = None;
            for position in candidates {
                let d = position.distance_squared(turret.position);
                if d <= range_sq && best.map_or(true, |(b, _)| d < b) {
                    best = Some((d, position));
                }
            }
            best.map(|(_, position)| position)
        };

        let target = nearest(
            &mut self
                .players
                .values()
                .filter(|p| p.is_alive() && p.team != turret.team)
                .map(|p| p.position),
        )
        .or_else(|| {
            nearest(&mut self.dynamics.values().filter_map(|d| match d {
                DynamicObject::Turret(t) if t.team != turret.team => Some(t.position),
                _ => None,
            }))
        });

        let Some(target) = target else {
            self.write_back(turret.id, DynamicObject::Turret(turret));
            return;
        };

        turret.aim = aim(turret.position, target);
        if turret.reload == 0 {
            let id = self.allocate_id();
            let muzzle = turret.position + turret.aim.scale(Fixed::from_num(stats.muzzle_offset));
            self.add_dynamic(DynamicObject::Projectile(Projectile {
                id,
                kind: ProjectileKind::Bullet,
                position: muzzle,
                direction: turret.aim,
                team: turret.team,
                owner: Some(turret.owner),
                lifetime: bullet.lifetime,
            }));
            self.cue(CueKind::TurretFire, turret.position);
            turret.reload = stats.reload;
        } else {
            turret.reload -= 1;
        }
        self.write_back(turret.id, DynamicObject::Turret(turret));
    }

    /// Pulse healing on cadence and expire after the lifetime.
    pub fn step_heal(&mut self, mut heal: Heal) {
        let stats = self.tuning().structures.heal.clone();
        let cap = Fixed::from_num(self.tuning().player.heal_cap);
        let amount = Fixed::from_num(stats.amount);
        let radius = Fixed::from_num(stats.radius);

        if heal.countdown == 0 {
            let mut credited = Fixed::ZERO;
            for player in self.players.values_mut() {
                if !player.is_alive() || !player.position.within(heal.position, radius) {
                    continue;
                }
                let before = player.health.current;
                let after = (before + amount).min(cap).max(before);
                let gained = after - before;
                player.health.current = after;
                player.events.change_health += gained;
                if player.team == heal.team {
                    credited += gained;
                }
            }
            if let Some(owner) = self.players.get_mut(&heal.owner) {
                owner.events.change_health_team_player += credited;
            }
            heal.countdown = stats.cadence;
        } else {
            heal.countdown -= 1;
        }

        heal.lifetime = heal.lifetime.saturating_sub(1);
        if heal.lifetime == 0 {
            self.remove_effect(heal.id);
        } else {
            self.effects.insert(heal.id, Effect::Heal(heal));
        }
    }

    /// Store a stepped copy, unless something removed the original during
    /// the step.
    fn write_back(&mut self, id: EntityId, object: DynamicObject) {
        if let Some(slot) = self.dynamics.get_mut(&id) {
            *slot = object;
        }
    }
}
