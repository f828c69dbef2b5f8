//! Damage application.
//!
//! Every source of damage (melee swings, projectiles, explosions, spikes,
//! the storm) builds a [`Hit`] and hands it to [`World::apply_hit`], which
//! dispatches on the target kind. This is the only place health, kill
//! bounties, harvest yield, salvage and knockback are applied, so each side
//! effect fires exactly once per hit.
//!
//! # Target rules
//!
//! | target | melee | arrow | bullet | explosion |
//! |---|---|---|---|---|
//! | player | damage | damage | damage | damage |
//! | resource node | damage, yields `applied / 3` | absorbed | absorbed | damage x2 |
//! | wall | `+ damage / 3 - damage` | absorbed | chip | damage x4 |
//! | spike | `+ damage / 3 - damage` | - | chip | damage |
//! | turret, base | damage | damage | damage | damage |

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, PlayerId, Resources, Team};
use crate::entities::{DynamicObject, StaticKind};
use crate::events::CueKind;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::world::{TargetRef, World};

/// Source category of a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    /// Sword or hammer swing.
    Melee,
    /// Arrow or charged arrow.
    Arrow,
    /// Turret round.
    Bullet,
    /// Frag blast.
    Explosion,
    /// Spike pulse.
    Spike,
    /// Storm chip damage.
    Zone,
}

/// One application of damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    /// Source category.
    pub kind: HitKind,
    /// Where the hit came from (knockback pushes away from here).
    pub origin: Vec2Fixed,
    /// Base damage before target multipliers.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Player credited with the hit.
    pub attacker: Option<PlayerId>,
    /// Team of the source; `None` for neutral damage, which never knocks
    /// back.
    pub team: Option<Team>,
}

fn floor_third(value: Fixed) -> Fixed {
    (value / Fixed::from_num(3)).floor()
}

impl World {
    /// Apply a hit to a target, returning the health actually removed.
    ///
    /// Missing or already-dead targets take nothing.
    pub fn apply_hit(&mut self, target: TargetRef, hit: &Hit) -> Fixed {
        match target {
            TargetRef::Player(id) => self.hit_player(id, hit),
            TargetRef::Base => self.hit_base(hit),
            TargetRef::Static(id) => self.hit_static(id, hit),
            TargetRef::Dynamic(id) => self.hit_dynamic(id, hit),
        }
    }

    fn hit_player(&mut self, id: PlayerId, hit: &Hit) -> Fixed {
        let tuning = self.tuning().player.clone();
        let Some(victim) = self.players.get_mut(&id) else {
            return Fixed::ZERO;
        };
        if !victim.is_alive() {
            return Fixed::ZERO;
        }

        victim.hit = true;
        let applied = victim.health.apply_damage(hit.damage);
        victim.events.change_health -= applied;

        if hit.team.is_some() {
            let away = victim.position - hit.origin;
            let magnitude = away.length().max(Fixed::ONE / Fixed::from_num(2));
            let shove = away.scale(Fixed::from_num(tuning.knockback_distance) / magnitude);
            victim.position += shove;
            victim.slow_ticks = tuning.slow_ticks;
            victim.knockback = shove;
            victim.knockback_ticks = tuning.knockback_ticks;
        }

        let died = !victim.is_alive();
        let (victim_team, position, loot) = (victim.team, victim.position, victim.resources);
        if died {
            victim.events.died = true;
        }

        self.cue(CueKind::Hurt, position);
        if died {
            self.events.deaths.push(id);
            self.cue(CueKind::Death, position);
            tracing::debug!(player = id, attacker = ?hit.attacker, "Player died");
        }

        let Some(attacker_id) = hit.attacker.filter(|&a| a != id) else {
            return applied;
        };
        let Some(attacker) = self.players.get_mut(&attacker_id) else {
            return applied;
        };
        if attacker.team == victim_team {
            attacker.events.change_health_team_player -= applied;
            return applied;
        }
        attacker.events.change_health_enemy_player -= applied;
        if died {
            attacker.events.killed_enemy_player += 1;
            attacker.kills += 1;
            let bounty = Resources::new(
                tuning.kill_bonus + loot.food / tuning.kill_share,
                tuning.kill_bonus + loot.wood / tuning.kill_share,
                tuning.kill_bonus + loot.stone / tuning.kill_share,
            );
            self.grant(attacker_id, bounty);
        }
        applied
    }

    fn hit_base(&mut self, hit: &Hit) -> Fixed {
        let base = &mut self.base;
        if !base.is_alive() {
            return Fixed::ZERO;
        }
        if hit.kind == HitKind::Melee && hit.team == Some(base.team) {
            return Fixed::ZERO;
        }

        base.hit = true;
        let applied = base.health.apply_damage(hit.damage);
        let (owner, position, destroyed) = (base.team, base.position, !base.is_alive());

        if let Some(attacker) = hit.attacker.and_then(|a| self.players.get_mut(&a)) {
            if attacker.team == owner {
                attacker.events.self_damage_dealt_base -= applied;
            } else {
                attacker.events.self_damage_dealt_base += applied;
            }
        }
        for player in self.players.values_mut() {
            if player.team == owner {
                player.events.damage_dealt_base -= applied;
            } else {
                player.events.damage_dealt_base += applied;
            }
        }

        self.cue(CueKind::BaseHit, position);
        if destroyed {
            self.cue(CueKind::BaseDestroyed, position);
            tracing::info!(tick = self.tick, "Base destroyed");
        }
        applied
    }

    fn hit_static(&mut self, id: EntityId, hit: &Hit) -> Fixed {
        let explosion = self.tuning().projectiles.explosion;
        let chip = Fixed::from_num(self.tuning().projectiles.wall_chip);
        let Some(object) = self.statics.get_mut(&id) else {
            return Fixed::ZERO;
        };
        let resource = object.kind.is_resource();
        let applied = match (resource, hit.kind) {
            (true, HitKind::Melee) => object.health.apply_damage(hit.damage),
            (true, HitKind::Explosion) => object
                .health
                .apply_damage(hit.damage * Fixed::from_num(explosion.resource_multiplier)),
            (false, HitKind::Melee) => -object.health.adjust(floor_third(hit.damage) - hit.damage),
            (false, HitKind::Explosion) => object
                .health
                .apply_damage(hit.damage * Fixed::from_num(explosion.wall_multiplier)),
            (false, HitKind::Bullet) => object.health.apply_damage(chip),
            _ => Fixed::ZERO,
        };
        object.hit = true;
        let (kind, team, position, destroyed) =
            (object.kind, object.team, object.position, object.health.is_dead());

        if resource {
            if let Some(stats) = kind.resource_stats(self.tuning()) {
                if let Some(object) = self.statics.get_mut(&id) {
                    object.shrink(stats);
                }
            }
            if applied > Fixed::ZERO {
                self.cue(CueKind::ResourceHit, position);
            }
            if let (HitKind::Melee, Some(attacker)) = (hit.kind, hit.attacker) {
                let amount = floor_third(applied).to_num::<u32>();
                let gain = match kind {
                    StaticKind::Bush => Resources::new(amount, 0, 0),
                    StaticKind::Tree => Resources::new(0, amount, 0),
                    _ => Resources::new(0, 0, amount),
                };
                self.grant(attacker, gain);
            }
        } else {
            if applied > Fixed::ZERO {
                self.cue(CueKind::StructureHit, position);
            }
            if let Some(owner) = team {
                self.credit_structure_damage(hit.attacker, owner, applied);
            }
        }

        if destroyed {
            self.remove_static(id);
            self.events.destroyed.push(id);
            self.cue(CueKind::StructureDestroyed, position);
            tracing::debug!(id, ?kind, "Static object destroyed");
            if let (HitKind::Melee, Some(attacker), false) = (hit.kind, hit.attacker, resource) {
                let structures = &self.tuning().structures;
                let salvage = if kind == StaticKind::StoneWall {
                    structures.stone_wall.salvage
                } else {
                    structures.wood_wall.salvage
                };
                self.grant(attacker, salvage);
            }
        }
        applied
    }

    fn hit_dynamic(&mut self, id: EntityId, hit: &Hit) -> Fixed {
        let chip = Fixed::from_num(self.tuning().projectiles.wall_chip);
        let spike_salvage = self.tuning().structures.spike.salvage;
        let turret_salvage = self.tuning().structures.turret.salvage;

        let (applied, team, position, destroyed, salvage) = match self.dynamics.get_mut(&id) {
            Some(DynamicObject::Spike(spike)) => {
                let applied = match hit.kind {
                    HitKind::Melee => -spike.health.adjust(floor_third(hit.damage) - hit.damage),
                    HitKind::Explosion => spike.health.apply_damage(hit.damage),
                    HitKind::Bullet => spike.health.apply_damage(chip),
                    _ => Fixed::ZERO,
                };
                spike.hit = true;
                (applied, spike.team, spike.position, spike.health.is_dead(), spike_salvage)
            }
            Some(DynamicObject::Turret(turret)) => {
                let applied = turret.health.apply_damage(hit.damage);
                turret.hit = true;
                (applied, turret.team, turret.position, turret.health.is_dead(), turret_salvage)
            }
            _ => return Fixed::ZERO,
        };

        if applied > Fixed::ZERO {
            self.cue(CueKind::StructureHit, position);
        }
        self.credit_structure_damage(hit.attacker, team, applied);

        if destroyed {
            self.remove_dynamic(id);
            self.events.destroyed.push(id);
            self.cue(CueKind::StructureDestroyed, position);
            tracing::debug!(id, ?team, "Structure destroyed");
            if let (HitKind::Melee, Some(attacker)) = (hit.kind, hit.attacker) {
                self.grant(attacker, salvage);
            }
        }
        applied
    }

    fn credit_structure_damage(&mut self, attacker: Option<PlayerId>, owner: Team, applied: Fixed) {
        let Some(attacker) = attacker.and_then(|a| self.players.get_mut(&a)) else {
            return;
        };
        if attacker.team == owner {
            attacker.events.damage_dealt_team_structure += applied;
        } else {
            attacker.events.damage_dealt_enemy_structure += applied;
        }
    }
}
