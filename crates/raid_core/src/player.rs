//! Player state and the per-tick action controller.
//!
//! Each tick a living player with an action runs, in order:
//!
//! 1. tool switch (slot 9 remembers the slot to return to)
//! 2. heading rotation
//! 3. trigger handling: start an attack, place a structure or drop a heal
//! 4. movement, collision separation and edge push-back
//! 5. attack timer advance, hitting or firing during the strike window
//!
//! Refusals (cannot afford, blocked placement, attack already running) are
//! silent and leave the player unchanged.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::action::PlayerAction;
use crate::combat::{Hit, HitKind};
use crate::components::{Health, PlayerEvents, PlayerId, Resources, Team, Tool};
use crate::entities::{
    DynamicObject, Effect, Frag, Heal, Projectile, ProjectileKind, Spike, StaticKind, Turret,
};
use crate::events::CueKind;
use crate::math::{Fixed, Heading, Vec2Fixed};
use crate::tuning::Tuning;
use crate::world::{ColliderClass, TargetRef, World};

/// An attack activation in progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackTimer {
    /// Weapon that started it.
    pub tool: Tool,
    /// Ticks left; counts down from the schedule total.
    pub remaining: u32,
    /// Targets already struck by this activation.
    pub hit_targets: BTreeSet<TargetRef>,
}

/// A combatant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Roster id.
    pub id: PlayerId,
    /// Team.
    pub team: Team,
    /// Centre.
    pub position: Vec2Fixed,
    /// Facing.
    pub heading: Heading,
    /// Health; the player stays on the roster at zero.
    pub health: Health,
    /// Food, wood and stone.
    pub resources: Resources,
    /// Active tool.
    pub tool: Tool,
    /// Slot to return to after a heal.
    pub last_tool: Tool,
    /// Running attack, if any.
    pub attack: Option<AttackTimer>,
    /// Consecutive ticks the trigger has been held.
    pub consec_held: u32,
    /// Swallow the next trigger (set after a heal).
    pub buffer: bool,
    /// Ticks of reduced speed left.
    pub slow_ticks: u32,
    /// Displacement added each tick while knocked back.
    pub knockback: Vec2Fixed,
    /// Ticks of knockback left.
    pub knockback_ticks: u32,
    /// Enemy players killed this match.
    pub kills: u32,
    /// This tick's tally.
    pub events: PlayerEvents,
    /// Set when the player took a hit this tick.
    pub hit: bool,
}

impl Player {
    /// A fresh player with the team's starting kit.
    #[must_use]
    pub fn new(id: PlayerId, team: Team, position: Vec2Fixed, tuning: &Tuning) -> Self {
        Self {
            id,
            team,
            position,
            heading: Heading::default(),
            health: Health::new(tuning.player.health),
            resources: tuning.kit(team).resources,
            tool: Tool::Sword,
            last_tool: Tool::Sword,
            attack: None,
            consec_held: 0,
            buffer: false,
            slow_ticks: 0,
            knockback: Vec2Fixed::ZERO,
            knockback_ticks: 0,
            kills: 0,
            events: PlayerEvents::default(),
            hit: false,
        }
    }

    /// Whether the player is still fighting.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    /// -1 with no attack, 1 during the strike window, 0 otherwise.
    #[must_use]
    pub fn attack_state(&self, tuning: &Tuning) -> i8 {
        match &self.attack {
            None => -1,
            Some(timer) => {
                let frames = tuning.weapons.stats(timer.tool).frames;
                i8::from(frames.is_live(timer.remaining))
            }
        }
    }

    fn spend(&mut self, cost: &Resources) -> bool {
        if !self.resources.try_spend(cost) {
            return false;
        }
        self.events.change_food -= i64::from(cost.food);
        self.events.change_wood -= i64::from(cost.wood);
        self.events.change_stone -= i64::from(cost.stone);
        true
    }
}

/// Distance ahead of a player's centre where an object of `object_radius`
/// is spawned.
fn spawn_offset(tuning: &Tuning, object_radius: u32) -> Fixed {
    let seven_fifths = Fixed::from_num(7) / Fixed::from_num(5);
    Fixed::from_num(tuning.player.radius)
        + seven_fifths * Fixed::from_num(object_radius)
        + Fixed::from_num(10)
}

impl World {
    /// Run one tick of a player's action. Dead or unknown players are
    /// skipped.
    pub fn step_player(&mut self, id: PlayerId, action: &PlayerAction) {
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if !player.is_alive() {
            return;
        }

        if let Some(tool) = action.selected_tool() {
            if tool == Tool::Heal && player.tool != Tool::Heal {
                player.last_tool = player.tool;
            }
            player.tool = tool;
        }
        player.heading = player.heading.rotate(action.turn_steps());

        let mut trigger = action.trigger_held();
        if player.buffer {
            trigger = false;
            player.buffer = false;
        }
        if trigger {
            player.consec_held += 1;
            self.use_tool(id);
        } else {
            player.consec_held = 0;
        }

        self.move_player(id, action.dx(), action.dy());
        self.advance_attack(id);
    }

    fn use_tool(&mut self, id: PlayerId) {
        let costs = self.tuning().costs.clone();
        let weapons = self.tuning().weapons;
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        let tool = player.tool;
        match tool {
            Tool::Sword | Tool::Hammer | Tool::Bow | Tool::Frag => {
                if player.attack.is_some() {
                    return;
                }
                let paid = match tool {
                    Tool::Bow => player.spend(&costs.arrow),
                    Tool::Frag => player.spend(&costs.frag),
                    _ => true,
                };
                if paid {
                    player.attack = Some(AttackTimer {
                        tool,
                        remaining: weapons.stats(tool).frames.total,
                        hit_targets: BTreeSet::new(),
                    });
                }
            }
            Tool::WoodWall => self.place(id, tool, &costs.wood_wall),
            Tool::StoneWall => self.place(id, tool, &costs.stone_wall),
            Tool::Spike => self.place(id, tool, &costs.spike),
            Tool::Turret => self.place(id, tool, &costs.turret),
            Tool::Heal => self.drop_heal(id, &costs.heal),
        }
    }

    fn place(&mut self, id: PlayerId, tool: Tool, cost: &Resources) {
        let Some(player) = self.players.get(&id) else {
            return;
        };
        if !player.resources.covers(cost) {
            return;
        }
        let structures = &self.tuning().structures;
        let radius = match tool {
            Tool::WoodWall => structures.wood_wall.radius,
            Tool::StoneWall => structures.stone_wall.radius,
            Tool::Spike => structures.spike.radius,
            _ => structures.turret.radius,
        };
        let team = player.team;
        let spot =
            player.position + player.heading.unit().scale(spawn_offset(self.tuning(), radius));
        if !self.within_bounds(spot) || self.blocked_for_placement(spot, Fixed::from_num(radius)) {
            return;
        }

        let placed = match tool {
            Tool::WoodWall => self.spawn_wall(StaticKind::WoodWall, spot, team).is_some(),
            Tool::StoneWall => self.spawn_wall(StaticKind::StoneWall, spot, team).is_some(),
            Tool::Spike => {
                let spike_id = self.allocate_id();
                let stats = &self.tuning().structures.spike;
                let spike = Spike {
                    id: spike_id,
                    position: spot,
                    team,
                    owner: id,
                    health: Health::new(stats.health),
                    // primed: the first step pulses
                    countdown: 0,
                    hit: false,
                };
                self.add_dynamic(DynamicObject::Spike(spike));
                true
            }
            _ => {
                let turret_id = self.allocate_id();
                let stats = &self.tuning().structures.turret;
                let turret = Turret {
                    id: turret_id,
                    position: spot,
                    team,
                    owner: id,
                    health: Health::new(stats.health),
                    reload: stats.first_shot,
                    aim: Vec2Fixed::ZERO,
                    hit: false,
                };
                self.add_dynamic(DynamicObject::Turret(turret));
                true
            }
        };

        if placed {
            if let Some(player) = self.players.get_mut(&id) {
                player.spend(cost);
            }
            self.cue(CueKind::Placement, spot);
            tracing::debug!(player = id, ?tool, "Structure placed");
        }
    }

    fn drop_heal(&mut self, id: PlayerId, cost: &Resources) {
        let stats = self.tuning().structures.heal.clone();
        let player_radius = Fixed::from_num(self.tuning().player.radius);
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if !player.spend(cost) {
            return;
        }
        let seven_fifths = Fixed::from_num(7) / Fixed::from_num(5);
        let offset = (player_radius + seven_fifths * Fixed::from_num(stats.radius)) / Fixed::from_num(2);
        let spot = player.position + player.heading.unit().scale(offset);
        let team = player.team;
        player.tool = player.last_tool;
        player.buffer = true;

        let heal_id = self.allocate_id();
        self.add_effect(Effect::Heal(Heal {
            id: heal_id,
            position: spot,
            owner: id,
            team,
            countdown: 0,
            lifetime: stats.lifetime,
        }));
        self.cue(CueKind::Placement, spot);
    }

    fn move_player(&mut self, id: PlayerId, dx: i32, dy: i32) {
        let tuning = self.tuning();
        let player_radius = Fixed::from_num(tuning.player.radius);
        let tolerance = tuning.player.collision_tolerance;
        let force = Fixed::from_num(tuning.player.separation_force);
        let margin = Fixed::from_num(tuning.map.edge_margin);
        let push = Fixed::from_num(tuning.map.edge_push);
        let max_x = Fixed::from_num(tuning.map.width) - margin - Fixed::ONE;
        let max_y = Fixed::from_num(tuning.map.height) - margin - Fixed::ONE;
        let (speed, slowed) = (tuning.player.speed, tuning.player.slowed_speed);

        let Some(player) = self.players.get(&id) else {
            return;
        };
        let speed = Fixed::from_num(if player.slow_ticks > 0 { slowed } else { speed });
        let mut position = player.position
            + player.knockback
            + Vec2Fixed::new(Fixed::from_num(dx) * speed, Fixed::from_num(dy) * speed);

        let min_distance = Fixed::ONE / Fixed::from_num(10);
        for collider in self.colliders_near(position, 1) {
            if collider.target == TargetRef::Player(id) || collider.class == ColliderClass::Base {
                continue;
            }
            if !collider.overlaps(position, player_radius, tolerance) {
                continue;
            }
            let distance = position.distance(collider.position).max(min_distance);
            let radius_sq = collider.radius * collider.radius;
            let falloff = (radius_sq / (distance * distance)).min(Fixed::ONE);
            let factor = force / distance * falloff;
            position += (position - collider.position).scale(factor);
        }

        if position.x < margin {
            position.x += push;
        } else if position.x > max_x {
            position.x -= push;
        }
        if position.y < margin {
            position.y += push;
        } else if position.y > max_y {
            position.y -= push;
        }

        if let Some(player) = self.players.get_mut(&id) {
            player.position = position;
            player.slow_ticks = player.slow_ticks.saturating_sub(1);
            if player.knockback_ticks > 0 {
                player.knockback_ticks -= 1;
            } else {
                player.knockback = Vec2Fixed::ZERO;
            }
        }
    }

    fn advance_attack(&mut self, id: PlayerId) {
        let weapons = self.tuning().weapons;
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        let Some(timer) = player.attack.as_mut() else {
            return;
        };
        if timer.remaining == 0 {
            player.attack = None;
            return;
        }
        timer.remaining -= 1;
        let frames = weapons.stats(timer.tool).frames;
        if frames.is_live(timer.remaining) {
            let first_frame = timer.remaining == frames.strike_start;
            let tool = timer.tool;
            self.strike(id, tool, first_frame);
        } else {
            timer.hit_targets.clear();
        }
    }

    /// One live tick of an attack: melee scan or projectile launch.
    fn strike(&mut self, id: PlayerId, tool: Tool, first_frame: bool) {
        let Some(player) = self.players.get(&id) else {
            return;
        };
        let position = player.position;
        let facing = player.heading.unit();
        let (team, consec_held, wood) = (player.team, player.consec_held, player.resources.wood);

        match tool {
            Tool::Bow if first_frame => {
                let tuning = self.tuning();
                let charged = consec_held >= tuning.player.charge_threshold
                    && wood >= tuning.player.charged_arrow_wood;
                let (kind, stats) = if charged {
                    (ProjectileKind::ChargedArrow, tuning.projectiles.charged_arrow)
                } else {
                    (ProjectileKind::Arrow, tuning.projectiles.arrow)
                };
                if charged {
                    let extra = Resources::new(0, tuning.player.charged_arrow_wood, 0);
                    if let Some(player) = self.players.get_mut(&id) {
                        player.spend(&extra);
                    }
                }
                let spot = position + facing.scale(spawn_offset(self.tuning(), stats.radius));
                let arrow_id = self.allocate_id();
                self.add_dynamic(DynamicObject::Projectile(Projectile {
                    id: arrow_id,
                    kind,
                    position: spot,
                    direction: facing,
                    team,
                    owner: Some(id),
                    lifetime: stats.lifetime,
                }));
                self.cue(CueKind::BowShot, position);
            }
            Tool::Frag if first_frame => {
                let stats = self.tuning().projectiles.frag;
                let spot = position + facing.scale(spawn_offset(self.tuning(), stats.radius));
                let frag_id = self.allocate_id();
                self.add_dynamic(DynamicObject::Frag(Frag {
                    id: frag_id,
                    position: spot,
                    direction: facing,
                    speed: Fixed::from_num(stats.speed),
                    team,
                    owner: Some(id),
                    lifetime: stats.lifetime,
                }));
                self.cue(CueKind::FragThrow, position);
            }
            Tool::Sword | Tool::Hammer => {
                if first_frame {
                    self.cue(CueKind::Swing, position);
                }
                self.melee(id, tool, position, facing, team);
            }
            _ => {}
        }
    }

    fn melee(&mut self, id: PlayerId, tool: Tool, position: Vec2Fixed, facing: Vec2Fixed, team: Team) {
        let tuning = self.tuning();
        let reach = Fixed::from_num(tuning.player.attack_radius);
        let step = Fixed::from_num(tuning.player.radius);
        let base_damage = Fixed::from_num(tuning.weapons.stats(tool).damage);
        let (resource_bonus, wall_bonus) = if tool == Tool::Hammer {
            (tuning.player.hammer_resource_bonus, tuning.player.hammer_wall_bonus)
        } else {
            (Fixed::ONE, Fixed::ONE)
        };
        let points: Vec<Vec2Fixed> = (1..=3)
            .map(|k| position + facing.scale(step * Fixed::from_num(k)))
            .collect();

        let already_hit = self
            .players
            .get(&id)
            .and_then(|p| p.attack.as_ref())
            .map(|timer| timer.hit_targets.clone())
            .unwrap_or_default();

        let mut struck = Vec::new();
        for collider in self.colliders_near(position, 1) {
            if collider.target == TargetRef::Player(id) || already_hit.contains(&collider.target) {
                continue;
            }
            // teammates and own-team buildings are never melee candidates
            if collider.team == Some(team)
                && (collider.class == ColliderClass::Player || collider.class.is_structure())
            {
                continue;
            }
            let range = collider.radius + reach;
            if points.iter().any(|p| p.within(collider.position, range)) {
                let multiplier = match collider.class {
                    ColliderClass::Resource => resource_bonus,
                    ColliderClass::Wall | ColliderClass::Spike => wall_bonus,
                    _ => Fixed::ONE,
                };
                struck.push((collider.target, base_damage * multiplier));
            }
        }

        for (target, damage) in struck {
            if let Some(timer) = self.players.get_mut(&id).and_then(|p| p.attack.as_mut()) {
                timer.hit_targets.insert(target);
            }
            self.apply_hit(
                target,
                &Hit {
                    kind: HitKind::Melee,
                    origin: position,
                    damage,
                    attacker: Some(id),
                    team: Some(team),
                },
            );
        }
    }
}
