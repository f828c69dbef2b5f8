//! Scripted controllers for players the runner drives itself.
//!
//! Policies are deterministic: each owns a [`MatchRng`] seeded from the
//! match seed and the player id, so a scripted match replays exactly.

use raid_core::action::PlayerAction;
use raid_core::components::{PlayerId, Team, Tool};
use raid_core::math::Fixed;
use raid_core::rng::MatchRng;
use raid_core::world::World;
use serde::{Deserialize, Serialize};

/// Closer than this on an axis counts as aligned.
const AXIS_DEADZONE: i32 = 4;

/// Reach at which a rushing player starts swinging, beyond both radii.
const SWING_REACH: i32 = 20;

/// Which scripted behaviour drives a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Never moves or acts.
    #[default]
    Idle,
    /// Uniformly random bins, switching tools now and then.
    Random,
    /// Walks at the nearest objective and swings the sword at it. Raiders
    /// go for the base while it stands.
    Rush,
    /// Driven over the protocol; the runner idles it.
    External,
}

/// A scripted controller for one player.
#[derive(Debug, Clone)]
pub struct Policy {
    kind: PolicyKind,
    rng: MatchRng,
}

impl Policy {
    /// Create a policy for `player` in a match seeded with `seed`.
    #[must_use]
    pub fn new(kind: PolicyKind, seed: u64, player: PlayerId) -> Self {
        let salt = u64::from(player).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self {
            kind,
            rng: MatchRng::new(seed ^ salt),
        }
    }

    /// Behaviour of this policy.
    #[must_use]
    pub const fn kind(&self) -> PolicyKind {
        self.kind
    }

    /// Choose this tick's action for `player`.
    pub fn act(&mut self, world: &World, player: PlayerId) -> PlayerAction {
        match self.kind {
            PolicyKind::Idle | PolicyKind::External => PlayerAction::idle(),
            PolicyKind::Random => self.random_action(),
            PolicyKind::Rush => rush_action(world, player),
        }
    }

    fn random_action(&mut self) -> PlayerAction {
        let mut bin = |max: i32| u8::try_from(self.rng.range_inclusive(0, max)).unwrap_or(0);
        let move_x = bin(2);
        let move_y = bin(2);
        let switch = bin(7) == 0;
        let tool = if switch { bin(8) + 1 } else { 0 };
        let trigger = bin(1);
        let turn = bin(4);
        PlayerAction {
            move_x,
            move_y,
            tool,
            trigger,
            turn,
        }
    }
}

fn rush_action(world: &World, id: PlayerId) -> PlayerAction {
    let Some(me) = world.player(id).filter(|p| p.is_alive()) else {
        return PlayerAction::idle();
    };

    let base_standing = world.base.health.current > Fixed::ZERO;
    let target = if me.team == Team::Raider && base_standing {
        Some((world.base.position, world.base.radius))
    } else {
        let radius = Fixed::from_num(world.tuning().player.radius);
        world
            .players
            .values()
            .filter(|p| p.team != me.team && p.is_alive())
            .min_by_key(|p| (p.position.distance_squared(me.position), p.id))
            .map(|p| (p.position, radius))
    };
    let Some((goal, goal_radius)) = target else {
        return PlayerAction::idle();
    };

    let delta = goal - me.position;
    let axis = |d: Fixed| -> i8 {
        let d: i32 = d.to_num();
        if d > AXIS_DEADZONE {
            1
        } else if d < -AXIS_DEADZONE {
            -1
        } else {
            0
        }
    };

    let facing = me.heading.unit();
    let cross = facing.x * delta.y - facing.y * delta.x;
    let ahead = facing.dot(delta) > Fixed::ZERO;
    let turn = match (ahead, cross > Fixed::ZERO) {
        (false, true) => 4,
        (false, false) => 0,
        (true, _) if cross.abs() < delta.length() / 8 => 2,
        (true, true) => 3,
        (true, false) => 1,
    };

    let own_radius = Fixed::from_num(world.tuning().player.radius);
    let reach = own_radius + goal_radius + Fixed::from_num(SWING_REACH);
    let in_reach = me.position.within(goal, reach);

    let mut action = PlayerAction::idle()
        .with_move(axis(delta.x), axis(delta.y))
        .with_turn(turn)
        .with_trigger(in_reach && ahead);
    if me.tool != Tool::Sword {
        action = action.with_tool(Tool::Sword);
    }
    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use raid_core::tuning::Tuning;
    use raid_test_utils::fixtures::{empty_world, place_player};

    #[test]
    fn test_idle_policy() {
        let world = World::new(Tuning::default(), 1);
        let mut policy = Policy::new(PolicyKind::Idle, 1, 1);
        assert_eq!(policy.act(&world, 1), PlayerAction::idle());
    }

    #[test]
    fn test_random_policy_is_valid_and_seeded() {
        let world = World::new(Tuning::default(), 1);
        let mut a = Policy::new(PolicyKind::Random, 77, 3);
        let mut b = Policy::new(PolicyKind::Random, 77, 3);
        let mut c = Policy::new(PolicyKind::Random, 77, 4);
        let mut differs = false;
        for _ in 0..200 {
            let action = a.act(&world, 3);
            action.validate(3).unwrap();
            assert_eq!(action, b.act(&world, 3));
            differs |= action != c.act(&world, 4);
        }
        assert!(differs);
    }

    #[test]
    fn test_rush_heads_for_base() {
        let mut world = empty_world(5);
        place_player(&mut world, 2, Team::Raider, 1400, 1000);
        let mut policy = Policy::new(PolicyKind::Rush, 5, 2);
        let action = policy.act(&world, 2);
        assert_eq!(action.dx(), -1);
        assert_eq!(action.dy(), 0);
        // already holding the sword
        assert_eq!(action.selected_tool(), None);
        assert!(!action.trigger_held());
    }

    #[test]
    fn test_rush_switches_to_sword_and_swings() {
        let mut world = empty_world(5);
        place_player(&mut world, 2, Team::Raider, 1070, 1000);
        world.player_mut(2).unwrap().tool = Tool::Bow;
        world.player_mut(2).unwrap().heading = raid_core::math::Heading::from_step(32);
        let mut policy = Policy::new(PolicyKind::Rush, 5, 2);
        let action = policy.act(&world, 2);
        assert_eq!(action.selected_tool(), Some(Tool::Sword));
        assert!(action.trigger_held());
        assert_eq!(action.turn_steps(), 0);
    }

    #[test]
    fn test_rush_defender_chases_nearest_raider() {
        let mut world = empty_world(5);
        place_player(&mut world, 1, Team::Defender, 1000, 800);
        place_player(&mut world, 2, Team::Raider, 1000, 300);
        place_player(&mut world, 4, Team::Raider, 1600, 1600);
        let mut policy = Policy::new(PolicyKind::Rush, 5, 1);
        let action = policy.act(&world, 1);
        assert_eq!(action.dx(), 0);
        assert_eq!(action.dy(), -1);
    }

    #[test]
    fn test_rush_without_target_idles() {
        let mut world = empty_world(5);
        place_player(&mut world, 1, Team::Defender, 1000, 800);
        let mut policy = Policy::new(PolicyKind::Rush, 5, 1);
        assert_eq!(policy.act(&world, 1), PlayerAction::idle());
    }
}
