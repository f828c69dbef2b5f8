//! Test fixtures and helpers.
//!
//! Hand-built arenas with exact layouts, plus scripted action streams
//! that exercise every tool without needing a bot.

use fixed::types::I32F32;
use raid_core::action::{ActionMap, PlayerAction};
use raid_core::components::{PlayerId, Team, Tool};
use raid_core::math::Vec2Fixed;
use raid_core::player::Player;
use raid_core::simulation::Simulation;
use raid_core::tuning::Tuning;
use raid_core::world::World;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a position from integer coordinates.
#[must_use]
pub fn pos(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_int(x, y)
}

/// World with default tuning, the base at the centre and nothing else.
#[must_use]
pub fn empty_world(seed: u64) -> World {
    World::new(Tuning::default(), seed)
}

/// Put a fresh player with the team kit at an exact position.
pub fn place_player(world: &mut World, id: PlayerId, team: Team, x: i32, y: i32) {
    let player = Player::new(id, team, pos(x, y), world.tuning());
    world.players.insert(id, player);
}

/// A duel in an empty arena: defender 1 and raider 2 facing each other
/// east of the base.
#[must_use]
pub fn duel() -> Simulation {
    let mut world = empty_world(1);
    place_player(&mut world, 1, Team::Defender, 1300, 1000);
    place_player(&mut world, 2, Team::Raider, 1330, 1000);
    Simulation::from_world(world, 1)
}

/// A reset match with deposits and `per_team` players on each side.
///
/// Even ids defend, odd ids raid.
///
/// # Panics
///
/// Panics if the default tuning is rejected.
#[must_use]
pub fn populated_match(seed: u64, per_team: u32) -> Simulation {
    let mut sim = Simulation::new(Tuning::default(), seed).expect("default tuning is valid");
    for id in 0..per_team * 2 {
        let team = if id % 2 == 0 {
            Team::Defender
        } else {
            Team::Raider
        };
        sim.add_player(id, team).expect("fresh ids");
    }
    sim.reset();
    sim
}

/// Deterministic pseudo-random action map for every rostered player.
///
/// Cycles through all tools, movement directions and turn bins so long
/// runs hit placements, projectiles and melee.
#[must_use]
pub fn scripted_actions(sim: &Simulation, tick: u64) -> ActionMap {
    sim.roster()
        .keys()
        .map(|&id| {
            let mut h = (u64::from(id) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ tick;
            h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
            let bins = [
                (h >> 8) % 3,
                (h >> 16) % 3,
                if (h >> 24) % 8 == 0 { (h >> 28) % 10 } else { 0 },
                (h >> 36) % 2,
                (h >> 40) % 5,
            ];
            let action = PlayerAction {
                move_x: bins[0] as u8,
                move_y: bins[1] as u8,
                tool: bins[2] as u8,
                trigger: bins[3] as u8,
                turn: bins[4] as u8,
            };
            (id, action)
        })
        .collect()
}

/// Every player holds `tool` with the trigger pressed, standing still.
#[must_use]
pub fn all_using(sim: &Simulation, tool: Tool) -> ActionMap {
    sim.roster()
        .keys()
        .map(|&id| (id, PlayerAction::idle().with_tool(tool).with_trigger(true)))
        .collect()
}
