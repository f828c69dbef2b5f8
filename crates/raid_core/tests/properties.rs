//! Property tests over arbitrary action streams.

use proptest::prelude::*;
use raid_core::grid::SpatialGrid;
use raid_core::prelude::*;
use raid_test_utils::fixtures::populated_match;
use raid_test_utils::strategies::{arb_action_stream, arb_any_position, arb_seed};

fn run(seed: u64, stream: &[ActionMap]) -> Simulation {
    let mut sim = populated_match(seed, 2);
    for actions in stream {
        if sim.is_done() {
            break;
        }
        sim.step(actions).expect("generated actions are valid");
    }
    sim
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_same_inputs_same_trajectory(
        seed in arb_seed(),
        stream in arb_action_stream(vec![0, 1, 2, 3], 120),
    ) {
        let a = run(seed, &stream);
        let b = run(seed, &stream);
        prop_assert_eq!(a.state_hash(), b.state_hash());
        prop_assert_eq!(a.world().tick, b.world().tick);
    }

    #[test]
    fn prop_health_never_negative(
        seed in arb_seed(),
        stream in arb_action_stream(vec![0, 1, 2, 3], 200),
    ) {
        let mut sim = populated_match(seed, 2);
        for actions in &stream {
            if sim.is_done() {
                break;
            }
            sim.step(actions).expect("generated actions are valid");
            let world = sim.world();
            for player in world.players.values() {
                prop_assert!(player.health.current >= Fixed::ZERO);
            }
            for object in world.statics.values() {
                prop_assert!(object.health.current > Fixed::ZERO);
            }
            for object in world.dynamics.values() {
                match object {
                    DynamicObject::Spike(s) => prop_assert!(s.health.current > Fixed::ZERO),
                    DynamicObject::Turret(t) => prop_assert!(t.health.current > Fixed::ZERO),
                    _ => {}
                }
            }
            prop_assert!(world.base.health.current >= Fixed::ZERO);
        }
    }

    #[test]
    fn prop_resource_changes_match_counters(
        seed in arb_seed(),
        stream in arb_action_stream(vec![0, 1, 2, 3], 150),
    ) {
        let mut sim = populated_match(seed, 2);
        for actions in &stream {
            if sim.is_done() {
                break;
            }
            let before: Vec<Resources> =
                sim.world().players.values().map(|p| p.resources).collect();
            sim.step(actions).expect("generated actions are valid");
            for (player, old) in sim.world().players.values().zip(before) {
                let events = player.events;
                prop_assert_eq!(i64::from(old.food) + events.change_food, i64::from(player.resources.food));
                prop_assert_eq!(i64::from(old.wood) + events.change_wood, i64::from(player.resources.wood));
                prop_assert_eq!(i64::from(old.stone) + events.change_stone, i64::from(player.resources.stone));
            }
        }
    }

    #[test]
    fn prop_grid_remove_is_idempotent(
        positions in proptest::collection::vec(arb_any_position(), 1..40),
        victim in 0usize..40,
    ) {
        let mut grid = SpatialGrid::new(2000, 2000, 200);
        let mut stored = Vec::new();
        for (i, position) in positions.iter().enumerate() {
            let id = i as EntityId;
            if grid.add(id, *position) {
                stored.push((id, *position));
            }
        }
        prop_assert_eq!(grid.len(), stored.len());
        if let Some(&(id, position)) = stored.get(victim % stored.len().max(1)) {
            prop_assert!(grid.remove(id, position));
            let after_first = grid.clone();
            prop_assert!(!grid.remove(id, position));
            prop_assert_eq!(&grid, &after_first);
            for &(other, other_position) in &stored {
                let found = grid.query_near(other_position, 0).contains(&other);
                prop_assert_eq!(found, other != id);
            }
        }
    }
}
