//! End-to-end match scenarios driven through `Simulation::step`.

use raid_core::prelude::*;
use raid_test_utils::fixtures::{empty_world, fixed, place_player, pos};

fn step(sim: &mut Simulation, actions: &[(PlayerId, PlayerAction)]) -> StepOutcome {
    let map: ActionMap = actions.iter().copied().collect();
    sim.step(&map).expect("valid actions")
}

fn explosion_at(world: &mut World, x: i32, y: i32, team: Team) -> EntityId {
    let id = world.allocate_id();
    world.add_dynamic(DynamicObject::Explosion(Explosion {
        id,
        position: pos(x, y),
        team,
        owner: None,
    }));
    id
}

#[test]
fn wood_wall_without_wood_is_refused() {
    let mut world = empty_world(1);
    place_player(&mut world, 1, Team::Raider, 1500, 1000);
    world.player_mut(1).unwrap().resources = Resources::new(80, 0, 50);
    let mut sim = Simulation::from_world(world, 1);

    let place = PlayerAction::idle().with_tool(Tool::WoodWall).with_trigger(true);
    step(&mut sim, &[(1, place)]);

    let player = sim.world().player(1).unwrap();
    assert_eq!(player.resources.wood, 0);
    assert!(sim.world().statics.is_empty());
    assert_eq!(player.tool, Tool::WoodWall);
}

#[test]
fn wood_wall_with_wood_is_placed_ahead() {
    let mut world = empty_world(1);
    place_player(&mut world, 1, Team::Defender, 1500, 1000);
    let mut sim = Simulation::from_world(world, 1);

    let place = PlayerAction::idle().with_tool(Tool::WoodWall).with_trigger(true);
    let outcome = step(&mut sim, &[(1, place)]);

    let player = sim.world().player(1).unwrap();
    assert_eq!(player.resources.wood, 110);
    assert_eq!(player.events.change_wood, -10);
    let wall = sim.world().statics.values().next().expect("wall placed");
    assert_eq!(wall.kind, StaticKind::WoodWall);
    assert_eq!(wall.team, Some(Team::Defender));
    // 15 + 1.4 * 20 + 10 ahead, facing +x
    assert!((wall.position.x - fixed(1553)).abs() < fixed(1));
    assert_eq!(outcome.events.count(CueKind::Placement), 1);
}

#[test]
fn bush_harvest_yields_a_third_of_the_damage() {
    let mut tuning = Tuning::default();
    tuning.weapons.sword.damage = 9;
    let mut world = World::new(tuning, 1);
    place_player(&mut world, 1, Team::Raider, 1345, 1000);
    let bush = world
        .spawn_resource(StaticKind::Bush, pos(1400, 1000))
        .expect("on the map");
    let mut sim = Simulation::from_world(world, 1);

    let swing = PlayerAction::idle().with_tool(Tool::Sword).with_trigger(true);
    step(&mut sim, &[(1, swing)]);
    for _ in 0..15 {
        step(&mut sim, &[]);
    }

    let node = sim.world().statics[&bush];
    assert_eq!(node.health.current, fixed(6));
    assert!(node.radius < fixed(20));
    assert_eq!(sim.world().player(1).unwrap().resources.food, 83);
}

#[test]
fn explosion_destroys_weak_wall() {
    let mut world = empty_world(1);
    place_player(&mut world, 1, Team::Raider, 300, 300);
    let wall = world
        .spawn_wall(StaticKind::WoodWall, pos(1500, 1500), Team::Defender)
        .expect("on the map");
    world.statics.get_mut(&wall).unwrap().health.current = fixed(20);
    let blast = explosion_at(&mut world, 1540, 1500, Team::Raider);
    let mut sim = Simulation::from_world(world, 1);

    let outcome = step(&mut sim, &[]);

    assert!(!sim.world().statics.contains_key(&wall));
    assert!(!sim.world().grid.query_near(pos(1500, 1500), 0).contains(&wall));
    assert!(outcome.events.destroyed.contains(&wall));
    assert!(!sim.world().dynamics.contains_key(&blast));
}

#[test]
fn explosion_damages_friendly_wall() {
    let mut world = empty_world(1);
    place_player(&mut world, 1, Team::Defender, 300, 300);
    let wall = world
        .spawn_wall(StaticKind::StoneWall, pos(1500, 1500), Team::Defender)
        .expect("on the map");
    explosion_at(&mut world, 1500, 1560, Team::Defender);
    let mut sim = Simulation::from_world(world, 1);

    step(&mut sim, &[]);
    assert_eq!(sim.world().statics[&wall].health.current, fixed(75 - 32));
}

#[test]
fn zone_chips_once_per_cadence() {
    let mut tuning = Tuning::default();
    tuning.zone.max_radius = fixed(300);
    tuning.zone.min_radius = fixed(150);
    let mut world = World::new(tuning, 1);
    place_player(&mut world, 1, Team::Raider, 1500, 1000);
    place_player(&mut world, 2, Team::Defender, 1100, 1000);
    let mut sim = Simulation::from_world(world, 1);

    for tick in 1..=39 {
        step(&mut sim, &[]);
        let outside = sim.world().player(1).unwrap().health.current;
        let expected = if tick < 20 { 20 } else { 15 };
        assert_eq!(outside, fixed(expected), "tick {tick}");
    }
    assert_eq!(sim.world().player(2).unwrap().health.current, fixed(20));
    step(&mut sim, &[]);
    assert_eq!(sim.world().player(1).unwrap().health.current, fixed(10));
}

#[test]
fn base_destruction_ends_match_on_the_same_tick() {
    let mut world = empty_world(1);
    place_player(&mut world, 1, Team::Defender, 300, 300);
    place_player(&mut world, 2, Team::Raider, 1700, 1700);
    world.base.health.current = fixed(3);
    explosion_at(&mut world, 1000, 1060, Team::Raider);
    let mut sim = Simulation::from_world(world, 1);

    let outcome = step(&mut sim, &[]);

    assert!(outcome.done);
    assert_eq!(
        outcome.termination,
        Some(Termination::BaseDestroyed {
            owner: Team::Defender
        })
    );
    assert_eq!(sim.world().base.health.current, Fixed::ZERO);
    assert_eq!(outcome.events.count(CueKind::BaseDestroyed), 1);
    assert_eq!(outcome.rewards[&1], -1);
    assert_eq!(outcome.rewards[&2], 1);

    assert!(sim.step(&ActionMap::new()).is_err());
    assert_eq!(sim.world().base.health.current, Fixed::ZERO);
}

#[test]
fn melee_swing_hits_each_target_once() {
    let mut world = empty_world(1);
    place_player(&mut world, 1, Team::Raider, 1300, 1000);
    place_player(&mut world, 2, Team::Defender, 1330, 1000);
    let mut sim = Simulation::from_world(world, 1);

    let swing = PlayerAction::idle().with_tool(Tool::Sword).with_trigger(true);
    step(&mut sim, &[(1, swing)]);
    let mut cues = 0;
    for _ in 0..15 {
        let outcome = step(&mut sim, &[]);
        cues += outcome.events.count(CueKind::Swing);
    }

    assert_eq!(cues, 1);
    assert_eq!(sim.world().player(2).unwrap().health.current, fixed(16));
    assert!(sim.world().player(1).unwrap().attack.is_none());
}

#[test]
fn melee_kill_pays_bounty_and_flags_death() {
    let mut world = empty_world(1);
    place_player(&mut world, 1, Team::Raider, 1300, 1000);
    place_player(&mut world, 2, Team::Defender, 1330, 1000);
    place_player(&mut world, 3, Team::Defender, 300, 300);
    world.player_mut(2).unwrap().health.current = fixed(3);
    let mut sim = Simulation::from_world(world, 1);

    let swing = PlayerAction::idle().with_tool(Tool::Sword).with_trigger(true);
    step(&mut sim, &[(1, swing)]);
    let mut died = None;
    for _ in 0..14 {
        let outcome = step(&mut sim, &[]);
        if outcome.events.deaths.contains(&2) {
            died = Some(outcome);
        }
    }

    let outcome = died.expect("victim died");
    let killer_view = &outcome.observations[&1];
    assert!(killer_view.player.iter().all(|p| p.id != 2));
    let killer = sim.world().player(1).unwrap();
    assert_eq!(killer.kills, 1);
    // raider kit 80/50/50 plus 20 + defender kit / 6
    assert_eq!(killer.resources, Resources::new(80 + 20 + 8, 50 + 20 + 20, 50 + 20 + 20));
    assert_eq!(sim.world().player(2).unwrap().health.current, Fixed::ZERO);
    assert!(!sim.is_done());
}

#[test]
fn spike_hurts_enemies_standing_on_it() {
    let mut world = empty_world(1);
    place_player(&mut world, 1, Team::Defender, 1500, 1000);
    place_player(&mut world, 2, Team::Raider, 1560, 1000);
    let mut sim = Simulation::from_world(world, 1);

    let spike = PlayerAction::idle().with_tool(Tool::Spike).with_trigger(true);
    step(&mut sim, &[(1, spike)]);
    assert_eq!(sim.world().player(1).unwrap().resources, Resources::new(50, 108, 108));
    // a fresh spike pulses on the tick it goes down
    assert_eq!(sim.world().player(2).unwrap().health.current, fixed(17));

    for _ in 0..10 {
        step(&mut sim, &[]);
    }
    assert!(sim.world().player(2).unwrap().health.current < fixed(20));
    assert_eq!(sim.world().player(1).unwrap().health.current, fixed(20));
}

#[test]
fn arrow_flies_and_hits_enemy() {
    let mut world = empty_world(1);
    place_player(&mut world, 1, Team::Raider, 1200, 1000);
    place_player(&mut world, 2, Team::Defender, 1400, 1000);
    let mut sim = Simulation::from_world(world, 1);

    let shoot = PlayerAction::idle().with_tool(Tool::Bow).with_trigger(true);
    step(&mut sim, &[(1, shoot)]);
    assert_eq!(sim.world().player(1).unwrap().resources.wood, 48);

    let mut impacts = 0;
    for _ in 0..40 {
        impacts += step(&mut sim, &[]).events.count(CueKind::ArrowImpact);
    }
    assert_eq!(impacts, 1);
    assert_eq!(sim.world().player(2).unwrap().health.current, fixed(17));
    assert!(sim.world().dynamics.is_empty());
}

#[test]
fn heal_swaps_back_and_swallows_next_trigger() {
    let mut world = empty_world(1);
    place_player(&mut world, 1, Team::Raider, 1500, 1000);
    world.player_mut(1).unwrap().health.current = fixed(10);
    let mut sim = Simulation::from_world(world, 1);

    let heal = PlayerAction::idle().with_tool(Tool::Heal).with_trigger(true);
    step(&mut sim, &[(1, heal)]);
    let player = sim.world().player(1).unwrap();
    assert_eq!(player.tool, Tool::Sword);
    assert_eq!(player.resources.food, 65);
    assert_eq!(player.health.current, fixed(12));

    let attack = PlayerAction::idle().with_trigger(true);
    step(&mut sim, &[(1, attack)]);
    assert!(sim.world().player(1).unwrap().attack.is_none());
    step(&mut sim, &[(1, attack)]);
    assert!(sim.world().player(1).unwrap().attack.is_some());
}

#[test]
fn render_snapshot_lists_every_live_entity() {
    let mut world = empty_world(1);
    place_player(&mut world, 1, Team::Raider, 1200, 1000);
    place_player(&mut world, 2, Team::Defender, 1600, 1000);
    place_player(&mut world, 3, Team::Raider, 800, 1000);
    world.spawn_resource(StaticKind::Bush, pos(1000, 1400)).expect("bush placed");
    let mut sim = Simulation::from_world(world, 1);

    let shoot = PlayerAction::idle().with_tool(Tool::Bow).with_trigger(true);
    let heal = PlayerAction::idle().with_tool(Tool::Heal).with_trigger(true);
    step(&mut sim, &[(1, shoot), (3, heal)]);

    let mut snapshot = sim.render_snapshot();
    for _ in 0..20 {
        if snapshot
            .iter()
            .any(|v| matches!(v.kind, EntityKind::Projectile(_)))
        {
            break;
        }
        step(&mut sim, &[]);
        snapshot = sim.render_snapshot();
    }

    let count = |kind: EntityKind| snapshot.iter().filter(|v| v.kind == kind).count();
    assert_eq!(count(EntityKind::Player), 3);
    assert_eq!(count(EntityKind::Base), 1);
    assert_eq!(count(EntityKind::Static(StaticKind::Bush)), 1);
    assert_eq!(count(EntityKind::Projectile(ProjectileKind::Arrow)), 1);
    assert_eq!(count(EntityKind::Heal), 1);

    for view in &snapshot {
        match view.kind {
            EntityKind::Projectile(_)
            | EntityKind::Frag
            | EntityKind::Explosion
            | EntityKind::Heal => assert_eq!(view.health, None, "{:?}", view.kind),
            _ => assert!(view.health.is_some(), "{:?}", view.kind),
        }
    }
    let base = snapshot.iter().find(|v| v.kind == EntityKind::Base).unwrap();
    assert_eq!(base.position, pos(1000, 1000));
    assert_eq!(base.team, Some(Team::Defender));

    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: Vec<EntityView> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, snapshot);
}
