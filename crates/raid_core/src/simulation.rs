//! The match loop.
//!
//! A [`Simulation`] owns one [`World`] plus the roster and runs the fixed
//! per-tick order:
//!
//! 1. validate the whole action map (nothing changes on failure)
//! 2. advance the tick counter and the storm radius
//! 3. clear hit markers, per-player tallies and cues
//! 4. step every rostered player in id order
//! 5. step the base, then every dynamic object and effect in id order
//! 6. apply storm damage on cadence
//! 7. build observations
//! 8. evaluate termination
//!
//! # Determinism
//!
//! - All arithmetic is fixed-point ([`Fixed`](crate::math::Fixed))
//! - Deposit and spawn randomness comes from the seeded world RNG
//! - Every collection is a `BTreeMap`, iterated in id order
//! - Objects created during step 5 are first stepped on the next tick
//!
//! # Example
//!
//! ```
//! use raid_core::action::{ActionMap, PlayerAction};
//! use raid_core::components::Team;
//! use raid_core::simulation::Simulation;
//! use raid_core::tuning::Tuning;
//!
//! let mut sim = Simulation::new(Tuning::default(), 7).unwrap();
//! sim.add_player(1, Team::Defender).unwrap();
//! sim.add_player(2, Team::Raider).unwrap();
//! sim.reset();
//!
//! let mut actions = ActionMap::new();
//! actions.insert(1, PlayerAction::idle().with_move(1, 0));
//! let outcome = sim.step(&actions).unwrap();
//! assert!(!outcome.done);
//! assert_eq!(sim.world().tick, 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::action::{ActionMap, PlayerAction};
use crate::components::{EntityId, PlayerId, Team};
use crate::entities::{DynamicObject, Effect};
use crate::error::{GameError, Result};
use crate::events::TickEvents;
use crate::observation::{EntityView, Observation};
use crate::tuning::Tuning;
use crate::world::World;

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The base fell. `owner` is the team that was defending it.
    BaseDestroyed {
        /// Team owning the base.
        owner: Team,
    },
    /// Every rostered member of `team` is dead.
    TeamEliminated {
        /// The wiped team.
        team: Team,
    },
    /// Both teams died out on the same tick.
    MutualElimination,
}

impl Termination {
    /// Terminal reward for a member of `team`: -1 for the losing side,
    /// +1 for the winner, 0 on mutual elimination.
    #[must_use]
    pub const fn reward_for(self, team: Team) -> i32 {
        let loser = match self {
            Self::BaseDestroyed { owner } => owner,
            Self::TeamEliminated { team } => team,
            Self::MutualElimination => return 0,
        };
        if team.number() == loser.number() {
            -1
        } else {
            1
        }
    }
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Observation for every rostered player.
    pub observations: BTreeMap<PlayerId, Observation>,
    /// Cues, deaths, spawns and destructions of this tick.
    pub events: TickEvents,
    /// Whether the match is over.
    pub done: bool,
    /// Why it ended, when `done`.
    pub termination: Option<Termination>,
    /// 0 while running, the terminal team outcome once done.
    pub rewards: BTreeMap<PlayerId, i32>,
}

/// A seeded match with its roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    world: World,
    seed: u64,
    roster: BTreeMap<PlayerId, Team>,
    termination: Option<Termination>,
}

impl Simulation {
    /// Validate the tuning and build a populated arena with an empty
    /// roster.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TuningParse`] if the tuning is inconsistent.
    pub fn new(tuning: Tuning, seed: u64) -> Result<Self> {
        tuning.validate()?;
        let mut sim = Self {
            world: World::new(tuning, seed),
            seed,
            roster: BTreeMap::new(),
            termination: None,
        };
        sim.reset();
        Ok(sim)
    }

    /// Wrap a hand-built world. The roster is taken from its players.
    ///
    /// Used by tests and tools that need exact entity layouts.
    #[must_use]
    pub fn from_world(world: World, seed: u64) -> Self {
        let roster = world.players.values().map(|p| (p.id, p.team)).collect();
        Self {
            world,
            seed,
            roster,
            termination: None,
        }
    }

    /// Read-only world state.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world state, for scenario setup.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Seed used by [`reset`](Self::reset).
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Current roster.
    #[must_use]
    pub const fn roster(&self) -> &BTreeMap<PlayerId, Team> {
        &self.roster
    }

    /// Termination reason, once the match has ended.
    #[must_use]
    pub const fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Whether the match has ended.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.termination.is_some()
    }

    /// Roster size per team as `(defenders, raiders)`.
    #[must_use]
    pub fn team_counts(&self) -> (usize, usize) {
        let defenders = self.roster.values().filter(|t| **t == Team::Defender).count();
        (defenders, self.roster.len() - defenders)
    }

    /// Enrol a player and spawn them into the current match.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DuplicatePlayer`] if the id is taken.
    pub fn add_player(&mut self, id: PlayerId, team: Team) -> Result<()> {
        if self.roster.contains_key(&id) {
            return Err(GameError::DuplicatePlayer(id));
        }
        self.roster.insert(id, team);
        self.world.spawn_player(id, team);
        tracing::info!(player = id, ?team, "Player joined");
        Ok(())
    }

    /// Drop a player from the roster and the world. Returns whether they
    /// were present.
    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        let removed = self.roster.remove(&id).is_some();
        self.world.players.remove(&id);
        if removed {
            tracing::info!(player = id, "Player left");
        }
        removed
    }

    /// Start a fresh match with the same seed and roster.
    ///
    /// Rebuilds the grid, base and deposits, then respawns every rostered
    /// player with their team kit.
    pub fn reset(&mut self) -> BTreeMap<PlayerId, Observation> {
        let tuning = self.world.tuning().clone();
        self.world = World::new(tuning, self.seed);
        self.world.populate_deposits();
        for (&id, &team) in &self.roster {
            self.world.spawn_player(id, team);
        }
        self.world.events.clear();
        self.termination = None;
        tracing::info!(
            seed = self.seed,
            players = self.roster.len(),
            deposits = self.world.statics.len(),
            "Match reset"
        );
        self.observations()
    }

    /// Advance one tick.
    ///
    /// Rostered players missing from `actions` idle for the tick.
    ///
    /// # Errors
    ///
    /// - [`GameError::InvalidState`] if the match is already over
    /// - [`GameError::UnknownPlayer`] for an action from an unrostered id
    /// - [`GameError::InvalidAction`] for an out-of-range field
    ///
    /// On error the world is left untouched.
    pub fn step(&mut self, actions: &ActionMap) -> Result<StepOutcome> {
        if let Some(termination) = self.termination {
            return Err(GameError::InvalidState(format!(
                "Match already ended: {termination:?}"
            )));
        }
        if let Err(e) = self.validate(actions) {
            tracing::warn!(tick = self.world.tick, error = %e, "Rejected action map");
            return Err(e);
        }

        let world = &mut self.world;
        world.tick += 1;
        world.update_zone();
        Self::begin_tick(world);

        let idle = PlayerAction::idle();
        for &id in self.roster.keys() {
            let action = actions.get(&id).unwrap_or(&idle);
            world.step_player(id, action);
        }

        world.step_base();
        let dynamic_ids: Vec<EntityId> = world.dynamics.keys().copied().collect();
        for id in dynamic_ids {
            let Some(&object) = world.dynamics.get(&id) else {
                continue;
            };
            match object {
                DynamicObject::Spike(spike) => world.step_spike(spike),
                DynamicObject::Turret(turret) => world.step_turret(turret),
                DynamicObject::Projectile(projectile) => world.step_projectile(projectile),
                DynamicObject::Frag(frag) => world.step_frag(frag),
                DynamicObject::Explosion(explosion) => world.step_explosion(explosion),
            }
        }
        let effect_ids: Vec<EntityId> = world.effects.keys().copied().collect();
        for id in effect_ids {
            match world.effects.get(&id).copied() {
                Some(Effect::Heal(heal)) => world.step_heal(heal),
                None => {}
            }
        }

        world.apply_zone_damage();

        let observations = self.observations();
        self.termination = self.evaluate_termination();
        let rewards = self
            .roster
            .iter()
            .map(|(&id, &team)| (id, self.termination.map_or(0, |t| t.reward_for(team))))
            .collect();
        if let Some(termination) = self.termination {
            tracing::info!(tick = self.world.tick, ?termination, "Match ended");
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.world.tick, state_hash = hash, "Simulation state hash");
        }

        Ok(StepOutcome {
            observations,
            events: std::mem::take(&mut self.world.events),
            done: self.termination.is_some(),
            termination: self.termination,
            rewards,
        })
    }

    fn validate(&self, actions: &ActionMap) -> Result<()> {
        for (&id, action) in actions {
            if !self.roster.contains_key(&id) {
                return Err(GameError::UnknownPlayer(id));
            }
            action.validate(id)?;
        }
        Ok(())
    }

    fn begin_tick(world: &mut World) {
        world.events.clear();
        world.base.hit = false;
        for player in world.players.values_mut() {
            player.hit = false;
            player.events = Default::default();
        }
        for object in world.statics.values_mut() {
            object.hit = false;
        }
        for object in world.dynamics.values_mut() {
            match object {
                DynamicObject::Spike(spike) => spike.hit = false,
                DynamicObject::Turret(turret) => turret.hit = false,
                _ => {}
            }
        }
    }

    /// A team with rostered members and none alive is eliminated; a team
    /// with no members never is.
    fn evaluate_termination(&self) -> Option<Termination> {
        if !self.world.base.is_alive() {
            return Some(Termination::BaseDestroyed {
                owner: self.world.base.team,
            });
        }
        let (defenders, raiders) = self.team_counts();
        let wiped = |team: Team, members: usize| members > 0 && self.world.alive_count(team) == 0;
        match (wiped(Team::Defender, defenders), wiped(Team::Raider, raiders)) {
            (true, true) => Some(Termination::MutualElimination),
            (true, false) => Some(Termination::TeamEliminated {
                team: Team::Defender,
            }),
            (false, true) => Some(Termination::TeamEliminated { team: Team::Raider }),
            (false, false) => None,
        }
    }

    /// Observations for every rostered player.
    #[must_use]
    pub fn observations(&self) -> BTreeMap<PlayerId, Observation> {
        self.roster
            .keys()
            .filter_map(|&id| self.world.observe(id).map(|obs| (id, obs)))
            .collect()
    }

    /// Observation for one player.
    #[must_use]
    pub fn observe(&self, id: PlayerId) -> Option<Observation> {
        self.world.observe(id)
    }

    /// Read-only snapshot of every live entity for presentation.
    #[must_use]
    pub fn render_snapshot(&self) -> Vec<EntityView> {
        self.world.render_snapshot()
    }

    /// Calculate a hash of the current match state.
    ///
    /// Two simulations with identical state produce identical hashes.
    /// Per-tick cues are presentation output and are not included.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        let world = &self.world;

        world.tick.hash(&mut hasher);
        world.zone_radius.to_bits().hash(&mut hasher);
        world.rng.hash(&mut hasher);
        world.base.hash(&mut hasher);
        world.players.hash(&mut hasher);
        world.statics.hash(&mut hasher);
        world.dynamics.hash(&mut hasher);
        world.effects.hash(&mut hasher);
        self.roster.hash(&mut hasher);
        self.termination.hash(&mut hasher);

        hasher.finish()
    }

    /// Serialize the match for replay or transfer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Deserialize a match from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| {
            GameError::InvalidState(format!("Failed to deserialize simulation: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Tool;
    use crate::math::{Fixed, Vec2Fixed};

    fn two_player_match(seed: u64) -> Simulation {
        let mut sim = Simulation::new(Tuning::default(), seed).unwrap();
        sim.add_player(1, Team::Defender).unwrap();
        sim.add_player(2, Team::Raider).unwrap();
        sim.reset();
        sim
    }

    #[test]
    fn test_new_match_is_populated() {
        let sim = two_player_match(3);
        assert_eq!(sim.world().tick, 0);
        assert_eq!(sim.world().statics.len(), 228);
        assert_eq!(sim.world().players.len(), 2);
        assert_eq!(sim.team_counts(), (1, 1));
        assert!(!sim.is_done());
    }

    #[test]
    fn test_duplicate_player_rejected() {
        let mut sim = two_player_match(3);
        assert!(matches!(
            sim.add_player(1, Team::Raider),
            Err(GameError::DuplicatePlayer(1))
        ));
    }

    #[test]
    fn test_remove_player() {
        let mut sim = two_player_match(3);
        assert!(sim.remove_player(2));
        assert!(!sim.remove_player(2));
        assert!(sim.world().player(2).is_none());
        assert_eq!(sim.team_counts(), (1, 0));
    }

    #[test]
    fn test_step_advances_tick_and_observes_everyone() {
        let mut sim = two_player_match(3);
        let outcome = sim.step(&ActionMap::new()).unwrap();
        assert_eq!(sim.world().tick, 1);
        assert_eq!(outcome.observations.len(), 2);
        assert_eq!(outcome.rewards.values().copied().collect::<Vec<_>>(), vec![0, 0]);
        assert!(!outcome.done);
    }

    #[test]
    fn test_invalid_action_leaves_world_untouched() {
        let mut sim = two_player_match(3);
        let before = sim.state_hash();

        let mut actions = ActionMap::new();
        actions.insert(1, PlayerAction::idle().with_move(1, 1));
        let mut bad = PlayerAction::idle();
        bad.tool = 12;
        actions.insert(2, bad);

        assert!(matches!(
            sim.step(&actions),
            Err(GameError::InvalidAction { player: 2, field: "tool", .. })
        ));
        assert_eq!(sim.state_hash(), before);
        assert_eq!(sim.world().tick, 0);
    }

    #[test]
    fn test_unknown_player_rejected() {
        let mut sim = two_player_match(3);
        let mut actions = ActionMap::new();
        actions.insert(9, PlayerAction::idle());
        assert!(matches!(sim.step(&actions), Err(GameError::UnknownPlayer(9))));
    }

    #[test]
    fn test_base_destroyed_ends_match() {
        let mut sim = two_player_match(3);
        sim.world_mut().base.health.current = Fixed::ZERO;
        let outcome = sim.step(&ActionMap::new()).unwrap();

        assert!(outcome.done);
        assert_eq!(
            outcome.termination,
            Some(Termination::BaseDestroyed { owner: Team::Defender })
        );
        assert_eq!(outcome.rewards[&1], -1);
        assert_eq!(outcome.rewards[&2], 1);
        assert!(matches!(sim.step(&ActionMap::new()), Err(GameError::InvalidState(_))));
    }

    #[test]
    fn test_team_wipe_ends_match() {
        let mut sim = two_player_match(3);
        sim.world_mut().player_mut(2).unwrap().health.current = Fixed::ZERO;
        let outcome = sim.step(&ActionMap::new()).unwrap();
        assert_eq!(
            outcome.termination,
            Some(Termination::TeamEliminated { team: Team::Raider })
        );
        assert_eq!(outcome.rewards[&1], 1);
        assert_eq!(outcome.rewards[&2], -1);
    }

    #[test]
    fn test_mutual_elimination_is_neutral() {
        let mut sim = two_player_match(3);
        for id in [1, 2] {
            sim.world_mut().player_mut(id).unwrap().health.current = Fixed::ZERO;
        }
        let outcome = sim.step(&ActionMap::new()).unwrap();
        assert_eq!(outcome.termination, Some(Termination::MutualElimination));
        assert!(outcome.rewards.values().all(|r| *r == 0));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut sim = two_player_match(11);
        let initial = sim.state_hash();
        let mut actions = ActionMap::new();
        actions.insert(2, PlayerAction::idle().with_move(-1, 0).with_trigger(true));
        for _ in 0..10 {
            sim.step(&actions).unwrap();
        }
        assert_ne!(sim.state_hash(), initial);
        sim.reset();
        assert_eq!(sim.state_hash(), initial);
    }

    #[test]
    fn test_same_seed_same_hash() {
        let mut a = two_player_match(21);
        let mut b = two_player_match(21);
        let mut actions = ActionMap::new();
        actions.insert(1, PlayerAction::idle().with_move(1, 0).with_turn(3));
        actions.insert(2, PlayerAction::idle().with_tool(Tool::Bow).with_trigger(true));
        for _ in 0..50 {
            a.step(&actions).unwrap();
            b.step(&actions).unwrap();
            assert_eq!(a.state_hash(), b.state_hash());
        }
    }

    #[test]
    fn test_hit_markers_cleared_each_tick() {
        let mut sim = two_player_match(3);
        sim.world_mut().player_mut(1).unwrap().hit = true;
        sim.world_mut().base.hit = true;
        sim.step(&ActionMap::new()).unwrap();
        assert!(!sim.world().player(1).unwrap().hit);
        assert!(!sim.world().base.hit);
    }

    #[test]
    fn test_serialize_round_trip_keeps_hash() {
        let mut sim = two_player_match(5);
        sim.world_mut().player_mut(1).unwrap().position = Vec2Fixed::from_int(900, 900);
        sim.step(&ActionMap::new()).unwrap();
        let bytes = sim.serialize().unwrap();
        let restored = Simulation::deserialize(&bytes).unwrap();
        assert_eq!(restored.state_hash(), sim.state_hash());
    }
}
