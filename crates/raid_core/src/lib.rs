//! # Raid Core
//!
//! Deterministic simulation engine for a two-team arena battle around a
//! central base.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No audio
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless training and evaluation runs
//! - Replay systems
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`world`] - Entity storage and collision queries
//! - [`grid`] - Uniform-cell index over static objects
//! - [`player`] - Per-player action controller
//! - [`combat`] - Damage, knockback and economy side effects
//! - [`projectile`] - Sub-stepped projectile motion
//! - [`structures`] - Spikes, turrets, base and heal zones
//! - [`zone`] - Shrinking storm
//! - [`simulation`] - The tick loop and termination
//! - [`observation`] - Per-player observations and render snapshots
//! - [`replay`] - Recording and verification
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod action;
pub mod combat;
pub mod components;
pub mod entities;
pub mod error;
pub mod events;
pub mod grid;
pub mod map_generation;
pub mod math;
pub mod observation;
pub mod player;
pub mod projectile;
pub mod replay;
pub mod rng;
pub mod simulation;
pub mod structures;
pub mod tuning;
pub mod world;
pub mod zone;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::action::{ActionMap, PlayerAction};
    pub use crate::combat::{Hit, HitKind};
    pub use crate::components::*;
    pub use crate::entities::{
        Base, DynamicObject, Effect, Explosion, Frag, Heal, Projectile, ProjectileKind, Spike,
        StaticKind, StaticObject, Turret,
    };
    pub use crate::error::{GameError, Result};
    pub use crate::events::{Cue, CueKind, TickEvents};
    pub use crate::math::{Fixed, Heading, Vec2Fixed};
    pub use crate::observation::{EntityKind, EntityView, Observation};
    pub use crate::player::Player;
    pub use crate::replay::{Replay, ReplayPlayer};
    pub use crate::simulation::{Simulation, StepOutcome, Termination};
    pub use crate::tuning::Tuning;
    pub use crate::world::{TargetRef, World};
}
