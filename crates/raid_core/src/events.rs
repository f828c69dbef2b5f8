//! Per-tick output for presentation collaborators.
//!
//! The engine never calls into audio or rendering code. Instead every tick
//! collects [`Cue`]s and lifecycle notices in a [`TickEvents`] buffer that
//! is returned from [`Simulation::step`](crate::simulation::Simulation::step).

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, PlayerId};
use crate::math::Vec2Fixed;

/// Something audible or visible happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueKind {
    /// A player took damage.
    Hurt,
    /// A player died.
    Death,
    /// Melee strike frame.
    Swing,
    /// Arrow loosed.
    BowShot,
    /// Frag thrown.
    FragThrow,
    /// Arrow stopped by something.
    ArrowImpact,
    /// Bullet stopped by something.
    BulletImpact,
    /// Frag detonated.
    Explosion,
    /// Turret fired.
    TurretFire,
    /// Structure or heal zone placed.
    Placement,
    /// Structure damaged.
    StructureHit,
    /// Structure destroyed.
    StructureDestroyed,
    /// Resource node harvested.
    ResourceHit,
    /// Base damaged.
    BaseHit,
    /// Base destroyed.
    BaseDestroyed,
}

impl CueKind {
    /// Suggested playback volume in `0..=100`.
    #[must_use]
    pub const fn volume(self) -> u8 {
        match self {
            Self::Explosion | Self::BaseDestroyed => 100,
            Self::Death | Self::StructureDestroyed => 80,
            Self::BaseHit | Self::TurretFire => 60,
            Self::Hurt | Self::StructureHit | Self::ResourceHit => 50,
            Self::Swing | Self::BowShot | Self::FragThrow | Self::Placement => 40,
            Self::ArrowImpact | Self::BulletImpact => 30,
        }
    }
}

/// A cue at a world position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cue {
    /// What happened.
    pub kind: CueKind,
    /// Where it happened.
    pub position: Vec2Fixed,
}

/// Everything notable produced by one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Presentation cues in emission order.
    pub cues: Vec<Cue>,
    /// Players that died this tick.
    pub deaths: Vec<PlayerId>,
    /// Structures and resource nodes destroyed this tick.
    pub destroyed: Vec<EntityId>,
    /// Entities created this tick.
    pub spawned: Vec<EntityId>,
}

impl TickEvents {
    /// Record a cue.
    pub fn cue(&mut self, kind: CueKind, position: Vec2Fixed) {
        self.cues.push(Cue { kind, position });
    }

    /// Number of cues of one kind.
    #[must_use]
    pub fn count(&self, kind: CueKind) -> usize {
        self.cues.iter().filter(|c| c.kind == kind).count()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.cues.clear();
        self.deaths.clear();
        self.destroyed.clear();
        self.spawned.clear();
    }
}
