//! Gameplay constants, loadable from RON.
//!
//! A [`Tuning`] is built once before a match starts and never changes
//! afterwards. Whole-number quantities are stored as integers; fractional
//! ones are stored as raw `I32F32` bits, the same encoding every other
//! data file uses.
//!
//! # Example RON
//!
//! ```ron
//! Tuning(
//!     map: (width: 1200, height: 1200, /* ... */),
//!     // every section is required
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::{Resources, Team, Tool};
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Largest accepted map side. Range checks square distances in `I32F32`,
/// whose integer part tops out near 46_340 squared, and the diagonal of a
/// 30_000 map plus placement overhang stays below that.
pub const MAX_MAP_SIZE: u32 = 30_000;

/// Largest radius or range whose square still fits `I32F32`.
pub const MAX_SQUARED_RADIUS: u32 = 45_000;

/// Map layout, grid and observation window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapTuning {
    /// Map width in world units.
    pub width: u32,
    /// Map height in world units.
    pub height: u32,
    /// Side length of a spatial grid cell.
    pub grid_cell: u32,
    /// Distance from the edge inside which players are pushed back.
    pub edge_margin: u32,
    /// Push-back applied per tick inside the margin.
    pub edge_push: u32,
    /// Half-width of the square observation window.
    pub observation_half_width: u32,
    /// Grid ring scanned when building observations.
    pub observation_ring: i32,
    /// Deposit counts placed at reset.
    pub deposits: DepositTuning,
}

/// Number of resource nodes scattered at reset.
///
/// `outer` nodes land outside the central half of the map, `inner` ones
/// inside `inner_radius` of the centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepositTuning {
    /// Bushes outside the centre.
    pub outer_bushes: u32,
    /// Trees outside the centre.
    pub outer_trees: u32,
    /// Stones outside the centre.
    pub outer_stones: u32,
    /// Bushes near the centre.
    pub inner_bushes: u32,
    /// Trees near the centre.
    pub inner_trees: u32,
    /// Stones near the centre.
    pub inner_stones: u32,
    /// Radius of the central deposit disc.
    pub inner_radius: u32,
    /// Keep-out distance from the map border for outer deposits.
    pub border: u32,
}

/// Player body, movement and melee constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerTuning {
    /// Collision radius.
    pub radius: u32,
    /// Health at spawn.
    pub health: u32,
    /// Heal effects never raise health above this.
    pub heal_cap: u32,
    /// Movement per tick.
    pub speed: u32,
    /// Movement per tick while slowed.
    pub slowed_speed: u32,
    /// Ticks of slow after being knocked back.
    pub slow_ticks: u32,
    /// Knockback displacement per tick.
    pub knockback_distance: u32,
    /// Ticks the knockback displacement keeps being applied.
    pub knockback_ticks: u32,
    /// Reach radius of each melee sample point.
    pub attack_radius: u32,
    /// Hammer multiplier against resource nodes.
    #[serde(with = "fixed_serde")]
    pub hammer_resource_bonus: Fixed,
    /// Hammer multiplier against walls and spikes.
    #[serde(with = "fixed_serde")]
    pub hammer_wall_bonus: Fixed,
    /// Held-trigger ticks needed to loose a charged arrow.
    pub charge_threshold: u32,
    /// Extra wood consumed by a charged arrow.
    pub charged_arrow_wood: u32,
    /// Flat amount of each resource granted for a kill.
    pub kill_bonus: u32,
    /// The killer also receives `victim / kill_share` of each resource.
    pub kill_share: u32,
    /// Separation force against overlapping colliders.
    pub separation_force: u32,
    /// Overlap tolerance for every circle test.
    #[serde(with = "fixed_serde")]
    pub collision_tolerance: Fixed,
}

/// Damage and three-phase frame schedule of a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeaponStats {
    /// Damage per hit.
    pub damage: u32,
    /// Timing of an activation.
    pub frames: FrameSchedule,
}

/// `[total, strike_start, recovery_start]` frame schedule.
///
/// The attack timer starts at `total` and counts down; the weapon is live
/// while `recovery_start < remaining <= strike_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSchedule {
    /// Total ticks of the activation.
    pub total: u32,
    /// First live tick (counting down).
    pub strike_start: u32,
    /// Live window ends once the timer reaches this value.
    pub recovery_start: u32,
}

impl FrameSchedule {
    /// Create a new schedule.
    #[must_use]
    pub const fn new(total: u32, strike_start: u32, recovery_start: u32) -> Self {
        Self {
            total,
            strike_start,
            recovery_start,
        }
    }

    /// Whether the weapon is live with `remaining` ticks on the timer.
    #[must_use]
    pub const fn is_live(&self, remaining: u32) -> bool {
        remaining > 0 && self.recovery_start < remaining && remaining <= self.strike_start
    }
}

/// Weapon table for the four attack tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeaponTuning {
    /// Slot 1.
    pub sword: WeaponStats,
    /// Slot 2.
    pub bow: WeaponStats,
    /// Slot 3.
    pub hammer: WeaponStats,
    /// Slot 4.
    pub frag: WeaponStats,
}

impl WeaponTuning {
    /// Stats for a weapon tool. Non-weapons fall back to the sword.
    #[must_use]
    pub const fn stats(&self, tool: Tool) -> WeaponStats {
        match tool {
            Tool::Bow => self.bow,
            Tool::Hammer => self.hammer,
            Tool::Frag => self.frag,
            _ => self.sword,
        }
    }
}

/// Resource price of every tool activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CostTuning {
    /// Bow shot.
    pub arrow: Resources,
    /// Frag throw.
    pub frag: Resources,
    /// Wood wall placement.
    pub wood_wall: Resources,
    /// Stone wall placement.
    pub stone_wall: Resources,
    /// Spike placement.
    pub spike: Resources,
    /// Turret placement.
    pub turret: Resources,
    /// Heal zone.
    pub heal: Resources,
}

/// Flight characteristics of a straight-line projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectileStats {
    /// Damage on impact.
    pub damage: u32,
    /// Distance per tick.
    pub speed: u32,
    /// Collision radius.
    pub radius: u32,
    /// Ticks before the projectile expires.
    pub lifetime: u32,
    /// Collision checks per tick.
    pub sub_steps: u32,
}

/// Thrown frag grenade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FragStats {
    /// Initial distance per tick.
    pub speed: u32,
    /// Speed multiplier applied every tick.
    #[serde(with = "fixed_serde")]
    pub friction: Fixed,
    /// Collision radius.
    pub radius: u32,
    /// Fuse length in ticks.
    pub lifetime: u32,
    /// Collision checks per tick.
    pub sub_steps: u32,
}

/// Area blast spawned by a frag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExplosionStats {
    /// Base damage.
    pub damage: u32,
    /// Blast radius.
    pub radius: u32,
    /// Multiplier against resource nodes.
    pub resource_multiplier: u32,
    /// Multiplier against walls.
    pub wall_multiplier: u32,
}

/// Projectile table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectileTuning {
    /// Standard arrow.
    pub arrow: ProjectileStats,
    /// Arrow loosed after holding the trigger.
    pub charged_arrow: ProjectileStats,
    /// Turret round.
    pub bullet: ProjectileStats,
    /// Frag grenade.
    pub frag: FragStats,
    /// Frag detonation.
    pub explosion: ExplosionStats,
    /// Flat damage a bullet deals to the wall that stops it.
    pub wall_chip: u32,
}

/// Placed wall.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallStats {
    /// Collision radius.
    pub radius: u32,
    /// Health when placed.
    pub health: u32,
    /// Granted to the player whose melee hit destroys it.
    pub salvage: Resources,
}

/// Placed spike trap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpikeStats {
    /// Collision radius.
    pub radius: u32,
    /// Health when placed.
    pub health: u32,
    /// Damage per pulse.
    pub damage: u32,
    /// Ticks between pulses.
    pub cadence: u32,
    /// Extra reach beyond touching distance.
    pub reach: u32,
    /// Granted to the player whose melee hit destroys it.
    pub salvage: Resources,
}

/// Placed auto-turret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurretStats {
    /// Collision radius.
    pub radius: u32,
    /// Health when placed.
    pub health: u32,
    /// Ticks between shots.
    pub reload: u32,
    /// Ticks before the first shot.
    pub first_shot: u32,
    /// Targeting range.
    pub range: u32,
    /// Distance ahead of the turret where bullets appear.
    pub muzzle_offset: u32,
    /// Granted to the player whose melee hit destroys it.
    pub salvage: Resources,
}

/// The defended objective.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseStats {
    /// Collision radius.
    pub radius: u32,
    /// Health at reset (also the regeneration ceiling).
    pub health: u32,
    /// Health regained per tick while standing.
    #[serde(with = "fixed_serde")]
    pub regen: Fixed,
}

/// Heal zone effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HealStats {
    /// Effect radius.
    pub radius: u32,
    /// Ticks between pulses.
    pub cadence: u32,
    /// Ticks before the zone expires.
    pub lifetime: u32,
    /// Health restored per pulse.
    pub amount: u32,
}

/// Harvestable resource node.
///
/// The node's radius shrinks as it loses health:
/// `radius - shrink * (1 - health / shrink_reference)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceStats {
    /// Radius at full size.
    pub radius: u32,
    /// Health when spawned.
    pub health: u32,
    /// Radius lost when health reaches zero.
    pub shrink: u32,
    /// Health value the shrink is measured against.
    pub shrink_reference: u32,
}

/// Structure and resource-node table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureTuning {
    /// Slot 5.
    pub wood_wall: WallStats,
    /// Slot 6.
    pub stone_wall: WallStats,
    /// Slot 7.
    pub spike: SpikeStats,
    /// Slot 8.
    pub turret: TurretStats,
    /// Slot 9.
    pub heal: HealStats,
    /// The central objective.
    pub base: BaseStats,
    /// Yields food.
    pub bush: ResourceStats,
    /// Yields wood.
    pub tree: ResourceStats,
    /// Yields stone.
    pub stone: ResourceStats,
}

/// Shrinking storm schedule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneTuning {
    /// Tick the storm starts closing.
    pub shrink_start: u64,
    /// Tick the storm reaches its minimum.
    pub shrink_end: u64,
    /// Radius before shrinking.
    #[serde(with = "fixed_serde")]
    pub max_radius: Fixed,
    /// Radius after shrinking.
    #[serde(with = "fixed_serde")]
    pub min_radius: Fixed,
    /// Damage is dealt on ticks divisible by this.
    pub cadence: u64,
    /// Damage per pulse to players outside.
    pub damage: u32,
}

/// Starting kit for one team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamKit {
    /// Resources granted at spawn.
    pub resources: Resources,
    /// Distance from the map centre where members spawn.
    pub spawn_radius: u32,
    /// Display colour reported in observations.
    pub color: [u8; 3],
}

/// Starting kits for both teams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamTuning {
    /// Team 1, owns the base.
    pub defender: TeamKit,
    /// Team 2.
    pub raider: TeamKit,
    /// Attempts to find a spawn point clear of static objects.
    pub spawn_attempts: u32,
}

/// Complete gameplay constant set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tuning {
    /// Map and grid.
    pub map: MapTuning,
    /// Player body and melee.
    pub player: PlayerTuning,
    /// Weapon frames and damage.
    pub weapons: WeaponTuning,
    /// Tool prices.
    pub costs: CostTuning,
    /// Projectiles and explosions.
    pub projectiles: ProjectileTuning,
    /// Placed structures and resource nodes.
    pub structures: StructureTuning,
    /// Storm schedule.
    pub zone: ZoneTuning,
    /// Team kits.
    pub teams: TeamTuning,
}

impl Default for Tuning {
    fn default() -> Self {
        // sqrt(2) * 1000
        let max_radius = Fixed::from_bits(6_074_001_000) * Fixed::from_num(1000);
        Self {
            map: MapTuning {
                width: 2000,
                height: 2000,
                grid_cell: 200,
                edge_margin: 100,
                edge_push: 5,
                observation_half_width: 320,
                observation_ring: 2,
                deposits: DepositTuning {
                    outer_bushes: 70,
                    outer_trees: 100,
                    outer_stones: 40,
                    inner_bushes: 6,
                    inner_trees: 8,
                    inner_stones: 4,
                    inner_radius: 200,
                    border: 50,
                },
            },
            player: PlayerTuning {
                radius: 15,
                health: 20,
                heal_cap: 25,
                speed: 4,
                slowed_speed: 2,
                slow_ticks: 15,
                knockback_distance: 3,
                knockback_ticks: 3,
                attack_radius: 20,
                hammer_resource_bonus: Fixed::from_num(3) / Fixed::from_num(2),
                hammer_wall_bonus: Fixed::from_num(2),
                charge_threshold: 7,
                charged_arrow_wood: 4,
                kill_bonus: 20,
                kill_share: 6,
                separation_force: 8,
                collision_tolerance: Fixed::ONE / Fixed::from_num(2),
            },
            weapons: WeaponTuning {
                sword: WeaponStats {
                    damage: 4,
                    frames: FrameSchedule::new(15, 10, 7),
                },
                bow: WeaponStats {
                    damage: 4,
                    frames: FrameSchedule::new(25, 18, 17),
                },
                hammer: WeaponStats {
                    damage: 6,
                    frames: FrameSchedule::new(25, 17, 14),
                },
                frag: WeaponStats {
                    damage: 5,
                    frames: FrameSchedule::new(12, 11, 10),
                },
            },
            costs: CostTuning {
                arrow: Resources::new(0, 2, 0),
                frag: Resources::new(0, 0, 10),
                wood_wall: Resources::new(0, 10, 0),
                stone_wall: Resources::new(0, 0, 20),
                spike: Resources::new(0, 12, 12),
                turret: Resources::new(0, 45, 30),
                heal: Resources::new(15, 0, 0),
            },
            projectiles: ProjectileTuning {
                arrow: ProjectileStats {
                    damage: 3,
                    speed: 25,
                    radius: 5,
                    lifetime: 30,
                    sub_steps: 8,
                },
                charged_arrow: ProjectileStats {
                    damage: 3,
                    speed: 45,
                    radius: 5,
                    lifetime: 30,
                    sub_steps: 20,
                },
                bullet: ProjectileStats {
                    damage: 5,
                    speed: 15,
                    radius: 10,
                    lifetime: 60,
                    sub_steps: 8,
                },
                frag: FragStats {
                    speed: 15,
                    friction: Fixed::from_num(93) / Fixed::from_num(100),
                    radius: 12,
                    lifetime: 40,
                    sub_steps: 4,
                },
                explosion: ExplosionStats {
                    damage: 8,
                    radius: 80,
                    resource_multiplier: 2,
                    wall_multiplier: 4,
                },
                wall_chip: 2,
            },
            structures: StructureTuning {
                wood_wall: WallStats {
                    radius: 20,
                    health: 25,
                    salvage: Resources::new(0, 5, 0),
                },
                stone_wall: WallStats {
                    radius: 30,
                    health: 75,
                    salvage: Resources::new(0, 0, 8),
                },
                spike: SpikeStats {
                    radius: 17,
                    health: 35,
                    damage: 3,
                    cadence: 5,
                    reach: 2,
                    salvage: Resources::new(0, 4, 4),
                },
                turret: TurretStats {
                    radius: 20,
                    health: 25,
                    reload: 50,
                    first_shot: 30,
                    range: 400,
                    muzzle_offset: 20,
                    salvage: Resources::new(0, 30, 15),
                },
                heal: HealStats {
                    radius: 40,
                    cadence: 20,
                    lifetime: 80,
                    amount: 2,
                },
                base: BaseStats {
                    radius: 40,
                    health: 100,
                    regen: Fixed::ONE / Fixed::from_num(100),
                },
                bush: ResourceStats {
                    radius: 20,
                    health: 15,
                    shrink: 10,
                    shrink_reference: 20,
                },
                tree: ResourceStats {
                    radius: 30,
                    health: 20,
                    shrink: 10,
                    shrink_reference: 20,
                },
                stone: ResourceStats {
                    radius: 40,
                    health: 50,
                    shrink: 20,
                    shrink_reference: 50,
                },
            },
            zone: ZoneTuning {
                shrink_start: 3600,
                shrink_end: 6000,
                max_radius,
                min_radius: max_radius / Fixed::from_num(2),
                cadence: 20,
                damage: 5,
            },
            teams: TeamTuning {
                defender: TeamKit {
                    resources: Resources::new(50, 120, 120),
                    spawn_radius: 240,
                    color: [140, 190, 240],
                },
                raider: TeamKit {
                    resources: Resources::new(80, 50, 50),
                    spawn_radius: 800,
                    color: [240, 140, 80],
                },
                spawn_attempts: 15,
            },
        }
    }
}

impl Tuning {
    /// Parse and validate a tuning from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TuningParse`] if the text is not a valid tuning.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let tuning: Self = ron::from_str(text).map_err(|e| GameError::TuningParse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load and validate a tuning file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TuningParse`] if the file cannot be read,
    /// parsed, or fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GameError::TuningParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_ron_str(&text).map_err(|e| match e {
            GameError::TuningParse { message, .. } => GameError::TuningParse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Serialize to pretty RON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize tuning: {e}")))
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TuningParse`] naming the first violated rule.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| {
            Err(GameError::TuningParse {
                path: "<tuning>".to_string(),
                message: message.to_string(),
            })
        };

        if self.map.width == 0 || self.map.height == 0 || self.map.grid_cell == 0 {
            return fail("map dimensions and grid cell must be positive");
        }
        if self.map.width > MAX_MAP_SIZE || self.map.height > MAX_MAP_SIZE {
            return fail(&format!("map dimensions must not exceed {MAX_MAP_SIZE}"));
        }
        if self.map.observation_ring < 0 {
            return fail("observation ring must not be negative");
        }
        if self.player.radius == 0 || self.player.health == 0 {
            return fail("player radius and health must be positive");
        }
        for (name, weapon) in [
            ("sword", &self.weapons.sword),
            ("bow", &self.weapons.bow),
            ("hammer", &self.weapons.hammer),
            ("frag", &self.weapons.frag),
        ] {
            let frames = weapon.frames;
            if !(frames.total >= frames.strike_start && frames.strike_start > frames.recovery_start)
            {
                return fail(&format!(
                    "{name} frames must satisfy total >= strike_start > recovery_start"
                ));
            }
        }
        for (name, stats) in [
            ("arrow", &self.projectiles.arrow),
            ("charged_arrow", &self.projectiles.charged_arrow),
            ("bullet", &self.projectiles.bullet),
        ] {
            if stats.sub_steps == 0 {
                return fail(&format!("{name} needs at least one sub-step"));
            }
        }
        if self.projectiles.frag.sub_steps == 0 {
            return fail("frag needs at least one sub-step");
        }
        if self.zone.shrink_end <= self.zone.shrink_start {
            return fail("zone shrink_end must come after shrink_start");
        }
        if self.zone.min_radius > self.zone.max_radius {
            return fail("zone min_radius must not exceed max_radius");
        }
        if self.zone.max_radius > Fixed::from_num(MAX_SQUARED_RADIUS)
            || self.structures.turret.range > MAX_SQUARED_RADIUS
        {
            return fail(&format!(
                "zone radius and turret range must not exceed {MAX_SQUARED_RADIUS}"
            ));
        }
        if self.zone.cadence == 0 || self.structures.spike.cadence == 0 {
            return fail("cadences must be positive");
        }
        if self.player.kill_share == 0 {
            return fail("kill_share must be positive");
        }
        for stats in [
            self.structures.bush,
            self.structures.tree,
            self.structures.stone,
        ] {
            if stats.shrink_reference == 0 {
                return fail("resource shrink_reference must be positive");
            }
        }
        Ok(())
    }

    /// Map centre.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        Vec2Fixed::new(
            Fixed::from_num(self.map.width / 2),
            Fixed::from_num(self.map.height / 2),
        )
    }

    /// Starting kit for a team.
    #[must_use]
    pub const fn kit(&self, team: Team) -> &TeamKit {
        match team {
            Team::Defender => &self.teams.defender,
            Team::Raider => &self.teams.raider,
        }
    }
}
