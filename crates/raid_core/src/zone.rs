//! Shrinking storm around the map centre.

use crate::combat::{Hit, HitKind};
use crate::math::Fixed;
use crate::tuning::ZoneTuning;
use crate::world::{TargetRef, World};

/// Storm radius at `tick`.
///
/// Holds the maximum until `shrink_start`, closes linearly to the minimum
/// at `shrink_end`, then holds again.
#[must_use]
pub fn zone_radius(zone: &ZoneTuning, tick: u64) -> Fixed {
    let progress = if tick <= zone.shrink_start {
        Fixed::ZERO
    } else if tick >= zone.shrink_end {
        Fixed::ONE
    } else {
        Fixed::from_num(tick - zone.shrink_start) / Fixed::from_num(zone.shrink_end - zone.shrink_start)
    };
    zone.max_radius + progress * (zone.min_radius - zone.max_radius)
}

impl World {
    /// Recompute the storm radius for the current tick.
    pub fn update_zone(&mut self) {
        self.zone_radius = zone_radius(&self.tuning().zone, self.tick);
    }

    /// On cadence ticks, chip every living player outside the storm.
    ///
    /// The damage is neutral: no attacker, no knockback.
    pub fn apply_zone_damage(&mut self) {
        let zone = &self.tuning().zone;
        if self.tick % zone.cadence != 0 {
            return;
        }
        let hit = Hit {
            kind: HitKind::Zone,
            origin: self.tuning().center(),
            damage: Fixed::from_num(zone.damage),
            attacker: None,
            team: None,
        };
        let radius_sq = self.zone_radius * self.zone_radius;
        let outside: Vec<_> = self
            .players
            .values()
            .filter(|p| p.is_alive() && p.position.distance_squared(hit.origin) > radius_sq)
            .map(|p| p.id)
            .collect();
        for id in outside {
            self.apply_hit(TargetRef::Player(id), &hit);
        }
    }
}
