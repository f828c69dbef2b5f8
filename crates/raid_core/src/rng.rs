//! Seeded pseudo-random numbers for match setup.
//!
//! The simulation never touches system randomness. Deposit placement and
//! spawn points draw from a [`MatchRng`] owned by the world, so the seed
//! and the action stream fully determine a match.

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec2Fixed};

/// Linear congruential generator returning the high bits of its state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchRng {
    state: u64,
}

impl MatchRng {
    /// Create a generator from a seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    /// Next raw 32-bit value.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        // high bits of an LCG are the well-mixed ones
        (self.state >> 32) as u32
    }

    /// Uniform integer in `min..=max`. Returns `min` if the range is empty.
    pub fn range_inclusive(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = u64::from(max.abs_diff(min)) + 1;
        let offset = u64::from(self.next_u32()) % span;
        // offset < span <= i32 range width, so this stays in range
        min + i32::try_from(offset).unwrap_or(0)
    }

    /// Uniformly distributed unit vector.
    ///
    /// Rejection-samples integer points in a disc so the direction is
    /// isotropic without trigonometry.
    pub fn unit_vector(&mut self) -> Vec2Fixed {
        const SCALE: i32 = 1024;
        loop {
            let x = self.range_inclusive(-SCALE, SCALE);
            let y = self.range_inclusive(-SCALE, SCALE);
            let len_sq = i64::from(x) * i64::from(x) + i64::from(y) * i64::from(y);
            if len_sq == 0 || len_sq > i64::from(SCALE) * i64::from(SCALE) {
                continue;
            }
            return Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y)).normalize();
        }
    }

    /// Uniform integer point inside a disc of `radius` around `center`.
    pub fn point_in_disc(&mut self, center: Vec2Fixed, radius: u32) -> Vec2Fixed {
        let r = i32::try_from(radius).unwrap_or(i32::MAX);
        let r_sq = i64::from(r) * i64::from(r);
        loop {
            let x = self.range_inclusive(-r, r);
            let y = self.range_inclusive(-r, r);
            if i64::from(x) * i64::from(x) + i64::from(y) * i64::from(y) <= r_sq {
                return center + Vec2Fixed::from_int(x, y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = MatchRng::new(42);
        let mut b = MatchRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = MatchRng::new(1);
        let mut b = MatchRng::new(2);
        let same = (0..16).filter(|_| a.next_u32() == b.next_u32()).count();
        assert!(same < 16);
    }

    #[test]
    fn test_range_is_inclusive_and_bounded() {
        let mut rng = MatchRng::new(7);
        let mut seen_min = false;
        let mut seen_max = false;
        for _ in 0..2000 {
            let v = rng.range_inclusive(3, 6);
            assert!((3..=6).contains(&v));
            seen_min |= v == 3;
            seen_max |= v == 6;
        }
        assert!(seen_min && seen_max);
        assert_eq!(rng.range_inclusive(5, 5), 5);
    }

    #[test]
    fn test_point_in_disc_stays_inside() {
        let mut rng = MatchRng::new(99);
        let center = Vec2Fixed::from_int(1000, 1000);
        for _ in 0..200 {
            let p = rng.point_in_disc(center, 200);
            assert!(p.within(center, Fixed::from_num(200)));
        }
    }

    #[test]
    fn test_unit_vector_has_unit_length() {
        let mut rng = MatchRng::new(5);
        let eps = Fixed::ONE / Fixed::from_num(1000);
        for _ in 0..50 {
            let v = rng.unit_vector();
            assert!((v.length() - Fixed::ONE).abs() < eps);
        }
    }
}
