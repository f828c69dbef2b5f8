//! Deposit placement and spawn points.
//!
//! Deposits are scattered in two passes: an outer pass that rejects points
//! inside the central half of the map, and an inner pass that drops a small
//! cluster inside a disc around the base. Both draw from the world's
//! [`MatchRng`](crate::rng::MatchRng), so the layout depends only on the
//! seed.

use crate::components::{PlayerId, Team};
use crate::entities::StaticKind;
use crate::math::{Fixed, Vec2Fixed};
use crate::player::Player;
use crate::world::World;

/// Order in which deposit kinds are placed in each pass.
const DEPOSIT_ORDER: [StaticKind; 3] = [StaticKind::Stone, StaticKind::Bush, StaticKind::Tree];

impl World {
    /// Scatter resource nodes over the map.
    pub fn populate_deposits(&mut self) {
        let map = self.tuning().map.clone();
        let deposits = map.deposits;
        let (width, height) = (
            i32::try_from(map.width).unwrap_or(i32::MAX),
            i32::try_from(map.height).unwrap_or(i32::MAX),
        );
        let border = i32::try_from(deposits.border).unwrap_or(0);
        let (quarter_x, quarter_y) = (width / 4, height / 4);

        for kind in DEPOSIT_ORDER {
            let count = match kind {
                StaticKind::Stone => deposits.outer_stones,
                StaticKind::Bush => deposits.outer_bushes,
                _ => deposits.outer_trees,
            };
            for _ in 0..count {
                let position = loop {
                    let x = self.rng.range_inclusive(border, width - border);
                    let y = self.rng.range_inclusive(border, height - border);
                    let central = x > quarter_x
                        && x < width - quarter_x
                        && y > quarter_y
                        && y < height - quarter_y;
                    if !central {
                        break Vec2Fixed::from_int(x, y);
                    }
                };
                self.spawn_resource(kind, position);
            }
        }

        let center = self.tuning().center();
        for kind in DEPOSIT_ORDER {
            let count = match kind {
                StaticKind::Stone => deposits.inner_stones,
                StaticKind::Bush => deposits.inner_bushes,
                _ => deposits.inner_trees,
            };
            for _ in 0..count {
                let position = self.rng.point_in_disc(center, deposits.inner_radius);
                self.spawn_resource(kind, position);
            }
        }

        tracing::debug!(count = self.statics.len(), "Deposits placed");
    }

    /// Pick a spawn point on the team's ring around the centre.
    ///
    /// Tries a bounded number of random directions for a point clear of
    /// resources and structures; if all are blocked the last candidate is used.
    pub fn find_spawn_point(&mut self, team: Team) -> Vec2Fixed {
        let tuning = self.tuning();
        let center = tuning.center();
        let ring = Fixed::from_num(tuning.kit(team).spawn_radius);
        let radius = Fixed::from_num(tuning.player.radius);
        let attempts = tuning.teams.spawn_attempts.max(1);

        let mut candidate = center;
        for _ in 0..attempts {
            candidate = center + self.rng.unit_vector().scale(ring);
            if !self.blocked_for_placement(candidate, radius) {
                break;
            }
        }
        candidate
    }

    /// Put a fresh player with the team kit on the map, replacing any
    /// previous state under the same id.
    pub fn spawn_player(&mut self, id: PlayerId, team: Team) {
        let position = self.find_spawn_point(team);
        let player = Player::new(id, team, position, self.tuning());
        self.players.insert(id, player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    #[test]
    fn test_deposit_counts() {
        let mut world = World::new(Tuning::default(), 42);
        world.populate_deposits();
        let count = |kind| world.statics.values().filter(|o| o.kind == kind).count();
        assert_eq!(count(StaticKind::Bush), 76);
        assert_eq!(count(StaticKind::Tree), 108);
        assert_eq!(count(StaticKind::Stone), 44);
        assert_eq!(world.grid.len(), world.statics.len());
    }

    #[test]
    fn test_outer_deposits_avoid_centre() {
        let mut world = World::new(Tuning::default(), 42);
        world.populate_deposits();
        let center = world.tuning().center();
        let inner = Fixed::from_num(200);
        for object in world.statics.values() {
            let p = object.position;
            let in_square = p.x > Fixed::from_num(500)
                && p.x < Fixed::from_num(1500)
                && p.y > Fixed::from_num(500)
                && p.y < Fixed::from_num(1500);
            if in_square {
                assert!(p.within(center, inner), "stray deposit at {p:?}");
            }
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let mut a = World::new(Tuning::default(), 9);
        let mut b = World::new(Tuning::default(), 9);
        a.populate_deposits();
        b.populate_deposits();
        assert_eq!(a.statics, b.statics);
    }

    #[test]
    fn test_spawn_on_team_ring() {
        let mut world = World::new(Tuning::default(), 4);
        world.spawn_player(1, Team::Raider);
        world.spawn_player(2, Team::Defender);
        let center = world.tuning().center();
        let tolerance = Fixed::ONE;

        let raider = world.player(1).unwrap();
        assert!((raider.position.distance(center) - Fixed::from_num(800)).abs() < tolerance);
        assert_eq!(raider.resources, world.tuning().teams.raider.resources);

        let defender = world.player(2).unwrap();
        assert!((defender.position.distance(center) - Fixed::from_num(240)).abs() < tolerance);
    }
}
