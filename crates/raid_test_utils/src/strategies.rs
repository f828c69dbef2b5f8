//! Proptest strategies for simulation inputs.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing of the engine.

use proptest::prelude::*;
use raid_core::action::{ActionMap, PlayerAction};
use raid_core::components::{PlayerId, Tool};
use raid_core::math::{Fixed, Vec2Fixed};

/// Any valid action.
pub fn arb_action() -> impl Strategy<Value = PlayerAction> {
    (0u8..=2, 0u8..=2, 0u8..=9, 0u8..=1, 0u8..=4).prop_map(
        |(move_x, move_y, tool, trigger, turn)| PlayerAction {
            move_x,
            move_y,
            tool,
            trigger,
            turn,
        },
    )
}

/// Raw bins with at least one field out of range.
pub fn arb_invalid_bins() -> impl Strategy<Value = [i64; 5]> {
    let limits = [2i64, 2, 9, 1, 4];
    (0usize..5, prop_oneof![-50i64..0, 10i64..50], arb_action()).prop_map(
        move |(field, bad, action)| {
            let mut bins = action.bins().map(i64::from);
            bins[field] = if bad < 0 { bad } else { limits[field] + bad };
            bins
        },
    )
}

/// A tool slot (never 0).
pub fn arb_tool() -> impl Strategy<Value = Tool> {
    (1u8..=9).prop_filter_map("slot", Tool::from_slot)
}

/// One action map covering exactly `players`.
pub fn arb_action_map(players: Vec<PlayerId>) -> impl Strategy<Value = ActionMap> {
    proptest::collection::vec(arb_action(), players.len())
        .prop_map(move |actions| players.iter().copied().zip(actions).collect())
}

/// A stream of `1..max_len` action maps for `players`.
pub fn arb_action_stream(
    players: Vec<PlayerId>,
    max_len: usize,
) -> impl Strategy<Value = Vec<ActionMap>> {
    proptest::collection::vec(arb_action_map(players), 1..max_len)
}

/// Integer position on a 2000x2000 map.
pub fn arb_map_position() -> impl Strategy<Value = Vec2Fixed> {
    (0i32..2000, 0i32..2000).prop_map(|(x, y)| Vec2Fixed::from_int(x, y))
}

/// Integer position that may be off the map.
pub fn arb_any_position() -> impl Strategy<Value = Vec2Fixed> {
    (-500i32..2500, -500i32..2500).prop_map(|(x, y)| Vec2Fixed::from_int(x, y))
}

/// Damage amounts (1-100).
pub fn arb_damage() -> impl Strategy<Value = Fixed> {
    (1i32..100).prop_map(Fixed::from_num)
}

/// World seeds.
pub fn arb_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}
