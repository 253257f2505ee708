//! ==============================================================================
//! mapper.rs - dial value to selection index
//! ==============================================================================
//!
//! purpose:
//!     the one pure function in the system: map a conditioned dial value to
//!     a zero-based selection index. the dial range [0, range_max) is cut
//!     into n equal-width zones; the top remainder zone is folded into the
//!     last index by the clamp.
//!
//! invariants:
//!     - for any value in [0, range_max), the result is in [0, n)
//!     - monotonic non-decreasing in value
//!     - n == 1 maps everything to 0
//!
//! relationships:
//!     - called by: runloop.rs (after the conditioner emits)
//!
//! ==============================================================================

/// map a dial value to a selection index
///
/// `zone_width = range_max / n` with integer division, so the last zone
/// absorbs the remainder; values at or past `n * zone_width` clamp to the
/// final index.
pub fn map_to_index(value: u32, range_max: u32, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }

    // a selection space larger than the dial range degenerates to one raw
    // step per zone
    let zone_width = (range_max / n as u32).max(1);
    let index = (value / zone_width) as usize;
    index.min(n - 1)
}
