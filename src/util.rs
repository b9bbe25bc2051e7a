//! Miscellaneous utility functions.

/// Wraps a longitudinal position onto a ring of the given length,
/// returning a value in `[0, length)`.
///
/// A non-positive `length` maps every position to zero.
pub fn wrap_position(pos: f64, length: f64) -> f64 {
    if length <= 0.0 || !pos.is_finite() {
        return 0.0;
    }
    let wrapped = pos.rem_euclid(length);
    // `rem_euclid` rounds up to `length` for tiny negative inputs
    if wrapped >= length {
        0.0
    } else {
        wrapped
    }
}

/// The distance travelled forwards around a ring of the given length
/// to get from `from` to `to`.
pub fn forward_distance(from: f64, to: f64, length: f64) -> f64 {
    wrap_position(to - from, length)
}
