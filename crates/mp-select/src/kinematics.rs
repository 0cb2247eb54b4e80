//! Angular helpers.

use std::f64::consts::{PI, TAU};

/// Azimuthal difference `phi1 - phi2` wrapped into `(-pi, pi]`.
///
/// Non-finite inputs propagate as NaN.
pub fn corrected_delta_phi(phi1: f64, phi2: f64) -> f64 {
    let d = phi1 - phi2;
    if !d.is_finite() {
        return f64::NAN;
    }
    // rem_euclid lands in [0, 2pi); shift the upper half down.
    let r = d.rem_euclid(TAU);
    if r > PI { r - TAU } else { r }
}
