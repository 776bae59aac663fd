//! Laplace noise sampling for the differential-privacy strategies.

use rand::Rng;

/// Draws one sample from Laplace(0, `scale`) by inverse transform.
///
/// A non-positive or non-finite scale yields no noise.
pub fn laplace<R: Rng + ?Sized>(rng: &mut R, scale: f64) -> f64 {
    if !(scale.is_finite() && scale > 0.0) {
        return 0.0;
    }
    // u in (0, 1); zero would map to an infinite sample.
    let u = rng.random::<f64>().max(f64::MIN_POSITIVE);
    if u < 0.5 {
        scale * (2.0 * u).ln()
    } else {
        -scale * (2.0 * (1.0 - u)).ln()
    }
}
