//! Inverse-law derivation: Boyle's law with simulated measurement noise.
//!
//! Pressure is never set directly by the user; it is recomputed from volume
//! each time the volume model notifies. The transform is `p = c / V` with a
//! uniformly sampled multiplicative perturbation, so repeated readings at
//! the same volume scatter the way a real gauge would.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// `derived = constant / source`, with optional multiplicative noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InverseLaw {
    /// Boyle constant `c` in kPa*cc.
    pub constant: f64,
    /// Noise fraction: the perturbation is uniform in
    /// `[-noise * base, +noise * base]`. Must be non-negative; zero means
    /// exact.
    pub noise: f64,
}

impl InverseLaw {
    /// Law with the given constant and noise fraction.
    pub fn new(constant: f64, noise: f64) -> Self {
        debug_assert!(noise >= 0.0, "noise must be a positive number");
        InverseLaw { constant, noise }
    }

    /// Noise-free law, fully deterministic.
    pub fn exact(constant: f64) -> Self {
        InverseLaw {
            constant,
            noise: 0.0,
        }
    }

    /// Compute the derived reading for a source value.
    ///
    /// - `noise == 0`: the exact quotient, rounded to `precision` decimals.
    /// - Unbounded quotient (source 0): the sentinel is returned verbatim,
    ///   never clamped - each downstream consumer picks its own policy.
    /// - Otherwise: quotient plus a uniform perturbation within the noise
    ///   band, rounded to `precision` decimals.
    pub fn sample(&self, source: f64, precision: u32) -> f64 {
        let base = self.constant / source;

        if self.noise == 0.0 {
            return round_to(base, precision);
        }
        if !base.is_finite() {
            return base;
        }

        let spread = (self.noise * base).abs();
        if spread == 0.0 {
            return round_to(base, precision);
        }
        let jitter = rand::rng().random_range(-spread..spread);
        round_to(base + jitter, precision)
    }
}

/// Round to a number of decimal places, for display-precision storage of
/// derived readings. Non-finite values pass through untouched.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}
