//! Stochastic primitives of the diffusion model.
//!
//! Every function takes the RNG explicitly so callers decide whether draws
//! come from a seeded stream or from entropy.

use rand::Rng;
use rand_distr::StandardNormal;

/// Mean of the confidence-weight distribution.
pub const CONFIDENCE_MEAN: f64 = 0.5;

/// Standard deviation of the confidence-weight distribution.
pub const CONFIDENCE_STD_DEV: f64 = 0.22;

/// Where a freshly activated node takes its opinion from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpinionSource {
    /// Designated starter: polarized opinion, 0 or 1
    Seed,

    /// Current opinion of the node whose attempt succeeded
    Activator(f64),
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Uniform draw in [0, 1), compared against `p_active` for one edge attempt.
pub fn draw_activation<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen::<f64>()
}

/// Returns true when one edge attempt transmits activation.
pub fn transmits<R: Rng + ?Sized>(rng: &mut R, p_active: f64) -> bool {
    draw_activation(rng) < p_active
}

/// Uniform draw in [0, 1) for construction-time node parameters.
pub fn draw_uniform_unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen::<f64>()
}

/// Mixing weight between a node's own opinion and its neighborhood mean.
///
/// Normal(0.5, 0.22), redrawn until the sample lands in [0, 1].
pub fn draw_confidence_weight<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let z: f64 = rng.sample(StandardNormal);
        let weight = CONFIDENCE_MEAN + CONFIDENCE_STD_DEV * z;
        if (0.0..=1.0).contains(&weight) {
            return weight;
        }
    }
}

/// Opinion assigned at activation time.
///
/// Seeds flip a fair coin between the poles. Everyone else lands uniformly
/// in the half of [0, 1] that contains the activator's opinion, rounded to
/// two decimals, so opinions drift toward the side they started near.
pub fn derive_opinion<R: Rng + ?Sized>(source: OpinionSource, rng: &mut R) -> f64 {
    match source {
        OpinionSource::Seed => {
            if rng.gen::<f64>() < 0.5 {
                0.0
            } else {
                1.0
            }
        }
        OpinionSource::Activator(opinion) => {
            let drawn = if opinion < 0.5 {
                rng.gen_range(0.0..0.5)
            } else {
                rng.gen_range(0.5..=1.0)
            };
            round2(drawn)
        }
    }
}
