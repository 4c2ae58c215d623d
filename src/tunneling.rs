//! Quantum-tunneling access
//!
//! A probabilistic memory-read redirection: each element of the output is
//! read either from its own index or, with a distance-shaped probability,
//! from a bounded random offset elsewhere in the tensor (wrapped per axis).
//! The probability model is the closed form
//! `p(d, barrier) = min(base_probability * exp(-d / (temperature * barrier)), 1)`,
//! zeroed entirely beyond `max_distance_factor * barrier`; the per-element
//! stochastic pass consults that same model, so long jumps are exponentially
//! rarer than short ones.
//!
//! The operator takes an explicit RNG handle rather than a process-wide
//! generator, so boundary cases are exactly reproducible under a fixed seed.

use crate::tensor::{Element, Tensor4D};
use crate::{GravwellError, GravwellResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Configuration for one tunneling pass. Immutable per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelingParams {
    /// Probability scale for a zero-distance jump. Must be in [0, 1].
    pub base_probability: f64,
    /// Decay temperature for the probability model. Must be > 0.
    pub temperature: f64,
    /// Caps jump length relative to the tensor's characteristic distance
    /// (`sqrt(element_count)`). Must be >= 0.
    pub max_distance_factor: f64,
    /// Reserved for future probability shaping.
    pub adaptive: bool,
}

impl Default for TunnelingParams {
    fn default() -> Self {
        Self {
            base_probability: 0.1,
            temperature: 1.0,
            max_distance_factor: 0.5,
            adaptive: false,
        }
    }
}

impl TunnelingParams {
    /// Reject invalid configurations before any data-dependent work.
    pub fn validate(&self) -> GravwellResult<()> {
        if !(0.0..=1.0).contains(&self.base_probability) {
            return Err(GravwellError::InvalidParameter(format!(
                "base_probability must be in [0, 1], got {}",
                self.base_probability
            )));
        }
        if !(self.temperature > 0.0) {
            return Err(GravwellError::InvalidParameter(format!(
                "temperature must be > 0, got {}",
                self.temperature
            )));
        }
        if !(self.max_distance_factor >= 0.0 && self.max_distance_factor.is_finite()) {
            return Err(GravwellError::InvalidParameter(format!(
                "max_distance_factor must be finite and >= 0, got {}",
                self.max_distance_factor
            )));
        }
        Ok(())
    }
}

/// Closed-form tunneling probability for a jump of `distance` through an
/// `energy_barrier`.
///
/// Zero beyond `max_distance_factor * energy_barrier`, otherwise the
/// exponential decay capped at 1. Pure; independently testable from the
/// stochastic pass that consults it.
pub fn tunneling_probability(
    distance: f64,
    energy_barrier: f64,
    params: &TunnelingParams,
) -> f64 {
    if energy_barrier <= 0.0 || distance > params.max_distance_factor * energy_barrier {
        return 0.0;
    }
    (params.base_probability * (-distance / (params.temperature * energy_barrier)).exp()).min(1.0)
}

/// Probabilistic long-range read over the whole tensor.
///
/// The output has the input's shape. For each element a candidate jump is
/// sampled (per-axis offsets capped at `max_distance_factor *
/// sqrt(element_count)`, halved for each later axis, wrapped modulo the axis
/// size), its probability evaluated via [`tunneling_probability`], and the
/// read redirected iff a uniform draw lands under it. With
/// `base_probability = 0` the result is a value-for-value copy. The input is
/// never mutated.
pub fn tunneling_access<T: Element, R: Rng + ?Sized>(
    input: &Tensor4D<T>,
    params: &TunnelingParams,
    rng: &mut R,
) -> GravwellResult<Tensor4D<T>> {
    params.validate()?;

    let mut output = input.clone();
    if input.is_empty() {
        return Ok(output);
    }

    let dims = input.dims();
    // The primary axis carries the dominant distance signal; later axes get
    // progressively tighter caps.
    let characteristic = (input.len() as f64).sqrt();
    let cap = params.max_distance_factor * characteristic;
    let axis_caps: [i64; 4] = [
        cap.floor() as i64,
        (cap / 2.0).floor() as i64,
        (cap / 4.0).floor() as i64,
        (cap / 8.0).floor() as i64,
    ];

    let mut redirected = 0usize;
    for i0 in 0..dims[0] {
        for i1 in 0..dims[1] {
            for i2 in 0..dims[2] {
                for i3 in 0..dims[3] {
                    let mut offsets = [0i64; 4];
                    let mut dist_sq = 0.0;
                    for axis in 0..4 {
                        let c = axis_caps[axis];
                        if c > 0 {
                            let off = rng.gen_range(-c..=c);
                            offsets[axis] = off;
                            dist_sq += (off * off) as f64;
                        }
                    }

                    let p = tunneling_probability(dist_sq.sqrt(), characteristic, params);
                    if rng.gen::<f64>() < p {
                        let idx = [i0, i1, i2, i3];
                        let mut target = [0usize; 4];
                        for axis in 0..4 {
                            let wrapped = (idx[axis] as i64 + offsets[axis])
                                .rem_euclid(dims[axis] as i64);
                            target[axis] = wrapped as usize;
                        }
                        let value = input.get(target[0], target[1], target[2], target[3]);
                        output.set(i0, i1, i2, i3, value);
                        redirected += 1;
                    }
                }
            }
        }
    }

    trace!(redirected, total = input.len(), "tunneling pass complete");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_params_validation() {
        assert!(TunnelingParams::default().validate().is_ok());

        let bad = TunnelingParams {
            base_probability: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = TunnelingParams {
            base_probability: -0.1,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = TunnelingParams {
            temperature: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = TunnelingParams {
            max_distance_factor: -1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_probability_zero_at_zero_base() {
        let params = TunnelingParams {
            base_probability: 0.0,
            ..Default::default()
        };
        assert_eq!(tunneling_probability(0.0, 10.0, &params), 0.0);
        assert_eq!(tunneling_probability(3.0, 10.0, &params), 0.0);
    }

    #[test]
    fn test_probability_cutoff_beyond_barrier() {
        let params = TunnelingParams {
            base_probability: 1.0,
            max_distance_factor: 0.5,
            ..Default::default()
        };
        // Cutoff at 0.5 * 10 = 5.
        assert!(tunneling_probability(4.9, 10.0, &params) > 0.0);
        assert_eq!(tunneling_probability(5.1, 10.0, &params), 0.0);
    }

    #[test]
    fn test_probability_monotone_decay_and_cap() {
        let params = TunnelingParams {
            base_probability: 1.0,
            temperature: 1.0,
            max_distance_factor: 10.0,
            ..Default::default()
        };
        let p0 = tunneling_probability(0.0, 10.0, &params);
        let p1 = tunneling_probability(1.0, 10.0, &params);
        let p5 = tunneling_probability(5.0, 10.0, &params);
        assert!(p0 <= 1.0);
        assert!((p0 - 1.0).abs() < 1e-12);
        assert!(p0 > p1 && p1 > p5);
        assert!(p5 > 0.0);
    }

    #[test]
    fn test_zero_probability_is_exact_copy() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut input = Tensor4D::<f64>::zeros([2, 2, 4, 4]);
        input.random_fill(-1.0, 1.0, &mut rng);

        let params = TunnelingParams {
            base_probability: 0.0,
            ..Default::default()
        };
        let out = tunneling_access(&input, &params, &mut rng).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_high_probability_shuffles_something() {
        // Distinguishable per-element values; assert non-identity over the
        // whole tensor rather than any single element.
        let data: Vec<f64> = (0..256).map(|i| i as f64).collect();
        let input = Tensor4D::from_vec([4, 4, 4, 4], data).unwrap();

        let params = TunnelingParams {
            base_probability: 0.5,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let out = tunneling_access(&input, &params, &mut rng).unwrap();

        let changed = out
            .data()
            .iter()
            .zip(input.data())
            .filter(|(a, b)| a != b)
            .count();
        assert!(changed > 0, "expected at least one redirected element");
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let data: Vec<f32> = (0..128).map(|i| i as f32 * 0.5).collect();
        let input = Tensor4D::from_vec([2, 4, 4, 4], data).unwrap();
        let params = TunnelingParams {
            base_probability: 0.3,
            ..Default::default()
        };

        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);
        let a = tunneling_access(&input, &params, &mut rng_a).unwrap();
        let b = tunneling_access(&input, &params, &mut rng_b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_tensor_passes_through() {
        let input = Tensor4D::<f32>::zeros([0, 2, 2, 2]);
        let mut rng = StdRng::seed_from_u64(5);
        let out = tunneling_access(&input, &TunnelingParams::default(), &mut rng).unwrap();
        assert_eq!(out.dims(), [0, 2, 2, 2]);
        assert!(out.is_empty());
    }
}
