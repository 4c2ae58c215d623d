//! Gravity-well attention
//!
//! A scoring-and-aggregation scheme where the affinity between a query and a
//! key grows with their combined mass (L2 norm, a proxy for signal energy)
//! and shrinks with the square of their cosine distance. The inverse-square
//! form is a gravity analogy, not a physical law: a more aligned, more
//! energetic key pulls the aggregate harder.
//!
//! Scores optionally pass through a max-subtracted softmax so they sum to 1;
//! the output is the score-weighted elementwise sum of the value tensors.

use crate::tensor::{Element, Tensor4D};
use crate::{GravwellError, GravwellResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for one attention invocation. Immutable per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttentionParams {
    /// Scales the gravitational score. Must be >= 0.
    pub mass_scale: f64,
    /// Floor on the cosine distance, avoiding division by zero. Must be > 0.
    pub min_distance: f64,
    /// Softmax sharpness divisor. Low values sharpen toward the single
    /// best-aligned key, high values flatten toward a uniform average.
    /// Must be > 0.
    pub temperature: f64,
    /// Normalize scores to sum to 1 before aggregation.
    pub use_softmax: bool,
}

impl Default for AttentionParams {
    fn default() -> Self {
        Self {
            mass_scale: 1.0,
            min_distance: 0.1,
            temperature: 1.0,
            use_softmax: true,
        }
    }
}

impl AttentionParams {
    /// Reject invalid configurations before any data-dependent work.
    pub fn validate(&self) -> GravwellResult<()> {
        if !(self.mass_scale >= 0.0 && self.mass_scale.is_finite()) {
            return Err(GravwellError::InvalidParameter(format!(
                "mass_scale must be finite and >= 0, got {}",
                self.mass_scale
            )));
        }
        if !(self.min_distance > 0.0) {
            return Err(GravwellError::InvalidParameter(format!(
                "min_distance must be > 0, got {}",
                self.min_distance
            )));
        }
        if !(self.temperature > 0.0) {
            return Err(GravwellError::InvalidParameter(format!(
                "temperature must be > 0, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Cosine distance `1 - (a.b)/(|a||b|)` over the flattened buffers.
///
/// Returns `None` when either norm is zero: the distance is undefined there
/// and callers substitute their configured floor. The tensors must hold the
/// same number of elements (shapes need not match).
pub fn cosine_distance<T: Element>(a: &Tensor4D<T>, b: &Tensor4D<T>) -> Option<f64> {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.data().iter().zip(b.data()) {
        let (x, y) = (x.as_f64(), y.as_f64());
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = (norm_a * norm_b).sqrt();
    if denom > 0.0 {
        Some(1.0 - dot / denom)
    } else {
        None
    }
}

/// Attention scores for a query against a set of keys, before aggregation.
///
/// `raw_score[i] = mass_scale * mass(q) * mass(k[i]) / max(dist, min_distance)^2`,
/// divided by the temperature, then (optionally) softmax-normalized.
fn well_scores<T: Element>(
    query: &Tensor4D<T>,
    keys: &[&Tensor4D<T>],
    params: &AttentionParams,
) -> Vec<f64> {
    let query_mass = query.mass();
    let mut scores: Vec<f64> = keys
        .iter()
        .map(|key| {
            let dist = cosine_distance(query, key)
                .unwrap_or(params.min_distance)
                .max(params.min_distance);
            params.mass_scale * query_mass * key.mass() / (dist * dist)
        })
        .collect();

    for s in &mut scores {
        *s /= params.temperature;
    }

    if params.use_softmax {
        // Max subtraction for numerical stability.
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        for s in &mut scores {
            *s = (*s - max).exp();
        }
        let sum: f64 = scores.iter().sum();
        if sum > 0.0 {
            for s in &mut scores {
                *s /= sum;
            }
        } else {
            // Degenerate but valid data state: leave scores at zero.
            debug!("softmax sum is zero, leaving scores unnormalized");
            for s in &mut scores {
                *s = 0.0;
            }
        }
    }

    scores
}

/// Distance/mass-weighted attention over N (key, value) pairs.
///
/// `keys` and `values` must have equal length N >= 1; the values must all
/// share one shape, which the output inherits. The query and each key must
/// hold the same element count so the cosine metric is defined, but need not
/// share the output's shape. Inputs are never mutated; the output is a fresh
/// allocation owned by the caller.
pub fn gravity_well_attention<T: Element>(
    query: &Tensor4D<T>,
    keys: &[&Tensor4D<T>],
    values: &[&Tensor4D<T>],
    params: &AttentionParams,
) -> GravwellResult<Tensor4D<T>> {
    params.validate()?;

    if keys.is_empty() || keys.len() != values.len() {
        return Err(GravwellError::ArityMismatch {
            keys: keys.len(),
            values: values.len(),
        });
    }
    for value in &values[1..] {
        if !value.same_shape(values[0]) {
            return Err(GravwellError::ShapeMismatch {
                expected: values[0].dims(),
                got: value.dims(),
            });
        }
    }
    for key in keys {
        if key.len() != query.len() {
            return Err(GravwellError::ShapeMismatch {
                expected: query.dims(),
                got: key.dims(),
            });
        }
    }

    let scores = well_scores(query, keys, params);

    let mut output = Tensor4D::zeros(values[0].dims());
    output
        .data_mut()
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, slot)| {
            let mut acc = 0.0;
            for (score, value) in scores.iter().zip(values) {
                acc += score * value.data()[i].as_f64();
            }
            *slot = T::from_f64_lossy(acc);
        });

    Ok(output)
}
