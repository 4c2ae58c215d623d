//! Spiral receptive fields
//!
//! A convolution neighborhood mask whose included taps follow a
//! logarithmic-spiral arc instead of a dense square or disc. A cell is part
//! of the receptive field when its radial distance from the kernel center
//! falls inside the spiral locus at its angle, so the included-cell count
//! grows along the arc and the sampling is anisotropic and
//! rotation-parameterized.

use crate::tensor::{Element, Tensor4D};
use crate::{GravwellError, GravwellResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Parameters for a spiral kernel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpiralKernelParams {
    /// Side of the square neighborhood. Must be odd and >= 1.
    pub kernel_size: usize,
    /// Full turns the spiral locus makes from center to edge. Must be > 0.
    pub num_rotations: f64,
}

impl Default for SpiralKernelParams {
    fn default() -> Self {
        Self {
            kernel_size: 7,
            num_rotations: 2.0,
        }
    }
}

impl SpiralKernelParams {
    /// Reject invalid configurations at construction time.
    pub fn validate(&self) -> GravwellResult<()> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(GravwellError::InvalidParameter(format!(
                "kernel_size must be odd and >= 1, got {}",
                self.kernel_size
            )));
        }
        if !(self.num_rotations > 0.0) {
            return Err(GravwellError::InvalidParameter(format!(
                "num_rotations must be > 0, got {}",
                self.num_rotations
            )));
        }
        Ok(())
    }
}

/// Weighting mask over the `kernel_size x kernel_size` neighborhood.
///
/// Included cells carry weight 1, excluded cells 0. A cell at `(x, y)` is
/// included iff `distance <= spiral_radius * center * 1.5`, where
/// `spiral_radius = (atan2(dy, dx) + pi) / (2 pi num_rotations)`. The center
/// tap is always included.
pub fn spiral_mask(params: &SpiralKernelParams) -> GravwellResult<Array2<f64>> {
    params.validate()?;

    let k = params.kernel_size;
    let center = (k as f64 - 1.0) / 2.0;
    let mut mask = Array2::zeros((k, k));

    for y in 0..k {
        for x in 0..k {
            let dx = x as f64 - center;
            let dy = y as f64 - center;
            let distance = (dx * dx + dy * dy).sqrt();
            // Angle mapped to [0, 2pi).
            let angle = dy.atan2(dx) + PI;
            let spiral_radius = angle / (2.0 * PI * params.num_rotations);
            if distance <= spiral_radius * center * 1.5 {
                mask[[y, x]] = 1.0;
            }
        }
    }

    Ok(mask)
}

/// Number of included taps in a mask. Pinned counts serve as regression
/// fixtures: (11, 1.0) -> 55, (11, 2.0) -> 14.
pub fn active_taps(mask: &Array2<f64>) -> usize {
    mask.iter().filter(|&&w| w > 0.0).count()
}

/// Convolution-style aggregation under a spiral mask.
///
/// For every (batch, channel) plane, slides the `kernel_size` window over
/// the spatial axes with the given stride and zero padding, and emits the
/// sum of input x mask over the neighborhood normalized by the included-cell
/// count. Output spatial size per axis is
/// `floor((input + 2 * padding - kernel_size) / stride) + 1`.
pub fn spiral_convolve<T: Element>(
    input: &Tensor4D<T>,
    params: &SpiralKernelParams,
    stride: usize,
    padding: usize,
) -> GravwellResult<Tensor4D<T>> {
    if stride == 0 {
        return Err(GravwellError::InvalidParameter(
            "stride must be >= 1".into(),
        ));
    }
    let mask = spiral_mask(params)?;
    let taps = active_taps(&mask) as f64;

    let [batch, depth, height, width] = input.dims();
    let k = params.kernel_size;
    let out_extent = |extent: usize| {
        (extent + 2 * padding)
            .checked_sub(k)
            .map(|v| v / stride + 1)
            .unwrap_or(0)
    };
    let out_h = out_extent(height);
    let out_w = out_extent(width);

    let mut output = Tensor4D::zeros([batch, depth, out_h, out_w]);
    for b in 0..batch {
        for c in 0..depth {
            for oy in 0..out_h {
                for ox in 0..out_w {
                    let mut acc = 0.0;
                    for ky in 0..k {
                        for kx in 0..k {
                            let weight = mask[[ky, kx]];
                            if weight == 0.0 {
                                continue;
                            }
                            let iy = (oy * stride + ky) as isize - padding as isize;
                            let ix = (ox * stride + kx) as isize - padding as isize;
                            if iy < 0
                                || ix < 0
                                || iy >= height as isize
                                || ix >= width as isize
                            {
                                continue; // zero padding
                            }
                            acc += weight
                                * input.get(b, c, iy as usize, ix as usize).as_f64();
                        }
                    }
                    output.set(b, c, oy, ox, T::from_f64_lossy(acc / taps));
                }
            }
        }
    }

    Ok(output)
}
