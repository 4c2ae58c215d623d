//! Dense 4D tensor container
//!
//! A `Tensor4D<T>` owns a flat buffer addressed by four axis sizes,
//! conventionally (batch, depth, height, width), stored row-major with the
//! last axis varying fastest. All higher-level operators in this crate work
//! on references to this container; outputs are always freshly allocated.

use crate::{GravwellError, GravwellResult};
use num_traits::{NumCast, Zero};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::{Add, Mul};

/// Numeric element types a tensor can hold.
///
/// Implemented for 16/32/64-bit floats and 16/32-bit signed/unsigned
/// integers. Scoring and aggregation always accumulate in `f64` and cast
/// back on write-out; integer casts truncate toward zero.
pub trait Element:
    Copy
    + PartialOrd
    + Debug
    + Send
    + Sync
    + Zero
    + NumCast
    + Add<Output = Self>
    + Mul<Output = Self>
    + 'static
{
    /// Lossy widening to f64 (the accumulation type).
    #[inline]
    fn as_f64(self) -> f64 {
        self.to_f64().unwrap_or(0.0)
    }

    /// Lossy narrowing from f64. Values outside the target range (and NaN)
    /// collapse to zero.
    #[inline]
    fn from_f64_lossy(value: f64) -> Self {
        NumCast::from(value).unwrap_or_else(Self::zero)
    }
}

impl Element for half::f16 {}
impl Element for f32 {}
impl Element for f64 {}
impl Element for i16 {}
impl Element for i32 {}
impl Element for u16 {}
impl Element for u32 {}

/// Dense 4D tensor over axes (batch, depth, height, width).
///
/// The buffer length is always the product of the four axis sizes. A clone
/// is a distinct buffer; tensors never alias each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor4D<T: Element> {
    dims: [usize; 4],
    data: Vec<T>,
}

impl<T: Element> Tensor4D<T> {
    /// Create a zero-filled tensor.
    pub fn zeros(dims: [usize; 4]) -> Self {
        Self {
            dims,
            data: vec![T::zero(); dims.iter().product()],
        }
    }

    /// Create a tensor filled with a constant.
    pub fn filled(dims: [usize; 4], value: T) -> Self {
        Self {
            dims,
            data: vec![value; dims.iter().product()],
        }
    }

    /// Create a tensor from caller-supplied data in row-major order.
    ///
    /// Fails with `DataLength` if the buffer length does not match the
    /// product of the dims.
    pub fn from_vec(dims: [usize; 4], data: Vec<T>) -> GravwellResult<Self> {
        let expected: usize = dims.iter().product();
        if data.len() != expected {
            return Err(GravwellError::DataLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self { dims, data })
    }

    /// Axis sizes as (batch, depth, height, width).
    #[inline]
    pub fn dims(&self) -> [usize; 4] {
        self.dims
    }

    /// Total element count.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read-only view of the flat buffer, row-major.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable view of the flat buffer, row-major.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Flat offset for a 4-tuple index. The single place index arithmetic
    /// lives; every accessor goes through it.
    ///
    /// # Panics
    /// Panics if any index is out of range for its axis. Out-of-bounds
    /// access is a programmer error, not a recoverable condition.
    #[inline]
    fn offset(&self, idx: [usize; 4]) -> usize {
        for axis in 0..4 {
            assert!(
                idx[axis] < self.dims[axis],
                "index {} out of bounds for axis {} (size {})",
                idx[axis],
                axis,
                self.dims[axis]
            );
        }
        ((idx[0] * self.dims[1] + idx[1]) * self.dims[2] + idx[2]) * self.dims[3] + idx[3]
    }

    /// Read one element.
    ///
    /// # Panics
    /// Panics on an out-of-range index.
    #[inline]
    pub fn get(&self, i0: usize, i1: usize, i2: usize, i3: usize) -> T {
        self.data[self.offset([i0, i1, i2, i3])]
    }

    /// Write one element.
    ///
    /// # Panics
    /// Panics on an out-of-range index.
    #[inline]
    pub fn set(&mut self, i0: usize, i1: usize, i2: usize, i3: usize, value: T) {
        let off = self.offset([i0, i1, i2, i3]);
        self.data[off] = value;
    }

    /// Overwrite every element with a constant.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Whether the other tensor has identical axis sizes.
    #[inline]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.dims == other.dims
    }

    fn check_shape(&self, other: &Self) -> GravwellResult<()> {
        if self.same_shape(other) {
            Ok(())
        } else {
            Err(GravwellError::ShapeMismatch {
                expected: self.dims,
                got: other.dims,
            })
        }
    }

    /// Elementwise sum into a fresh tensor. Fails with `ShapeMismatch` if
    /// the shapes differ; shapes are never coerced.
    pub fn elementwise_add(&self, other: &Self) -> GravwellResult<Self> {
        self.check_shape(other)?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| a + b)
            .collect();
        Ok(Self {
            dims: self.dims,
            data,
        })
    }

    /// Elementwise product into a fresh tensor. Fails with `ShapeMismatch`
    /// if the shapes differ.
    pub fn elementwise_mul(&self, other: &Self) -> GravwellResult<Self> {
        self.check_shape(other)?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| a * b)
            .collect();
        Ok(Self {
            dims: self.dims,
            data,
        })
    }

    /// Clamp negatives to zero in place. A no-op for unsigned elements.
    pub fn relu(&mut self) {
        let zero = T::zero();
        for v in &mut self.data {
            if *v < zero {
                *v = zero;
            }
        }
    }

    /// Scale every element by a factor, accumulating in f64.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v = T::from_f64_lossy(v.as_f64() * factor);
        }
    }

    /// Fill with uniform random values in `[min, max)`. Test-fixture helper;
    /// takes the caller's RNG so runs stay reproducible.
    pub fn random_fill<R: Rng + ?Sized>(&mut self, min: f64, max: f64, rng: &mut R) {
        for v in &mut self.data {
            *v = T::from_f64_lossy(rng.gen_range(min..max));
        }
    }

    /// Euclidean (L2) norm over the flattened buffer, the tensor's "mass".
    /// Zero for an empty or all-zero tensor.
    pub fn mass(&self) -> f64 {
        self.data
            .iter()
            .map(|v| {
                let x = v.as_f64();
                x * x
            })
            .sum::<f64>()
            .sqrt()
    }
}
