//! Temporal windowing
//!
//! A bounded, chronologically ordered history of tensor snapshots, consumed
//! as the key/value set for self-attention over time. The window is a ring
//! buffer: once full, each new observation evicts the oldest snapshot. The
//! wraparound detail never leaks: the window is exposed only as a finite,
//! restartable iterator in chronological order, never as the raw buffer.
//!
//! The processor is deliberately not thread-safe: `observe` mutates the
//! cursor and buffer through `&mut self`, so concurrent use on one instance
//! is ruled out at compile time. Callers that share a processor across
//! threads wrap it in a mutex.

use crate::attention::{gravity_well_attention, AttentionParams};
use crate::tensor::{Element, Tensor4D};
use crate::{GravwellError, GravwellResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for a temporal processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalConfig {
    /// Maximum number of snapshots retained. Must be >= 1.
    pub window_size: usize,
    /// Snapshot admission stride: observation `n` (0-based) is recorded
    /// into the window iff `n % stride == 0`. Must be >= 1.
    pub stride: usize,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            window_size: 8,
            stride: 1,
        }
    }
}

impl TemporalConfig {
    /// Reject invalid configurations at construction time.
    pub fn validate(&self) -> GravwellResult<()> {
        if self.window_size == 0 {
            return Err(GravwellError::InvalidParameter(
                "window_size must be >= 1".into(),
            ));
        }
        if self.stride == 0 {
            return Err(GravwellError::InvalidParameter(
                "stride must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Fill state of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowState {
    /// The buffer has not wrapped yet.
    Filling,
    /// The buffer has wrapped at least once; every slot holds a snapshot.
    Filled,
}

/// Stateful sliding-window aggregator.
///
/// Each `observe` deep-copies the incoming tensor into the ring, then runs
/// gravity-well self-attention across the current window (query = oldest
/// snapshot, keys = values = the whole window) and returns the aggregate.
#[derive(Debug, Clone)]
pub struct TemporalProcessor<T: Element> {
    config: TemporalConfig,
    params: AttentionParams,
    slots: Vec<Tensor4D<T>>,
    position: usize,
    state: WindowState,
    observations: u64,
}

impl<T: Element> TemporalProcessor<T> {
    /// Create a processor that aggregates with default [`AttentionParams`].
    pub fn new(config: TemporalConfig) -> GravwellResult<Self> {
        Self::with_params(config, AttentionParams::default())
    }

    /// Create a processor with explicit attention parameters.
    pub fn with_params(
        config: TemporalConfig,
        params: AttentionParams,
    ) -> GravwellResult<Self> {
        config.validate()?;
        params.validate()?;
        let capacity = config.window_size;
        Ok(Self {
            config,
            params,
            slots: Vec::with_capacity(capacity),
            position: 0,
            state: WindowState::Filling,
            observations: 0,
        })
    }

    /// Ingest one tensor for this time step and return the window aggregate.
    ///
    /// All fallible checks run before any mutation: a failed `observe`
    /// neither advances the cursor nor evicts a snapshot. The caller keeps
    /// ownership of `tensor` (the window stores a deep copy) and owns the
    /// returned aggregate.
    pub fn observe(&mut self, tensor: &Tensor4D<T>) -> GravwellResult<Tensor4D<T>> {
        if let Some(resident) = self.slots.first() {
            if !resident.same_shape(tensor) {
                return Err(GravwellError::ShapeMismatch {
                    expected: resident.dims(),
                    got: tensor.dims(),
                });
            }
        }

        let admit = self.observations % self.config.stride as u64 == 0;
        self.observations += 1;

        if admit {
            if self.slots.len() < self.config.window_size {
                self.slots.push(tensor.clone());
            } else {
                // Overwriting releases the evicted snapshot.
                self.slots[self.position] = tensor.clone();
            }
            self.position = (self.position + 1) % self.config.window_size;
            if self.position == 0 && self.state == WindowState::Filling {
                self.state = WindowState::Filled;
                debug!(window_size = self.config.window_size, "temporal window filled");
            }
        }

        let window: Vec<&Tensor4D<T>> = self.window().collect();
        let query = window[0];
        gravity_well_attention(query, &window, &window, &self.params)
    }

    /// The current window in chronological order (oldest first).
    ///
    /// Finite and restartable; yields between 1 and `window_size` snapshots
    /// once at least one observation has been admitted.
    pub fn window(&self) -> impl Iterator<Item = &Tensor4D<T>> {
        // While filling, position == slots.len(), so the first half is empty
        // and the second is the whole (already chronological) prefix.
        let split = self.position.min(self.slots.len());
        self.slots[split..].iter().chain(self.slots[..split].iter())
    }

    /// Number of snapshots currently held.
    pub fn window_len(&self) -> usize {
        self.slots.len()
    }

    /// Fill state of the window.
    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Total observations ingested, admitted or not.
    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn config(&self) -> &TemporalConfig {
        &self.config
    }
}
