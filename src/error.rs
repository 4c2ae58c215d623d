//! Error types for gravity-well tensor operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GravwellError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: [usize; 4],
        got: [usize; 4],
    },

    #[error("arity mismatch: {keys} keys vs {values} values")]
    ArityMismatch { keys: usize, values: usize },

    #[error("buffer length {got} does not match dims product {expected}")]
    DataLength { expected: usize, got: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("backend error: {0}")]
    Backend(String),
}
