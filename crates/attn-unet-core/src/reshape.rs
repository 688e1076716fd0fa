//! Element-count-checked shape reinterpretation
//!
//! A stateless view change between tensor ranks. Target dimensions are
//! validated at construction; the element-count compatibility check happens
//! per call, since it depends on the incoming tensor.

use burn::prelude::*;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReshapeError {
    #[error("target shape {dims:?} has more than one inferred dimension")]
    MultipleInferred { dims: Vec<i64> },

    #[error("target shape {dims:?} contains an invalid dimension")]
    InvalidDimension { dims: Vec<i64> },

    #[error("cannot reshape {count} elements into {dims:?}")]
    IncompatibleElementCount { count: usize, dims: Vec<i64> },
}

/// Reinterprets a tensor's layout without touching its data.
///
/// Target dimensions are positive sizes, with at most one `-1` slot whose
/// size is inferred from the input's element count (typically the batch
/// axis). Pure and parameter-free.
#[derive(Debug, Clone)]
pub struct Reshape<const D: usize> {
    dims: [i64; D],
}

impl<const D: usize> Reshape<D> {
    /// Creates a reshape to the given target dimensions.
    pub fn new(dims: [i64; D]) -> Result<Self, ReshapeError> {
        let inferred = dims.iter().filter(|&&d| d == -1).count();
        if inferred > 1 {
            return Err(ReshapeError::MultipleInferred {
                dims: dims.to_vec(),
            });
        }
        if dims.iter().any(|&d| d == 0 || d < -1) {
            return Err(ReshapeError::InvalidDimension {
                dims: dims.to_vec(),
            });
        }

        Ok(Self { dims })
    }

    /// Target dimensions, with `-1` marking the inferred slot.
    pub fn dims(&self) -> [i64; D] {
        self.dims
    }

    /// Reshapes `x` to the target dimensions.
    ///
    /// Fails when the input's element count does not match the target shape
    /// (or is not divisible by the fixed dimensions when one is inferred).
    pub fn forward<B: Backend, const DI: usize>(
        &self,
        x: Tensor<B, DI>,
    ) -> Result<Tensor<B, D>, ReshapeError> {
        let count: usize = x.dims().iter().product();
        let fixed: usize = self
            .dims
            .iter()
            .filter(|&&d| d != -1)
            .map(|&d| d as usize)
            .product();

        let has_inferred = self.dims.iter().any(|&d| d == -1);
        let compatible = if has_inferred {
            count % fixed == 0
        } else {
            count == fixed
        };
        if !compatible {
            return Err(ReshapeError::IncompatibleElementCount {
                count,
                dims: self.dims.to_vec(),
            });
        }

        let mut resolved = [0usize; D];
        for (slot, &dim) in resolved.iter_mut().zip(self.dims.iter()) {
            *slot = if dim == -1 { count / fixed } else { dim as usize };
        }

        Ok(x.reshape(resolved))
    }
}
