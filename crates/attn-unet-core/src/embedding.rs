//! Sinusoidal positional and time embeddings
//!
//! Encodes a batch of scalar timesteps into fixed-length vectors using
//! sinusoids of geometrically spaced frequencies, as used to condition
//! diffusion models. The inverse frequencies are precomputed once at
//! construction and stored as a module tensor.

use burn::module::Ignored;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use thiserror::Error;

use crate::activation::Activation;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("embedding dimension must be even, got {0}")]
    OddDimension(usize),
}

/// Closed-form sinusoidal embedding of scalar timesteps.
///
/// For an embedding width `dim`, the `dim / 2` inverse frequencies are
/// `exp(-i * ln(10000) / (dim / 2))`. The forward pass forms the outer
/// product of the scaled timesteps with the frequencies and concatenates
/// `sin(phase)` then `cos(phase)` along the last axis.
///
/// Deterministic and parameter-free.
#[derive(Module, Debug)]
pub struct PositionalEmbedding<B: Backend> {
    /// Precomputed inverse frequencies, shape `[dim / 2]`
    pub freqs: Tensor<B, 1>,
    /// Embedding width (always even)
    pub dim: usize,
    /// Multiplier applied to raw timestep values before encoding
    pub scale: f64,
}

impl<B: Backend> PositionalEmbedding<B> {
    /// Creates a positional embedding of width `dim`.
    ///
    /// Fails with [`EmbeddingError::OddDimension`] when `dim` is odd, since
    /// the output is an even split between sine and cosine halves.
    pub fn new(dim: usize, scale: f64, device: &B::Device) -> Result<Self, EmbeddingError> {
        if dim % 2 != 0 {
            return Err(EmbeddingError::OddDimension(dim));
        }

        let half_dim = dim / 2;
        let max_period = 10000.0f64;

        let freqs: Vec<f32> = (0..half_dim)
            .map(|i| (-(i as f64) * max_period.ln() / half_dim as f64).exp() as f32)
            .collect();

        Ok(Self {
            freqs: Tensor::<B, 1>::from_data(TensorData::new(freqs, [half_dim]), device),
            dim,
            scale,
        })
    }

    /// Encodes a batch of scalar timesteps.
    ///
    /// # Arguments
    ///
    /// * `timesteps` - Timestep values of shape `[batch]`
    ///
    /// # Returns
    ///
    /// Embedding of shape `[batch, dim]`: sine half followed by cosine half.
    pub fn forward(&self, timesteps: Tensor<B, 1>) -> Tensor<B, 2> {
        let [batch] = timesteps.dims();
        let [half_dim] = self.freqs.dims();

        let phase = (timesteps * self.scale).reshape([batch, 1])
            * self.freqs.clone().reshape([1, half_dim]);

        let sin = phase.clone().sin();
        let cos = phase.cos();

        Tensor::cat(vec![sin, cos], 1)
    }
}

/// Time conditioning vector: sinusoidal embedding plus a learned projection.
///
/// The projection widens to `2 * dim`, applies the activation, and maps back
/// to `dim`, so callers always receive a `dim`-length vector per batch
/// element.
#[derive(Module, Debug)]
pub struct TimeEmbedding<B: Backend> {
    /// Closed-form sinusoidal encoder
    pub embedding: PositionalEmbedding<B>,
    /// Widening projection, `dim -> 2 * dim`
    pub lin1: Linear<B>,
    /// Narrowing projection, `2 * dim -> dim`
    pub lin2: Linear<B>,
    /// Nonlinearity between the two projections
    pub activation: Ignored<Activation>,
}

impl<B: Backend> TimeEmbedding<B> {
    /// Creates a time embedding of width `dim`.
    ///
    /// # Arguments
    ///
    /// * `dim` - Output width (must be even)
    /// * `scale` - Timestep multiplier forwarded to [`PositionalEmbedding`]
    /// * `activation` - Nonlinearity between the two projections
    /// * `device` - Device to create tensors on
    pub fn new(
        dim: usize,
        scale: f64,
        activation: Activation,
        device: &B::Device,
    ) -> Result<Self, EmbeddingError> {
        let embedding = PositionalEmbedding::new(dim, scale, device)?;

        Ok(Self {
            embedding,
            lin1: LinearConfig::new(dim, 2 * dim).init(device),
            lin2: LinearConfig::new(2 * dim, dim).init(device),
            activation: Ignored(activation),
        })
    }

    /// Encodes and projects a batch of scalar timesteps to `[batch, dim]`.
    pub fn forward(&self, timesteps: Tensor<B, 1>) -> Tensor<B, 2> {
        let x = self.embedding.forward(timesteps);
        let x = self.lin1.forward(x);
        let x = self.activation.0.forward(x);
        self.lin2.forward(x)
    }
}
