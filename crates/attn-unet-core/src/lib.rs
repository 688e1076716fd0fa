//! Shared Building Blocks for Attention U-Net Models
//!
//! This crate provides the framework-level pieces used by the model crates:
//!
//! - [`activation`] - Closed set of activation functions
//! - [`embedding`] - Sinusoidal positional and time embeddings
//! - [`reshape`] - Element-count-checked shape reinterpretation
//!
//! # Example
//!
//! ```ignore
//! use attn_unet_core::{Activation, TimeEmbedding};
//!
//! let time_embed = TimeEmbedding::<Backend>::new(128, 1.0, Activation::Relu, &device)?;
//! let emb = time_embed.forward(timesteps); // [batch, 128]
//! ```

pub mod activation;
pub mod embedding;
pub mod reshape;

pub use activation::{Activation, ActivationError};
pub use embedding::{EmbeddingError, PositionalEmbedding, TimeEmbedding};
pub use reshape::{Reshape, ReshapeError};
