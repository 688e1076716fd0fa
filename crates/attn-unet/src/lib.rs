//! Attention-Gated U-Net
//!
//! Building blocks for convolutional encoder/decoder image models with
//! attention-gated skip connections, and the assembled model.
//!
//! # Building Blocks
//!
//! - [`DoubleConv3x3`] - Two stacked conv/norm/activation stages
//! - [`DownSample`] - Max-pool encoder stage
//! - [`AttentionGate`] - Soft spatial attention over skip features
//! - [`UpSample`] - Upsample, align, gate, and fuse decoder stage
//!
//! # Model
//!
//! - [`AttentionUNet`] - Full encoder/decoder assembly
//!
//! # Example
//!
//! ```ignore
//! use attn_unet::{AttentionUNet, AttentionUNetConfig};
//!
//! let meta = attn_unet_data::dataset_meta("MNIST")?;
//! let config = AttentionUNetConfig::for_dataset(meta);
//! let model = AttentionUNet::<Backend>::new(&config, &device);
//!
//! let y = model.forward(images); // same spatial size as the input
//! ```

pub mod blocks;
pub mod unet;

pub use blocks::{AttentionGate, DoubleConv3x3, DownSample, UpSample, UpsampleMode};
pub use unet::{AttentionUNet, AttentionUNetConfig};
