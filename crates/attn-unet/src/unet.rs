//! Attention U-Net
//!
//! Assembles the building blocks into the full encoder/decoder model: an
//! input double convolution, a max-pool encoder that doubles channel width
//! per level, a decoder whose stages gate and fuse the matching skip
//! connections, and a 1x1 output projection.

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::prelude::*;

use attn_unet_core::activation::Activation;
use attn_unet_data::DatasetMeta;

use crate::blocks::{DoubleConv3x3, DownSample, UpSample, UpsampleMode};

/// Attention U-Net configuration
#[derive(Debug, Clone)]
pub struct AttentionUNetConfig {
    /// Input image channels
    pub in_channels: usize,
    /// Output channels
    pub out_channels: usize,
    /// Channel width after the input convolution; doubles per encoder level
    pub base_channels: usize,
    /// Number of encoder/decoder levels
    pub depth: usize,
    /// Nonlinearity used throughout the double convolutions
    pub activation: Activation,
    /// Upsampling operator used by the decoder
    pub mode: UpsampleMode,
    /// Whether decoder stages gate their skip connections
    pub attention: bool,
}

impl Default for AttentionUNetConfig {
    fn default() -> Self {
        Self {
            in_channels: 1,
            out_channels: 1,
            base_channels: 64,
            depth: 4,
            activation: Activation::Relu,
            mode: UpsampleMode::Bilinear,
            attention: true,
        }
    }
}

impl AttentionUNetConfig {
    /// Configuration sized for a dataset from the metadata table, mapping
    /// images back to images (e.g. for denoising).
    pub fn for_dataset(meta: &DatasetMeta) -> Self {
        Self {
            in_channels: meta.channels,
            out_channels: meta.channels,
            ..Default::default()
        }
    }

    /// Set the output channel count.
    pub fn with_out_channels(mut self, out_channels: usize) -> Self {
        self.out_channels = out_channels;
        self
    }

    /// Set the base channel width.
    pub fn with_base_channels(mut self, base_channels: usize) -> Self {
        self.base_channels = base_channels;
        self
    }

    /// Set the encoder/decoder depth.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Set the activation used by the double convolutions.
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Set the decoder upsampling operator.
    pub fn with_mode(mut self, mode: UpsampleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable skip-connection gating.
    pub fn with_attention(mut self, attention: bool) -> Self {
        self.attention = attention;
        self
    }
}

/// Attention U-Net model
#[derive(Module, Debug)]
pub struct AttentionUNet<B: Backend> {
    /// Input convolution, `in_channels -> base_channels`
    pub conv_in: DoubleConv3x3<B>,
    /// Encoder path; level `i` maps `base << i` to `base << (i + 1)` channels
    pub down_blocks: Vec<DownSample<B>>,
    /// Decoder path, deepest level first
    pub up_blocks: Vec<UpSample<B>>,
    /// Output projection, `base_channels -> out_channels`
    pub conv_out: Conv2d<B>,
}

impl<B: Backend> AttentionUNet<B> {
    /// Creates an attention U-Net.
    ///
    /// # Arguments
    ///
    /// * `config` - Model configuration
    /// * `device` - Device to create tensors on
    pub fn new(config: &AttentionUNetConfig, device: &B::Device) -> Self {
        let base = config.base_channels;

        let conv_in =
            DoubleConv3x3::new(config.in_channels, base, None, config.activation, device);

        let down_blocks = (0..config.depth)
            .map(|level| {
                let ch = base << level;
                DownSample::new(ch, ch * 2, None, config.activation, device)
            })
            .collect();

        // Deepest stage first: each consumes the skip saved by the encoder
        // level of matching width
        let up_blocks = (0..config.depth)
            .rev()
            .map(|level| {
                let ch = base << (level + 1);
                UpSample::new(
                    ch,
                    ch / 2,
                    None,
                    config.activation,
                    config.mode,
                    config.attention,
                    device,
                )
            })
            .collect();

        let conv_out = Conv2dConfig::new([base, config.out_channels], [1, 1]).init(device);

        Self {
            conv_in,
            down_blocks,
            up_blocks,
            conv_out,
        }
    }

    /// Forward pass.
    ///
    /// # Arguments
    ///
    /// * `x` - Input images of shape `[batch, in_channels, height, width]`
    ///
    /// # Returns
    ///
    /// Output of shape `[batch, out_channels, height, width]`. Odd
    /// intermediate sizes are realigned by the decoder stages, so height
    /// and width need not be divisible by `2^depth`.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut skips = Vec::with_capacity(self.down_blocks.len());

        let mut x = self.conv_in.forward(x);
        for down in &self.down_blocks {
            skips.push(x.clone());
            x = down.forward(x);
        }

        for (up, skip) in self.up_blocks.iter().zip(skips.into_iter().rev()) {
            x = up.forward(x, skip);
        }

        self.conv_out.forward(x)
    }
}
