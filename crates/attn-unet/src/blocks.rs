//! U-Net building blocks: double convolutions, encoder/decoder stages, and
//! the attention gate applied to skip connections

use burn::module::Ignored;
use burn::nn::{
    conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
    pool::{MaxPool2d, MaxPool2dConfig},
    BatchNorm, BatchNormConfig, PaddingConfig2d,
};
use burn::prelude::*;
use burn::tensor::activation::{relu, sigmoid};

use attn_unet_core::activation::Activation;

/// Two stacked 3x3 convolution stages, each conv -> batch norm -> activation.
///
/// Padding 1 with stride 1 and kernel 3 preserves the spatial size exactly,
/// so stacked stages only ever move the channel axis.
#[derive(Module, Debug)]
pub struct DoubleConv3x3<B: Backend> {
    /// First convolution, `in_channels -> hidden_channels`
    pub conv1: Conv2d<B>,
    /// Normalization after the first convolution
    pub norm1: BatchNorm<B, 2>,
    /// Second convolution, `hidden_channels -> out_channels`
    pub conv2: Conv2d<B>,
    /// Normalization after the second convolution
    pub norm2: BatchNorm<B, 2>,
    /// Nonlinearity applied after each normalization
    pub activation: Ignored<Activation>,
}

impl<B: Backend> DoubleConv3x3<B> {
    /// Creates a double convolution block.
    ///
    /// # Arguments
    ///
    /// * `in_channels` - Number of input channels
    /// * `out_channels` - Number of output channels
    /// * `hidden_channels` - Width of the intermediate stage (defaults to `out_channels`)
    /// * `activation` - Nonlinearity applied after each normalization
    /// * `device` - Device to create tensors on
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        hidden_channels: Option<usize>,
        activation: Activation,
        device: &B::Device,
    ) -> Self {
        let hidden_channels = hidden_channels.unwrap_or(out_channels);

        let conv1 = Conv2dConfig::new([in_channels, hidden_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        let norm1 = BatchNormConfig::new(hidden_channels).init(device);

        let conv2 = Conv2dConfig::new([hidden_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);
        let norm2 = BatchNormConfig::new(out_channels).init(device);

        Self {
            conv1,
            norm1,
            conv2,
            norm2,
            activation: Ignored(activation),
        }
    }

    /// Forward pass, `[batch, in_channels, h, w]` -> `[batch, out_channels, h, w]`.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv1.forward(x);
        let x = self.norm1.forward(x);
        let x = self.activation.0.forward(x);

        let x = self.conv2.forward(x);
        let x = self.norm2.forward(x);
        self.activation.0.forward(x)
    }
}

/// Encoder stage: 2x max-pooling followed by [`DoubleConv3x3`].
///
/// Pooling uses non-overlapping 2x2 windows, so odd spatial sizes
/// floor-truncate.
#[derive(Module, Debug)]
pub struct DownSample<B: Backend> {
    /// Non-overlapping 2x2 max pool
    pub pool: MaxPool2d,
    /// Channel transformation after pooling
    pub conv: DoubleConv3x3<B>,
}

impl<B: Backend> DownSample<B> {
    /// Creates an encoder stage.
    ///
    /// # Arguments
    ///
    /// * `in_channels` - Number of input channels
    /// * `out_channels` - Number of output channels
    /// * `hidden_channels` - Intermediate width of the double conv (defaults to `out_channels`)
    /// * `activation` - Nonlinearity used by the double conv
    /// * `device` - Device to create tensors on
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        hidden_channels: Option<usize>,
        activation: Activation,
        device: &B::Device,
    ) -> Self {
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let conv = DoubleConv3x3::new(in_channels, out_channels, hidden_channels, activation, device);

        Self { pool, conv }
    }

    /// Forward pass, `[batch, in_channels, h, w]` -> `[batch, out_channels, h/2, w/2]`.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv.forward(self.pool.forward(x))
    }
}

/// Soft spatial attention over skip-connection features.
///
/// Projects the gating signal `g` and the skip features `x` to a shared
/// internal width, rectifies their sum, and squeezes it to a single-channel
/// sigmoid gate that is multiplied against `x` (broadcast over channels).
/// Low-value skip information is down-weighted before concatenation in the
/// decoder.
#[derive(Module, Debug)]
pub struct AttentionGate<B: Backend> {
    /// Gating-signal projection, `f_g -> f_int`
    pub w_g: Conv2d<B>,
    /// Normalization of the gating projection
    pub norm_g: BatchNorm<B, 2>,
    /// Skip-feature projection, `f_l -> f_int`
    pub w_x: Conv2d<B>,
    /// Normalization of the skip projection
    pub norm_x: BatchNorm<B, 2>,
    /// Gate squeeze, `f_int -> 1`
    pub psi: Conv2d<B>,
    /// Normalization of the gate squeeze
    pub norm_psi: BatchNorm<B, 2>,
}

impl<B: Backend> AttentionGate<B> {
    /// Creates an attention gate.
    ///
    /// All projections are 1x1 convolutions without bias, so spatial sizes
    /// are untouched.
    ///
    /// # Arguments
    ///
    /// * `f_g` - Channels of the gating signal
    /// * `f_l` - Channels of the skip features
    /// * `f_int` - Internal projection width
    /// * `device` - Device to create tensors on
    pub fn new(f_g: usize, f_l: usize, f_int: usize, device: &B::Device) -> Self {
        let project = |in_ch: usize, out_ch: usize| {
            Conv2dConfig::new([in_ch, out_ch], [1, 1])
                .with_bias(false)
                .init(device)
        };

        Self {
            w_g: project(f_g, f_int),
            norm_g: BatchNormConfig::new(f_int).init(device),
            w_x: project(f_l, f_int),
            norm_x: BatchNormConfig::new(f_int).init(device),
            psi: project(f_int, 1),
            norm_psi: BatchNormConfig::new(1).init(device),
        }
    }

    /// Gates `x` by a per-pixel mask computed from `g` and `x`.
    ///
    /// # Arguments
    ///
    /// * `g` - Gating signal of shape `[batch, f_g, h, w]`
    /// * `x` - Skip features of shape `[batch, f_l, h, w]`
    ///
    /// # Returns
    ///
    /// Gated skip features with the same shape as `x`; gate values lie in
    /// `[0, 1]`.
    pub fn forward(&self, g: Tensor<B, 4>, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let g1 = self.norm_g.forward(self.w_g.forward(g));
        let x1 = self.norm_x.forward(self.w_x.forward(x.clone()));

        let gate = relu(g1 + x1);
        let gate = sigmoid(self.norm_psi.forward(self.psi.forward(gate)));

        // [batch, 1, h, w] gate broadcasts over the channel axis
        x * gate
    }
}

/// How the decoder grows the coarse feature map back to skip resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpsampleMode {
    /// Fixed bilinear interpolation followed by a channel-halving 3x3 conv
    #[default]
    Bilinear,
    /// Learned stride-2 transposed convolution
    Transposed,
}

/// Decoder stage: upsample, align to the skip, optionally gate, fuse.
///
/// `in_channels` is the channel count after concatenation: the incoming
/// coarse map carries `in_channels` channels, the upsampling path halves
/// them, and the skip contributes the other `in_channels / 2`.
#[derive(Module, Debug)]
pub struct UpSample<B: Backend> {
    /// Learned upsampling operator (transposed mode)
    pub up_transposed: Option<ConvTranspose2d<B>>,
    /// Channel-halving conv after interpolation (bilinear mode)
    pub up_conv: Option<Conv2d<B>>,
    /// Gate applied to the skip features, when enabled
    pub attention: Option<AttentionGate<B>>,
    /// Fusion of the concatenated maps
    pub conv: DoubleConv3x3<B>,
}

impl<B: Backend> UpSample<B> {
    /// Creates a decoder stage.
    ///
    /// # Arguments
    ///
    /// * `in_channels` - Channels of the incoming coarse map (and after concatenation)
    /// * `out_channels` - Number of output channels
    /// * `hidden_channels` - Intermediate width of the fusion conv (defaults to `out_channels`)
    /// * `activation` - Nonlinearity used by the fusion conv
    /// * `mode` - Upsampling operator
    /// * `attention` - Whether to gate the skip features
    /// * `device` - Device to create tensors on
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        hidden_channels: Option<usize>,
        activation: Activation,
        mode: UpsampleMode,
        attention: bool,
        device: &B::Device,
    ) -> Self {
        let half_channels = in_channels / 2;

        let (up_transposed, up_conv) = match mode {
            UpsampleMode::Transposed => {
                let up = ConvTranspose2dConfig::new([in_channels, half_channels], [2, 2])
                    .with_stride([2, 2])
                    .init(device);
                (Some(up), None)
            }
            UpsampleMode::Bilinear => {
                let conv = Conv2dConfig::new([in_channels, half_channels], [3, 3])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .with_bias(false)
                    .init(device);
                (None, Some(conv))
            }
        };

        let attention = attention
            .then(|| AttentionGate::new(half_channels, half_channels, in_channels / 4, device));

        let conv = DoubleConv3x3::new(in_channels, out_channels, hidden_channels, activation, device);

        Self {
            up_transposed,
            up_conv,
            attention,
            conv,
        }
    }

    /// Fuses an upsampled coarse map with a skip-connection map.
    ///
    /// The upsampled map is zero-padded to match the skip's spatial size
    /// exactly (pooling truncation makes them differ by at most one pixel
    /// per axis). With gating enabled, the skip features are replaced by
    /// `attention(upsampled, skip)` before concatenation; the gating signal
    /// is always the upsampled decoder path. Concatenation order is
    /// skip-then-upsampled.
    ///
    /// # Arguments
    ///
    /// * `x_1` - Coarse map to upsample, `[batch, in_channels, h, w]`
    /// * `x_2` - Skip map, `[batch, in_channels / 2, h2, w2]` with `h2 >= 2 * h`
    ///
    /// # Returns
    ///
    /// Fused map of shape `[batch, out_channels, h2, w2]`.
    pub fn forward(&self, x_1: Tensor<B, 4>, x_2: Tensor<B, 4>) -> Tensor<B, 4> {
        let x_1 = if let Some(up) = &self.up_transposed {
            up.forward(x_1)
        } else if let Some(conv) = &self.up_conv {
            conv.forward(upsample_bilinear_2x(x_1))
        } else {
            x_1
        };

        let [_, _, target_h, target_w] = x_2.dims();
        let x_1 = pad_to_match(x_1, target_h, target_w);

        let x_2 = match &self.attention {
            Some(gate) => gate.forward(x_1.clone(), x_2),
            None => x_2,
        };

        let x = Tensor::cat(vec![x_2, x_1], 1);
        self.conv.forward(x)
    }
}

/// 2x bilinear spatial upsampling.
fn upsample_bilinear_2x<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    use burn::tensor::module::interpolate;
    use burn::tensor::ops::{InterpolateMode, InterpolateOptions};

    let [_b, _c, h, w] = x.dims();

    interpolate(
        x,
        [h * 2, w * 2],
        InterpolateOptions::new(InterpolateMode::Bilinear),
    )
}

/// Zero-pads `x` spatially to `[target_h, target_w]`, splitting the padding
/// evenly and giving the trailing edge the larger share when the difference
/// is odd. `x` must not be larger than the target; a 2x upsample of a
/// floor-halved map never is.
fn pad_to_match<B: Backend>(x: Tensor<B, 4>, target_h: usize, target_w: usize) -> Tensor<B, 4> {
    let [b, c, h, w] = x.dims();
    if h == target_h && w == target_w {
        return x;
    }

    let device = x.device();
    let top = (target_h - h) / 2;
    let left = (target_w - w) / 2;

    let padded = Tensor::zeros([b, c, target_h, target_w], &device);
    padded.slice_assign([0..b, 0..c, top..top + h, left..left + w], x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::module::Param;
    use burn::tensor::Distribution;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn random(shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::random(shape, Distribution::Default, &Default::default())
    }

    #[test]
    fn test_double_conv_preserves_spatial_dims() {
        let device = Default::default();
        let block = DoubleConv3x3::<TestBackend>::new(3, 16, None, Activation::Relu, &device);

        let y = block.forward(random([2, 3, 13, 17]));
        assert_eq!(y.dims(), [2, 16, 13, 17]);
    }

    #[test]
    fn test_double_conv_hidden_channels() {
        let device = Default::default();
        let block = DoubleConv3x3::<TestBackend>::new(4, 8, Some(32), Activation::Relu, &device);

        assert_eq!(block.conv1.weight.val().dims(), [32, 4, 3, 3]);
        assert_eq!(block.conv2.weight.val().dims(), [8, 32, 3, 3]);
        assert_eq!(block.forward(random([1, 4, 8, 8])).dims(), [1, 8, 8, 8]);
    }

    #[test]
    fn test_double_conv_shape_chains() {
        let device = Default::default();
        let first = DoubleConv3x3::<TestBackend>::new(3, 16, None, Activation::Relu, &device);
        let second = DoubleConv3x3::<TestBackend>::new(16, 32, None, Activation::Relu, &device);

        let y = second.forward(first.forward(random([1, 3, 9, 9])));
        assert_eq!(y.dims(), [1, 32, 9, 9]);
    }

    #[test]
    fn test_downsample_halves_even_dims() {
        let device = Default::default();
        let down = DownSample::<TestBackend>::new(8, 16, None, Activation::Relu, &device);

        let y = down.forward(random([1, 8, 16, 24]));
        assert_eq!(y.dims(), [1, 16, 8, 12]);
    }

    #[test]
    fn test_downsample_floors_odd_dims() {
        let device = Default::default();
        let down = DownSample::<TestBackend>::new(4, 8, None, Activation::Relu, &device);

        let y = down.forward(random([1, 4, 11, 7]));
        assert_eq!(y.dims(), [1, 8, 5, 3]);
    }

    #[test]
    fn test_attention_gate_preserves_shape() {
        let device = Default::default();
        let gate = AttentionGate::<TestBackend>::new(8, 8, 4, &device);

        let g = random([2, 8, 10, 10]);
        let x = random([2, 8, 10, 10]);
        assert_eq!(gate.forward(g, x).dims(), [2, 8, 10, 10]);
    }

    #[test]
    fn test_attention_gate_never_amplifies() {
        // The gate is a sigmoid, so |output| <= |x| elementwise
        let device = Default::default();
        let gate = AttentionGate::<TestBackend>::new(4, 4, 2, &device);

        let g = random([1, 4, 6, 6]);
        let x = random([1, 4, 6, 6]);
        let y = gate.forward(g, x.clone());

        let x = x.into_data().to_vec::<f32>().unwrap();
        let y = y.into_data().to_vec::<f32>().unwrap();
        for (out, inp) in y.iter().zip(x.iter()) {
            assert!(out.abs() <= inp.abs() + 1e-6);
        }
    }

    #[test]
    fn test_attention_gate_zeroed_squeeze_halves_input() {
        // With the squeeze conv zeroed the pre-sigmoid response is 0
        // everywhere, so the gate is exactly sigmoid(0) = 0.5.
        let device = Default::default();
        let mut gate = AttentionGate::<TestBackend>::new(4, 4, 2, &device);
        gate.psi.weight = Param::from_tensor(gate.psi.weight.val().zeros_like());

        let g = random([1, 4, 5, 5]);
        let x = random([1, 4, 5, 5]);
        let y = gate.forward(g, x.clone());

        let expected = (x * 0.5).into_data().to_vec::<f32>().unwrap();
        let actual = y.into_data().to_vec::<f32>().unwrap();
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-6);
        }
    }

    #[test]
    fn test_upsample_bilinear_even_sizes() {
        let device = Default::default();
        let up = UpSample::<TestBackend>::new(
            16,
            8,
            None,
            Activation::Relu,
            UpsampleMode::Bilinear,
            true,
            &device,
        );

        let coarse = random([1, 16, 8, 8]);
        let skip = random([1, 8, 16, 16]);
        assert_eq!(up.forward(coarse, skip).dims(), [1, 8, 16, 16]);
    }

    #[test]
    fn test_upsample_aligns_odd_skip() {
        // Skip of 11 pools to 5; upsampling 5 gives 10, one short of 11
        let device = Default::default();
        let up = UpSample::<TestBackend>::new(
            16,
            8,
            None,
            Activation::Relu,
            UpsampleMode::Bilinear,
            true,
            &device,
        );

        let coarse = random([1, 16, 5, 5]);
        let skip = random([1, 8, 11, 11]);
        assert_eq!(up.forward(coarse, skip).dims(), [1, 8, 11, 11]);
    }

    #[test]
    fn test_upsample_transposed_mode() {
        let device = Default::default();
        let up = UpSample::<TestBackend>::new(
            8,
            4,
            None,
            Activation::Relu,
            UpsampleMode::Transposed,
            false,
            &device,
        );

        let coarse = random([2, 8, 7, 9]);
        let skip = random([2, 4, 14, 18]);
        assert_eq!(up.forward(coarse, skip).dims(), [2, 4, 14, 18]);
    }

    #[test]
    fn test_upsample_without_attention() {
        let device = Default::default();
        let up = UpSample::<TestBackend>::new(
            8,
            8,
            None,
            Activation::Relu,
            UpsampleMode::Bilinear,
            false,
            &device,
        );

        assert!(up.attention.is_none());
        let y = up.forward(random([1, 8, 4, 4]), random([1, 4, 8, 8]));
        assert_eq!(y.dims(), [1, 8, 8, 8]);
    }

    #[test]
    fn test_pad_to_match_keeps_content_position() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::ones([1, 1, 2, 2], &device);

        let padded = pad_to_match(x, 3, 3);
        assert_eq!(padded.dims(), [1, 1, 3, 3]);

        // Difference of 1 goes entirely to the trailing edge
        let values = padded.into_data().to_vec::<f32>().unwrap();
        assert_eq!(
            values,
            vec![1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_pad_to_match_noop_when_equal() {
        let x = random([1, 2, 4, 4]);
        let padded = pad_to_match(x.clone(), 4, 4);
        assert_eq!(padded.dims(), x.dims());
    }
}
