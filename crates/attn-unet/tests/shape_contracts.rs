//! Shape contracts across stacked encoder/decoder stages
//!
//! Verifies that block shape contracts chain correctly through the full
//! model: spatial sizes survive a complete encode/decode round trip even
//! when pooling truncates odd intermediate sizes.

use burn::prelude::*;
use burn::tensor::Distribution;
use burn_ndarray::NdArray;

use attn_unet::{AttentionUNet, AttentionUNetConfig, DownSample, UpSample, UpsampleMode};
use attn_unet_core::activation::Activation;

type TestBackend = NdArray<f32>;

fn random(shape: [usize; 4]) -> Tensor<TestBackend, 4> {
    Tensor::random(shape, Distribution::Default, &Default::default())
}

#[test]
fn test_model_round_trips_mnist_shape() {
    let device = Default::default();
    let meta = attn_unet_data::dataset_meta("MNIST").unwrap();
    let config = AttentionUNetConfig::for_dataset(meta).with_base_channels(4);
    let model = AttentionUNet::<TestBackend>::new(&config, &device);

    let (c, h, w) = meta.size();
    let y = model.forward(random([2, c, h, w]));
    assert_eq!(y.dims(), [2, c, h, w]);
}

#[test]
fn test_model_handles_odd_spatial_sizes() {
    // 45 pools through 22, 11, 5, 2; every decoder stage must realign
    let device = Default::default();
    let config = AttentionUNetConfig {
        in_channels: 3,
        out_channels: 3,
        base_channels: 4,
        depth: 4,
        ..Default::default()
    };
    let model = AttentionUNet::<TestBackend>::new(&config, &device);

    let y = model.forward(random([1, 3, 45, 45]));
    assert_eq!(y.dims(), [1, 3, 45, 45]);
}

#[test]
fn test_model_transposed_without_attention() {
    let device = Default::default();
    let config = AttentionUNetConfig {
        in_channels: 1,
        out_channels: 2,
        base_channels: 4,
        depth: 3,
        mode: UpsampleMode::Transposed,
        attention: false,
        ..Default::default()
    };
    let model = AttentionUNet::<TestBackend>::new(&config, &device);

    let y = model.forward(random([1, 1, 24, 20]));
    assert_eq!(y.dims(), [1, 2, 24, 20]);
}

#[test]
fn test_model_segmentation_head_channels() {
    let device = Default::default();
    let meta = attn_unet_data::dataset_meta("cifar-10").unwrap();
    let config = AttentionUNetConfig::for_dataset(meta)
        .with_base_channels(4)
        .with_depth(3)
        .with_out_channels(meta.num_classes);
    let model = AttentionUNet::<TestBackend>::new(&config, &device);

    let (c, h, w) = meta.size();
    let y = model.forward(random([1, c, h, w]));
    assert_eq!(y.dims(), [1, meta.num_classes, h, w]);
}

#[test]
fn test_encoder_decoder_stage_pair_round_trips() {
    // A single down/up pair reproduces the pre-pool spatial size, which is
    // what lets arbitrarily deep stacks chain
    let device = Default::default();
    let down = DownSample::<TestBackend>::new(8, 16, None, Activation::Relu, &device);
    let up = UpSample::<TestBackend>::new(
        16,
        8,
        None,
        Activation::Relu,
        UpsampleMode::Bilinear,
        true,
        &device,
    );

    for size in [14usize, 15, 21] {
        let x = random([1, 8, size, size]);
        let pooled = down.forward(x.clone());
        assert_eq!(pooled.dims()[2], size / 2);

        let y = up.forward(pooled, x);
        assert_eq!(y.dims(), [1, 8, size, size]);
    }
}
