//! Static dataset-shape table
//!
//! Each entry records the image layout as (channels, height, width), the
//! flattened input width, and the label count. The values are fixed
//! properties of the datasets themselves and never change at runtime.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DatasetError {
    #[error("unknown dataset: {0}")]
    Unknown(String),
}

/// Fixed shape description of a supported dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetMeta {
    /// Dataset name as used in configuration
    pub name: &'static str,
    /// Image channels
    pub channels: usize,
    /// Image height in pixels
    pub height: usize,
    /// Image width in pixels
    pub width: usize,
    /// Flattened input width: `channels * height * width`
    pub input_dim: usize,
    /// Number of label classes
    pub num_classes: usize,
}

impl DatasetMeta {
    /// Image layout as a (channels, height, width) tuple.
    pub fn size(&self) -> (usize, usize, usize) {
        (self.channels, self.height, self.width)
    }
}

const DATASETS: [DatasetMeta; 4] = [
    DatasetMeta {
        name: "MNIST",
        channels: 1,
        height: 28,
        width: 28,
        input_dim: 28 * 28,
        num_classes: 10,
    },
    DatasetMeta {
        name: "USPS",
        channels: 1,
        height: 16,
        width: 16,
        input_dim: 16 * 16,
        num_classes: 10,
    },
    DatasetMeta {
        name: "cifar-10",
        channels: 3,
        height: 32,
        width: 32,
        input_dim: 3 * 32 * 32,
        num_classes: 10,
    },
    DatasetMeta {
        name: "cifar-100",
        channels: 3,
        height: 32,
        width: 32,
        input_dim: 3 * 32 * 32,
        num_classes: 100,
    },
];

/// Looks up the shape metadata for a dataset by exact name.
pub fn dataset_meta(name: &str) -> Result<&'static DatasetMeta, DatasetError> {
    DATASETS
        .iter()
        .find(|meta| meta.name == name)
        .ok_or_else(|| DatasetError::Unknown(name.to_string()))
}

/// Names of all supported datasets, in table order.
pub fn dataset_names() -> impl Iterator<Item = &'static str> {
    DATASETS.iter().map(|meta| meta.name)
}
