//! Dataset Shape Metadata
//!
//! Fixed shape descriptions for the standard image classification datasets
//! the models are built against. Lookup is by exact dataset name.

pub mod dataset;

pub use dataset::{dataset_meta, dataset_names, DatasetError, DatasetMeta};
