//! Dataset loading and transform utilities for boja fruit/produce detection.
//!
//! This crate provides utilities for:
//! - Filtering an `image,annotation` manifest into confirmed sample pairs
//! - Mapping annotation labels onto a fixed class-id vocabulary
//! - Lazy per-index sample loading with an image + target transform pipeline
//! - Manifest quality reports from filter rejection counts
//! - Burn tensor conversion and batching (feature `burn-runtime`)

pub mod aug;
pub mod config;
pub mod dataset;
pub mod labels;
pub mod manifest;
pub mod types;
pub mod validation;

#[cfg(feature = "burn-runtime")]
pub mod batch;

pub use aug::{ImageTransform, Transform};
pub use config::{ConfigError, DatasetConfig};
pub use dataset::BojaDataset;
pub use labels::LabelMap;
pub use manifest::{
    filter_lines, filter_manifest, AnnotationSource, FilteredManifest, ManifestEntry, VocReader,
    INVALID_ANNOTATION_FILE_IDENTIFIER,
};
pub use types::*;
pub use validation::validate_summary;

#[cfg(feature = "burn-runtime")]
pub use batch::{collate, BurnBatch, BurnSample};
