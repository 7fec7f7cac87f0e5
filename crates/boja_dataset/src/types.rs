//! Core types, error definitions, and data structures for boja_dataset.

use crate::config::ConfigError;
use data_contracts::AnnotationError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, BojaDatasetError>;

#[derive(Debug, Error)]
pub enum BojaDatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("label {label:?} in {path} is not in the label vocabulary")]
    UnknownLabel { label: String, path: PathBuf },
    #[error("index {index} out of bounds for dataset of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("config error at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
    #[error("{0}")]
    Other(String),
}

/// Image in CHW layout (3 channels, RGB order), normalized to [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl ImageTensor {
    pub const CHANNELS: usize = 3;

    pub fn from_rgb(img: &image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let plane = (width * height) as usize;
        let mut data = vec![0.0f32; plane * Self::CHANNELS];
        for (x, y, pixel) in img.enumerate_pixels() {
            let base = (y * width + x) as usize;
            data[base] = pixel[0] as f32 / 255.0;
            data[plane + base] = pixel[1] as f32 / 255.0;
            data[2 * plane + base] = pixel[2] as f32 / 255.0;
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        [Self::CHANNELS, self.height as usize, self.width as usize]
    }

    pub fn get(&self, c: usize, y: u32, x: u32) -> f32 {
        let plane = (self.width * self.height) as usize;
        self.data[c * plane + (y * self.width + x) as usize]
    }

    /// Mirror every row left to right.
    pub fn flip_horizontal(&mut self) {
        let w = self.width as usize;
        if w == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(w) {
            row.reverse();
        }
    }
}

/// Image as it moves through the transform pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleImage {
    Raster(image::RgbImage),
    Tensor(ImageTensor),
}

impl SampleImage {
    pub fn width(&self) -> u32 {
        match self {
            SampleImage::Raster(img) => img.width(),
            SampleImage::Tensor(t) => t.width,
        }
    }

    pub fn into_tensor(self) -> ImageTensor {
        match self {
            SampleImage::Raster(img) => ImageTensor::from_rgb(&img),
            SampleImage::Tensor(t) => t,
        }
    }
}

/// Detection target for one image. Every per-box vector has the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Pixel boxes: [xmin, ymin, xmax, ymax].
    pub boxes: Vec<[f32; 4]>,
    pub labels: Vec<i64>,
    pub image_id: i64,
    pub area: Vec<f32>,
    #[serde(rename = "iscrowd")]
    pub is_crowd: Vec<i64>,
}

impl Target {
    pub fn num_boxes(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_consistent(&self) -> bool {
        let n = self.boxes.len();
        self.labels.len() == n && self.area.len() == n && self.is_crowd.len() == n
    }
}

#[derive(Debug, Clone)]
pub struct Sample {
    pub image: ImageTensor,
    pub target: Target,
}

/// Per-cause rejection counts from one manifest load. Each rejected line is
/// counted under the first predicate it fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSummary {
    pub total: usize,
    pub accepted: usize,
    pub malformed: usize,
    pub flagged_invalid: usize,
    pub missing_image: usize,
    pub missing_annotation: usize,
    pub empty: usize,
    pub unreadable: usize,
}

impl FilterSummary {
    pub fn rejected(&self) -> usize {
        self.total - self.accepted
    }

    pub fn missing(&self) -> usize {
        self.missing_image + self.missing_annotation
    }
}

/// Ordered by severity, so the worst of several checks is their `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationOutcome {
    Pass,
    Warn,
    Fail,
}

impl std::fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let word = match self {
            ValidationOutcome::Pass => "pass",
            ValidationOutcome::Warn => "warn",
            ValidationOutcome::Fail => "fail",
        };
        f.write_str(word)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationThresholds {
    pub max_malformed: Option<usize>,
    pub max_invalid: Option<usize>,
    pub max_missing: Option<usize>,
    pub max_empty: Option<usize>,
    pub max_malformed_ratio: Option<f32>,
    pub max_invalid_ratio: Option<f32>,
    pub max_missing_ratio: Option<f32>,
    pub max_empty_ratio: Option<f32>,
}

impl ValidationThresholds {
    pub fn from_env() -> Self {
        fn parse_usize(key: &str) -> Option<usize> {
            std::env::var(key).ok()?.parse().ok()
        }
        fn parse_ratio(key: &str) -> Option<f32> {
            std::env::var(key).ok()?.parse().ok()
        }
        ValidationThresholds {
            max_malformed: parse_usize("BOJA_DATASET_MAX_MALFORMED"),
            max_invalid: parse_usize("BOJA_DATASET_MAX_INVALID"),
            max_missing: parse_usize("BOJA_DATASET_MAX_MISSING"),
            max_empty: parse_usize("BOJA_DATASET_MAX_EMPTY"),
            max_malformed_ratio: parse_ratio("BOJA_DATASET_MAX_MALFORMED_RATIO"),
            max_invalid_ratio: parse_ratio("BOJA_DATASET_MAX_INVALID_RATIO"),
            max_missing_ratio: parse_ratio("BOJA_DATASET_MAX_MISSING_RATIO"),
            max_empty_ratio: parse_ratio("BOJA_DATASET_MAX_EMPTY_RATIO"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub outcome: ValidationOutcome,
    pub reasons: Vec<String>,
    pub summary: FilterSummary,
}
