use crate::types::{BojaDatasetError, DatasetResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_CONFIG_NAME: &str = "boja-dataset.toml";
const CONFIG_ENV: &str = "BOJA_DATASET_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("labels must not be empty")]
    EmptyLabels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory image filenames in the manifest are resolved against.
    pub image_dir: PathBuf,
    /// Directory annotation filenames in the manifest are resolved against.
    pub annotation_dir: PathBuf,
    /// `image,annotation` manifest, one record per line.
    pub manifest_path: PathBuf,
    /// Ordered label vocabulary; class ids are positions in this list.
    pub labels: Vec<String>,
    /// Adds a random horizontal flip after tensor conversion.
    pub training: bool,
    /// Per-index deterministic augmentation when set.
    pub seed: Option<u64>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        let data_root = PathBuf::from("data");
        Self {
            image_dir: data_root.join("images"),
            annotation_dir: data_root.join("annotations"),
            manifest_path: data_root.join("manifest.csv"),
            labels: Vec::new(),
            training: false,
            seed: None,
        }
    }
}

impl DatasetConfig {
    /// Load from `$BOJA_DATASET_CONFIG`, falling back to `boja-dataset.toml`
    /// in the working directory.
    pub fn load() -> DatasetResult<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(Path::new(&path)),
            _ => Self::from_path(Path::new(DEFAULT_CONFIG_NAME)),
        }
    }

    pub fn from_path(path: &Path) -> DatasetResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| BojaDatasetError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let cfg = Self::from_toml_str(&raw).map_err(|source| BojaDatasetError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(cfg.resolve_relative_to(path.parent().unwrap_or_else(|| Path::new(""))))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: DatasetConfig = toml::from_str(raw)?;
        if cfg.labels.is_empty() {
            return Err(ConfigError::EmptyLabels);
        }
        Ok(cfg)
    }

    /// Relative paths in a config file are taken relative to the file's directory.
    fn resolve_relative_to(mut self, base: &Path) -> Self {
        for p in [
            &mut self.image_dir,
            &mut self.annotation_dir,
            &mut self.manifest_path,
        ] {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
        self
    }
}
