//! The boja detection dataset: filtered manifest + lazy per-index sample loading.

use crate::aug::{ImageTransform, Transform};
use crate::config::DatasetConfig;
use crate::labels::LabelMap;
use crate::manifest::{filter_manifest, AnnotationSource, FilteredManifest, VocReader};
use crate::types::{
    BojaDatasetError, DatasetResult, FilterSummary, Sample, SampleImage, Target,
};
use data_contracts::LabeledBox;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

/// Fixed-length, randomly indexable detection samples.
///
/// Construction filters the manifest once. Each `get_item` re-reads the image
/// and annotation from disk; nothing is cached.
#[derive(Debug, Clone)]
pub struct BojaDataset {
    images: Vec<PathBuf>,
    annotations: Vec<PathBuf>,
    labels: LabelMap,
    pipeline: Transform,
    seed: Option<u64>,
    summary: FilterSummary,
}

impl BojaDataset {
    pub fn new(cfg: &DatasetConfig) -> DatasetResult<Self> {
        Self::with_pipeline(cfg, Transform::for_mode(cfg.training))
    }

    /// Positional constructor mirroring the config fields.
    pub fn open(
        image_dir: impl AsRef<Path>,
        annotation_dir: impl AsRef<Path>,
        manifest_path: impl AsRef<Path>,
        labels: Vec<String>,
        training: bool,
    ) -> DatasetResult<Self> {
        Self::new(&DatasetConfig {
            image_dir: image_dir.as_ref().to_path_buf(),
            annotation_dir: annotation_dir.as_ref().to_path_buf(),
            manifest_path: manifest_path.as_ref().to_path_buf(),
            labels,
            training,
            seed: None,
        })
    }

    pub fn with_pipeline(cfg: &DatasetConfig, pipeline: Transform) -> DatasetResult<Self> {
        Self::with_reader(cfg, pipeline, &VocReader)
    }

    pub fn with_reader(
        cfg: &DatasetConfig,
        pipeline: Transform,
        reader: &dyn AnnotationSource,
    ) -> DatasetResult<Self> {
        let FilteredManifest {
            images,
            annotations,
            summary,
        } = filter_manifest(
            &cfg.manifest_path,
            &cfg.image_dir,
            &cfg.annotation_dir,
            reader,
        )?;
        tracing::info!(
            samples = images.len(),
            classes = cfg.labels.len(),
            pipeline = %pipeline.describe(),
            "built boja dataset"
        );
        Ok(Self {
            images,
            annotations,
            labels: LabelMap::new(cfg.labels.iter().cloned()),
            pipeline,
            seed: cfg.seed,
            summary,
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn summary(&self) -> &FilterSummary {
        &self.summary
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    pub fn pipeline(&self) -> &Transform {
        &self.pipeline
    }

    pub fn image_path(&self, idx: usize) -> Option<&Path> {
        self.images.get(idx).map(PathBuf::as_path)
    }

    pub fn annotation_path(&self, idx: usize) -> Option<&Path> {
        self.annotations.get(idx).map(PathBuf::as_path)
    }

    fn check_index(&self, idx: usize) -> DatasetResult<()> {
        if idx >= self.len() {
            return Err(BojaDatasetError::IndexOutOfBounds {
                index: idx,
                len: self.len(),
            });
        }
        Ok(())
    }

    /// Build the untransformed target for `idx` from its annotation file.
    pub fn target(&self, idx: usize) -> DatasetResult<Target> {
        self.check_index(idx)?;
        let path = &self.annotations[idx];
        let (_meta, boxes) = data_contracts::read_content(path)?;
        build_target(&boxes, &self.labels, idx, path)
    }

    pub fn get_item(&self, idx: usize) -> DatasetResult<Sample> {
        self.check_index(idx)?;
        let img_path = &self.images[idx];
        let img = image::open(img_path)
            .map_err(|e| BojaDatasetError::Image {
                path: img_path.clone(),
                source: e,
            })?
            .to_rgb8();
        let target = self.target(idx)?;

        // Seeded RNG is per index so repeated calls draw the same flips.
        let mut rng_local;
        let mut seeded_rng;
        let rng: &mut dyn rand::RngCore = if let Some(seed) = self.seed {
            seeded_rng = rand::rngs::StdRng::seed_from_u64(seed ^ idx as u64);
            &mut seeded_rng
        } else {
            rng_local = rand::rng();
            &mut rng_local
        };
        let (image, target) = self
            .pipeline
            .apply(SampleImage::Raster(img), target, rng)?;
        Ok(Sample {
            image: image.into_tensor(),
            target,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = DatasetResult<Sample>> + '_ {
        (0..self.len()).map(move |idx| self.get_item(idx))
    }
}

fn build_target(
    boxes: &[LabeledBox],
    labels: &LabelMap,
    idx: usize,
    path: &Path,
) -> DatasetResult<Target> {
    let label_ids = boxes
        .iter()
        .map(|b| {
            labels
                .id_of(&b.label)
                .ok_or_else(|| BojaDatasetError::UnknownLabel {
                    label: b.label.clone(),
                    path: path.to_path_buf(),
                })
        })
        .collect::<DatasetResult<Vec<i64>>>()?;
    Ok(Target {
        boxes: boxes.iter().map(LabeledBox::as_xyxy).collect(),
        labels: label_ids,
        image_id: idx as i64,
        area: boxes.iter().map(LabeledBox::area).collect(),
        is_crowd: vec![0; boxes.len()],
    })
}
