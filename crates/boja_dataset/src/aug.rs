//! Image + target transform pipeline.

use crate::types::{DatasetResult, SampleImage, Target};
use rand::Rng;

/// Probability used by the training pipeline's horizontal flip.
pub const TRAIN_FLIP_PROB: f32 = 0.5;

/// Common interface for everything that maps `(image, target)` to `(image, target)`.
pub trait ImageTransform {
    fn apply(
        &self,
        image: SampleImage,
        target: Target,
        rng: &mut dyn rand::RngCore,
    ) -> DatasetResult<(SampleImage, Target)>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Raster to CHW `f32` tensor scaled to [0, 1]. Tensors pass through.
    ToTensor,
    /// Mirror image and boxes left to right with probability `prob`.
    RandomHorizontalFlip { prob: f32 },
    /// Apply each child in order.
    Compose(Vec<Transform>),
}

impl Transform {
    /// `ToTensor`, followed by a 50% horizontal flip in training mode.
    pub fn for_mode(training: bool) -> Self {
        let mut steps = vec![Transform::ToTensor];
        if training {
            steps.push(Transform::RandomHorizontalFlip {
                prob: TRAIN_FLIP_PROB,
            });
        }
        Transform::Compose(steps)
    }

    /// True if applying this transform may consume randomness.
    pub fn is_random(&self) -> bool {
        match self {
            Transform::ToTensor => false,
            Transform::RandomHorizontalFlip { prob } => *prob > 0.0,
            Transform::Compose(steps) => steps.iter().any(Transform::is_random),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Transform::ToTensor => "to_tensor".to_string(),
            Transform::RandomHorizontalFlip { prob } => format!("hflip(p={prob:.2})"),
            Transform::Compose(steps) => {
                let inner: Vec<String> = steps.iter().map(Transform::describe).collect();
                format!("compose[{}]", inner.join(", "))
            }
        }
    }
}

impl ImageTransform for Transform {
    fn apply(
        &self,
        image: SampleImage,
        target: Target,
        rng: &mut dyn rand::RngCore,
    ) -> DatasetResult<(SampleImage, Target)> {
        match self {
            Transform::ToTensor => Ok((SampleImage::Tensor(image.into_tensor()), target)),
            Transform::RandomHorizontalFlip { prob } => {
                let (mut image, mut target) = (image, target);
                maybe_hflip(&mut image, &mut target, *prob, rng);
                Ok((image, target))
            }
            Transform::Compose(steps) => {
                let mut pair = (image, target);
                for step in steps {
                    pair = step.apply(pair.0, pair.1, rng)?;
                }
                Ok(pair)
            }
        }
    }
}

/// Mirror pixel boxes inside an image of the given width: `x0' = w - x1`, `x1' = w - x0`.
pub(crate) fn hflip_boxes(boxes: &mut [[f32; 4]], width: u32) {
    let w = width as f32;
    for b in boxes.iter_mut() {
        let x0 = b[0];
        let x1 = b[2];
        b[0] = w - x1;
        b[2] = w - x0;
    }
}

pub(crate) fn maybe_hflip(
    image: &mut SampleImage,
    target: &mut Target,
    prob: f32,
    rng: &mut dyn rand::RngCore,
) {
    if prob <= 0.0 {
        return;
    }
    if rng.random_range(0.0..1.0) < prob {
        let width = image.width();
        match image {
            SampleImage::Raster(img) => image::imageops::flip_horizontal_in_place(img),
            SampleImage::Tensor(t) => t.flip_horizontal(),
        }
        hflip_boxes(&mut target.boxes, width);
    }
}
