//! Burn tensor bridge: per-sample tensors, padded batches, and the Burn `Dataset` trait.

use crate::dataset::BojaDataset;
use crate::types::{BojaDatasetError, DatasetResult, Sample};
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};

/// One sample as Burn tensors.
pub struct BurnSample<B: Backend> {
    /// Shape: [3, height, width].
    pub image: Tensor<B, 3>,
    /// Shape: [num_boxes, 4], pixel coordinates.
    pub boxes: Tensor<B, 2>,
    pub labels: Tensor<B, 1, Int>,
    pub area: Tensor<B, 1>,
    pub is_crowd: Tensor<B, 1, Int>,
    pub image_id: i64,
}

impl Sample {
    pub fn to_burn<B: Backend>(&self, device: &B::Device) -> BurnSample<B> {
        let t = &self.target;
        let n = t.num_boxes();
        let flat_boxes: Vec<f32> = t.boxes.iter().flatten().copied().collect();
        BurnSample {
            image: Tensor::from_data(
                TensorData::new(self.image.data.clone(), self.image.shape()),
                device,
            ),
            boxes: Tensor::from_data(TensorData::new(flat_boxes, [n, 4]), device),
            labels: Tensor::from_data(TensorData::new(t.labels.clone(), [n]), device),
            area: Tensor::from_data(TensorData::new(t.area.clone(), [n]), device),
            is_crowd: Tensor::from_data(TensorData::new(t.is_crowd.clone(), [n]), device),
            image_id: t.image_id,
        }
    }
}

/// Samples stacked into fixed-shape tensors; box slots past each sample's
/// count are zero with `box_mask` 0.
pub struct BurnBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub boxes: Tensor<B, 3>,
    pub labels: Tensor<B, 2, Int>,
    pub box_mask: Tensor<B, 2>,
    pub image_ids: Tensor<B, 1, Int>,
}

/// Stack samples of identical image size. `max_boxes` caps box slots per sample.
pub fn collate<B: Backend>(
    samples: &[Sample],
    max_boxes: usize,
    device: &B::Device,
) -> DatasetResult<BurnBatch<B>> {
    let first = samples
        .first()
        .ok_or_else(|| BojaDatasetError::Other("cannot collate empty batch".to_string()))?;
    let (width, height) = (first.image.width, first.image.height);
    let max_boxes = max_boxes.max(1);
    let batch = samples.len();

    let mut images_buf = Vec::with_capacity(batch * first.image.data.len());
    let mut boxes_buf = vec![0.0f32; batch * max_boxes * 4];
    let mut labels_buf = vec![0i64; batch * max_boxes];
    let mut mask_buf = vec![0.0f32; batch * max_boxes];
    let mut ids_buf = Vec::with_capacity(batch);

    for (b, sample) in samples.iter().enumerate() {
        if (sample.image.width, sample.image.height) != (width, height) {
            return Err(BojaDatasetError::Other(format!(
                "batch contains varying image sizes: sample {} is {}x{}, expected {}x{}",
                sample.target.image_id, sample.image.width, sample.image.height, width, height
            )));
        }
        images_buf.extend_from_slice(&sample.image.data);
        ids_buf.push(sample.target.image_id);
        let t = &sample.target;
        for (i, (bbox, label)) in t.boxes.iter().zip(&t.labels).take(max_boxes).enumerate() {
            let slot = b * max_boxes + i;
            boxes_buf[slot * 4..slot * 4 + 4].copy_from_slice(bbox);
            labels_buf[slot] = *label;
            mask_buf[slot] = 1.0;
        }
    }

    Ok(BurnBatch {
        images: Tensor::from_data(
            TensorData::new(images_buf, [batch, 3, height as usize, width as usize]),
            device,
        ),
        boxes: Tensor::from_data(TensorData::new(boxes_buf, [batch, max_boxes, 4]), device),
        labels: Tensor::from_data(TensorData::new(labels_buf, [batch, max_boxes]), device),
        box_mask: Tensor::from_data(TensorData::new(mask_buf, [batch, max_boxes]), device),
        image_ids: Tensor::from_data(TensorData::new(ids_buf, [batch]), device),
    })
}

/// `None` only past the end. Any other load failure panics: Burn iterators stop
/// at the first `None`, so returning it for a bad sample would end the epoch early.
impl Dataset<Sample> for BojaDataset {
    fn get(&self, index: usize) -> Option<Sample> {
        match self.get_item(index) {
            Ok(sample) => Some(sample),
            Err(BojaDatasetError::IndexOutOfBounds { .. }) => None,
            Err(e) => {
                tracing::error!(index, error = %e, "failed to load sample");
                panic!("failed to load sample {index}: {e}");
            }
        }
    }

    fn len(&self) -> usize {
        BojaDataset::len(self)
    }
}
