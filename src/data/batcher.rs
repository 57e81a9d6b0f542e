// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<ImageSample>
// into the two tensors one training step consumes.
//
//   Input:  N samples, each size*size*3 floats + a class index
//   Output: images [N, size, size, 3]   (NHWC, as decoded)
//           labels [N, num_classes]     (one-hot)
//
// The network permutes NHWC → NCHW itself, so the batch keeps
// the same layout the preprocessor produced.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ImageSample;
use crate::data::preprocessor::CHANNELS;

// ─── ImageBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Shape: [batch_size, H, W, C]
    pub images: Tensor<B, 4>,

    /// Shape: [batch_size, num_classes], one-hot
    pub labels: Tensor<B, 2>,
}

impl<B: Backend> ImageBatch<B> {
    #[cfg(test)]
    pub fn batch_size(&self) -> usize {
        self.images.dims()[0]
    }
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device:      B::Device,
    pub image_size:  usize,
    pub num_classes: usize,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, image_size: usize, num_classes: usize) -> Self {
        Self { device, image_size, num_classes }
    }
}

impl<B: Backend> Batcher<ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ImageBatch<B> {
        let batch_size = items.len();
        let side       = self.image_size;

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();

        let mut one_hot = vec![0.0f32; batch_size * self.num_classes];
        for (row, sample) in items.iter().enumerate() {
            if sample.label < self.num_classes {
                one_hot[row * self.num_classes + sample.label] = 1.0;
            } else {
                tracing::warn!("Label {} outside {} classes", sample.label, self.num_classes);
            }
        }

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, side, side, CHANNELS]),
            &self.device,
        );
        let labels = Tensor::<B, 2>::from_data(
            TensorData::new(one_hot, [batch_size, self.num_classes]),
            &self.device,
        );

        ImageBatch { images, labels }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_shapes_and_one_hot() {
        let batcher = ImageBatcher::<NdArray>::new(Default::default(), 2, 3);
        let items = vec![
            ImageSample { pixels: vec![0.5; 12], label: 2 },
            ImageSample { pixels: vec![1.5; 12], label: 0 },
        ];
        let batch = batcher.batch(items);

        assert_eq!(batch.images.dims(), [2, 2, 2, 3]);
        assert_eq!(batch.labels.dims(), [2, 3]);
        assert_eq!(batch.batch_size(), 2);

        let labels = batch.labels.into_data().to_vec::<f32>().unwrap();
        assert_eq!(labels, vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
    }
}
