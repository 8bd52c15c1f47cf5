//! Burn Dataset Integration
//!
//! In-memory dataset of decoded images plus the batcher that stacks them into
//! tensors for training, evaluation and inference.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use super::preprocess::{IMAGENET_MEAN, IMAGENET_STD};

/// A single decoded image ready for Burn
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageItem {
    /// Image data as flattened CHW float array [3 * H * W] in [0, 1]
    pub image: Vec<f32>,
    /// Class label
    pub label: usize,
    /// Where the image came from (file path or archive entry)
    pub source: String,
}

impl ImageItem {
    pub fn new(image: Vec<f32>, label: usize, source: impl Into<String>) -> Self {
        Self {
            image,
            label,
            source: source.into(),
        }
    }
}

/// Dataset holding every item in memory
#[derive(Debug, Clone, Default)]
pub struct ImageDataset {
    items: Vec<ImageItem>,
}

impl ImageDataset {
    pub fn new(items: Vec<ImageItem>) -> Self {
        Self { items }
    }

    /// Number of classes implied by the largest label
    pub fn num_classes(&self) -> usize {
        self.items
            .iter()
            .map(|item| item.label)
            .max()
            .map(|m| m + 1)
            .unwrap_or(0)
    }

    /// Items per class, sized to `num_classes`
    pub fn class_distribution(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_classes];
        for item in &self.items {
            if item.label < num_classes {
                counts[item.label] += 1;
            }
        }
        counts
    }

    pub fn items(&self) -> &[ImageItem] {
        &self.items
    }

    pub fn labels(&self) -> Vec<usize> {
        self.items.iter().map(|item| item.label).collect()
    }
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of images
#[derive(Clone, Debug)]
pub struct ImageBatch<B: Backend> {
    /// Batch of images with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Batch of labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher turning [`ImageItem`]s into an [`ImageBatch`]
#[derive(Clone, Debug)]
pub struct ImageBatcher {
    image_size: usize,
    normalize: bool,
}

impl ImageBatcher {
    pub fn new(image_size: usize, normalize: bool) -> Self {
        Self {
            image_size,
            normalize,
        }
    }

    pub fn image_size(&self) -> usize {
        self.image_size
    }
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let size = self.image_size;

        let images_data: Vec<f32> = items
            .iter()
            .flat_map(|item| item.image.iter().copied())
            .collect();

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, 3, size, size]),
            device,
        );

        // (x - mean) / std per channel
        let images = if self.normalize {
            let mean = Tensor::<B, 4>::from_floats(
                TensorData::new(IMAGENET_MEAN.to_vec(), [1, 3, 1, 1]),
                device,
            );
            let std = Tensor::<B, 4>::from_floats(
                TensorData::new(IMAGENET_STD.to_vec(), [1, 3, 1, 1]),
                device,
            );
            (images - mean) / std
        } else {
            images
        };

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        ImageBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::preprocess::normalize_chw;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn item(value: f32, label: usize) -> ImageItem {
        ImageItem::new(vec![value; 3 * 2 * 2], label, format!("img_{}", label))
    }

    #[test]
    fn test_dataset_basics() {
        let dataset = ImageDataset::new(vec![item(0.1, 0), item(0.2, 2), item(0.3, 2)]);

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.num_classes(), 3);
        assert_eq!(dataset.class_distribution(4), vec![1, 0, 2, 0]);
        assert_eq!(dataset.get(1).map(|i| i.label), Some(2));
        assert!(dataset.get(3).is_none());
    }

    #[test]
    fn test_batch_shapes() {
        let device = Default::default();
        let batcher = ImageBatcher::new(2, false);
        let batch: ImageBatch<TestBackend> = batcher.batch(vec![item(0.5, 1), item(0.25, 0)], &device);

        assert_eq!(batch.images.dims(), [2, 3, 2, 2]);
        assert_eq!(batch.targets.dims(), [2]);

        let targets: Vec<i64> = batch.targets.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(targets, vec![1, 0]);
    }

    #[test]
    fn test_batch_normalization_matches_cpu_path() {
        let device = Default::default();
        let raw = item(0.6, 0);

        let mut expected = raw.image.clone();
        normalize_chw(&mut expected);

        let batch: ImageBatch<TestBackend> =
            ImageBatcher::new(2, true).batch(vec![raw], &device);
        let actual: Vec<f32> = batch.images.into_data().to_vec().unwrap();

        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-5);
        }
    }
}
