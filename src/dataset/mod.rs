//! Dataset module for loading labeled image collections
//!
//! This module provides functionality for:
//! - Decoding and resizing images into CHW float buffers (`preprocess`)
//! - Class-folder datasets with a fixed per-class split (`loader`, crops)
//! - Zip/directory sources for the binary task (`archive`, birds)
//! - Burn `Dataset` and `Batcher` implementations (`burn_dataset`)

pub mod archive;
pub mod burn_dataset;
pub mod loader;
pub mod preprocess;

use tracing::info;

// Re-export main types for convenience
pub use archive::{load_binary, ClassSource};
pub use burn_dataset::{ImageBatch, ImageBatcher, ImageDataset, ImageItem};
pub use loader::{DatasetStats, ImageFolder, ImageSample};

use crate::model::config::{PipelineConfig, Task};
use crate::utils::error::{ClassifierError, Result};

/// Training and validation sets of one run
#[derive(Debug, Clone)]
pub struct DatasetSplits {
    pub train: ImageDataset,
    pub validation: ImageDataset,
    /// Index = label
    pub class_names: Vec<String>,
}

impl DatasetSplits {
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }
}

/// Load the data described by `config` and split it
pub fn load_splits(config: &PipelineConfig) -> Result<DatasetSplits> {
    let data = &config.data;

    let (train, validation, class_names) = match config.task {
        Task::Birds => {
            let positive = ClassSource::from_path(&data.positive_source)?;
            let negative = ClassSource::from_path(&data.negative_source)?;
            let (train, validation) = load_binary(
                &positive,
                &negative,
                data.max_images_per_class,
                data.image_size,
                data.validation_fraction,
                data.seed,
            )?;
            (train, validation, Task::Birds.default_class_names())
        }
        Task::Crops => {
            let folder = ImageFolder::scan(&data.data_dir)?;
            if folder.num_classes() == 0 {
                return Err(ClassifierError::Dataset(format!(
                    "no class directories under {:?}",
                    data.data_dir
                )));
            }
            let (train, validation) = folder.split_per_class(
                data.train_per_class,
                data.validation_per_class,
                data.image_size,
                data.seed,
            );
            (train, validation, folder.class_names)
        }
    };

    if train.is_empty() {
        return Err(ClassifierError::Dataset("training set is empty".to_string()));
    }
    if validation.is_empty() {
        return Err(ClassifierError::Dataset("validation set is empty".to_string()));
    }

    info!(
        "Dataset ready: {} classes, {} training / {} validation images",
        class_names.len(),
        train.len(),
        validation.len()
    );

    Ok(DatasetSplits {
        train: ImageDataset::new(train),
        validation: ImageDataset::new(validation),
        class_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_load_crop_splits() {
        let dir = tempfile::tempdir().unwrap();
        for class in ["maize", "cotton"] {
            let class_dir = dir.path().join(class);
            std::fs::create_dir_all(&class_dir).unwrap();
            for i in 0..4 {
                RgbImage::from_pixel(4, 4, Rgb([i * 40, 0, 0]))
                    .save(class_dir.join(format!("{}.png", i)))
                    .unwrap();
            }
        }

        let mut config = PipelineConfig::crops();
        config.data.data_dir = dir.path().to_path_buf();
        config.data.image_size = 8;
        config.data.train_per_class = 3;
        config.data.validation_per_class = 2;

        let splits = load_splits(&config).unwrap();
        assert_eq!(splits.class_names, vec!["cotton", "maize"]);
        assert_eq!(splits.num_classes(), 2);
        assert_eq!(burn::data::dataset::Dataset::len(&splits.train), 6);
        assert_eq!(burn::data::dataset::Dataset::len(&splits.validation), 2);
    }

    #[test]
    fn test_empty_validation_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let class_dir = dir.path().join("only");
        std::fs::create_dir_all(&class_dir).unwrap();
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))
            .save(class_dir.join("a.png"))
            .unwrap();

        let mut config = PipelineConfig::crops();
        config.data.data_dir = dir.path().to_path_buf();
        config.data.image_size = 8;

        let err = load_splits(&config).unwrap_err();
        assert!(matches!(err, ClassifierError::Dataset(_)));
    }

    #[test]
    fn test_missing_bird_source() {
        let mut config = PipelineConfig::birds();
        config.data.positive_source = "/nonexistent/bird.zip".into();
        assert!(matches!(
            load_splits(&config),
            Err(ClassifierError::PathNotFound(_))
        ));
    }
}
