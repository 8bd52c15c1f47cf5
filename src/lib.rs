//! # vision_cnn
//!
//! Convolutional image classification pipelines built on the Burn framework.
//!
//! Two tasks share one architecture and one training loop:
//!
//! - **Birds**: bird / not-bird on 32x32 images read from zip archives or folders
//! - **Crops**: 30 agricultural crop classes on 224x224 images, one folder per class
//!
//! ## Modules
//!
//! - `dataset`: Image decoding, class sources, per-class splits and Burn batching
//! - `model`: CNN architecture and pipeline configuration
//! - `training`: Epoch loop, best-model checkpoints, history and evaluation
//! - `inference`: Prediction on new images from a saved checkpoint
//! - `utils`: Logging, metrics, charts and the error type
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vision_cnn::backend::{default_device, TrainingBackend};
//! use vision_cnn::dataset::load_splits;
//! use vision_cnn::{PipelineConfig, Trainer};
//!
//! let config = PipelineConfig::birds();
//! let splits = load_splits(&config)?;
//! let trainer = Trainer::<TrainingBackend>::new(config, splits.class_names.clone(), default_device())?;
//! let outcome = trainer.fit(&splits.train, &splits.validation)?;
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::{load_splits, DatasetSplits, ImageBatch, ImageBatcher, ImageDataset, ImageItem};
pub use inference::{PredictionResult, Predictor};
pub use model::{ClassifierCnn, ClassifierConfig, PipelineConfig, Task};
pub use training::{CheckpointManager, TrainingHistory, Trainer};
pub use utils::error::{ClassifierError, Result};
pub use utils::metrics::{BinaryReport, ConfusionMatrix, Metrics};

/// Side length of bird images
pub const BIRD_IMAGE_SIZE: usize = 32;

/// Side length of crop images
pub const CROP_IMAGE_SIZE: usize = 224;

/// Number of crop classes in the reference dataset
pub const NUM_CROP_CLASSES: usize = 30;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
