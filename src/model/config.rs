//! Pipeline Configuration Module
//!
//! Task presets plus the data, model and training settings of one run.
//! Configurations round-trip through pretty-printed JSON files.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::cnn::ClassifierConfig;
use crate::utils::error::{ClassifierError, Result};

/// Which of the two classification problems a run targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Binary bird / not-bird
    Birds,
    /// 30-class agricultural crops
    Crops,
}

impl Task {
    /// Fixed class names, empty when they are discovered from disk
    pub fn default_class_names(&self) -> Vec<String> {
        match self {
            Task::Birds => vec!["not-bird".to_string(), "bird".to_string()],
            Task::Crops => Vec::new(),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Task::Birds => "Bird / Not-Bird",
            Task::Crops => "Agricultural Crops",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Birds => write!(f, "birds"),
            Task::Crops => write!(f, "crops"),
        }
    }
}

impl FromStr for Task {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "birds" | "bird" => Ok(Task::Birds),
            "crops" | "crop" => Ok(Task::Crops),
            other => Err(ClassifierError::Config(format!(
                "unknown task '{}', expected 'birds' or 'crops'",
                other
            ))),
        }
    }
}

/// Where images come from and how they are split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Crops: root with one sub-directory per class
    pub data_dir: PathBuf,

    /// Birds: directory or .zip archive of positive (bird) images
    pub positive_source: PathBuf,

    /// Birds: directory or .zip archive of negative images
    pub negative_source: PathBuf,

    /// Images are resized to image_size x image_size
    pub image_size: usize,

    /// Birds: cap on images read from each source
    pub max_images_per_class: usize,

    /// Crops: training images per class
    pub train_per_class: usize,

    /// Crops: validation images per class
    pub validation_per_class: usize,

    /// Birds: share of the shuffled union held out for validation
    pub validation_fraction: f64,

    /// Apply ImageNet mean/std normalization
    pub normalize: bool,

    /// Seed for every shuffle in the pipeline
    pub seed: u64,
}

impl DataConfig {
    pub fn birds() -> Self {
        Self {
            data_dir: PathBuf::from("data/birds"),
            positive_source: PathBuf::from("bird.zip"),
            negative_source: PathBuf::from("not-bird.zip"),
            image_size: 32,
            max_images_per_class: 1000,
            train_per_class: 20,
            validation_per_class: 12,
            validation_fraction: 0.2,
            normalize: true,
            seed: 42,
        }
    }

    pub fn crops() -> Self {
        Self {
            data_dir: PathBuf::from("Agricultural-crops"),
            image_size: 224,
            ..Self::birds()
        }
    }
}

/// Optimizer and loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,

    /// L2 penalty passed to Adam, disabled when `None`
    pub weight_decay: Option<f32>,

    /// Checkpoints, history, charts and class list land here
    pub output_dir: PathBuf,

    /// Batches between progress lines (0 disables them)
    pub log_interval: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            learning_rate: 1e-3,
            weight_decay: None,
            output_dir: PathBuf::from("output"),
            log_interval: 10,
        }
    }
}

/// Complete configuration of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub task: Task,
    pub data: DataConfig,
    pub model: ClassifierConfig,
    pub training: TrainingConfig,
}

impl PipelineConfig {
    /// 32x32 binary preset
    pub fn birds() -> Self {
        Self {
            task: Task::Birds,
            data: DataConfig::birds(),
            model: ClassifierConfig::new(2, 32).with_pooled_size(4),
            training: TrainingConfig {
                epochs: 100,
                batch_size: 64,
                learning_rate: 1e-4,
                output_dir: PathBuf::from("output/birds"),
                ..TrainingConfig::default()
            },
        }
    }

    /// 224x224, 30-class preset
    pub fn crops() -> Self {
        Self {
            task: Task::Crops,
            data: DataConfig::crops(),
            model: ClassifierConfig::new(30, 224),
            training: TrainingConfig {
                output_dir: PathBuf::from("output/crops"),
                ..TrainingConfig::default()
            },
        }
    }

    pub fn for_task(task: Task) -> Self {
        match task {
            Task::Birds => Self::birds(),
            Task::Crops => Self::crops(),
        }
    }

    /// Check the settings for values that cannot produce a run
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(ClassifierError::Config(msg));

        if self.model.num_classes == 0 {
            return fail("model must have at least one class".to_string());
        }
        if self.task == Task::Birds && self.model.num_classes != 2 {
            return fail(format!(
                "bird task is binary but model has {} classes",
                self.model.num_classes
            ));
        }
        if self.data.image_size == 0 {
            return fail("image size must be positive".to_string());
        }
        if self.model.image_size != self.data.image_size {
            return fail(format!(
                "model image size {} does not match data image size {}",
                self.model.image_size, self.data.image_size
            ));
        }
        if self.model.pooled_size == 0 || self.model.hidden_units == 0 {
            return fail("pooled size and hidden units must be positive".to_string());
        }
        if !(0.0..1.0).contains(&self.model.dropout) {
            return fail(format!("dropout {} outside [0, 1)", self.model.dropout));
        }
        if self.training.epochs == 0 {
            return fail("epochs must be positive".to_string());
        }
        if self.training.batch_size == 0 {
            return fail("batch size must be positive".to_string());
        }
        if !(self.training.learning_rate > 0.0) {
            return fail(format!(
                "learning rate must be positive, got {}",
                self.training.learning_rate
            ));
        }
        match self.task {
            Task::Birds => {
                let fraction = self.data.validation_fraction;
                if !(fraction > 0.0 && fraction < 1.0) {
                    return fail(format!("validation fraction {} outside (0, 1)", fraction));
                }
                if self.data.max_images_per_class == 0 {
                    return fail("max images per class must be positive".to_string());
                }
            }
            Task::Crops => {
                if self.data.train_per_class == 0 || self.data.validation_per_class == 0 {
                    return fail("per-class train and validation counts must be positive".to_string());
                }
            }
        }

        Ok(())
    }

    /// Save as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ClassifierError::PathNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        PipelineConfig::birds().validate().unwrap();
        PipelineConfig::crops().validate().unwrap();
    }

    #[test]
    fn test_bird_preset_values() {
        let config = PipelineConfig::birds();
        assert_eq!(config.data.image_size, 32);
        assert_eq!(config.model.num_classes, 2);
        assert_eq!(config.model.pooled_size, 4);
        assert_eq!(config.data.max_images_per_class, 1000);
        assert_eq!(config.training.batch_size, 64);
    }

    #[test]
    fn test_crop_preset_values() {
        let config = PipelineConfig::crops();
        assert_eq!(config.data.image_size, 224);
        assert_eq!(config.model.num_classes, 30);
        assert_eq!(config.model.pooled_size, 7);
        assert_eq!(config.data.train_per_class, 20);
        assert_eq!(config.data.validation_per_class, 12);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::crops();
        config.training.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::crops();
        config.training.learning_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::crops();
        config.data.image_size = 64;
        assert!(matches!(config.validate(), Err(ClassifierError::Config(_))));

        let mut config = PipelineConfig::birds();
        config.data.validation_fraction = 1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::birds();
        config.model.num_classes = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_task_parse_and_display() {
        assert_eq!("Birds".parse::<Task>().unwrap(), Task::Birds);
        assert_eq!("crops".parse::<Task>().unwrap(), Task::Crops);
        assert!("fish".parse::<Task>().is_err());
        assert_eq!(Task::Crops.to_string(), "crops");
        assert_eq!(Task::Birds.default_class_names(), vec!["not-bird", "bird"]);
    }

    #[test]
    fn test_save_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = PipelineConfig::birds();
        config.training.epochs = 7;
        config.save(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"task\": \"birds\""));

        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.task, Task::Birds);
        assert_eq!(loaded.training.epochs, 7);
        assert_eq!(loaded.model.filters, [32, 64, 128]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ClassifierError::PathNotFound(_)));
    }
}
