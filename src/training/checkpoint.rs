//! Model checkpointing.
//!
//! This module provides:
//! - Best-model saving with an atomic replace and an epoch-suffixed fallback
//! - Final model saving
//! - JSON metadata next to every weight file, enough to rebuild the model
//! - Class list files (`"{index}: {name}"` per line)

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::cnn::{ClassifierCnn, ClassifierConfig};
use crate::model::config::Task;
use crate::utils::error::{ClassifierError, Result};

/// Full-precision named MessagePack recorder
pub type ModelRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Extension `ModelRecorder` writes
pub const MODEL_EXTENSION: &str = "mpk";

const BEST_STEM: &str = "best_model";
const BEST_TMP_STEM: &str = "best_model_tmp";
const FINAL_STEM: &str = "final_model";

/// Everything needed to rebuild and use a saved model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub task: Task,
    /// 0-indexed epoch the weights come from
    pub epoch: usize,
    /// Validation accuracy in percent
    pub val_accuracy: f64,
    pub class_names: Vec<String>,
    pub model_config: ClassifierConfig,
    /// Whether inputs were ImageNet-normalized during training
    pub normalize: bool,
    pub timestamp: String,
}

impl CheckpointMetadata {
    pub fn new(
        task: Task,
        epoch: usize,
        val_accuracy: f64,
        class_names: Vec<String>,
        model_config: ClassifierConfig,
        normalize: bool,
    ) -> Self {
        Self {
            task,
            epoch,
            val_accuracy,
            class_names,
            model_config,
            normalize,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ClassifierError::PathNotFound(path.to_path_buf()));
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

/// Metadata file that belongs to a weight file
pub fn metadata_path_for(model_path: &Path) -> PathBuf {
    model_path.with_extension("json")
}

/// Saves and loads model weights under one directory
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    checkpoint_dir: PathBuf,
}

impl CheckpointManager {
    pub fn new<P: Into<PathBuf>>(checkpoint_dir: P) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    pub fn best_model_path(&self) -> PathBuf {
        self.model_path(BEST_STEM)
    }

    pub fn final_model_path(&self) -> PathBuf {
        self.model_path(FINAL_STEM)
    }

    fn model_path(&self, stem: &str) -> PathBuf {
        self.checkpoint_dir
            .join(stem)
            .with_extension(MODEL_EXTENSION)
    }

    /// Save the current best model, returning where the weights went.
    ///
    /// Weights are recorded to a temporary file and renamed over
    /// `best_model.mpk`. If that fails, `best_model_ep{N}.mpk` (1-based epoch)
    /// is tried instead.
    pub fn save_best<B: Backend>(
        &self,
        model: &ClassifierCnn<B>,
        metadata: &CheckpointMetadata,
    ) -> Result<PathBuf> {
        match self.save_best_atomic(model) {
            Ok(path) => {
                metadata.save(&metadata_path_for(&path))?;
                info!(
                    "Best model saved to {:?} (val acc {:.2}%)",
                    path, metadata.val_accuracy
                );
                Ok(path)
            }
            Err(e) => {
                warn!("Could not save best model atomically: {}", e);
                let stem = format!("{}_ep{}", BEST_STEM, metadata.epoch + 1);
                let path = self.record(model, &stem)?;
                metadata.save(&metadata_path_for(&path))?;
                warn!("Best model saved to fallback {:?}", path);
                Ok(path)
            }
        }
    }

    fn save_best_atomic<B: Backend>(&self, model: &ClassifierCnn<B>) -> Result<PathBuf> {
        let tmp = self.record(model, BEST_TMP_STEM)?;
        let target = self.best_model_path();
        fs::rename(&tmp, &target)?;
        Ok(target)
    }

    /// Save the model at the end of a run
    pub fn save_final<B: Backend>(
        &self,
        model: &ClassifierCnn<B>,
        metadata: &CheckpointMetadata,
    ) -> Result<PathBuf> {
        let path = self.record(model, FINAL_STEM)?;
        metadata.save(&metadata_path_for(&path))?;
        info!("Final model saved to {:?}", path);
        Ok(path)
    }

    fn record<B: Backend>(&self, model: &ClassifierCnn<B>, stem: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.checkpoint_dir)?;
        let path = self.model_path(stem);
        model
            .clone()
            .save_file(path.clone(), &ModelRecorder::new())
            .map_err(|e| ClassifierError::Model(format!("failed to save {:?}: {:?}", path, e)))?;
        Ok(path)
    }
}

/// Build a model from `config` and load weights from `path`
pub fn load_model<B: Backend>(
    path: &Path,
    config: &ClassifierConfig,
    device: &B::Device,
) -> Result<ClassifierCnn<B>> {
    if !path.exists() {
        return Err(ClassifierError::PathNotFound(path.to_path_buf()));
    }
    config
        .init::<B>(device)
        .load_file(path.to_path_buf(), &ModelRecorder::new(), device)
        .map_err(|e| ClassifierError::Model(format!("failed to load {:?}: {:?}", path, e)))
}

/// Write one `"{index}: {name}"` line per class
pub fn write_class_list(path: &Path, class_names: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let content: String = class_names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}: {}\n", i, name))
        .collect();
    fs::write(path, content)?;
    info!("Class list saved to {:?}", path);
    Ok(())
}

/// Parse a class list, ordering names by their index
pub fn read_class_list(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(ClassifierError::PathNotFound(path.to_path_buf()));
    }

    let mut entries: Vec<(usize, String)> = fs::read_to_string(path)?
        .lines()
        .filter_map(|line| {
            let (index, name) = line.split_once(':')?;
            let index = index.trim().parse::<usize>().ok()?;
            Some((index, name.trim().to_string()))
        })
        .collect();
    entries.sort_by_key(|(index, _)| *index);

    Ok(entries.into_iter().map(|(_, name)| name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, Tensor};

    type TestBackend = NdArray;

    fn tiny_config() -> ClassifierConfig {
        ClassifierConfig::new(3, 16)
            .with_filters([4, 4, 4])
            .with_pooled_size(1)
            .with_hidden_units(8)
    }

    fn metadata(epoch: usize) -> CheckpointMetadata {
        CheckpointMetadata::new(
            Task::Crops,
            epoch,
            66.7,
            vec!["a".into(), "b".into(), "c".into()],
            tiny_config(),
            true,
        )
    }

    #[test]
    fn test_save_best_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let manager = CheckpointManager::new(dir.path());
        let model: ClassifierCnn<TestBackend> = tiny_config().init(&device);

        let path = manager.save_best(&model, &metadata(4)).unwrap();

        assert_eq!(path, manager.best_model_path());
        assert!(path.exists());
        assert!(!dir.path().join("best_model_tmp.mpk").exists());

        let meta = CheckpointMetadata::load(&metadata_path_for(&path)).unwrap();
        assert_eq!(meta.epoch, 4);
        assert_eq!(meta.class_names.len(), 3);

        let loaded: ClassifierCnn<TestBackend> = load_model(&path, &meta.model_config, &device).unwrap();
        let input = Tensor::<TestBackend, 4>::random([1, 3, 16, 16], Distribution::Default, &device);
        let expected: Vec<f32> = model.forward(input.clone()).into_data().to_vec().unwrap();
        let actual: Vec<f32> = loaded.forward(input).into_data().to_vec().unwrap();
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-5);
        }
    }

    #[test]
    fn test_reload_keeps_weights_bit_exact() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let manager = CheckpointManager::new(dir.path());
        let model: ClassifierCnn<TestBackend> = tiny_config().init(&device);

        let path = manager.save_best(&model, &metadata(0)).unwrap();
        let loaded: ClassifierCnn<TestBackend> = load_model(&path, &tiny_config(), &device).unwrap();

        let before: Vec<f32> = model.block1.conv.weight.val().into_data().to_vec().unwrap();
        let after: Vec<f32> = loaded.block1.conv.weight.val().into_data().to_vec().unwrap();
        assert_eq!(before, after);

        let before: Vec<f32> = model.fc2.weight.val().into_data().to_vec().unwrap();
        let after: Vec<f32> = loaded.fc2.weight.val().into_data().to_vec().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_save_best_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let manager = CheckpointManager::new(dir.path());
        let model: ClassifierCnn<TestBackend> = tiny_config().init(&device);

        manager.save_best(&model, &metadata(0)).unwrap();
        manager.save_best(&model, &metadata(3)).unwrap();

        let meta = CheckpointMetadata::load(&dir.path().join("best_model.json")).unwrap();
        assert_eq!(meta.epoch, 3);
    }

    #[test]
    fn test_save_best_falls_back_to_epoch_name() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let manager = CheckpointManager::new(dir.path());
        // A directory in the way makes the rename fail
        std::fs::create_dir_all(dir.path().join("best_model.mpk").join("blocker")).unwrap();

        let model: ClassifierCnn<TestBackend> = tiny_config().init(&device);
        let path = manager.save_best(&model, &metadata(6)).unwrap();

        assert_eq!(path, dir.path().join("best_model_ep7.mpk"));
        assert!(path.exists());
        assert!(dir.path().join("best_model_ep7.json").exists());
    }

    #[test]
    fn test_save_final() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let manager = CheckpointManager::new(dir.path().join("nested"));
        let model: ClassifierCnn<TestBackend> = tiny_config().init(&device);

        let path = manager.save_final(&model, &metadata(9)).unwrap();
        assert_eq!(path, manager.final_model_path());
        assert!(dir.path().join("nested").join("final_model.json").exists());
    }

    #[test]
    fn test_load_missing_model() {
        let device = Default::default();
        let result = load_model::<TestBackend>(Path::new("/nonexistent/best_model.mpk"), &tiny_config(), &device);
        assert!(matches!(result, Err(ClassifierError::PathNotFound(_))));
    }

    #[test]
    fn test_class_list_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.txt");
        let names: Vec<String> = vec!["Cherry".into(), "Coffee-plant".into(), "Cucumber".into()];

        write_class_list(&path, &names).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("0: Cherry\n1: Coffee-plant\n"));

        assert_eq!(read_class_list(&path).unwrap(), names);
    }

    #[test]
    fn test_read_class_list_ignores_noise() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.txt");
        std::fs::write(&path, "# header\n1: wheat\n\n0: rice\nno colon here\n").unwrap();

        assert_eq!(read_class_list(&path).unwrap(), vec!["rice", "wheat"]);
    }
}
