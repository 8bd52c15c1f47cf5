//! Inference Predictor Module
//!
//! Runs a trained model on single images or whole directories. Images go
//! through the same resize, layout and normalization as during training.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use burn::data::dataloader::batcher::Batcher;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::preprocess::{is_image_file, load_image};
use crate::dataset::{ImageBatch, ImageBatcher, ImageItem};
use crate::model::cnn::ClassifierCnn;
use crate::training::checkpoint::{
    load_model, metadata_path_for, read_class_list, CheckpointMetadata,
};
use crate::utils::error::{ClassifierError, Result, ResultExt};
use crate::utils::metrics::top_k_indices;

/// Top-1 probability above which a prediction counts as high confidence
pub const HIGH_CONFIDENCE: f32 = 0.5;

/// Top-1 probability above which a prediction counts as moderate
pub const MODERATE_CONFIDENCE: f32 = 0.3;

/// Coarse confidence label for the top-1 prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Moderate,
    Low,
}

impl ConfidenceLevel {
    pub fn from_probability(p: f32) -> Self {
        if p > HIGH_CONFIDENCE {
            ConfidenceLevel::High
        } else if p > MODERATE_CONFIDENCE {
            ConfidenceLevel::Moderate
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "high"),
            ConfidenceLevel::Moderate => write!(f, "moderate"),
            ConfidenceLevel::Low => write!(f, "low"),
        }
    }
}

/// Result of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Path to the input image (if applicable)
    pub image_path: Option<PathBuf>,

    /// Predicted class index
    pub predicted_class: usize,

    /// Predicted class name
    pub class_name: String,

    /// Probability of the predicted class
    pub confidence: f32,

    /// Full probability distribution over all classes
    pub probabilities: Vec<f32>,

    /// Top-k predictions, highest first
    pub top_k: Vec<(usize, String, f32)>,

    /// Inference time in milliseconds
    pub inference_time_ms: f64,
}

impl PredictionResult {
    /// Build from softmax output; `k` is clamped to the number of classes
    pub fn new(
        probabilities: Vec<f32>,
        class_names: &[String],
        k: usize,
        inference_time: Duration,
        image_path: Option<PathBuf>,
    ) -> Self {
        let name = |idx: usize| {
            class_names
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("Class {}", idx))
        };

        let k = k.max(1).min(probabilities.len());
        let top_k: Vec<(usize, String, f32)> = top_k_indices(&probabilities, k)
            .into_iter()
            .map(|idx| (idx, name(idx), probabilities[idx]))
            .collect();

        let (predicted_class, confidence) = top_k
            .first()
            .map(|(idx, _, p)| (*idx, *p))
            .unwrap_or((0, 0.0));

        Self {
            image_path,
            predicted_class,
            class_name: name(predicted_class),
            confidence,
            probabilities,
            top_k,
            inference_time_ms: inference_time.as_secs_f64() * 1000.0,
        }
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_probability(self.confidence)
    }

    /// Entropy of the prediction (measure of uncertainty)
    pub fn entropy(&self) -> f32 {
        self.probabilities
            .iter()
            .filter(|&&p| p > 0.0)
            .map(|&p| -p * p.ln())
            .sum()
    }

    /// Margin between top-1 and top-2 predictions
    pub fn margin(&self) -> f32 {
        if self.top_k.len() >= 2 {
            self.top_k[0].2 - self.top_k[1].2
        } else {
            self.confidence
        }
    }

    /// Pretty print the prediction result
    pub fn display(&self) -> String {
        let mut output = String::new();

        if let Some(path) = &self.image_path {
            output.push_str(&format!("Image: {}\n", path.display()));
        }

        output.push_str(&format!(
            "Prediction: {} (class {})\n",
            self.class_name, self.predicted_class
        ));
        output.push_str(&format!(
            "Confidence: {:.2}% ({})\n",
            self.confidence * 100.0,
            self.confidence_level()
        ));
        output.push_str(&format!("Inference time: {:.2} ms\n", self.inference_time_ms));

        output.push_str(&format!("\nTop-{} predictions:\n", self.top_k.len()));
        for (i, (idx, name, prob)) in self.top_k.iter().enumerate() {
            output.push_str(&format!(
                "  {}. {:<25} (class {:>2}) {:6.2}%\n",
                i + 1,
                name,
                idx,
                prob * 100.0
            ));
        }

        output
    }
}

/// Predictor for running inference with a trained model
pub struct Predictor<B: Backend> {
    model: ClassifierCnn<B>,
    class_names: Vec<String>,
    batcher: ImageBatcher,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    /// Wrap a model; missing class names become `"Class {i}"`
    pub fn new(
        model: ClassifierCnn<B>,
        class_names: Vec<String>,
        image_size: usize,
        normalize: bool,
        device: B::Device,
    ) -> Self {
        let class_names = complete_class_names(class_names, model.num_classes());
        Self {
            model,
            class_names,
            batcher: ImageBatcher::new(image_size, normalize),
            device,
        }
    }

    /// Rebuild a predictor from saved weights and their metadata.
    ///
    /// `metadata_path` defaults to the `.json` next to the weights. A class
    /// list file, when given, overrides the names stored in the metadata.
    pub fn from_checkpoint(
        model_path: &Path,
        metadata_path: Option<&Path>,
        class_list: Option<&Path>,
        device: B::Device,
    ) -> Result<Self> {
        let metadata_path = metadata_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| metadata_path_for(model_path));
        let metadata = CheckpointMetadata::load(&metadata_path)
            .with_context(|| format!("checkpoint metadata {:?}", metadata_path))?;

        let class_names = match class_list {
            Some(path) => read_class_list(path)?,
            None => metadata.class_names.clone(),
        };

        let model = load_model::<B>(model_path, &metadata.model_config, &device)?;
        debug!(
            "Loaded {} model from {:?} (epoch {}, val acc {:.2}%)",
            metadata.task,
            model_path,
            metadata.epoch + 1,
            metadata.val_accuracy
        );

        Ok(Self::new(
            model,
            class_names,
            metadata.model_config.image_size,
            metadata.normalize,
            device,
        ))
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn num_classes(&self) -> usize {
        self.model.num_classes()
    }

    /// Softmax probabilities for one CHW image buffer
    pub fn predict_chw(&self, image: Vec<f32>) -> Result<Vec<f32>> {
        let size = self.batcher.image_size();
        if image.len() != 3 * size * size {
            return Err(ClassifierError::InvalidInput(format!(
                "expected {} values for a {}x{} image, got {}",
                3 * size * size,
                size,
                size,
                image.len()
            )));
        }

        let batch: ImageBatch<B> = self
            .batcher
            .batch(vec![ImageItem::new(image, 0, "")], &self.device);
        self.model
            .forward_softmax(batch.images)
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| ClassifierError::Inference(format!("{:?}", e)))
    }

    /// Classify one image file
    pub fn predict_file(&self, path: &Path, top_k: usize) -> Result<PredictionResult> {
        if !path.exists() {
            return Err(ClassifierError::PathNotFound(path.to_path_buf()));
        }

        let start = Instant::now();
        let image = load_image(path, self.batcher.image_size())?;
        let probabilities = self.predict_chw(image)?;

        Ok(PredictionResult::new(
            probabilities,
            &self.class_names,
            top_k,
            start.elapsed(),
            Some(path.to_path_buf()),
        ))
    }

    /// Classify every image file directly inside `dir`, in name order
    pub fn predict_dir(&self, dir: &Path, top_k: usize) -> Result<Vec<PredictionResult>> {
        if !dir.is_dir() {
            return Err(ClassifierError::PathNotFound(dir.to_path_buf()));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_image_file(p))
            .collect();
        files.sort();

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            match self.predict_file(&file, top_k) {
                Ok(result) => results.push(result),
                Err(e) => warn!("Skipping {:?}: {}", file, e),
            }
        }
        Ok(results)
    }
}

fn complete_class_names(mut names: Vec<String>, num_classes: usize) -> Vec<String> {
    if names.len() != num_classes {
        if !names.is_empty() {
            warn!(
                "{} class names for a {}-class model, filling with indices",
                names.len(),
                num_classes
            );
        }
        names.truncate(num_classes);
        for i in names.len()..num_classes {
            names.push(format!("Class {}", i));
        }
    }
    names
}
