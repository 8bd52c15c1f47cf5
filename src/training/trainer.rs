//! Training loop for the image classifier
//!
//! This module implements the full training loop using the Burn framework:
//! - Seeded per-epoch shuffling with lazily built batches
//! - Forward/backward passes with automatic differentiation
//! - Cross-entropy loss and Adam updates
//! - A validation pass after every epoch
//! - Best-model checkpointing on strict validation improvement, and reloading
//!   that checkpoint when the run ends

use std::path::PathBuf;

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use super::checkpoint::{load_model, CheckpointManager, CheckpointMetadata};
use super::evaluator::evaluate;
use super::history::{EpochMetrics, TrainingHistory};
use crate::dataset::{ImageBatch, ImageBatcher, ImageDataset};
use crate::model::cnn::ClassifierCnn;
use crate::model::config::PipelineConfig;
use crate::utils::error::{ClassifierError, Result};
use crate::utils::logging::TrainingLogger;
use crate::utils::metrics::{AccuracyTracker, RunningAverage};

/// Progress of the current run
#[derive(Debug, Clone, Default)]
pub struct TrainingState {
    /// Current epoch (0-indexed)
    pub epoch: usize,
    /// Optimizer steps taken
    pub iteration: usize,
    /// Training samples seen across all epochs
    pub samples_seen: usize,
    /// Best validation accuracy so far (percent)
    pub best_val_accuracy: f64,
}

/// What a finished run hands back
#[derive(Debug)]
pub struct TrainingOutcome<B: AutodiffBackend> {
    /// Best checkpoint when one was saved and reloaded, otherwise last epoch
    pub model: ClassifierCnn<B>,
    pub history: TrainingHistory,
    pub best_checkpoint: Option<PathBuf>,
}

/// Trainer for [`ClassifierCnn`]
pub struct Trainer<B: AutodiffBackend> {
    pub model: ClassifierCnn<B>,
    pub config: PipelineConfig,
    pub class_names: Vec<String>,
    pub state: TrainingState,
    checkpoints: CheckpointManager,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Build a fresh model for `config`; `class_names` must match its class count
    pub fn new(config: PipelineConfig, class_names: Vec<String>, device: B::Device) -> Result<Self> {
        config.validate()?;
        if class_names.len() != config.model.num_classes {
            return Err(ClassifierError::Config(format!(
                "model has {} outputs but {} class names were given",
                config.model.num_classes,
                class_names.len()
            )));
        }

        let model = config.model.init::<B>(&device);
        let checkpoints = CheckpointManager::new(config.training.output_dir.clone());

        Ok(Self {
            model,
            config,
            class_names,
            state: TrainingState::default(),
            checkpoints,
            device,
        })
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Train for the configured number of epochs
    pub fn fit(
        mut self,
        train: &ImageDataset,
        validation: &ImageDataset,
    ) -> Result<TrainingOutcome<B>> {
        let training = self.config.training.clone();
        let data = self.config.data.clone();

        if train.is_empty() {
            return Err(ClassifierError::Training("training set is empty".to_string()));
        }
        if validation.is_empty() {
            return Err(ClassifierError::Training("validation set is empty".to_string()));
        }
        if training.batch_size == 0 {
            return Err(ClassifierError::Training("batch size must be positive".to_string()));
        }

        info!(
            "Training {} for {} epochs ({} train / {} validation images, batch {}, lr {})",
            self.config.task,
            training.epochs,
            train.len(),
            validation.len(),
            training.batch_size,
            training.learning_rate
        );

        let batcher = ImageBatcher::new(data.image_size, data.normalize);
        let loss_fn = CrossEntropyLossConfig::new().init(&self.device);
        let mut optimizer = AdamConfig::new()
            .with_weight_decay(training.weight_decay.map(WeightDecayConfig::new))
            .init();

        let mut rng = ChaCha8Rng::seed_from_u64(data.seed);
        let mut history = TrainingHistory::new();
        let mut logger = TrainingLogger::new(training.epochs);
        let mut best_checkpoint: Option<PathBuf> = None;

        for epoch in 0..training.epochs {
            self.state.epoch = epoch;
            logger.start_epoch(epoch);

            let mut indices: Vec<usize> = (0..train.len()).collect();
            indices.shuffle(&mut rng);
            let num_batches = indices.len().div_ceil(training.batch_size);

            let mut epoch_loss = RunningAverage::new();
            let mut accuracy = AccuracyTracker::new();

            for (batch_idx, chunk) in indices.chunks(training.batch_size).enumerate() {
                let items: Vec<_> = chunk.iter().filter_map(|&i| train.get(i)).collect();
                if items.is_empty() {
                    continue;
                }

                let batch: ImageBatch<B> = batcher.batch(items, &self.device);
                let batch_len = batch.targets.dims()[0];

                let output = self.model.forward(batch.images);
                let loss = loss_fn.forward(output.clone(), batch.targets.clone());

                let loss_value: f64 = loss.clone().into_scalar().elem();
                epoch_loss.add(loss_value);

                let predictions = output.argmax(1).reshape([batch_len]);
                let batch_correct: i64 = predictions
                    .equal(batch.targets)
                    .int()
                    .sum()
                    .into_scalar()
                    .elem();
                accuracy.add_counts(batch_correct as usize, batch_len);

                let grads = GradientsParams::from_grads(loss.backward(), &self.model);
                self.model = optimizer.step(training.learning_rate, self.model.clone(), grads);

                self.state.iteration += 1;
                self.state.samples_seen += batch_len;

                let log_now = training.log_interval > 0 && (batch_idx + 1) % training.log_interval == 0;
                if log_now || batch_idx + 1 == num_batches {
                    debug!(
                        "  Batch {:>4}/{}: loss = {:.4}, acc = {:.2}%",
                        batch_idx + 1,
                        num_batches,
                        loss_value,
                        accuracy.percent()
                    );
                }
            }

            let evaluation = evaluate(
                &self.model.valid(),
                validation,
                training.batch_size,
                data.normalize,
                data.image_size,
                &self.device,
            )?;

            let metrics = EpochMetrics {
                epoch,
                train_loss: epoch_loss.average(),
                train_accuracy: accuracy.percent(),
                val_loss: evaluation.loss(),
                val_accuracy: evaluation.accuracy_percent(),
            };
            logger.end_epoch(
                metrics.train_loss,
                metrics.train_accuracy,
                metrics.val_loss,
                metrics.val_accuracy,
            );

            let previous_best = history.best_val_accuracy;
            if history.record(metrics) {
                logger.log_new_best(previous_best, metrics.val_accuracy);
                self.state.best_val_accuracy = metrics.val_accuracy;

                let metadata = self.metadata(epoch, metrics.val_accuracy);
                match self.checkpoints.save_best(&self.model, &metadata) {
                    Ok(path) => best_checkpoint = Some(path),
                    Err(e) => warn!("Failed to save best checkpoint at epoch {}: {}", epoch + 1, e),
                }
            }
        }

        logger.log_complete(history.best_val_accuracy);

        match &best_checkpoint {
            Some(path) => match load_model::<B>(path, &self.config.model, &self.device) {
                Ok(model) => {
                    info!("Reloaded best model from {:?}", path);
                    self.model = model;
                }
                Err(e) => warn!("Could not reload best model, keeping last epoch: {}", e),
            },
            None => warn!("No best checkpoint was saved, keeping last-epoch model"),
        }

        Ok(TrainingOutcome {
            model: self.model,
            history,
            best_checkpoint,
        })
    }

    /// Metadata describing the current model
    pub fn metadata(&self, epoch: usize, val_accuracy: f64) -> CheckpointMetadata {
        CheckpointMetadata::new(
            self.config.task,
            epoch,
            val_accuracy,
            self.class_names.clone(),
            self.config.model.clone(),
            self.config.data.normalize,
        )
    }
}
