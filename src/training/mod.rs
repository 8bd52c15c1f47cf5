//! Training module
//!
//! This module provides:
//! - The epoch loop with best-model tracking (`trainer`)
//! - Per-epoch loss/accuracy history (`history`)
//! - Weight and metadata persistence (`checkpoint`)
//! - Evaluation of a trained model (`evaluator`)

pub mod checkpoint;
pub mod evaluator;
pub mod history;
pub mod trainer;

// Re-export main types for convenience
pub use checkpoint::{
    load_model, read_class_list, write_class_list, CheckpointManager, CheckpointMetadata,
};
pub use evaluator::{evaluate, Evaluation};
pub use history::{EpochMetrics, TrainingHistory};
pub use trainer::{Trainer, TrainingOutcome, TrainingState};

/// Score threshold for the binary report
pub const DEFAULT_BINARY_THRESHOLD: f32 = 0.5;
