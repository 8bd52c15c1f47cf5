//! Model module for the CNN classifier and run configuration
//!
//! This module provides:
//! - The shared CNN architecture (`cnn`)
//! - Task presets and pipeline configuration (`config`)

pub mod cnn;
pub mod config;

// Re-export main types for convenience
pub use cnn::{ClassifierCnn, ClassifierConfig};
pub use config::{DataConfig, PipelineConfig, Task, TrainingConfig};
