//! Inference module for classifying new images
//!
//! This module provides:
//! - Loading a trained model together with its checkpoint metadata
//! - Single image and directory prediction with top-k output
//! - Confidence labels, entropy and margin for each prediction

pub mod predictor;

// Re-export main types for convenience
pub use predictor::{ConfidenceLevel, PredictionResult, Predictor};

/// Number of ranked classes shown by default
pub const DEFAULT_TOP_K: usize = 5;
