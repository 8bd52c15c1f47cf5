//! Per-epoch training history
//!
//! Stored as JSON with snake_case keys so charts can be regenerated later
//! without retraining.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{ClassifierError, Result};

/// Metrics of a single epoch (accuracies in percent)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
}

/// Loss and accuracy curves for a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub train_loss: Vec<f64>,
    pub train_accuracy: Vec<f64>,
    pub val_loss: Vec<f64>,
    pub val_accuracy: Vec<f64>,
    #[serde(default)]
    pub best_val_accuracy: f64,
    /// 0-indexed epoch of the best validation accuracy
    #[serde(default)]
    pub best_epoch: Option<usize>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one epoch; returns true when it is a strict improvement
    pub fn record(&mut self, metrics: EpochMetrics) -> bool {
        self.train_loss.push(metrics.train_loss);
        self.train_accuracy.push(metrics.train_accuracy);
        self.val_loss.push(metrics.val_loss);
        self.val_accuracy.push(metrics.val_accuracy);

        let improved = metrics.val_accuracy > self.best_val_accuracy;
        if improved {
            self.best_val_accuracy = metrics.val_accuracy;
            self.best_epoch = Some(metrics.epoch);
        }
        improved
    }

    /// Number of recorded epochs
    pub fn epochs(&self) -> usize {
        self.train_loss.len()
    }

    pub fn last(&self) -> Option<EpochMetrics> {
        let i = self.epochs().checked_sub(1)?;
        Some(EpochMetrics {
            epoch: i,
            train_loss: self.train_loss[i],
            train_accuracy: self.train_accuracy[i],
            val_loss: self.val_loss[i],
            val_accuracy: self.val_accuracy[i],
        })
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::info!("Training history saved to {:?}", path);
        Ok(())
    }

    /// Load and check that all four curves have the same length
    pub fn load_json(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ClassifierError::PathNotFound(path.to_path_buf()));
        }
        let history: Self = serde_json::from_str(&std::fs::read_to_string(path)?)?;

        let n = history.train_loss.len();
        if history.train_accuracy.len() != n
            || history.val_loss.len() != n
            || history.val_accuracy.len() != n
        {
            return Err(ClassifierError::InvalidInput(format!(
                "history curves in {:?} have different lengths",
                path
            )));
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch(epoch: usize, val_accuracy: f64) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_loss: 0.5,
            train_accuracy: 60.0,
            val_loss: 0.6,
            val_accuracy,
        }
    }

    #[test]
    fn test_record_tracks_strict_best() {
        let mut history = TrainingHistory::new();
        assert!(history.record(epoch(0, 40.0)));
        assert!(!history.record(epoch(1, 40.0)));
        assert!(history.record(epoch(2, 55.0)));
        assert!(!history.record(epoch(3, 50.0)));

        assert_eq!(history.epochs(), 4);
        assert_eq!(history.best_epoch, Some(2));
        assert_eq!(history.best_val_accuracy, 55.0);
        assert_eq!(history.last().map(|m| m.val_accuracy), Some(50.0));
    }

    #[test]
    fn test_zero_accuracy_is_not_an_improvement() {
        let mut history = TrainingHistory::new();
        assert!(!history.record(epoch(0, 0.0)));
        assert_eq!(history.best_epoch, None);
    }

    #[test]
    fn test_json_keys_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut history = TrainingHistory::new();
        history.record(epoch(0, 30.0));
        history.save_json(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        for key in ["train_loss", "train_accuracy", "val_loss", "val_accuracy"] {
            assert!(json.contains(key));
        }

        assert_eq!(TrainingHistory::load_json(&path).unwrap(), history);
    }

    #[test]
    fn test_load_rejects_ragged_curves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(
            &path,
            r#"{"train_loss":[1.0,0.5],"train_accuracy":[10.0],"val_loss":[1.0],"val_accuracy":[5.0]}"#,
        )
        .unwrap();

        assert!(matches!(
            TrainingHistory::load_json(&path),
            Err(ClassifierError::InvalidInput(_))
        ));
    }
}
