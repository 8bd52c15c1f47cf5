//! Logging Module
//!
//! Structured logging on top of `tracing`, plus small progress loggers used by
//! the data loaders and the training loop.

use std::time::Instant;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Crate whose events follow the configured level; everything else is
/// limited to warnings unless `RUST_LOG` says otherwise.
const CRATE_TARGET: &str = "vision_cnn";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    /// Show the module path of each event
    pub include_target: bool,
    pub include_thread_ids: bool,
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            include_target: false,
            include_thread_ids: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// Debug output with targets and thread ids (`--verbose`)
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            include_target: true,
            include_thread_ids: true,
            ..Self::default()
        }
    }

    /// Errors only
    pub fn quiet() -> Self {
        Self {
            level: Level::ERROR,
            ..Self::default()
        }
    }

    /// Filter directive used when `RUST_LOG` is unset
    pub fn directive(&self) -> String {
        let level = self.level.as_str().to_lowercase();
        if self.level <= Level::WARN {
            // Level ordering in tracing: ERROR < WARN < INFO < DEBUG < TRACE
            format!("{}={}", CRATE_TARGET, level)
        } else {
            format!("warn,{}={}", CRATE_TARGET, level)
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()))
    }
}

/// Install the global subscriber; `RUST_LOG` overrides the configured level
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_ids)
        .compact()
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}

/// Progress logger for long-running operations
pub struct ProgressLogger {
    operation: String,
    total: usize,
    current: usize,
    log_interval: usize,
    start_time: Instant,
}

impl ProgressLogger {
    /// Create a new progress logger that reports roughly every 10%
    pub fn new(operation: &str, total: usize) -> Self {
        Self {
            operation: operation.to_string(),
            total,
            current: 0,
            log_interval: (total / 10).max(1),
            start_time: Instant::now(),
        }
    }

    /// Create with custom log interval
    pub fn with_interval(mut self, interval: usize) -> Self {
        self.log_interval = interval.max(1);
        self
    }

    /// Update progress
    pub fn update(&mut self, count: usize) {
        self.current = count;

        if self.current % self.log_interval == 0 || self.current == self.total {
            let elapsed = self.start_time.elapsed().as_secs_f64();
            let items_per_sec = if elapsed > 0.0 {
                self.current as f64 / elapsed
            } else {
                0.0
            };

            if self.total > 0 {
                tracing::info!(
                    "{}: {}/{} ({:.1}%) - {:.1} items/s",
                    self.operation,
                    self.current,
                    self.total,
                    100.0 * self.current as f64 / self.total as f64,
                    items_per_sec
                );
            } else {
                tracing::info!(
                    "{}: {} - {:.1} items/s",
                    self.operation,
                    self.current,
                    items_per_sec
                );
            }
        }
    }

    /// Increment progress by 1
    pub fn increment(&mut self) {
        self.update(self.current + 1);
    }

    /// Current count
    pub fn current(&self) -> usize {
        self.current
    }

    /// Log completion
    pub fn finish(&self) {
        tracing::info!(
            "{}: completed {} items in {:.2}s",
            self.operation,
            self.current,
            self.start_time.elapsed().as_secs_f64()
        );
    }
}

/// Training progress logger
pub struct TrainingLogger {
    epoch: usize,
    total_epochs: usize,
    epoch_start: Instant,
    training_start: Instant,
}

impl TrainingLogger {
    /// Create a new training logger
    pub fn new(total_epochs: usize) -> Self {
        Self {
            epoch: 0,
            total_epochs,
            epoch_start: Instant::now(),
            training_start: Instant::now(),
        }
    }

    /// Log start of an epoch
    pub fn start_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
        self.epoch_start = Instant::now();
        tracing::debug!("Epoch {}/{} started", epoch + 1, self.total_epochs);
    }

    /// Log end of an epoch with metrics (accuracies in percent)
    pub fn end_epoch(
        &self,
        train_loss: f64,
        train_accuracy: f64,
        val_loss: f64,
        val_accuracy: f64,
    ) -> f64 {
        let epoch_secs = self.epoch_start.elapsed().as_secs_f64();

        tracing::info!(
            "Epoch {}/{} | train loss {:.4} acc {:.2}% | val loss {:.4} acc {:.2}% | {:.2}s",
            self.epoch + 1,
            self.total_epochs,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
            epoch_secs
        );

        epoch_secs
    }

    /// Log a new best model
    pub fn log_new_best(&self, previous: f64, accuracy: f64) {
        tracing::info!(
            "New best model: validation accuracy {:.2}% -> {:.2}%",
            previous,
            accuracy
        );
    }

    /// Log training completion
    pub fn log_complete(&self, best_accuracy: f64) {
        tracing::info!(
            "Training complete: {} epochs in {:.1}s | best validation accuracy {:.2}%",
            self.total_epochs,
            self.training_start.elapsed().as_secs_f64(),
            best_accuracy
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_presets() {
        assert_eq!(LogConfig::default().level, Level::INFO);
        assert_eq!(LogConfig::verbose().level, Level::DEBUG);
        assert!(LogConfig::verbose().include_target);
        assert_eq!(LogConfig::quiet().level, Level::ERROR);
    }

    #[test]
    fn test_directive() {
        assert_eq!(LogConfig::default().directive(), "warn,vision_cnn=info");
        assert_eq!(LogConfig::verbose().directive(), "warn,vision_cnn=debug");
        assert_eq!(LogConfig::quiet().directive(), "vision_cnn=error");
    }

    #[test]
    fn test_progress_logger() {
        let mut logger = ProgressLogger::new("Decoding", 100).with_interval(25);
        logger.update(50);
        logger.increment();
        assert_eq!(logger.current(), 51);
    }
}
