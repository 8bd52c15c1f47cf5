//! Metrics Module for Model Evaluation
//!
//! - Accuracy (overall and per-class)
//! - Precision, Recall, F1-score
//! - Confusion Matrix
//! - Top-k accuracy
//! - Thresholded binary report (bird / not-bird)

use serde::{Deserialize, Serialize};

/// Metrics for a multi-class evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Total number of samples evaluated
    pub total_samples: usize,

    /// Number of correct predictions
    pub correct_predictions: usize,

    /// Overall accuracy (correct / total)
    pub accuracy: f64,

    /// Top-5 accuracy
    pub top5_accuracy: f64,

    /// Mean batch loss, when the evaluator computed one
    pub loss: Option<f64>,

    /// Macro-averaged precision (average over classes that occur as a label
    /// or as a prediction)
    pub macro_precision: f64,

    /// Macro-averaged recall
    pub macro_recall: f64,

    /// Macro-averaged F1-score
    pub macro_f1: f64,

    /// Weighted F1-score (weighted by class support)
    pub weighted_f1: f64,

    /// Per-class metrics
    pub per_class: Vec<ClassMetrics>,

    /// Confusion matrix
    pub confusion_matrix: ConfusionMatrix,
}

impl Metrics {
    /// Create metrics from predictions and ground truth labels
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let total_samples = predictions.len().min(ground_truth.len());
        if total_samples == 0 {
            return Self {
                confusion_matrix: ConfusionMatrix::new(num_classes),
                ..Self::default()
            };
        }

        let confusion_matrix =
            ConfusionMatrix::from_predictions(predictions, ground_truth, num_classes);

        let correct_predictions = predictions
            .iter()
            .zip(ground_truth.iter())
            .filter(|(p, g)| p == g)
            .count();

        let accuracy = correct_predictions as f64 / total_samples as f64;

        let per_class: Vec<ClassMetrics> = (0..num_classes)
            .map(|class_idx| ClassMetrics::from_confusion_matrix(&confusion_matrix, class_idx))
            .collect();

        let observed: Vec<&ClassMetrics> = per_class.iter().filter(|m| m.is_observed()).collect();
        let macro_avg = |value: fn(&ClassMetrics) -> f64| {
            if observed.is_empty() {
                0.0
            } else {
                observed.iter().map(|m| value(m)).sum::<f64>() / observed.len() as f64
            }
        };

        let macro_precision = macro_avg(|m| m.precision);
        let macro_recall = macro_avg(|m| m.recall);
        let macro_f1 = macro_avg(|m| m.f1);

        let total_support: usize = per_class.iter().map(|m| m.support).sum();
        let weighted_f1 = if total_support > 0 {
            per_class
                .iter()
                .map(|m| m.f1 * m.support as f64)
                .sum::<f64>()
                / total_support as f64
        } else {
            0.0
        };

        Self {
            total_samples,
            correct_predictions,
            accuracy,
            top5_accuracy: 0.0,
            loss: None,
            macro_precision,
            macro_recall,
            macro_f1,
            weighted_f1,
            per_class,
            confusion_matrix,
        }
    }

    /// Create metrics and fill in top-5 accuracy from class probabilities
    pub fn from_predictions_with_probs(
        predictions: &[usize],
        probabilities: &[Vec<f32>],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let mut metrics = Self::from_predictions(predictions, ground_truth, num_classes);

        if metrics.total_samples == 0 {
            return metrics;
        }

        let top5_correct = probabilities
            .iter()
            .zip(ground_truth.iter())
            .filter(|&(probs, &gt)| top_k_indices(probs, 5).contains(&gt))
            .count();

        metrics.top5_accuracy = top5_correct as f64 / metrics.total_samples as f64;
        metrics
    }

    /// Attach class names to the per-class entries
    pub fn with_class_names(mut self, names: &[String]) -> Self {
        for m in &mut self.per_class {
            if let Some(name) = names.get(m.class_idx) {
                m.class_name = Some(name.clone());
            }
        }
        self
    }

    /// One line per headline number
    pub fn display(&self) -> String {
        let mut rows: Vec<(&str, String)> = vec![
            ("Samples", self.total_samples.to_string()),
            (
                "Accuracy",
                format!(
                    "{:.2}% ({}/{})",
                    self.accuracy * 100.0,
                    self.correct_predictions,
                    self.total_samples
                ),
            ),
        ];
        if let Some(loss) = self.loss {
            rows.push(("Loss", format!("{:.4}", loss)));
        }
        if self.per_class.len() > 5 {
            rows.push(("Top-5 accuracy", format!("{:.2}%", self.top5_accuracy * 100.0)));
        }
        rows.push(("Macro precision", format!("{:.2}%", self.macro_precision * 100.0)));
        rows.push(("Macro recall", format!("{:.2}%", self.macro_recall * 100.0)));
        rows.push(("Macro F1", format!("{:.2}%", self.macro_f1 * 100.0)));
        rows.push(("Weighted F1", format!("{:.2}%", self.weighted_f1 * 100.0)));

        rows.iter()
            .map(|(label, value)| format!("  {:<16} {}\n", format!("{}:", label), value))
            .collect()
    }

    /// Per-class precision / recall / F1 table with a macro-average footer
    pub fn class_report(&self) -> String {
        let mut output = String::new();
        let rule = "-".repeat(70);

        output.push_str(&format!(
            "{:<25} {:>12} {:>12} {:>12}\n",
            "Class", "Precision", "Recall", "F1-Score"
        ));
        output.push_str(&rule);
        output.push('\n');

        for m in self.per_class.iter().filter(|m| m.is_observed()) {
            let name = m
                .class_name
                .clone()
                .unwrap_or_else(|| format!("Class {}", m.class_idx));
            output.push_str(&format!(
                "{:<25} {:>11.2}% {:>11.2}% {:>11.2}%\n",
                name,
                m.precision * 100.0,
                m.recall * 100.0,
                m.f1 * 100.0
            ));
        }

        output.push_str(&rule);
        output.push('\n');
        output.push_str(&format!(
            "{:<25} {:>11.2}% {:>11.2}% {:>11.2}%\n",
            "MACRO AVG",
            self.macro_precision * 100.0,
            self.macro_recall * 100.0,
            self.macro_f1 * 100.0
        ));

        output
    }
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Indices of the `k` largest entries, highest first
pub fn top_k_indices(values: &[f32], k: usize) -> Vec<usize> {
    let mut indexed: Vec<(usize, f32)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
    indexed.into_iter().take(k).map(|(idx, _)| idx).collect()
}

/// Per-class metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class index
    pub class_idx: usize,

    /// Class name (if available)
    pub class_name: Option<String>,

    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,

    /// Precision = TP / (TP + FP)
    pub precision: f64,

    /// Recall = TP / (TP + FN)
    pub recall: f64,

    /// F1 = 2 * (precision * recall) / (precision + recall)
    pub f1: f64,

    /// Number of actual samples of this class
    pub support: usize,
}

impl ClassMetrics {
    /// Calculate metrics for a class from confusion matrix
    pub fn from_confusion_matrix(cm: &ConfusionMatrix, class_idx: usize) -> Self {
        let true_positives = cm.get(class_idx, class_idx);

        // Predicted as this class, actually something else
        let false_positives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(i, class_idx))
            .sum();

        // Actually this class, predicted as something else
        let false_negatives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(class_idx, i))
            .sum();

        let true_negatives = cm.total() - true_positives - false_positives - false_negatives;
        let support = true_positives + false_negatives;

        let precision = ratio(true_positives, true_positives + false_positives);
        let recall = ratio(true_positives, true_positives + false_negatives);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            class_idx,
            class_name: None,
            true_positives,
            false_positives,
            false_negatives,
            true_negatives,
            precision,
            recall,
            f1,
            support,
        }
    }

    /// Class appears in the ground truth or was predicted at least once
    pub fn is_observed(&self) -> bool {
        self.support > 0 || self.true_positives + self.false_positives > 0
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator > 0 {
        numerator as f64 / denominator as f64
    } else {
        0.0
    }
}

/// Largest class count drawn as a full grid
const MAX_GRID_CLASSES: usize = 12;

/// Confusion Matrix for multi-class classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,

    /// Row = actual, column = predicted, row-major
    pub matrix: Vec<usize>,
}

impl Default for ConfusionMatrix {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Create confusion matrix from predictions and ground truth
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let mut cm = Self::new(num_classes);

        for (&pred, &actual) in predictions.iter().zip(ground_truth.iter()) {
            cm.add(actual, pred);
        }

        cm
    }

    /// Add a single prediction; out-of-range indices are ignored
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted] += 1;
        }
    }

    /// Get the count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Diagonal sum
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Off-diagonal cells sorted by count, largest first
    pub fn most_confused(&self, limit: usize) -> Vec<(usize, usize, usize)> {
        let mut cells: Vec<(usize, usize, usize)> = (0..self.num_classes)
            .flat_map(|actual| (0..self.num_classes).map(move |predicted| (actual, predicted)))
            .filter(|&(actual, predicted)| actual != predicted)
            .map(|(actual, predicted)| (actual, predicted, self.get(actual, predicted)))
            .filter(|&(_, _, count)| count > 0)
            .collect();
        cells.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));
        cells.truncate(limit);
        cells
    }

    /// Grid for small matrices; a list of the worst confusions for large ones
    pub fn display(&self, class_names: Option<&[String]>) -> String {
        let name = |idx: usize| -> String {
            class_names
                .and_then(|names| names.get(idx))
                .cloned()
                .unwrap_or_else(|| idx.to_string())
        };
        let mut output = String::new();

        if self.num_classes > MAX_GRID_CLASSES {
            output.push_str("Most frequent confusions (actual -> predicted):\n");
            let confused = self.most_confused(10);
            if confused.is_empty() {
                output.push_str("  none\n");
            }
            for (actual, predicted, count) in confused {
                output.push_str(&format!(
                    "  {:>20} -> {:<20} {:>5}\n",
                    name(actual),
                    name(predicted),
                    count
                ));
            }
        } else {
            output.push_str("Confusion matrix (rows = actual, columns = predicted):\n");
            let label_width = (0..self.num_classes)
                .map(|i| name(i).chars().count())
                .max()
                .unwrap_or(0)
                .clamp(6, 16);

            output.push_str(&" ".repeat(label_width + 1));
            for col in 0..self.num_classes {
                let short: String = name(col).chars().take(6).collect();
                output.push_str(&format!(" {:>6}", short));
            }
            output.push('\n');

            for row in 0..self.num_classes {
                let label: String = name(row).chars().take(label_width).collect();
                output.push_str(&format!("{:>width$} ", label, width = label_width));
                for col in 0..self.num_classes {
                    match self.get(row, col) {
                        0 if row != col => output.push_str("      ."),
                        count => output.push_str(&format!(" {:>6}", count)),
                    }
                }
                output.push('\n');
            }
        }

        output.push_str(&format!(
            "{} of {} correct ({:.2}%)\n",
            self.correct(),
            self.total(),
            self.accuracy() * 100.0
        ));
        output
    }

    /// Write as CSV with class names (or indices) as row and column headers
    pub fn save_csv(
        &self,
        path: &std::path::Path,
        class_names: Option<&[String]>,
    ) -> std::io::Result<()> {
        let header = |idx: usize| -> String {
            class_names
                .and_then(|names| names.get(idx))
                .map(|name| name.replace(',', " "))
                .unwrap_or_else(|| idx.to_string())
        };

        let mut content = String::from("actual/predicted");
        for col in 0..self.num_classes {
            content.push(',');
            content.push_str(&header(col));
        }
        content.push('\n');

        for row in 0..self.num_classes {
            content.push_str(&header(row));
            for col in 0..self.num_classes {
                content.push(',');
                content.push_str(&self.get(row, col).to_string());
            }
            content.push('\n');
        }

        std::fs::write(path, content)
    }
}

impl std::fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display(None))
    }
}

/// Thresholded two-class report.
///
/// A sample is predicted positive when its positive-class score is strictly
/// above the threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinaryReport {
    pub threshold: f32,
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

impl BinaryReport {
    /// Build from positive-class scores and labels (`true` = positive)
    pub fn from_scores(scores: &[f32], labels: &[bool], threshold: f32) -> Self {
        let mut report = Self {
            threshold,
            ..Self::default()
        };

        for (&score, &actual) in scores.iter().zip(labels.iter()) {
            let predicted = score > threshold;
            match (predicted, actual) {
                (true, true) => report.true_positives += 1,
                (false, false) => report.true_negatives += 1,
                (true, false) => report.false_positives += 1,
                (false, true) => report.false_negatives += 1,
            }
        }

        let total = report.true_positives
            + report.true_negatives
            + report.false_positives
            + report.false_negatives;
        report.accuracy = ratio(report.true_positives + report.true_negatives, total);
        report.precision = ratio(
            report.true_positives,
            report.true_positives + report.false_positives,
        );
        report.recall = ratio(
            report.true_positives,
            report.true_positives + report.false_negatives,
        );

        report
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// Matrix laid out as predicted (rows) by actual (columns)
    pub fn display(&self, negative_name: &str, positive_name: &str) -> String {
        let mut output = String::new();

        output.push_str("Confusion Matrix:\n");
        output.push_str(&format!(
            "{:>24} Real: {:>12} {:>12}\n",
            "", negative_name, positive_name
        ));
        output.push_str(&format!(
            "{:>24}       {:>12} {:>12}\n",
            format!("Predicted: {}", negative_name),
            self.true_negatives,
            self.false_negatives
        ));
        output.push_str(&format!(
            "{:>24}       {:>12} {:>12}\n",
            format!("Predicted: {}", positive_name),
            self.false_positives,
            self.true_positives
        ));
        output.push('\n');
        output.push_str(&format!("  True positives:  {}\n", self.true_positives));
        output.push_str(&format!("  True negatives:  {}\n", self.true_negatives));
        output.push_str(&format!("  False positives: {}\n", self.false_positives));
        output.push_str(&format!("  False negatives: {}\n", self.false_negatives));
        output.push_str(&format!("  Accuracy:  {:.4}\n", self.accuracy));
        output.push_str(&format!("  Precision: {:.4}\n", self.precision));
        output.push_str(&format!("  Recall:    {:.4}\n", self.recall));

        output
    }
}

/// Mean of per-batch values
#[derive(Debug, Clone, Default)]
pub struct RunningAverage {
    sum: f64,
    count: usize,
}

impl RunningAverage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn average(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Correct / seen counter across batches
#[derive(Debug, Clone, Default)]
pub struct AccuracyTracker {
    correct: usize,
    total: usize,
}

impl AccuracyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add pre-counted results from one batch
    pub fn add_counts(&mut self, correct: usize, total: usize) {
        self.correct += correct;
        self.total += total;
    }

    /// Fraction in [0, 1]
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.total)
    }

    /// Accuracy in percent
    pub fn percent(&self) -> f64 {
        100.0 * self.accuracy()
    }

    pub fn count(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crop_names() -> Vec<String> {
        vec!["banana".into(), "maize".into(), "rice".into()]
    }

    // actual:    banana x4, maize x3, rice x3
    // predicted: one banana as rice, one maize as banana, one rice as maize
    fn crop_labels() -> (Vec<usize>, Vec<usize>) {
        let actual = vec![0, 0, 0, 0, 1, 1, 1, 2, 2, 2];
        let predicted = vec![0, 0, 0, 2, 1, 1, 0, 2, 2, 1];
        (predicted, actual)
    }

    #[test]
    fn test_confusion_matrix_counts() {
        let (predicted, actual) = crop_labels();
        let cm = ConfusionMatrix::from_predictions(&predicted, &actual, 3);

        assert_eq!(cm.get(0, 0), 3);
        assert_eq!(cm.get(0, 2), 1);
        assert_eq!(cm.get(1, 0), 1);
        assert_eq!(cm.get(2, 1), 1);
        assert_eq!(cm.total(), 10);
        assert_eq!(cm.correct(), 7);
        assert!((cm.accuracy() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_confusion_matrix_ignores_out_of_range() {
        let mut cm = ConfusionMatrix::new(2);
        cm.add(5, 0);
        cm.add(0, 9);
        assert_eq!(cm.total(), 0);
        assert_eq!(cm.get(7, 7), 0);
    }

    #[test]
    fn test_most_confused() {
        let mut cm = ConfusionMatrix::new(3);
        for _ in 0..3 {
            cm.add(2, 1);
        }
        cm.add(0, 1);
        cm.add(1, 1);

        assert_eq!(cm.most_confused(5), vec![(2, 1, 3), (0, 1, 1)]);
        assert_eq!(cm.most_confused(1).len(), 1);
    }

    #[test]
    fn test_display_switches_to_list_for_many_classes() {
        let names = crop_names();
        let (predicted, actual) = crop_labels();
        let small =
            ConfusionMatrix::from_predictions(&predicted, &actual, 3).display(Some(names.as_slice()));
        assert!(small.contains("rows = actual"));
        assert!(small.contains("banana"));

        let mut large = ConfusionMatrix::new(30);
        large.add(4, 17);
        let text = large.display(None);
        assert!(text.contains("4 ->"));
        assert!(text.contains("0 of 1 correct"));
    }

    #[test]
    fn test_save_csv_with_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cm.csv");
        let (predicted, actual) = crop_labels();
        ConfusionMatrix::from_predictions(&predicted, &actual, 3)
            .save_csv(&path, Some(crop_names().as_slice()))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "actual/predicted,banana,maize,rice");
        assert_eq!(lines[1], "banana,3,0,1");
    }

    #[test]
    fn test_metrics_from_predictions() {
        let (predicted, actual) = crop_labels();
        let metrics = Metrics::from_predictions(&predicted, &actual, 3);

        assert_eq!(metrics.total_samples, 10);
        assert_eq!(metrics.correct_predictions, 7);
        assert!((metrics.accuracy - 0.7).abs() < 1e-9);
        assert_eq!(metrics.per_class.len(), 3);
        assert_eq!(metrics.per_class[0].support, 4);
    }

    #[test]
    fn test_macro_average_skips_unsupported_classes() {
        // Class 2 never appears as ground truth
        let metrics = Metrics::from_predictions(&[0, 1], &[0, 1], 3);

        assert!((metrics.macro_precision - 1.0).abs() < 1e-9);
        assert!((metrics.macro_recall - 1.0).abs() < 1e-9);
        assert!((metrics.weighted_f1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_macro_average_counts_predicted_only_classes() {
        // rice (2) is predicted once but never the true label
        let metrics = Metrics::from_predictions(&[0, 2], &[0, 1], 3).with_class_names(&crop_names());

        assert!(metrics.per_class[2].is_observed());
        assert_eq!(metrics.per_class[2].support, 0);
        assert!((metrics.macro_precision - 1.0 / 3.0).abs() < 1e-9);
        assert!((metrics.macro_recall - 1.0 / 3.0).abs() < 1e-9);
        assert!((metrics.macro_f1 - 1.0 / 3.0).abs() < 1e-9);
        assert!((metrics.weighted_f1 - 0.5).abs() < 1e-9);

        let report = metrics.class_report();
        assert!(report.contains("rice"));
        assert!(report.contains("maize"));
    }

    #[test]
    fn test_empty_metrics_are_zero() {
        let metrics = Metrics::from_predictions(&[], &[], 4);
        assert_eq!(metrics.total_samples, 0);
        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.confusion_matrix.num_classes, 4);
    }

    #[test]
    fn test_class_metrics() {
        let (predicted, actual) = crop_labels();
        let cm = ConfusionMatrix::from_predictions(&predicted, &actual, 3);
        let banana = ClassMetrics::from_confusion_matrix(&cm, 0);

        assert_eq!(banana.true_positives, 3);
        assert_eq!(banana.false_positives, 1);
        assert_eq!(banana.false_negatives, 1);
        assert_eq!(banana.true_negatives, 5);
        assert!((banana.precision - 0.75).abs() < 1e-9);
        assert!((banana.recall - 0.75).abs() < 1e-9);
        assert!((banana.f1 - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_top5_accuracy() {
        let probs = vec![
            vec![0.5, 0.1, 0.1, 0.1, 0.1, 0.05, 0.05],
            vec![0.3, 0.2, 0.15, 0.15, 0.1, 0.06, 0.04],
        ];
        // Second sample's true class (6) is outside its top five
        let metrics = Metrics::from_predictions_with_probs(&[0, 0], &probs, &[0, 6], 7);
        assert!((metrics.top5_accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_top_k_indices() {
        assert_eq!(top_k_indices(&[0.1, 0.6, 0.3], 2), vec![1, 2]);
        assert_eq!(top_k_indices(&[0.1, 0.6], 5), vec![1, 0]);
    }

    #[test]
    fn test_reports_use_names() {
        let (predicted, actual) = crop_labels();
        let mut metrics =
            Metrics::from_predictions(&predicted, &actual, 3).with_class_names(&crop_names());
        metrics.loss = Some(0.6931);

        let report = metrics.class_report();
        assert!(report.contains("maize"));
        assert!(report.contains("MACRO AVG"));

        let summary = metrics.display();
        assert!(summary.contains("70.00% (7/10)"));
        assert!(summary.contains("0.6931"));
    }

    #[test]
    fn test_binary_report() {
        let scores = [0.9, 0.2, 0.7, 0.4, 0.5];
        let labels = [true, false, false, true, true];

        let report = BinaryReport::from_scores(&scores, &labels, 0.5);

        assert_eq!(report.true_positives, 1);
        assert_eq!(report.true_negatives, 1);
        assert_eq!(report.false_positives, 1);
        // 0.4 and 0.5 are not strictly above the threshold
        assert_eq!(report.false_negatives, 2);
        assert_eq!(report.total(), 5);
        assert!((report.accuracy - 0.4).abs() < 1e-9);
        assert!((report.precision - 0.5).abs() < 1e-9);
        assert!((report.recall - 1.0 / 3.0).abs() < 1e-9);
        assert!(report.display("not-bird", "bird").contains("Predicted: bird"));
    }

    #[test]
    fn test_binary_report_zero_denominators() {
        let report = BinaryReport::from_scores(&[0.1, 0.2], &[false, false], 0.5);
        assert_eq!(report.precision, 0.0);
        assert_eq!(report.recall, 0.0);
        assert!((report.accuracy - 1.0).abs() < 1e-9);

        let empty = BinaryReport::from_scores(&[], &[], 0.5);
        assert_eq!(empty.accuracy, 0.0);
    }

    #[test]
    fn test_batch_trackers() {
        let mut loss = RunningAverage::new();
        assert_eq!(loss.average(), 0.0);
        for value in [0.9, 0.7, 0.5] {
            loss.add(value);
        }
        assert_eq!(loss.count(), 3);
        assert!((loss.average() - 0.7).abs() < 1e-9);

        let mut accuracy = AccuracyTracker::new();
        accuracy.add_counts(28, 32);
        accuracy.add_counts(4, 8);
        assert_eq!(accuracy.count(), 40);
        assert!((accuracy.percent() - 80.0).abs() < 1e-9);
    }
}
