//! Model evaluation on a held-out dataset
//!
//! Runs the model without autodiff over fixed-order batches and collects
//! predictions, class probabilities and the mean cross-entropy loss.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::tensor::{backend::Backend, ElementConversion};

use crate::dataset::{ImageBatch, ImageBatcher, ImageDataset};
use crate::model::cnn::ClassifierCnn;
use crate::utils::error::{ClassifierError, Result};
use crate::utils::metrics::{BinaryReport, Metrics, RunningAverage};

/// Results of evaluating a model over a dataset
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub metrics: Metrics,
    pub predictions: Vec<usize>,
    pub labels: Vec<usize>,
    /// Softmax output per sample
    pub probabilities: Vec<Vec<f32>>,
}

impl Evaluation {
    /// Mean batch loss
    pub fn loss(&self) -> f64 {
        self.metrics.loss.unwrap_or(0.0)
    }

    /// Accuracy in percent
    pub fn accuracy_percent(&self) -> f64 {
        100.0 * self.metrics.accuracy
    }

    /// Thresholded report on the probability of `positive_class`
    pub fn binary_report(&self, positive_class: usize, threshold: f32) -> BinaryReport {
        let scores: Vec<f32> = self
            .probabilities
            .iter()
            .map(|p| p.get(positive_class).copied().unwrap_or(0.0))
            .collect();
        let labels: Vec<bool> = self.labels.iter().map(|&l| l == positive_class).collect();
        BinaryReport::from_scores(&scores, &labels, threshold)
    }
}

/// Evaluate `model` on every item of `dataset`
pub fn evaluate<B: Backend>(
    model: &ClassifierCnn<B>,
    dataset: &ImageDataset,
    batch_size: usize,
    normalize: bool,
    image_size: usize,
    device: &B::Device,
) -> Result<Evaluation> {
    if batch_size == 0 {
        return Err(ClassifierError::InvalidInput("batch size must be positive".to_string()));
    }

    let num_classes = model.num_classes();
    let batcher = ImageBatcher::new(image_size, normalize);
    let loss_fn = CrossEntropyLossConfig::new().init(device);

    let mut loss = RunningAverage::new();
    let mut probabilities = Vec::with_capacity(dataset.len());
    let mut labels = Vec::with_capacity(dataset.len());

    let len = dataset.len();
    for start in (0..len).step_by(batch_size) {
        let end = (start + batch_size).min(len);
        let items: Vec<_> = (start..end).filter_map(|i| dataset.get(i)).collect();
        if items.is_empty() {
            continue;
        }
        labels.extend(items.iter().map(|item| item.label));

        let batch: ImageBatch<B> = batcher.batch(items, device);
        let logits = model.forward(batch.images);

        let batch_loss: f64 = loss_fn
            .forward(logits.clone(), batch.targets)
            .into_scalar()
            .elem();
        loss.add(batch_loss);

        let [rows, cols] = logits.dims();
        let probs: Vec<f32> = burn::tensor::activation::softmax(logits, 1)
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| ClassifierError::Inference(format!("{:?}", e)))?;

        probabilities.extend((0..rows).map(|r| probs[r * cols..(r + 1) * cols].to_vec()));
    }

    let predictions: Vec<usize> = probabilities.iter().map(|p| argmax(p)).collect();

    let mut metrics =
        Metrics::from_predictions_with_probs(&predictions, &probabilities, &labels, num_classes);
    if loss.count() > 0 {
        metrics.loss = Some(loss.average());
    }

    Ok(Evaluation {
        metrics,
        predictions,
        labels,
        probabilities,
    })
}

/// Index of the largest value (first on ties)
pub fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best_i, best_v), (i, &v)| {
            if v > best_v {
                (i, v)
            } else {
                (best_i, best_v)
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ImageItem;
    use crate::model::cnn::ClassifierConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn test_evaluate_collects_everything() {
        let device = Default::default();
        let config = ClassifierConfig::new(3, 8)
            .with_filters([4, 4, 4])
            .with_pooled_size(1)
            .with_hidden_units(8);
        let model: ClassifierCnn<TestBackend> = config.init(&device);

        let items: Vec<ImageItem> = (0..5)
            .map(|i| ImageItem::new(vec![i as f32 / 5.0; 3 * 8 * 8], i % 3, format!("{}", i)))
            .collect();
        let dataset = ImageDataset::new(items);

        let evaluation = evaluate(&model, &dataset, 2, true, 8, &device).unwrap();

        assert_eq!(evaluation.predictions.len(), 5);
        assert_eq!(evaluation.labels, vec![0, 1, 2, 0, 1]);
        assert_eq!(evaluation.probabilities.len(), 5);
        assert!(evaluation.probabilities.iter().all(|p| p.len() == 3));
        assert_eq!(evaluation.metrics.total_samples, 5);
        assert!(evaluation.loss() > 0.0);
        // Three classes, so top-5 covers every class
        assert!((evaluation.metrics.top5_accuracy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_binary_report_from_evaluation() {
        let evaluation = Evaluation {
            metrics: Metrics::default(),
            predictions: vec![1, 0, 1],
            labels: vec![1, 0, 0],
            probabilities: vec![vec![0.2, 0.8], vec![0.9, 0.1], vec![0.3, 0.7]],
        };

        let report = evaluation.binary_report(1, 0.5);
        assert_eq!(report.true_positives, 1);
        assert_eq!(report.true_negatives, 1);
        assert_eq!(report.false_positives, 1);
        assert_eq!(report.false_negatives, 0);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let device = Default::default();
        let model: ClassifierCnn<TestBackend> = ClassifierConfig::new(2, 8)
            .with_pooled_size(1)
            .init(&device);
        let result = evaluate(&model, &ImageDataset::default(), 0, false, 8, &device);
        assert!(result.is_err());
    }
}
