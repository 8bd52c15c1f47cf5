//! CNN Model Architecture for Image Classification
//!
//! One network serves both tasks: three convolutional blocks, an adaptive
//! average pool to a fixed grid, and a two-layer classifier head. Only the
//! number of classes and the pooled grid size differ between the 32x32 bird
//! images and the 224x224 crop images.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Configuration for the [`ClassifierCnn`] model
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    /// Number of output classes
    pub num_classes: usize,

    /// Input image size (square images)
    pub image_size: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Output channels of the three convolutional blocks
    #[config(default = "[32, 64, 128]")]
    pub filters: [usize; 3],

    /// Side of the grid produced by the adaptive average pool
    #[config(default = "7")]
    pub pooled_size: usize,

    /// Width of the hidden fully connected layer
    #[config(default = "512")]
    pub hidden_units: usize,

    /// Dropout rate before the output layer
    #[config(default = "0.5")]
    pub dropout: f64,
}

impl ClassifierConfig {
    /// Build the model on `device`
    pub fn init<B: Backend>(&self, device: &B::Device) -> ClassifierCnn<B> {
        ClassifierCnn::new(self, device)
    }

    /// Number of features entering the classifier head
    pub fn flattened_features(&self) -> usize {
        self.filters[2] * self.pooled_size * self.pooled_size
    }
}

/// Conv2d (3x3, same padding) -> BatchNorm -> ReLU -> MaxPool 2x2
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
    pub relu: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        let bn = BatchNormConfig::new(out_channels).init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self {
            conv,
            bn,
            relu: Relu::new(),
            pool,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Image classifier CNN
///
/// Architecture:
/// - 3 convolutional blocks (32 -> 64 -> 128 filters by default), each halving
///   the spatial resolution
/// - Adaptive average pooling to `pooled_size x pooled_size`
/// - Linear -> ReLU -> Dropout -> Linear producing raw logits
#[derive(Module, Debug)]
pub struct ClassifierCnn<B: Backend> {
    pub block1: ConvBlock<B>,
    pub block2: ConvBlock<B>,
    pub block3: ConvBlock<B>,

    pub pool: AdaptiveAvgPool2d,

    pub fc1: Linear<B>,
    pub relu: Relu,
    pub dropout: Dropout,
    pub fc2: Linear<B>,

    num_classes: usize,
}

impl<B: Backend> ClassifierCnn<B> {
    /// Create a new classifier from configuration
    pub fn new(config: &ClassifierConfig, device: &B::Device) -> Self {
        let [f1, f2, f3] = config.filters;

        let block1 = ConvBlock::new(config.in_channels, f1, device);
        let block2 = ConvBlock::new(f1, f2, device);
        let block3 = ConvBlock::new(f2, f3, device);

        let pool = AdaptiveAvgPool2dConfig::new([config.pooled_size, config.pooled_size]).init();

        let fc1 = LinearConfig::new(config.flattened_features(), config.hidden_units).init(device);
        let dropout = DropoutConfig::new(config.dropout).init();
        let fc2 = LinearConfig::new(config.hidden_units, config.num_classes).init(device);

        Self {
            block1,
            block2,
            block3,
            pool,
            fc1,
            relu: Relu::new(),
            dropout,
            fc2,
            num_classes: config.num_classes,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, height, width]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.block1.forward(x);
        let x = self.block2.forward(x);
        let x = self.block3.forward(x);

        // [B, C, H, W] -> [B, C, P, P] -> [B, C * P * P]
        let x = self.pool.forward(x);
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.fc1.forward(x);
        let x = self.relu.forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(x), 1)
    }

    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    #[test]
    fn test_forward_shape_crops() {
        let device = Default::default();
        let config = ClassifierConfig::new(30, 64);
        let model: ClassifierCnn<TestBackend> = config.init(&device);

        let input = Tensor::<TestBackend, 4>::random([2, 3, 64, 64], Distribution::Default, &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 30]);
        assert_eq!(model.num_classes(), 30);
    }

    #[test]
    fn test_forward_shape_birds() {
        let device = Default::default();
        let config = ClassifierConfig::new(2, 32).with_pooled_size(4);
        let model: ClassifierCnn<TestBackend> = config.init(&device);

        let input = Tensor::<TestBackend, 4>::random([3, 3, 32, 32], Distribution::Default, &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [3, 2]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let device = Default::default();
        let model: ClassifierCnn<TestBackend> = ClassifierConfig::new(5, 32)
            .with_pooled_size(2)
            .with_hidden_units(16)
            .init(&device);

        let input = Tensor::<TestBackend, 4>::random([2, 3, 32, 32], Distribution::Default, &device);
        let probs = model.forward_softmax(input);
        let sums: Vec<f32> = probs.sum_dim(1).into_data().to_vec().unwrap();

        for s in sums {
            assert!((s - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_crops_head_size() {
        let config = ClassifierConfig::new(30, 224);
        assert_eq!(config.flattened_features(), 128 * 7 * 7);
    }

    #[test]
    fn test_param_count() {
        let device = Default::default();
        let config = ClassifierConfig::new(2, 32)
            .with_pooled_size(1)
            .with_hidden_units(8);
        let model: ClassifierCnn<TestBackend> = config.init(&device);

        // conv (w + b) + batch norm (gamma, beta, running mean, running var)
        // per block, then two linears
        let conv = |i: usize, o: usize| i * o * 9 + o + 4 * o;
        let expected = conv(3, 32) + conv(32, 64) + conv(64, 128) + (128 * 8 + 8) + (8 * 2 + 2);
        assert_eq!(model.num_params(), expected);
    }
}
