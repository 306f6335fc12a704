use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Initializer,
        Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

// Pooling window and stride shared by both pooling stages.
const POOL_SIZE:   usize = 3;
const POOL_STRIDE: usize = 2;

// Batch norm running statistics keep 99% of the old value per step.
const BN_MOMENTUM: f64 = 0.01;
const BN_EPSILON:  f64 = 1e-3;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ConvNetConfig {
    #[config(default = 10)]
    pub num_classes: usize,
    #[config(default = 3)]
    pub in_channels: usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl ConvNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvNet<B> {
        let conv1 = conv(self.in_channels, 64, 5, PaddingConfig2d::Same, device);
        let conv2 = conv(64, 64, 5, PaddingConfig2d::Same, device);
        let conv3 = conv(64, 64, 3, PaddingConfig2d::Valid, device);
        let conv4 = conv(64, 32, 3, PaddingConfig2d::Valid, device);

        let pool = MaxPool2dConfig::new([POOL_SIZE, POOL_SIZE])
            .with_strides([POOL_STRIDE, POOL_STRIDE])
            .init();

        let classifier = LinearConfig::new(self.flattened_features(32), self.num_classes)
            .with_initializer(glorot())
            .init(device);

        ConvNet {
            conv1, bn1: batch_norm(64, device),
            conv2, bn2: batch_norm(64, device),
            conv3, bn3: batch_norm(64, device),
            conv4, bn4: batch_norm(32, device),
            pool,
            dropout: DropoutConfig::new(self.dropout).init(),
            classifier,
        }
    }

    /// Size of the flattened feature map for a square input of side `side`.
    ///
    /// same-conv → pool → same-conv → pool → valid 3x3 → valid 3x3, 32 channels
    pub fn flattened_features(&self, side: usize) -> usize {
        let pooled = |s: usize| (s - POOL_SIZE) / POOL_STRIDE + 1;
        let valid3 = |s: usize| s - 2;
        let side = valid3(valid3(pooled(pooled(side))));
        32 * side * side
    }
}

fn glorot() -> Initializer {
    Initializer::XavierUniform { gain: 1.0 }
}

fn conv<B: Backend>(
    channels_in:  usize,
    channels_out: usize,
    kernel:       usize,
    padding:      PaddingConfig2d,
    device:       &B::Device,
) -> Conv2d<B> {
    Conv2dConfig::new([channels_in, channels_out], [kernel, kernel])
        .with_padding(padding)
        .with_initializer(glorot())
        .init(device)
}

fn batch_norm<B: Backend>(features: usize, device: &B::Device) -> BatchNorm<B, 2> {
    BatchNormConfig::new(features)
        .with_momentum(BN_MOMENTUM)
        .with_epsilon(BN_EPSILON)
        .init(device)
}

#[derive(Module, Debug)]
pub struct ConvNet<B: Backend> {
    pub conv1:      Conv2d<B>,
    pub bn1:        BatchNorm<B, 2>,
    pub conv2:      Conv2d<B>,
    pub bn2:        BatchNorm<B, 2>,
    pub conv3:      Conv2d<B>,
    pub bn3:        BatchNorm<B, 2>,
    pub conv4:      Conv2d<B>,
    pub bn4:        BatchNorm<B, 2>,
    pub pool:       MaxPool2d,
    pub dropout:    Dropout,
    pub classifier: Linear<B>,
}

impl<B: Backend> ConvNet<B> {
    /// images: [batch, 3, 32, 32] → logits: [batch, num_classes]
    ///
    /// Softmax is not applied here; the cross-entropy loss works on logits
    /// and argmax is unaffected by it.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.bn1.forward(self.conv1.forward(images)));
        let x = self.dropout.forward(self.pool.forward(x));

        // second block drops out before pooling
        let x = relu(self.bn2.forward(self.conv2.forward(x)));
        let x = self.pool.forward(self.dropout.forward(x));

        let x = relu(self.bn3.forward(self.conv3.forward(x)));
        let x = relu(self.bn4.forward(self.conv4.forward(x)));

        self.classifier.forward(x.flatten::<2>(1, 3))
    }

    pub fn forward_classification(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_flattened_features_for_cifar_side() {
        // 32 → pool 15 → pool 7 → valid 5 → valid 3
        assert_eq!(ConvNetConfig::new().flattened_features(32), 32 * 3 * 3);
    }

    #[test]
    fn test_forward_produces_class_logits() {
        let device = Default::default();
        let model: ConvNet<TestBackend> = ConvNetConfig::new().init(&device);

        let images = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        assert_eq!(model.forward(images).dims(), [2, 10]);
    }

    #[test]
    fn test_loss_is_finite_and_positive() {
        let device = Default::default();
        let model: ConvNet<TestBackend> = ConvNetConfig::new().with_dropout(0.0).init(&device);

        let images  = Tensor::<TestBackend, 4>::ones([2, 3, 32, 32], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([1, 4], &device);
        let (loss, logits) = model.forward_classification(images, targets);

        let loss: f64 = loss.into_scalar().elem::<f64>();
        assert!(loss.is_finite() && loss > 0.0);
        assert_eq!(logits.dims(), [2, 10]);
    }
}
