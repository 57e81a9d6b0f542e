// ============================================================
// Layer 5 — AlexNet
// ============================================================
// The fixed network being fine-tuned. Layer stack:
//
//   conv1  96 × 11×11 /4 valid  → ReLU → LRN → max-pool 3/2
//   conv2 256 ×  5×5  same, 2 groups → ReLU → LRN → max-pool 3/2
//   conv3 384 ×  3×3  same
//   conv4 384 ×  3×3  same, 2 groups
//   conv5 256 ×  3×3  same, 2 groups → max-pool 3/2
//   fc6  4096 → ReLU → dropout
//   fc7  4096 → ReLU → dropout
//   fc8  num_classes (raw class scores)
//
// Input is NHWC ([batch, 227, 227, 3] by default) and is permuted
// to NCHW before conv1. Dropout is only active on an autodiff
// backend, so `model.valid()` evaluates with every unit kept.
//
// Widths and input side are configurable so tests can build a
// tiny network with the same topology (the smallest input that
// survives all three pools is 67×67).

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::parameter::{ParameterId, TrainableSet};
use crate::domain::traits::ParameterRegistry;

/// Layer names in forward order; each owns a weight and a bias.
pub const LAYER_NAMES: [&str; 8] = [
    "conv1", "conv2", "conv3", "conv4", "conv5", "fc6", "fc7", "fc8",
];

const LRN_RADIUS: usize = 2;
const LRN_ALPHA:  f64   = 2e-5;
const LRN_BETA:   f64   = 0.75;
const LRN_BIAS:   f64   = 1.0;

const MIN_IMAGE_SIZE: usize = 67;

#[derive(Config, Debug)]
pub struct AlexNetConfig {
    pub num_classes: usize,
    /// Probability of keeping a unit in fc6/fc7 during training.
    #[config(default = 0.5)]
    pub dropout_keep_rate: f64,
    #[config(default = 227)]
    pub image_size: usize,
    #[config(default = "[96, 256, 384, 384, 256]")]
    pub conv_channels: [usize; 5],
    #[config(default = 4096)]
    pub fc_width: usize,
}

impl AlexNetConfig {
    pub fn check(&self) -> Result<(), String> {
        if self.image_size < MIN_IMAGE_SIZE {
            return Err(format!(
                "image_size {} is below the minimum of {}",
                self.image_size, MIN_IMAGE_SIZE
            ));
        }
        // conv2, conv4 and conv5 split their inputs and outputs in two groups
        let [c1, c2, c3, c4, c5] = self.conv_channels;
        if [c1, c2, c3, c4, c5].iter().any(|c| *c == 0 || c % 2 != 0) {
            return Err(format!("conv channels {:?} must be even and non-zero", self.conv_channels));
        }
        if self.num_classes == 0 || self.fc_width == 0 {
            return Err("num_classes and fc_width must be positive".into());
        }
        Ok(())
    }

    /// Side length of the feature map entering fc6.
    pub fn final_side(&self) -> usize {
        let conv1 = (self.image_size - 11) / 4 + 1;
        let pool1 = pooled(conv1);
        let pool2 = pooled(pool1);
        pooled(pool2)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> AlexNet<B> {
        let [c1, c2, c3, c4, c5] = self.conv_channels;
        let same = |k: usize| PaddingConfig2d::Explicit(k / 2, k / 2);

        let conv1 = Conv2dConfig::new([3, c1], [11, 11])
            .with_stride([4, 4])
            .init(device);
        let conv2 = Conv2dConfig::new([c1, c2], [5, 5])
            .with_padding(same(5))
            .with_groups(2)
            .init(device);
        let conv3 = Conv2dConfig::new([c2, c3], [3, 3])
            .with_padding(same(3))
            .init(device);
        let conv4 = Conv2dConfig::new([c3, c4], [3, 3])
            .with_padding(same(3))
            .with_groups(2)
            .init(device);
        let conv5 = Conv2dConfig::new([c4, c5], [3, 3])
            .with_padding(same(3))
            .with_groups(2)
            .init(device);

        let side = self.final_side();
        let fc6 = LinearConfig::new(side * side * c5, self.fc_width).init(device);
        let fc7 = LinearConfig::new(self.fc_width, self.fc_width).init(device);
        let fc8 = LinearConfig::new(self.fc_width, self.num_classes).init(device);

        AlexNet {
            conv1, conv2, conv3, conv4, conv5,
            fc6, fc7, fc8,
            pool:    MaxPool2dConfig::new([3, 3]).with_strides([2, 2]).init(),
            dropout: DropoutConfig::new(1.0 - self.dropout_keep_rate).init(),
        }
    }
}

fn pooled(side: usize) -> usize {
    (side - 3) / 2 + 1
}

#[derive(Module, Debug)]
pub struct AlexNet<B: Backend> {
    pub conv1:   Conv2d<B>,
    pub conv2:   Conv2d<B>,
    pub conv3:   Conv2d<B>,
    pub conv4:   Conv2d<B>,
    pub conv5:   Conv2d<B>,
    pub fc6:     Linear<B>,
    pub fc7:     Linear<B>,
    pub fc8:     Linear<B>,
    pub pool:    MaxPool2d,
    pub dropout: Dropout,
}

impl<B: Backend> AlexNet<B> {
    /// images: [batch, H, W, C] → class scores [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = images.permute([0, 3, 1, 2]);

        let x = self.pool.forward(local_response_norm(relu(self.conv1.forward(x))));
        let x = self.pool.forward(local_response_norm(relu(self.conv2.forward(x))));
        let x = relu(self.conv3.forward(x));
        let x = relu(self.conv4.forward(x));
        let x = self.pool.forward(relu(self.conv5.forward(x)));

        let [batch, channels, height, width] = x.dims();
        let x = x.reshape([batch, channels * height * width]);

        let x = self.dropout.forward(relu(self.fc6.forward(x)));
        let x = self.dropout.forward(relu(self.fc7.forward(x)));
        self.fc8.forward(x)
    }

    /// Take pretrained values for every layer except the ones listed
    /// in `trainable`, which keep their fresh initialisation.
    pub fn with_pretrained(self, pretrained: AlexNet<B>, trainable: &TrainableSet) -> Self {
        let pick_conv = |fresh: Conv2d<B>, loaded: Conv2d<B>, layer: &str| {
            if trainable.contains_layer(layer) { fresh } else { loaded }
        };
        let pick_fc = |fresh: Linear<B>, loaded: Linear<B>, layer: &str| {
            if trainable.contains_layer(layer) { fresh } else { loaded }
        };

        Self {
            conv1:   pick_conv(self.conv1, pretrained.conv1, "conv1"),
            conv2:   pick_conv(self.conv2, pretrained.conv2, "conv2"),
            conv3:   pick_conv(self.conv3, pretrained.conv3, "conv3"),
            conv4:   pick_conv(self.conv4, pretrained.conv4, "conv4"),
            conv5:   pick_conv(self.conv5, pretrained.conv5, "conv5"),
            fc6:     pick_fc(self.fc6, pretrained.fc6, "fc6"),
            fc7:     pick_fc(self.fc7, pretrained.fc7, "fc7"),
            fc8:     pick_fc(self.fc8, pretrained.fc8, "fc8"),
            pool:    self.pool,
            dropout: self.dropout,
        }
    }
}

impl<B: Backend> ParameterRegistry for AlexNet<B> {
    fn parameter_ids(&self) -> Vec<ParameterId> {
        LAYER_NAMES
            .iter()
            .flat_map(|layer| [ParameterId::weight(*layer), ParameterId::bias(*layer)])
            .collect()
    }

    fn freeze(self, trainable: &TrainableSet) -> Self {
        Self {
            conv1:   freeze_conv(self.conv1, "conv1", trainable),
            conv2:   freeze_conv(self.conv2, "conv2", trainable),
            conv3:   freeze_conv(self.conv3, "conv3", trainable),
            conv4:   freeze_conv(self.conv4, "conv4", trainable),
            conv5:   freeze_conv(self.conv5, "conv5", trainable),
            fc6:     freeze_linear(self.fc6, "fc6", trainable),
            fc7:     freeze_linear(self.fc7, "fc7", trainable),
            fc8:     freeze_linear(self.fc8, "fc8", trainable),
            pool:    self.pool,
            dropout: self.dropout,
        }
    }
}

fn freeze_conv<B: Backend>(mut conv: Conv2d<B>, layer: &str, trainable: &TrainableSet) -> Conv2d<B> {
    conv.weight = conv.weight.set_require_grad(trainable.contains(&ParameterId::weight(layer)));
    conv.bias   = conv.bias.map(|b| b.set_require_grad(trainable.contains(&ParameterId::bias(layer))));
    conv
}

fn freeze_linear<B: Backend>(mut fc: Linear<B>, layer: &str, trainable: &TrainableSet) -> Linear<B> {
    fc.weight = fc.weight.set_require_grad(trainable.contains(&ParameterId::weight(layer)));
    fc.bias   = fc.bias.map(|b| b.set_require_grad(trainable.contains(&ParameterId::bias(layer))));
    fc
}

/// Cross-channel local response normalisation over NCHW input:
///   out = x / (bias + alpha * Σ x²)^beta
/// where the sum runs over channels c-radius ..= c+radius.
fn local_response_norm<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    let [n, c, h, w] = x.dims();
    let squared = x.clone().powf_scalar(2.0);
    let pad     = Tensor::<B, 4>::zeros([n, LRN_RADIUS, h, w], &x.device());
    let padded  = Tensor::cat(vec![pad.clone(), squared, pad], 1);

    let mut window_sum = padded.clone().slice([0..n, 0..c, 0..h, 0..w]);
    for offset in 1..=2 * LRN_RADIUS {
        window_sum = window_sum + padded.clone().slice([0..n, offset..offset + c, 0..h, 0..w]);
    }

    let denom = window_sum
        .mul_scalar(LRN_ALPHA)
        .add_scalar(LRN_BIAS)
        .powf_scalar(LRN_BETA);
    x / denom
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    /// Same topology as AlexNet, small enough for CPU tests.
    pub(crate) fn tiny_config(num_classes: usize) -> AlexNetConfig {
        AlexNetConfig::new(num_classes)
            .with_image_size(67)
            .with_conv_channels([4, 4, 4, 4, 4])
            .with_fc_width(8)
    }

    #[test]
    fn test_default_geometry_matches_alexnet() {
        let cfg = AlexNetConfig::new(4);
        assert_eq!(cfg.final_side(), 6);
        assert!(cfg.check().is_ok());
    }

    #[test]
    fn test_forward_produces_class_scores() {
        let device = Default::default();
        let model: AlexNet<NdArray> = tiny_config(3).init(&device);
        let images = Tensor::<NdArray, 4>::random([2, 67, 67, 3], Distribution::Default, &device);

        assert_eq!(model.forward(images).dims(), [2, 3]);
    }

    #[test]
    fn test_parameter_ids_cover_every_layer() {
        let model: AlexNet<NdArray> = tiny_config(3).init(&Default::default());
        let ids = model.parameter_ids();

        assert_eq!(ids.len(), 16);
        assert_eq!(ids[0], ParameterId::weight("conv1"));
        assert_eq!(ids[15], ParameterId::bias("fc8"));
        assert_eq!(model.layer_names().len(), 8);
    }

    #[test]
    fn test_check_rejects_small_input() {
        assert!(tiny_config(3).with_image_size(40).check().is_err());
        assert!(tiny_config(3).with_conv_channels([4, 3, 4, 4, 4]).check().is_err());
    }

    #[test]
    fn test_lrn_is_identity_for_zero_input() {
        let x = Tensor::<NdArray, 4>::zeros([1, 5, 2, 2], &Default::default());
        let y = local_response_norm(x);
        let values = y.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_with_pretrained_keeps_fresh_trainable_layers() {
        let device = Default::default();
        let fresh:  AlexNet<NdArray> = tiny_config(3).init(&device);
        let loaded: AlexNet<NdArray> = tiny_config(3).init(&device);
        let fc8_fresh   = fresh.fc8.weight.val().into_data().to_vec::<f32>().unwrap();
        let conv1_saved = loaded.conv1.weight.val().into_data().to_vec::<f32>().unwrap();

        let trainable = crate::domain::parameter::select(&fresh.parameter_ids(), &["fc8"]);
        let merged    = fresh.with_pretrained(loaded, &trainable);

        assert_eq!(merged.fc8.weight.val().into_data().to_vec::<f32>().unwrap(), fc8_fresh);
        assert_eq!(merged.conv1.weight.val().into_data().to_vec::<f32>().unwrap(), conv1_saved);
    }
}
