// ============================================================
// Layer 5 — Training / Evaluation Step
// ============================================================
// One mini-batch of work.
//
// train_step (autodiff backend, dropout active):
//   scores = model(images)
//   loss   = mean softmax cross-entropy(scores, one-hot labels)
//   grads  = ∂loss/∂θ for trainable θ only
//   θ      = Adam(θ, grads)
//
// eval_step (inner backend, dropout off):
//   the same loss and accuracy, no gradients, no update. The
//   inner-backend copy comes from valid_model(), taken once per
//   validation pass and reused for all of its batches.
//
// Frozen parameters are built with require_grad = false, so the
// autodiff graph never produces a gradient for them and the
// optimizer has nothing to apply.

use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{activation::log_softmax, backend::AutodiffBackend},
};

use crate::data::batcher::ImageBatch;
use crate::ml::model::AlexNet;

/// Scalar results of one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutput {
    pub loss:     f64,
    pub accuracy: f64,
}

/// Mean softmax cross-entropy between raw scores and one-hot labels.
pub fn cross_entropy<B: Backend>(scores: Tensor<B, 2>, labels: Tensor<B, 2>) -> Tensor<B, 1> {
    let log_probs = log_softmax(scores, 1);
    (log_probs * labels).sum_dim(1).mean().neg()
}

/// Fraction of rows where argmax(scores) == argmax(labels).
pub fn accuracy<B: Backend>(scores: Tensor<B, 2>, labels: Tensor<B, 2>) -> f64 {
    let batch_size = scores.dims()[0];
    if batch_size == 0 {
        return 0.0;
    }
    // argmax(1) gives [batch, 1] for both sides, so shapes line up
    let correct: i64 = scores
        .argmax(1)
        .equal(labels.argmax(1))
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct as f64 / batch_size as f64
}

/// Forward pass plus metrics on any backend, without gradients.
pub fn evaluate_batch<B: Backend>(
    model:  &AlexNet<B>,
    images: Tensor<B, 4>,
    labels: Tensor<B, 2>,
) -> StepOutput {
    let scores = model.forward(images);
    let loss   = cross_entropy(scores.clone(), labels.clone());
    StepOutput {
        loss:     loss.into_scalar().elem::<f64>(),
        accuracy: accuracy(scores, labels),
    }
}

pub struct StepExecutor<B: AutodiffBackend, O: Optimizer<AlexNet<B>, B>> {
    model:         AlexNet<B>,
    optim:         O,
    learning_rate: f64,
}

/// Executor using Adam (β1 = 0.9, β2 = 0.999, ε = 1e-8).
pub fn adam_executor<B: AutodiffBackend>(
    model:         AlexNet<B>,
    learning_rate: f64,
) -> StepExecutor<B, impl Optimizer<AlexNet<B>, B>> {
    let optim = AdamConfig::new().with_epsilon(1e-8).init();
    StepExecutor::new(model, optim, learning_rate)
}

impl<B: AutodiffBackend, O: Optimizer<AlexNet<B>, B>> StepExecutor<B, O> {
    pub fn new(model: AlexNet<B>, optim: O, learning_rate: f64) -> Self {
        Self { model, optim, learning_rate }
    }

    pub fn model(&self) -> &AlexNet<B> {
        &self.model
    }

    /// Current weights on the inner backend, dropout disabled.
    pub fn valid_model(&self) -> AlexNet<B::InnerBackend> {
        self.model.valid()
    }

    pub fn train_step(&mut self, batch: ImageBatch<B>) -> StepOutput {
        let scores = self.model.forward(batch.images);
        let loss   = cross_entropy(scores.clone(), batch.labels.clone());

        let output = StepOutput {
            loss:     loss.clone().into_scalar().elem::<f64>(),
            accuracy: accuracy(scores.detach(), batch.labels),
        };

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.learning_rate, self.model.clone(), grads);

        output
    }
}

/// Evaluate an autodiff-backend batch with a model from `valid_model`.
pub fn eval_step<B: AutodiffBackend>(model: &AlexNet<B::InnerBackend>, batch: ImageBatch<B>) -> StepOutput {
    evaluate_batch(model, batch.images.inner(), batch.labels.inner())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parameter::select;
    use crate::domain::traits::ParameterRegistry;
    use crate::ml::model::tests::tiny_config;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::Distribution;

    type TB = Autodiff<NdArray>;

    fn batch(device: &<TB as Backend>::Device) -> ImageBatch<TB> {
        let images = Tensor::<TB, 4>::random([4, 67, 67, 3], Distribution::Default, device);
        let labels = Tensor::<TB, 2>::from_data(
            TensorData::new(
                vec![1.0f32, 0.0, 0.0,  0.0, 1.0, 0.0,  0.0, 0.0, 1.0,  1.0, 0.0, 0.0],
                [4, 3],
            ),
            device,
        );
        ImageBatch { images, labels }
    }

    fn values<const D: usize>(t: Tensor<TB, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_cross_entropy_of_uniform_scores() {
        let device = Default::default();
        let scores = Tensor::<NdArray, 2>::zeros([1, 2], &device);
        let labels = Tensor::<NdArray, 2>::from_data(TensorData::new(vec![1.0f32, 0.0], [1, 2]), &device);
        let loss: f64 = cross_entropy(scores, labels).into_scalar().elem();
        assert!((loss - std::f64::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_accuracy_counts_argmax_matches() {
        let device = Default::default();
        let scores = Tensor::<NdArray, 2>::from_data(
            TensorData::new(vec![2.0f32, 1.0, 0.0, 3.0], [2, 2]), &device,
        );
        let labels = Tensor::<NdArray, 2>::from_data(
            TensorData::new(vec![1.0f32, 0.0, 1.0, 0.0], [2, 2]), &device,
        );
        assert_eq!(accuracy(scores, labels), 0.5);
    }

    #[test]
    fn test_frozen_parameters_stay_bit_identical() {
        let device = Default::default();
        let model: AlexNet<TB> = tiny_config(3).init(&device);
        let trainable = select(&model.parameter_ids(), &["fc8"]);
        let model = model.freeze(&trainable);

        let conv1_before = values(model.conv1.weight.val());
        let fc6_before   = values(model.fc6.weight.val());
        let fc7_bias     = values(model.fc7.bias.as_ref().unwrap().val());
        let fc8_before   = values(model.fc8.bias.as_ref().unwrap().val());

        let mut exec = adam_executor(model, 1e-2);
        for _ in 0..3 {
            let out = exec.train_step(batch(&device));
            assert!(out.loss.is_finite());
        }

        let model = exec.model();
        assert_eq!(values(model.conv1.weight.val()), conv1_before);
        assert_eq!(values(model.fc6.weight.val()), fc6_before);
        assert_eq!(values(model.fc7.bias.as_ref().unwrap().val()), fc7_bias);
        assert_ne!(values(model.fc8.bias.as_ref().unwrap().val()), fc8_before);
    }

    #[test]
    fn test_eval_step_is_idempotent_and_read_only() {
        let device = Default::default();
        let model: AlexNet<TB> = tiny_config(3).init(&device);
        let exec   = adam_executor(model, 1e-3);
        let input  = batch(&device);
        let before = values(exec.model().fc8.weight.val());

        let valid  = exec.valid_model();
        let first  = eval_step(&valid, input.clone());
        let second = eval_step(&valid, input);

        assert_eq!(first, second);
        assert!((0.0..=1.0).contains(&first.accuracy));
        assert_eq!(values(exec.model().fc8.weight.val()), before);
    }
}
