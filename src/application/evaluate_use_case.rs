// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a saved checkpoint on a validation manifest:
//
//   Step 1: Read train_config.json from the checkpoint's directory
//   Step 2: Rebuild AlexNet with that architecture
//   Step 3: Load the checkpoint weights into it
//   Step 4: One pass of full batches, no gradients, no dropout
//
// Runs on the plain (non-autodiff) backend.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    prelude::*,
};

use crate::application::train_use_case::{BackendKind, TrainConfig};
use crate::data::{
    batcher::ImageBatcher,
    dataset::{ImageSample, ManifestDataset},
};
use crate::domain::errors::FinetuneError;
use crate::infra::{
    checkpoint::{load_config_from, load_meta, load_model},
    metrics::{EpochMetrics, EpochSummary},
};
use crate::ml::{model::AlexNet, step::evaluate_batch};

pub struct EvaluateUseCase {
    checkpoint: PathBuf,
    val_file:   Option<String>,
    backend:    Option<BackendKind>,
}

impl EvaluateUseCase {
    /// `val_file` and `backend` fall back to the values saved with the run.
    pub fn new(
        checkpoint: impl Into<PathBuf>,
        val_file:   Option<String>,
        backend:    Option<BackendKind>,
    ) -> Self {
        Self { checkpoint: checkpoint.into(), val_file, backend }
    }

    pub fn execute(&self) -> Result<EpochSummary> {
        if !self.checkpoint.is_file() {
            return Err(FinetuneError::config(format!(
                "checkpoint '{}' does not exist",
                self.checkpoint.display()
            ))
            .into());
        }

        let dir = self.checkpoint.parent().unwrap_or_else(|| Path::new("."));
        let cfg = load_config_from(dir)?;

        match self.backend.unwrap_or(cfg.backend) {
            BackendKind::Wgpu    => self.evaluate::<Wgpu>(&cfg, WgpuDevice::default()),
            BackendKind::NdArray => self.evaluate::<NdArray>(&cfg, NdArrayDevice::Cpu),
        }
    }

    pub fn evaluate<B: Backend>(&self, cfg: &TrainConfig, device: B::Device) -> Result<EpochSummary> {
        let val_file = self.val_file.as_deref().unwrap_or(&cfg.val_file);
        let dataset  = ManifestDataset::from_manifest(val_file, cfg.num_classes, cfg.image_size)?;

        let batches = dataset.len() / cfg.batch_size;
        if batches == 0 {
            return Err(FinetuneError::config(format!(
                "validation set has {} samples, fewer than one batch of {}",
                dataset.len(),
                cfg.batch_size
            ))
            .into());
        }

        let model: AlexNet<B> = cfg.model_config().init(&device);
        let model = load_model(&self.checkpoint, model, &device)
            .with_context(|| format!("Cannot load checkpoint '{}'", self.checkpoint.display()))?;
        tracing::info!("Evaluating '{}' on '{}'", self.checkpoint.display(), val_file);
        if let Some(meta) = load_meta(&self.checkpoint)? {
            tracing::info!(
                "Checkpoint of epoch {} (recorded loss = {:.4}, accuracy = {:.4})",
                meta.epoch,
                meta.eval_loss,
                meta.eval_accuracy,
            );
        }

        let batcher = ImageBatcher::<B>::new(device, cfg.image_size, cfg.num_classes);
        let summary = evaluate_dataset(&model, &dataset, &batcher, cfg.batch_size)?;

        tracing::info!(
            "Validation loss = {:.4}, accuracy = {:.4} ({} batches)",
            summary.loss,
            summary.accuracy,
            summary.steps,
        );
        Ok(summary)
    }
}

/// One in-order pass over `dataset` in full batches.
pub fn evaluate_dataset<B: Backend, D: Dataset<ImageSample>>(
    model:      &AlexNet<B>,
    dataset:    &D,
    batcher:    &ImageBatcher<B>,
    batch_size: usize,
) -> Result<EpochSummary, FinetuneError> {
    let mut metrics = EpochMetrics::default();

    for start in (0..dataset.len() / batch_size).map(|b| b * batch_size) {
        let items = (start..start + batch_size)
            .map(|index| {
                dataset.get(index).ok_or_else(|| FinetuneError::Data {
                    index,
                    reason: "validation sample could not be loaded".into(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let batch = batcher.batch(items);
        metrics.add(evaluate_batch(model, batch.images, batch.labels));
    }

    Ok(metrics.finalize())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::tests::tiny_config;
    use burn::data::dataset::InMemDataset;

    #[test]
    fn test_evaluate_dataset_uses_full_batches_only() {
        let device = Default::default();
        let model: AlexNet<NdArray> = tiny_config(2).init(&device);
        let dataset = InMemDataset::new(
            (0..10)
                .map(|i| ImageSample { pixels: vec![i as f32; 67 * 67 * 3], label: i % 2 })
                .collect::<Vec<_>>(),
        );
        let batcher = ImageBatcher::<NdArray>::new(device, 67, 2);

        let first  = evaluate_dataset(&model, &dataset, &batcher, 4).unwrap();
        let second = evaluate_dataset(&model, &dataset, &batcher, 4).unwrap();

        assert_eq!(first.steps, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_checkpoint_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let use_case = EvaluateUseCase::new(dir.path().join("none.ckpt"), None, Some(BackendKind::NdArray));

        let err = use_case.execute().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FinetuneError>(),
            Some(FinetuneError::Configuration(_))
        ));
    }
}
