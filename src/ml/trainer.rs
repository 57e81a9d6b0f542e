// ============================================================
// Layer 5 — Epoch Orchestrator
// ============================================================
// Drives the run as a small state machine:
//
//   Init → { TrainingEpoch → ValidationEpoch }* → Done
//
//   Init            step counts fixed: floor(len / batch_size)
//                   per source; a source smaller than one batch
//                   stops the run before any step is taken
//   TrainingEpoch   reset(Training), exactly N × (next + train_step)
//   ValidationEpoch reset(Validation), exactly M × (next + eval_step)
//   after each      report, then offer the checkpoint policy the
//                   validation metrics
//
// No early stopping: Done after exactly num_epochs cycles.
//
// The model and optimizer live in the StepExecutor, the cursors in
// the DatasetIterator; this module only sequences them.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use std::time::Instant;
use burn::{data::dataset::Dataset, optim::Optimizer, tensor::backend::AutodiffBackend};

use crate::data::{dataset::ImageSample, iterator::DatasetIterator};
use crate::domain::{errors::FinetuneError, parameter::Source};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, EpochRecord, MetricsReporter},
};
use crate::ml::{
    model::AlexNet,
    step::{eval_step, StepExecutor},
};

/// Batch counts fixed at Init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochPlan {
    pub num_epochs:    usize,
    pub train_batches: usize,
    pub val_batches:   usize,
}

impl EpochPlan {
    pub fn new<B: AutodiffBackend, D: Dataset<ImageSample>>(
        num_epochs: usize,
        iterator:   &DatasetIterator<B, D>,
    ) -> Result<Self, FinetuneError> {
        let train_batches = iterator.batches_per_epoch(Source::Training);
        let val_batches   = iterator.batches_per_epoch(Source::Validation);

        for (source, batches) in [(Source::Training, train_batches), (Source::Validation, val_batches)] {
            if batches == 0 {
                return Err(FinetuneError::config(format!(
                    "{} set has {} samples, fewer than one batch of {}",
                    source,
                    iterator.source_len(source),
                    iterator.batch_size(),
                )));
            }
        }

        Ok(Self { num_epochs, train_batches, val_batches })
    }
}

pub fn run_training<B, D, O>(
    plan:        EpochPlan,
    iterator:    &mut DatasetIterator<B, D>,
    executor:    &mut StepExecutor<B, O>,
    checkpoints: &CheckpointManager,
    reporter:    &mut MetricsReporter,
) -> Result<Vec<EpochRecord>>
where
    B: AutodiffBackend,
    D: Dataset<ImageSample>,
    O: Optimizer<AlexNet<B>, B>,
{
    tracing::info!(
        "{} epochs: {} training and {} validation batches each",
        plan.num_epochs,
        plan.train_batches,
        plan.val_batches,
    );

    let mut history     = Vec::with_capacity(plan.num_epochs);
    let mut global_step = 0usize;

    for epoch in 0..plan.num_epochs {
        reporter.epoch_started(epoch);

        // ── Training phase ────────────────────────────────────────────────────
        let started = Instant::now();
        iterator.reset(Source::Training);
        let mut train = EpochMetrics::default();
        for _ in 0..plan.train_batches {
            let batch  = iterator.next_batch()?;
            let output = executor.train_step(batch);
            global_step += 1;
            train.add(output);
            reporter.record_step(global_step, output)?;
        }
        let train_time = started.elapsed();

        // ── Validation phase ──────────────────────────────────────────────────
        reporter.validation_started();
        iterator.reset(Source::Validation);
        let model_valid = executor.valid_model();
        let mut val = EpochMetrics::default();
        for _ in 0..plan.val_batches {
            let batch = iterator.next_batch()?;
            val.add(eval_step(&model_valid, batch));
        }

        let mut record = EpochRecord {
            epoch,
            train:      train.finalize(),
            validation: val.finalize(),
            train_time,
            checkpoint: None,
        };
        reporter.report_epoch(&record, global_step)?;

        if checkpoints.policy().should_save(epoch) {
            reporter.checkpoint_saving();
        }
        record.checkpoint = checkpoints.maybe_checkpoint(
            epoch,
            record.validation.loss,
            record.validation.accuracy,
            executor.model(),
        )?;
        if let Some(path) = &record.checkpoint {
            reporter.checkpoint_saved(path);
        }

        history.push(record);
    }

    tracing::info!("Training complete!");
    Ok(history)
}
