// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores AlexNet weights on a fixed epoch schedule.
//
// What gets saved per checkpoint:
//   1. <name>.ckpt        — full parameter record, Burn binary format
//   2. <name>.ckpt.json   — epoch and validation metrics of that save
//   3. train_config.json  — run configuration, written once per run
//
// Schedule: after epoch index i (0-based) a checkpoint is written
// iff (i + 1) % interval == 0. With interval 5 and 10 epochs that
// is after the 5th and the 10th epoch, nothing else. No rotation.
//
// File naming convention:
//   checkpoints/
//     model_epoch_5_evalLoss_0.83_evalAcc_0.71.ckpt
//     model_epoch_5_evalLoss_0.83_evalAcc_0.71.ckpt.json
//     model_epoch_10_evalLoss_0.62_evalAcc_0.78.ckpt
//     ...
//     train_config.json
//
// The record is encoded in memory with BinBytesRecorder and written
// with fs::write, so the file name on disk is exactly the one above
// (file recorders would swap the extension).
//
// Pretrained weights use the same record format.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::domain::errors::FinetuneError;
use crate::ml::model::AlexNet;

pub const CONFIG_FILE: &str = "train_config.json";

// ─── CheckpointPolicy ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy)]
pub struct CheckpointPolicy {
    interval: usize,
}

impl CheckpointPolicy {
    /// An interval of 0 never saves.
    pub fn new(interval: usize) -> Self {
        Self { interval }
    }

    pub fn should_save(&self, epoch_index: usize) -> bool {
        self.interval != 0 && (epoch_index + 1) % self.interval == 0
    }

    /// `epoch_index` is 0-based; the name carries the 1-based number.
    pub fn file_name(&self, epoch_index: usize, eval_loss: f64, eval_accuracy: f64) -> String {
        format!(
            "model_epoch_{}_evalLoss_{:.2}_evalAcc_{:.2}.ckpt",
            epoch_index + 1,
            eval_loss,
            eval_accuracy,
        )
    }
}

/// Sidecar written next to every checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// 1-based
    pub epoch:         usize,
    pub eval_loss:     f64,
    pub eval_accuracy: f64,
    pub file_name:     String,
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
pub struct CheckpointManager {
    dir:    PathBuf,
    policy: CheckpointPolicy,
}

impl CheckpointManager {
    /// Create the manager and its directory (like `mkdir -p`).
    pub fn new(dir: impl Into<PathBuf>, interval: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir, policy: CheckpointPolicy::new(interval) })
    }

    pub fn policy(&self) -> CheckpointPolicy {
        self.policy
    }

    /// Save when the schedule says so. Returns the written path.
    /// Write failures are returned, never swallowed.
    pub fn maybe_checkpoint<B: Backend>(
        &self,
        epoch_index:   usize,
        eval_loss:     f64,
        eval_accuracy: f64,
        model:         &AlexNet<B>,
    ) -> Result<Option<PathBuf>> {
        if !self.policy.should_save(epoch_index) {
            return Ok(None);
        }

        let meta = CheckpointMeta {
            epoch:     epoch_index + 1,
            eval_loss,
            eval_accuracy,
            file_name: self.policy.file_name(epoch_index, eval_loss, eval_accuracy),
        };
        let path = self.save_model(model, &meta)?;
        Ok(Some(path))
    }

    /// Write the record and its sidecar under `meta.file_name`.
    pub fn save_model<B: Backend>(&self, model: &AlexNet<B>, meta: &CheckpointMeta) -> Result<PathBuf> {
        let path  = self.dir.join(&meta.file_name);
        let bytes = encode_model(model)?;

        fs::write(&path, bytes)
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let meta_path = sidecar_path(&path);
        fs::write(&meta_path, serde_json::to_string_pretty(meta)?)
            .with_context(|| format!("Failed to write '{}'", meta_path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {}", meta.epoch);
        Ok(path)
    }

    /// Save the run configuration to JSON.
    ///
    /// `evaluate` reads it back to rebuild the same architecture.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}

/// Load the sidecar of a checkpoint, if one was written.
pub fn load_meta(checkpoint: &Path) -> Result<Option<CheckpointMeta>> {
    let meta_path = sidecar_path(checkpoint);
    if !meta_path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(&meta_path)
        .with_context(|| format!("Cannot read '{}'", meta_path.display()))?;
    Ok(Some(serde_json::from_str(&json)?))
}

/// Read `train_config.json` from a checkpoint directory.
pub fn load_config_from(dir: &Path) -> Result<TrainConfig> {
    let path = dir.join(CONFIG_FILE);
    let json = fs::read_to_string(&path).with_context(|| {
        format!(
            "Cannot read config from '{}'. \
             Make sure you have run 'train' before 'evaluate'.",
            path.display()
        )
    })?;
    Ok(serde_json::from_str(&json)?)
}

/// Restore weights from a checkpoint or pretrained record file into
/// a model of the same architecture.
pub fn load_model<B: Backend>(path: &Path, model: AlexNet<B>, device: &B::Device) -> Result<AlexNet<B>> {
    if !path.exists() {
        return Err(FinetuneError::config(format!(
            "Weights file '{}' does not exist",
            path.display()
        ))
        .into());
    }

    let bytes = fs::read(path)
        .map_err(|e| FinetuneError::io(path, e))?;

    let record = BinBytesRecorder::<FullPrecisionSettings>::default()
        .load(bytes, device)
        .map_err(|e| FinetuneError::Record(format!("{}: {:?}", path.display(), e)))?;

    Ok(model.load_record(record))
}

fn encode_model<B: Backend>(model: &AlexNet<B>) -> Result<Vec<u8>> {
    BinBytesRecorder::<FullPrecisionSettings>::default()
        .record(model.clone().into_record(), ())
        .map_err(|e| FinetuneError::Record(format!("{:?}", e)).into())
}

fn sidecar_path(checkpoint: &Path) -> PathBuf {
    let mut name = checkpoint.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}
