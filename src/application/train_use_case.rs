// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full fine-tuning run in order:
//
//   Step 1: Validate the configuration         (Layer 2)
//   Step 2: Load both manifest splits          (Layer 4 - data)
//   Step 3: Build the dataset iterator         (Layer 4 - data)
//   Step 4: Fix the batch counts per epoch     (Layer 5 - ml)
//   Step 5: Build AlexNet, merge pretrained    (Layer 5 - ml)
//   Step 6: Select and freeze parameters       (Layer 3 - domain)
//   Step 7: Save config, open log outputs      (Layer 6 - infra)
//   Step 8: Run the epoch loop                 (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use std::path::Path;
use burn::{
    backend::{
        ndarray::NdArrayDevice,
        wgpu::WgpuDevice,
        Autodiff, NdArray, Wgpu,
    },
    tensor::backend::AutodiffBackend,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::data::{batcher::ImageBatcher, dataset::ManifestDataset, iterator::DatasetIterator};
use crate::domain::{
    errors::FinetuneError,
    parameter::{partition, select, ParameterId},
    traits::ParameterRegistry,
};
use crate::infra::{
    checkpoint::{load_model, CheckpointManager},
    metrics::{EpochRecord, MetricsReporter},
};
use crate::ml::{
    model::{AlexNet, AlexNetConfig, LAYER_NAMES},
    step::adam_executor,
    trainer::{run_training, EpochPlan},
};

/// Tensor backend to run on.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Wgpu,
    #[value(name = "ndarray")]
    NdArray,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for one run. Saved next to the checkpoints so that
// `evaluate` can rebuild the same architecture later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub train_file:          String,
    pub val_file:            String,
    pub pretrained_weights:  Option<String>,
    pub checkpoint_dir:      String,
    pub log_dir:             String,
    pub learning_rate:       f64,
    pub num_epochs:          usize,
    pub batch_size:          usize,
    pub dropout_keep_rate:   f64,
    pub num_classes:         usize,
    pub trainable_layers:    Vec<String>,
    pub checkpoint_interval: usize,
    /// Per-step scalar events every N steps; 0 turns them off.
    pub summary_interval:    usize,
    pub image_size:          usize,
    /// conv1..conv5 output channels; configs saved without it get AlexNet's.
    #[serde(default = "default_conv_channels")]
    pub conv_channels:       [usize; 5],
    #[serde(default = "default_fc_width")]
    pub fc_width:            usize,
    pub seed:                Option<u64>,
    pub backend:             BackendKind,
}

fn default_conv_channels() -> [usize; 5] {
    [96, 256, 384, 384, 256]
}

fn default_fc_width() -> usize {
    4096
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_file:          "data/train.txt".to_string(),
            val_file:            "data/val.txt".to_string(),
            pretrained_weights:  None,
            checkpoint_dir:      "result/checkpoints".to_string(),
            log_dir:             "result/tensorboard".to_string(),
            learning_rate:       0.001,
            num_epochs:          100,
            batch_size:          32,
            dropout_keep_rate:   0.5,
            num_classes:         4,
            trainable_layers:    vec!["fc8".into(), "fc7".into(), "fc6".into()],
            checkpoint_interval: 5,
            summary_interval:    20,
            image_size:          227,
            conv_channels:       default_conv_channels(),
            fc_width:            default_fc_width(),
            seed:                None,
            backend:             BackendKind::Wgpu,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self) -> AlexNetConfig {
        AlexNetConfig::new(self.num_classes)
            .with_dropout_keep_rate(self.dropout_keep_rate)
            .with_image_size(self.image_size)
            .with_conv_channels(self.conv_channels)
            .with_fc_width(self.fc_width)
    }

    /// Everything that can be checked before touching a tensor.
    pub fn validate(&self) -> Result<(), FinetuneError> {
        let positive = [
            ("batch_size", self.batch_size),
            ("num_epochs", self.num_epochs),
            ("num_classes", self.num_classes),
            ("checkpoint_interval", self.checkpoint_interval),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(FinetuneError::config(format!("{name} must be positive")));
            }
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(FinetuneError::config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.dropout_keep_rate > 0.0 && self.dropout_keep_rate <= 1.0) {
            return Err(FinetuneError::config(format!(
                "dropout_keep_rate must be in (0, 1], got {}",
                self.dropout_keep_rate
            )));
        }

        if let Some(unknown) = self
            .trainable_layers
            .iter()
            .find(|l| !LAYER_NAMES.contains(&l.as_str()))
        {
            return Err(FinetuneError::config(format!(
                "unknown layer '{}' in trainable_layers (known: {})",
                unknown,
                LAYER_NAMES.join(", ")
            )));
        }

        self.model_config().check().map_err(FinetuneError::Configuration)?;

        for (name, path) in [("train_file", &self.train_file), ("val_file", &self.val_file)] {
            if !Path::new(path).is_file() {
                return Err(FinetuneError::config(format!("{name} '{path}' does not exist")));
            }
        }
        if let Some(path) = &self.pretrained_weights {
            if !Path::new(path).is_file() {
                return Err(FinetuneError::config(format!(
                    "pretrained weights '{path}' do not exist"
                )));
            }
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Validate, pick the backend and run to completion.
    pub fn execute(&self) -> Result<Vec<EpochRecord>> {
        self.config.validate()?;

        match self.config.backend {
            BackendKind::Wgpu => {
                let device = WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                self.train::<Autodiff<Wgpu>>(device)
            }
            BackendKind::NdArray => {
                tracing::info!("Using NdArray CPU backend");
                self.train::<Autodiff<NdArray>>(NdArrayDevice::Cpu)
            }
        }
    }

    /// The run itself, on any autodiff backend. Expects a validated config.
    pub fn train<B: AutodiffBackend>(&self, device: B::Device) -> Result<Vec<EpochRecord>> {
        let cfg = &self.config;

        // ── Step 2: Manifest splits ───────────────────────────────────────────
        tracing::info!("Loading manifests '{}' and '{}'", cfg.train_file, cfg.val_file);
        let train_set = ManifestDataset::from_manifest(&cfg.train_file, cfg.num_classes, cfg.image_size)?;
        let val_set   = ManifestDataset::from_manifest(&cfg.val_file, cfg.num_classes, cfg.image_size)?;

        // ── Step 3: Iterator (shuffled training, fixed validation) ────────────
        let batcher = ImageBatcher::<B>::new(device.clone(), cfg.image_size, cfg.num_classes);
        let mut iterator = DatasetIterator::new(train_set, val_set, batcher, cfg.batch_size, cfg.seed);

        // ── Step 4: Batch counts ──────────────────────────────────────────────
        let plan = EpochPlan::new(cfg.num_epochs, &iterator)?;

        // ── Step 5: Model + pretrained weights ────────────────────────────────
        let model_cfg = cfg.model_config();
        let model: AlexNet<B> = model_cfg.init(&device);
        tracing::info!("Network layers: {}", model.layer_names().join(", "));
        let trainable = select(&model.parameter_ids(), &cfg.trainable_layers);

        let model = match &cfg.pretrained_weights {
            Some(path) => {
                tracing::info!("Loading pretrained weights from '{}'", path);
                let pretrained = load_model(Path::new(path), model_cfg.init(&device), &device)
                    .with_context(|| format!("Cannot load pretrained weights '{path}'"))?;
                model.with_pretrained(pretrained, &trainable)
            }
            None => {
                tracing::warn!("No pretrained weights configured, starting from random initialisation");
                model
            }
        };

        // ── Step 6: Freeze everything outside the whitelist ───────────────────
        let all_ids = model.parameter_ids();
        let (trainable_ids, frozen_ids) = partition(&all_ids, &trainable);
        tracing::info!(
            "Trainable parameters ({}): {}",
            trainable_ids.len(),
            join_ids(&trainable_ids)
        );
        tracing::info!("Frozen parameters ({}): {}", frozen_ids.len(), join_ids(&frozen_ids));
        if trainable.is_empty() {
            tracing::warn!("No trainable parameters, the model will not change");
        }

        let model = model.freeze(&trainable);
        let mut executor = adam_executor(model, cfg.learning_rate);

        // ── Step 7: Outputs ───────────────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir, cfg.checkpoint_interval)?;
        checkpoints.save_config(cfg)?;
        let mut reporter = MetricsReporter::new(&cfg.log_dir, cfg.summary_interval)?;

        // ── Step 8: Epoch loop (Layer 5) ──────────────────────────────────────
        reporter.training_started();
        run_training(plan, &mut iterator, &mut executor, &checkpoints, &mut reporter)
    }
}

fn join_ids(ids: &[&ParameterId]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}
