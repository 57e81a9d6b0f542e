// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `evaluate`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enum, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::{BackendKind, TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune AlexNet on an image manifest
    Train(TrainArgs),

    /// Score a saved checkpoint on a validation manifest
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Training manifest: one `image_path label` per line
    #[arg(long, default_value = "data/train.txt")]
    pub train_file: String,

    /// Validation manifest, same format
    #[arg(long, default_value = "data/val.txt")]
    pub val_file: String,

    /// Pretrained AlexNet record; without it training starts from random weights
    #[arg(long)]
    pub pretrained_weights: Option<String>,

    /// Directory for checkpoints and train_config.json
    #[arg(long, default_value = "result/checkpoints")]
    pub checkpoint_dir: String,

    /// Directory for metrics.csv and events.jsonl
    #[arg(long, default_value = "result/tensorboard")]
    pub log_dir: String,

    /// Adam step size
    #[arg(long, default_value_t = 0.001)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 100)]
    pub num_epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Probability of keeping a unit in fc6/fc7 during training
    #[arg(long, default_value_t = 0.5)]
    pub dropout_keep_rate: f64,

    #[arg(long, default_value_t = 4)]
    pub num_classes: usize,

    /// Layers whose weights and biases are updated; all others stay frozen
    #[arg(long, num_args = 1.., default_values_t = ["fc8".to_string(), "fc7".to_string(), "fc6".to_string()])]
    pub trainable_layers: Vec<String>,

    /// Save a checkpoint every N epochs
    #[arg(long, default_value_t = 5)]
    pub checkpoint_interval: usize,

    /// Write per-step scalars every N steps (0 = off)
    #[arg(long, default_value_t = 20)]
    pub summary_interval: usize,

    /// Side length images are resized to
    #[arg(long, default_value_t = 227)]
    pub image_size: usize,

    /// Seed for the training shuffle
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_file:          a.train_file,
            val_file:            a.val_file,
            pretrained_weights:  a.pretrained_weights,
            checkpoint_dir:      a.checkpoint_dir,
            log_dir:             a.log_dir,
            learning_rate:       a.learning_rate,
            num_epochs:          a.num_epochs,
            batch_size:          a.batch_size,
            dropout_keep_rate:   a.dropout_keep_rate,
            num_classes:         a.num_classes,
            trainable_layers:    a.trainable_layers,
            checkpoint_interval: a.checkpoint_interval,
            summary_interval:    a.summary_interval,
            image_size:          a.image_size,
            seed:                a.seed,
            backend:             a.backend,
            ..TrainConfig::default()
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// A .ckpt file written by `train`
    #[arg(long)]
    pub checkpoint: String,

    /// Validation manifest; defaults to the one used for training
    #[arg(long)]
    pub val_file: Option<String>,

    /// Defaults to the backend used for training
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(args).unwrap().command
    }

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let Commands::Train(args) = parse(&["alexnet-finetune", "train"]) else {
            panic!("expected train");
        };
        let cfg: TrainConfig = args.into();
        let def = TrainConfig::default();

        assert_eq!(cfg.trainable_layers, def.trainable_layers);
        assert_eq!(cfg.learning_rate, def.learning_rate);
        assert_eq!(cfg.checkpoint_dir, def.checkpoint_dir);
        assert_eq!(cfg.backend, def.backend);
        assert_eq!(cfg.conv_channels, def.conv_channels);
        assert_eq!(cfg.fc_width, def.fc_width);
    }

    #[test]
    fn test_train_flags() {
        let Commands::Train(args) = parse(&[
            "alexnet-finetune", "train",
            "--trainable-layers", "fc8",
            "--backend", "ndarray",
            "--seed", "9",
        ]) else {
            panic!("expected train");
        };
        assert_eq!(args.trainable_layers, vec!["fc8"]);
        assert_eq!(args.backend, BackendKind::NdArray);
        assert_eq!(args.seed, Some(9));
    }

    #[test]
    fn test_evaluate_requires_checkpoint() {
        assert!(Cli::try_parse_from(["alexnet-finetune", "evaluate"]).is_err());
        let Commands::Evaluate(args) = parse(&["alexnet-finetune", "evaluate", "--checkpoint", "a.ckpt"]) else {
            panic!("expected evaluate");
        };
        assert_eq!(args.checkpoint, "a.ckpt");
        assert!(args.val_file.is_none());
    }
}
