// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    — fine-tunes AlexNet on an image manifest
//   2. `evaluate` — scores a saved checkpoint
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "alexnet-finetune",
    version,
    about = "Fine-tune selected AlexNet layers on a labeled image dataset."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case.
    pub fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Train(args)    => self.run_train(args),
            Commands::Evaluate(args) => self.run_evaluate(args),
        }
    }

    fn run_train(&self, args: &TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Training on manifest: {}", args.train_file);

        let use_case = TrainUseCase::new(args.clone().into());
        let history  = use_case.execute()?;

        let saved = history.iter().filter(|r| r.checkpoint.is_some()).count();
        println!("Training complete: {} epochs, {} checkpoints saved.", history.len(), saved);
        if let Some(last) = history.last() {
            println!(
                "Final validation loss = {:.4}, accuracy = {:.4}",
                last.validation.loss, last.validation.accuracy
            );
        }
        Ok(())
    }

    fn run_evaluate(&self, args: &EvaluateArgs) -> Result<()> {
        use crate::application::evaluate_use_case::EvaluateUseCase;

        let use_case = EvaluateUseCase::new(&args.checkpoint, args.val_file.clone(), args.backend);
        let summary  = use_case.execute()?;

        println!("\nloss = {:.4}, accuracy = {:.4}", summary.loss, summary.accuracy);
        Ok(())
    }
}
