// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two pieces:
//
//   EpochMetrics    — running loss/accuracy totals for one phase,
//                     finalised to averages at the end of the phase
//   MetricsReporter — turns finished epochs into console lines,
//                     a CSV row and structured scalar events
//
// Output files in the log directory:
//
//   metrics.csv   one row per epoch
//     epoch,train_loss,train_acc,val_loss,val_acc,train_secs
//     1,1.203311,0.512500,1.100452,0.562500,42.1
//
//   events.jsonl  one JSON object per scalar
//     {"wall_time":1760600000.5,"step":3,"tag":"val/accuracy","value":0.56}
//
// Non-finite averages are passed through unchanged (JSON writes
// them as null); the reporter only warns about them.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use serde::Serialize;

use crate::ml::step::StepOutput;

// ─── EpochMetrics ─────────────────────────────────────────────────────────────
/// Running totals for one phase of one epoch.
#[derive(Debug, Clone, Default)]
pub struct EpochMetrics {
    total_loss:     f64,
    total_accuracy: f64,
    steps:          usize,
}

impl EpochMetrics {
    pub fn add(&mut self, step: StepOutput) {
        self.total_loss     += step.loss;
        self.total_accuracy += step.accuracy;
        self.steps          += 1;
    }

    /// Averages over the recorded steps (NaN when there were none).
    pub fn finalize(&self) -> EpochSummary {
        let n = self.steps as f64;
        EpochSummary {
            loss:     self.total_loss / n,
            accuracy: self.total_accuracy / n,
            steps:    self.steps,
        }
    }
}

/// Per-phase averages for one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochSummary {
    pub loss:     f64,
    pub accuracy: f64,
    pub steps:    usize,
}

impl EpochSummary {
    pub fn is_finite(&self) -> bool {
        self.loss.is_finite() && self.accuracy.is_finite()
    }
}

/// Everything known about one finished epoch.
#[derive(Debug, Clone)]
pub struct EpochRecord {
    /// 0-based epoch index
    pub epoch:      usize,
    pub train:      EpochSummary,
    pub validation: EpochSummary,
    pub train_time: Duration,
    pub checkpoint: Option<PathBuf>,
}

#[derive(Serialize)]
struct ScalarEvent<'a> {
    wall_time: f64,
    step:      usize,
    tag:       &'a str,
    value:     f64,
}

// ─── MetricsReporter ──────────────────────────────────────────────────────────
pub struct MetricsReporter {
    csv_path:         PathBuf,
    events:           File,
    summary_interval: usize,
}

impl MetricsReporter {
    /// Create the log directory and open both output files for appending.
    /// The CSV header is written only when the file is new.
    pub fn new(dir: impl AsRef<Path>, summary_interval: usize) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create log directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,train_loss,train_acc,val_loss,val_acc,train_secs")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        let events_path = dir.join("events.jsonl");
        let events = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&events_path)
            .with_context(|| format!("Cannot open '{}'", events_path.display()))?;

        Ok(Self { csv_path, events, summary_interval })
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn training_started(&self) {
        tracing::info!("Start training...");
        tracing::info!("Metrics are written to {}", self.csv_path.display());
    }

    pub fn epoch_started(&self, epoch: usize) {
        tracing::info!("Epoch number: {}", epoch + 1);
    }

    pub fn validation_started(&self) {
        tracing::info!("Start validation");
    }

    /// Per-step scalars, written every `summary_interval` global steps.
    pub fn record_step(&mut self, global_step: usize, step: StepOutput) -> Result<()> {
        if self.summary_interval == 0 || global_step % self.summary_interval != 0 {
            return Ok(());
        }
        self.write_event(global_step, "step/cross_entropy", step.loss)?;
        self.write_event(global_step, "step/accuracy", step.accuracy)
    }

    /// Log both phases, append the CSV row and the epoch events.
    /// `global_step` is the number of training steps taken so far.
    pub fn report_epoch(&mut self, record: &EpochRecord, global_step: usize) -> Result<()> {
        let train = &record.train;
        let val   = &record.validation;

        tracing::info!(
            "Use time: {:.0} s, loss: {:.4}, acc: {:.4}",
            record.train_time.as_secs_f64(),
            train.loss,
            train.accuracy,
        );
        tracing::info!("Validation loss = {:.4}, accuracy = {:.4}", val.loss, val.accuracy);

        if !train.is_finite() || !val.is_finite() {
            tracing::warn!(
                "Epoch {} produced non-finite metrics (train loss {}, val loss {})",
                record.epoch + 1,
                train.loss,
                val.loss,
            );
        }

        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.1}",
            record.epoch + 1,
            train.loss,
            train.accuracy,
            val.loss,
            val.accuracy,
            record.train_time.as_secs_f64(),
        )?;

        self.write_event(global_step, "train/cross_entropy", train.loss)?;
        self.write_event(global_step, "train/accuracy", train.accuracy)?;
        self.write_event(global_step, "val/cross_entropy", val.loss)?;
        self.write_event(global_step, "val/accuracy", val.accuracy)?;
        Ok(())
    }

    pub fn checkpoint_saving(&self) {
        tracing::info!("Saving checkpoint of model...");
    }

    pub fn checkpoint_saved(&self, path: &Path) {
        tracing::info!("Model checkpoint saved at {}", path.display());
    }

    fn write_event(&mut self, step: usize, tag: &str, value: f64) -> Result<()> {
        let wall_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        let line = serde_json::to_string(&ScalarEvent { wall_time, step, tag, value })?;
        writeln!(self.events, "{line}").context("Cannot write metrics event")?;
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn step(loss: f64, accuracy: f64) -> StepOutput {
        StepOutput { loss, accuracy }
    }

    fn record(train_loss: f64) -> EpochRecord {
        EpochRecord {
            epoch:      0,
            train:      EpochSummary { loss: train_loss, accuracy: 0.5, steps: 3 },
            validation: EpochSummary { loss: 1.0, accuracy: 0.25, steps: 1 },
            train_time: Duration::from_secs(2),
            checkpoint: None,
        }
    }

    #[test]
    fn test_averages_over_steps() {
        let mut m = EpochMetrics::default();
        m.add(step(1.0, 0.5));
        m.add(step(3.0, 1.0));
        let s = m.finalize();

        assert_eq!(s.steps, 2);
        assert_eq!(s.loss, 2.0);
        assert_eq!(s.accuracy, 0.75);
    }

    #[test]
    fn test_nan_loss_propagates_into_average() {
        let mut m = EpochMetrics::default();
        m.add(step(1.0, 0.5));
        m.add(step(f64::NAN, 0.5));
        let s = m.finalize();

        assert!(s.loss.is_nan());
        assert!(!s.is_finite());
        assert_eq!(s.accuracy, 0.5);
    }

    #[test]
    fn test_writes_csv_rows_and_events() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = MetricsReporter::new(dir.path().join("logs"), 2).unwrap();

        reporter.record_step(1, step(0.9, 0.1)).unwrap();
        reporter.record_step(2, step(0.8, 0.2)).unwrap();
        reporter.report_epoch(&record(0.7), 3).unwrap();
        reporter.report_epoch(&record(f64::NAN), 6).unwrap();

        let csv = fs::read_to_string(reporter.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "epoch,train_loss,train_acc,val_loss,val_acc,train_secs");
        assert_eq!(lines[1], "1,0.700000,0.500000,1.000000,0.250000,2.0");
        assert!(lines[2].starts_with("1,NaN,"));

        let events = fs::read_to_string(dir.path().join("logs/events.jsonl")).unwrap();
        let parsed: Vec<serde_json::Value> = events
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        // 2 step events (only step 2 hits the interval) + 4 per epoch × 2
        assert_eq!(parsed.len(), 10);
        assert_eq!(parsed[0]["tag"], "step/cross_entropy");
        assert_eq!(parsed[0]["step"], 2);
        assert!(parsed[9]["value"].is_number());
        assert!(parsed[6]["value"].is_null());
    }
}
