// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the training loop and the
// application layer:
//
//   checkpoint.rs — checkpoint schedule and file naming, saving
//                   and loading Burn records, pretrained weights,
//                   TrainConfig persistence as JSON
//
//   metrics.rs    — per-phase averages, console lines, a CSV row
//                   per epoch and JSON-lines scalar events
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics reporting
pub mod metrics;
