// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from manifest files to tensor batches.
//
//   train.txt / val.txt
//       │
//       ▼
//   ManifestLoader     → (image_path, label) pairs, validated
//       │
//       ▼
//   ImagePreprocessor  → resize, mean-centre, RGB → BGR
//       │
//       ▼
//   ManifestDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher       → stacks samples into NHWC + one-hot tensors
//       │
//       ▼
//   DatasetIterator    → switchable training/validation cursor
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads and validates the text manifests
pub mod loader;

/// Decodes and normalises images
pub mod preprocessor;

/// Implements Burn's Dataset trait for manifest splits
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Training/validation cursor with per-source shuffling
pub mod iterator;
