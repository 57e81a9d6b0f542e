// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits that define the core
// concepts of a fine-tuning run.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Everything here is testable without a tensor backend.

// Parameter identifiers and the trainable/frozen split
pub mod parameter;

// Typed errors shared by the data, ml and infra layers
pub mod errors;

// Core abstractions (traits) that other layers implement
pub mod traits;

pub use errors::FinetuneError;
pub use parameter::{ParamRole, ParameterId, Source, TrainableSet};
