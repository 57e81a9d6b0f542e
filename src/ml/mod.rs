// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches the network and the optimizer.
//
//   model.rs   — AlexNet layer stack (conv1..conv5, fc6..fc8),
//                local response normalisation, freezing and
//                pretrained merge
//
//   step.rs    — one mini-batch: train_step (forward, loss,
//                backward, Adam update of trainable parameters)
//                and eval_step (forward on the inner backend)
//
//   trainer.rs — the epoch loop: training phase, validation
//                phase, reporting, checkpoint schedule
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Krizhevsky et al. (2012) ImageNet Classification
//            with Deep Convolutional Neural Networks

/// AlexNet architecture
pub mod model;

/// Single train / eval step on one batch
pub mod step;

/// Epoch loop with validation and checkpointing
pub mod trainer;
