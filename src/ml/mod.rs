// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network, optimiser and loss code lives here.
//
//   model.rs     — the fixed-topology ConvNet: four conv/batch-norm
//                  blocks, two max-pool stages, dropout, a dense
//                  classifier over the 10 classes
//
//   trainer.rs   — the training loop: forward, loss, backward,
//                  Adam step, per-epoch validation, best-only
//                  checkpointing
//
//   evaluator.rs — loss/accuracy over a loader, and a model
//                  restored from disk for the `evaluate` command

/// ConvNet architecture
pub mod model;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Scoring on a data split
pub mod evaluator;
