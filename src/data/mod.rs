// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the .bin files on disk and the tensor
// batches the training loop consumes:
//
//   cifar-10-batches-bin/*.bin
//       │
//       ▼
//   Cifar10Loader   → parses records into LabeledImages
//       │
//       ▼
//   CifarDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher    → augment (train only) → normalise → tensors
//       │
//       ▼
//   DataLoader      → shuffles and feeds batches to the trainer

/// Reads the CIFAR-10 binary batch files
pub mod loader;

/// Random flips, shifts and rotations for training images
pub mod augment;

/// Rescaling and optional featurewise normalisation
pub mod normalizer;

/// Implements Burn's Dataset trait for labelled images
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
