// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence concerns:
//
//   checkpoint.rs — model weights (Burn gzip MessagePack recorder), the
//                   best-checkpoint pointer and the training
//                   config needed to rebuild the network
//
//   metrics.rs    — per-epoch loss/accuracy: CSV while training,
//                   full history as JSON at the end

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger and in-memory history
pub mod metrics;
