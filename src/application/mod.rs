// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor code, no printing,
// no direct file access.

// The training workflow
pub mod train_use_case;

// Re-scoring a saved model on the test split
pub mod evaluate_use_case;
