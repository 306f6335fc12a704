// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to an `ImageSource`; the
// CIFAR-10 binary reader in Layer 4 is one implementation, an
// in-memory source in the tests is another.

use anyhow::Result;
use crate::domain::image::{LabeledImage, Split};

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Any component that can produce the labelled images of a dataset split.
pub trait ImageSource {
    /// Load every image of the requested split, in on-disk order.
    fn load(&self, split: Split) -> Result<Vec<LabeledImage>>;
}
