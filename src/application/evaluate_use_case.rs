// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// Restores a saved model (the best checkpoint unless a stem is
// given) and scores it on the CIFAR-10 test split.

use anyhow::Result;

use crate::data::loader::Cifar10Loader;
use crate::domain::image::Split;
use crate::domain::traits::ImageSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::evaluator::{EvalScore, Evaluator};

pub struct EvaluateUseCase {
    data_dir:     String,
    artifact_dir: String,
    model:        Option<String>,
}

impl EvaluateUseCase {
    pub fn new(data_dir: String, artifact_dir: String, model: Option<String>) -> Self {
        Self { data_dir, artifact_dir, model }
    }

    /// Returns the stem that was evaluated and its score.
    pub fn execute(&self) -> Result<(String, EvalScore)> {
        let ckpt = CheckpointManager::new(&self.artifact_dir);
        let stem = match &self.model {
            Some(name) => CheckpointManager::normalize_stem(name),
            None       => ckpt.best_checkpoint()?.stem,
        };

        let device    = burn::backend::wgpu::WgpuDevice::default();
        let evaluator = Evaluator::<burn::backend::Wgpu>::from_checkpoint(&ckpt, &stem, device)?;
        let images    = Cifar10Loader::new(&self.data_dir).load(Split::Test)?;
        tracing::info!("Evaluating '{}' on {} test images", stem, images.len());

        Ok((stem, evaluator.score(images)))
    }
}
