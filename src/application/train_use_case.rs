// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load train + test splits        (Layer 4 - data)
//   Step 2: Fit the pixel normaliser         (Layer 4 - data)
//   Step 3: Configure augmentation           (Layer 4 - data)
//   Step 4: Save config + normaliser         (Layer 6 - infra)
//   Step 5: Fit with checkpointing           (Layer 5 - ml)
//   Step 6: Write the training history       (Layer 6 - infra)
//   Step 7: Save the final model             (Layer 6 - infra)

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::data::{
    augment::{AugmentConfig, Augmenter},
    dataset::CifarDataset,
    loader::Cifar10Loader,
    normalizer::{Normalizer, NormalizerConfig},
};
use crate::domain::image::Split;
use crate::domain::traits::ImageSource;
use crate::infra::{
    checkpoint::{CheckpointInfo, CheckpointManager},
    metrics::MetricsLogger,
};
use crate::ml::evaluator::EvalScore;
use crate::ml::trainer::{run_training, TrainingData};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved next to the weights so `evaluate` can rebuild the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:     String,
    pub artifact_dir: String,
    pub batch_size:   usize,
    pub epochs:       usize,
    pub lr:           f64,
    pub dropout:      f64,
    pub seed:         u64,
    pub num_workers:  usize,
    /// Random flips / shifts / rotations on the training split
    pub augment:      bool,
    /// Featurewise centering and std normalisation
    pub gcn:          bool,
    pub zca:          bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:     "data".to_string(),
            artifact_dir: "artifacts".to_string(),
            batch_size:   64,
            epochs:       100,
            lr:           1e-3,
            dropout:      0.1,
            seed:         42,
            num_workers:  4,
            augment:      true,
            gcn:          false,
            zca:          false,
        }
    }
}

impl TrainConfig {
    pub fn normalizer_config(&self) -> NormalizerConfig {
        NormalizerConfig { zca_whitening: self.zca, ..NormalizerConfig::default() }
            .with_gcn(self.gcn)
    }

    pub fn augment_config(&self) -> AugmentConfig {
        if self.augment { AugmentConfig::default() } else { AugmentConfig::disabled() }
    }
}

/// What `train` prints at the end.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub test_score:      EvalScore,
    /// Stem of the final model file (test accuracy in percent)
    pub final_model:     String,
    pub best_checkpoint: Option<CheckpointInfo>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;

        // ── Steps 1-3: Read the splits and set up preprocessing ───────────────
        let data = self.prepare(&Cifar10Loader::new(&cfg.data_dir))?;

        // ── Step 4: Persist what evaluation needs to rebuild the pipeline ─────
        let ckpt_manager = CheckpointManager::new(&cfg.artifact_dir);
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_normalizer(&data.normalizer)?;
        let logger = MetricsLogger::new(&cfg.artifact_dir)?;

        // ── Step 5: Fit (Layer 5) ─────────────────────────────────────────────
        let outcome = run_training(cfg, data, &ckpt_manager, &logger)?;

        // ── Step 6: History for plotting ──────────────────────────────────────
        let history_path = ckpt_manager.dir().join("history.json");
        outcome.history.save_json(&history_path)?;
        tracing::info!(
            "Wrote history to '{}' and '{}'",
            history_path.display(),
            logger.csv_path().display()
        );
        if let Some(best) = outcome.history.best_epoch() {
            tracing::info!(
                "Best epoch {}: val_loss={:.4} val_acc={:.4}",
                best.epoch,
                best.val_loss,
                best.val_acc
            );
        }

        // ── Step 7: Final model named by test accuracy ────────────────────────
        let final_model = ckpt_manager.save_final(&outcome.model, outcome.test_score.accuracy)?;

        Ok(TrainReport {
            test_score:      outcome.test_score,
            final_model,
            best_checkpoint: outcome.best,
        })
    }

    /// Load both splits from `source`, fit the normaliser on the training
    /// split and build the augmenter the config asks for.
    pub fn prepare(&self, source: &impl ImageSource) -> Result<TrainingData> {
        let cfg = &self.config;

        // ── Step 1: Load both splits ──────────────────────────────────────────
        let train_images = source.load(Split::Train)?;
        let test_images  = source.load(Split::Test)?;
        tracing::info!(
            "Dataset: {} train, {} test images",
            train_images.len(),
            test_images.len()
        );

        // ── Step 2: Fit normaliser on the training split only ─────────────────
        let normalizer = Normalizer::fit(cfg.normalizer_config(), &train_images)?;

        // ── Step 3: Augmentation for the training batches ─────────────────────
        let augment = cfg.augment_config();
        let augmenter = (!augment.is_identity()).then(|| Augmenter::new(augment));
        tracing::info!("Augmentation: {:?}", augment);

        Ok(TrainingData {
            train: CifarDataset::new(train_images),
            test:  CifarDataset::new(test_images),
            normalizer,
            augmenter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::{Cifar10Class, LabeledImage, PIXELS_LEN};

    /// Serves fixed images per split without touching the disk.
    struct InMemorySource {
        train: Vec<LabeledImage>,
        test:  Vec<LabeledImage>,
    }

    impl ImageSource for InMemorySource {
        fn load(&self, split: Split) -> Result<Vec<LabeledImage>> {
            Ok(match split {
                Split::Train => self.train.clone(),
                Split::Test  => self.test.clone(),
            })
        }
    }

    fn flat(value: u8, class: Cifar10Class) -> LabeledImage {
        LabeledImage::new(vec![value; PIXELS_LEN], class).unwrap()
    }

    fn source() -> InMemorySource {
        InMemorySource {
            train: vec![flat(0, Cifar10Class::Cat), flat(255, Cifar10Class::Dog)],
            // a test split far brighter than train must not move the statistics
            test:  vec![flat(255, Cifar10Class::Cat)],
        }
    }

    #[test]
    fn test_defaults_match_reference_run() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.batch_size, 64);
        assert_eq!(cfg.epochs, 100);
        assert!(cfg.augment && !cfg.gcn && !cfg.zca);
        assert_eq!(cfg.augment_config(), AugmentConfig::default());
        assert_eq!(cfg.normalizer_config(), NormalizerConfig::default());
    }

    #[test]
    fn test_flags_reach_sub_configs() {
        let cfg = TrainConfig { augment: false, gcn: true, zca: true, ..TrainConfig::default() };
        assert!(cfg.augment_config().is_identity());

        let norm = cfg.normalizer_config();
        assert!(norm.featurewise_center && norm.featurewise_std_normalization);
        assert!(norm.zca_whitening);
    }

    #[test]
    fn test_prepare_fits_statistics_on_train_split_only() {
        let cfg  = TrainConfig { gcn: true, ..TrainConfig::default() };
        let data = TrainUseCase::new(cfg).prepare(&source()).unwrap();

        assert_eq!(data.train.images().len(), 2);
        assert_eq!(data.test.images().len(), 1);
        for mean in data.normalizer.mean() {
            assert!((mean - 0.5).abs() < 1e-6);
        }
        assert!(data.augmenter.is_some());
    }

    #[test]
    fn test_prepare_without_augmentation_and_rejects_zca() {
        let use_case = TrainUseCase::new(TrainConfig { augment: false, ..TrainConfig::default() });
        assert!(use_case.prepare(&source()).unwrap().augmenter.is_none());

        let use_case = TrainUseCase::new(TrainConfig { zca: true, ..TrainConfig::default() });
        assert!(use_case.prepare(&source()).is_err());
    }
}
