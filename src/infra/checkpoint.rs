// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's named MessagePack
// recorder (gzip-compressed, half precision).
//
// Artifact directory layout:
//   artifacts/
//     train_config.json          ← hyperparameters, needed to rebuild the net
//     normalizer.json            ← pixel statistics fitted on the train split
//     convnet.03-0.61.mpk.gz     ← checkpoint: epoch 3, val_acc 0.61
//     convnet.07-0.70.mpk.gz     ← written only when val_loss improved
//     best_checkpoint.json       ← which checkpoint is the current best
//     81.35.mpk.gz               ← final model, named by test accuracy (%)
//
// Records are addressed by their stem ("convnet.07-0.70", "81.35").
// The recorder replaces the last extension of the path it is given
// with ".mpk.gz", so stems containing dots are passed as "{stem}.mpk".

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{HalfPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::data::normalizer::Normalizer;
use crate::infra::metrics::EpochMetrics;
use crate::ml::model::ConvNet;

const CONFIG_FILE:     &str = "train_config.json";
const NORMALIZER_FILE: &str = "normalizer.json";
const BEST_FILE:       &str = "best_checkpoint.json";
const RECORD_EXT:      &str = "mpk.gz";

type ModelRecorder = NamedMpkGzFileRecorder<HalfPrecisionSettings>;

/// Pointer to the best checkpoint written so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointInfo {
    pub stem:     String,
    pub epoch:    usize,
    pub val_loss: f64,
    pub val_acc:  f64,
}

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `convnet.{epoch:02}-{val_acc:.2}`, val_acc as a fraction.
    pub fn checkpoint_stem(epoch: usize, val_acc: f64) -> String {
        format!("convnet.{epoch:02}-{val_acc:.2}")
    }

    /// `{accuracy in percent:.2}`.
    pub fn final_stem(test_acc: f64) -> String {
        format!("{:.2}", test_acc * 100.0)
    }

    /// Accept a stem, a file name or a path ending in `.mpk.gz` or `.mpk`.
    pub fn normalize_stem(name: &str) -> String {
        let file = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);
        file.strip_suffix(".mpk.gz")
            .or_else(|| file.strip_suffix(".mpk"))
            .unwrap_or(file)
            .to_string()
    }

    /// Path handed to the recorder for `stem`.
    fn record_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.mpk"))
    }

    /// Where the recorder actually puts `stem` on disk.
    pub fn model_file(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{RECORD_EXT}"))
    }

    fn save_record<B: Backend>(&self, model: &ConvNet<B>, stem: &str) -> Result<PathBuf> {
        ModelRecorder::new()
            .record(model.clone().into_record(), self.record_path(stem))
            .with_context(|| format!("Failed to save model '{stem}' in '{}'", self.dir.display()))?;
        Ok(self.model_file(stem))
    }

    /// Save a checkpoint for an improved epoch and make it the best pointer.
    pub fn save_checkpoint<B: Backend>(
        &self,
        model:   &ConvNet<B>,
        metrics: &EpochMetrics,
    ) -> Result<CheckpointInfo> {
        let stem = Self::checkpoint_stem(metrics.epoch, metrics.val_acc);
        let path = self.save_record(model, &stem)?;

        let info = CheckpointInfo {
            stem,
            epoch:    metrics.epoch,
            val_loss: metrics.val_loss,
            val_acc:  metrics.val_acc,
        };
        let best_path = self.dir.join(BEST_FILE);
        fs::write(&best_path, serde_json::to_string_pretty(&info)?)
            .with_context(|| format!("Failed to write '{}'", best_path.display()))?;

        tracing::debug!("Saved checkpoint '{}'", path.display());
        Ok(info)
    }

    /// Save the trained model under its test-accuracy name, returns the stem.
    pub fn save_final<B: Backend>(&self, model: &ConvNet<B>, test_acc: f64) -> Result<String> {
        let stem = Self::final_stem(test_acc);
        let path = self.save_record(model, &stem)?;
        tracing::info!("Saved final model to '{}'", path.display());
        Ok(stem)
    }

    /// Load weights for `stem` into a model of the matching architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  ConvNet<B>,
        stem:   &str,
        device: &B::Device,
    ) -> Result<ConvNet<B>> {
        let file = self.model_file(stem);
        tracing::info!("Loading model from '{}'", file.display());

        let record = ModelRecorder::new()
            .load(self.record_path(stem), device)
            .with_context(|| {
                format!("Cannot load model '{}'. Have you trained the model first?",
                    file.display())
            })?;

        Ok(model.load_record(record))
    }

    /// The checkpoint recorded in `best_checkpoint.json`.
    pub fn best_checkpoint(&self) -> Result<CheckpointInfo> {
        let path = self.dir.join(BEST_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read '{}'. Have you run 'train' first?", path.display())
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save the training configuration to JSON.
    ///
    /// Must be called before training starts so evaluation can rebuild
    /// the exact model architecture.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'evaluate'.",
                    path.display()
                )
            })?;

        Ok(serde_json::from_str(&json)?)
    }

    /// Persist the fitted normaliser so evaluation applies the same transform.
    pub fn save_normalizer(&self, normalizer: &Normalizer) -> Result<()> {
        let path = self.dir.join(NORMALIZER_FILE);
        fs::write(&path, serde_json::to_string_pretty(normalizer)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }

    pub fn load_normalizer(&self) -> Result<Normalizer> {
        let path = self.dir.join(NORMALIZER_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::ConvNetConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("cifar-convnet-ckpt-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_stems_follow_naming_scheme() {
        assert_eq!(CheckpointManager::checkpoint_stem(7, 0.7049), "convnet.07-0.70");
        assert_eq!(CheckpointManager::checkpoint_stem(100, 0.8), "convnet.100-0.80");
        assert_eq!(CheckpointManager::final_stem(0.81354), "81.35");
    }

    #[test]
    fn test_normalize_stem_accepts_file_names() {
        assert_eq!(CheckpointManager::normalize_stem("81.35"), "81.35");
        assert_eq!(CheckpointManager::normalize_stem("81.35.mpk.gz"), "81.35");
        assert_eq!(CheckpointManager::normalize_stem("artifacts/81.35.mpk"), "81.35");
        assert_eq!(
            CheckpointManager::normalize_stem("artifacts/convnet.02-0.55.mpk.gz"),
            "convnet.02-0.55"
        );
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = scratch_dir("config");
        let ckpt = CheckpointManager::new(&dir);
        let cfg  = TrainConfig { epochs: 3, batch_size: 16, ..TrainConfig::default() };

        ckpt.save_config(&cfg).unwrap();
        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.epochs, 3);
        assert_eq!(loaded.batch_size, 16);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_checkpoint_keeps_dotted_stem_and_reloads() {
        let dir    = scratch_dir("model");
        let ckpt   = CheckpointManager::new(&dir);
        let device = Default::default();
        let model: ConvNet<TestBackend> = ConvNetConfig::new().init(&device);

        let metrics = EpochMetrics::new(4, 1.2, 0.55, 1.1, 0.612);
        let info = ckpt.save_checkpoint(&model, &metrics).unwrap();
        assert_eq!(info.stem, "convnet.04-0.61");
        assert!(dir.join("convnet.04-0.61.mpk.gz").exists());
        assert_eq!(ckpt.model_file(&info.stem), dir.join("convnet.04-0.61.mpk.gz"));
        assert_eq!(ckpt.best_checkpoint().unwrap(), info);

        let fresh: ConvNet<TestBackend> = ConvNetConfig::new().init(&device);
        let loaded = ckpt.load_model(fresh, &info.stem, &device).unwrap();

        let expected: Vec<f32> = model.classifier.weight.val().into_data().iter::<f32>().collect();
        let actual:   Vec<f32> = loaded.classifier.weight.val().into_data().iter::<f32>().collect();
        // half precision on disk
        for (e, a) in expected.iter().zip(&actual) {
            assert!((e - a).abs() < 1e-3);
        }

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_final_model_is_written_under_its_file_name() {
        let dir    = scratch_dir("final");
        let ckpt   = CheckpointManager::new(&dir);
        let model: ConvNet<TestBackend> = ConvNetConfig::new().init(&Default::default());

        let stem = ckpt.save_final(&model, 0.8135).unwrap();
        assert_eq!(stem, "81.35");
        assert!(ckpt.model_file(&stem).exists());
        assert!(!dir.join("81.35.mpk").exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_best_pointer_is_an_error() {
        let dir = scratch_dir("nobest");
        let ckpt = CheckpointManager::new(&dir);
        assert!(ckpt.best_checkpoint().is_err());
        fs::remove_dir_all(&dir).ok();
    }
}
