// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
// Per epoch:
//   1. one shuffled pass over the augmented training split
//   2. validation on the test split with model.valid()
//      (dropout off, batch norm uses its running statistics)
//   3. append metrics; checkpoint only when val_loss improved
//
// After the last epoch the same test loader scores the final model.
//
// Key Burn insight:
//   - Training runs on Autodiff<Wgpu> for gradients
//   - model.valid() returns the model on the inner backend (Wgpu)
//   - the validation batcher must therefore use the inner backend

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{augment::Augmenter, batcher::ImageBatcher, dataset::CifarDataset, normalizer::Normalizer};
use crate::infra::checkpoint::{CheckpointInfo, CheckpointManager};
use crate::infra::metrics::{EpochMetrics, MetricsLogger, TrainingHistory};
use crate::ml::evaluator::{evaluate, eval_loader, EvalScore};
use crate::ml::model::{ConvNet, ConvNetConfig};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

const ADAM_BETA_1:  f32 = 0.9;
const ADAM_BETA_2:  f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-7;

/// Everything the loop needs to read.
pub struct TrainingData {
    pub train:      CifarDataset,
    pub test:       CifarDataset,
    pub normalizer: Normalizer,
    /// `None` trains on the raw images
    pub augmenter:  Option<Augmenter>,
}

/// What a finished run hands back.
pub struct TrainingOutcome<B: Backend> {
    /// Final weights, on the inference backend
    pub model:      ConvNet<B>,
    pub history:    TrainingHistory,
    pub best:       Option<CheckpointInfo>,
    pub test_score: EvalScore,
}

pub fn run_training(
    cfg:          &TrainConfig,
    data:         TrainingData,
    ckpt_manager: &CheckpointManager,
    logger:       &MetricsLogger,
) -> Result<TrainingOutcome<burn::backend::Wgpu>> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, data, ckpt_manager, logger, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    data:         TrainingData,
    ckpt_manager: &CheckpointManager,
    logger:       &MetricsLogger,
    device:       B::Device,
) -> Result<TrainingOutcome<B::InnerBackend>> {
    if cfg.batch_size == 0 {
        bail!("batch size must be at least 1");
    }
    if !(0.0..=1.0).contains(&cfg.dropout) {
        bail!("dropout must be within [0, 1], got {}", cfg.dropout);
    }
    if data.train.images().is_empty() || data.test.images().is_empty() {
        bail!("both the train and the test split need at least one image");
    }

    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: ConvNet<B> = ConvNetConfig::new()
        .with_dropout(cfg.dropout)
        .init(&device);
    tracing::info!("Model ready: {} trainable parameters", model.num_params());

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new()
        .with_beta_1(ADAM_BETA_1)
        .with_beta_2(ADAM_BETA_2)
        .with_epsilon(ADAM_EPSILON)
        .init();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let mut train_batcher = ImageBatcher::<B>::new(device.clone(), data.normalizer.clone());
    if let Some(augmenter) = data.augmenter {
        train_batcher = train_batcher.with_augmenter(augmenter);
    }
    let train_loader = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(data.train);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let val_loader = eval_loader::<B::InnerBackend>(
        data.test.into_images(),
        data.normalizer,
        cfg.batch_size,
        cfg.num_workers,
        device.clone(),
    );

    let mut history = TrainingHistory::new();
    let mut best: Option<CheckpointInfo> = None;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut correct  = 0usize;
        let mut seen     = 0usize;

        for batch in train_loader.iter() {
            let n = batch.targets.dims()[0];
            let (loss, logits) = model.forward_classification(batch.images, batch.targets.clone());

            loss_sum += loss.clone().into_scalar().elem::<f64>() * n as f64;
            correct  += logits.argmax(1).flatten::<1>(0, 1)
                .equal(batch.targets)
                .int().sum().into_scalar().elem::<i64>() as usize;
            seen     += n;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let train_loss = if seen > 0 { loss_sum / seen as f64 } else { f64::NAN };
        let train_acc  = if seen > 0 { correct as f64 / seen as f64 } else { 0.0 };

        let val = evaluate(&model.valid(), &val_loader);
        let metrics = EpochMetrics::new(epoch, train_loss, train_acc, val.loss, val.accuracy);

        println!(
            "Epoch {:>3}/{} | loss={:.4} | acc={:.4} | val_loss={:.4} | val_acc={:.4}",
            epoch, cfg.epochs, train_loss, train_acc, val.loss, val.accuracy,
        );

        // Monitor val_loss, keep only improving checkpoints.
        let best_so_far = history.best_val_loss();
        if metrics.is_improvement(best_so_far) {
            let info = ckpt_manager.save_checkpoint(&model, &metrics)?;
            tracing::info!(
                "Epoch {:05}: val_loss improved from {:.5} to {:.5}, saving model to '{}'",
                epoch,
                best_so_far,
                metrics.val_loss,
                ckpt_manager.model_file(&info.stem).display(),
            );
            best = Some(info);
        } else {
            tracing::info!("Epoch {:05}: val_loss did not improve from {:.5}", epoch, best_so_far);
        }

        logger.log(&metrics)?;
        history.push(metrics);
    }

    // ── Final evaluation on the test split ────────────────────────────────────
    let model = model.valid();
    let test_score = evaluate(&model, &val_loader);

    tracing::info!("Training complete!");
    Ok(TrainingOutcome { model, history, best, test_score })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::augment::AugmentConfig;
    use crate::data::normalizer::NormalizerConfig;
    use crate::domain::image::{Cifar10Class, LabeledImage, PIXELS_LEN};
    use burn::backend::{Autodiff, NdArray};
    use std::{fs, path::PathBuf};

    type TestBackend = Autodiff<NdArray>;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("cifar-convnet-trainer-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn tiny_split(n: u8) -> Vec<LabeledImage> {
        (0..n)
            .map(|i| {
                let class = Cifar10Class::ALL[(i % 2) as usize];
                LabeledImage::new(vec![if i % 2 == 0 { 20 } else { 230 }; PIXELS_LEN], class).unwrap()
            })
            .collect()
    }

    fn tiny_config(dir: &PathBuf) -> TrainConfig {
        TrainConfig {
            artifact_dir: dir.to_string_lossy().into_owned(),
            epochs:       2,
            batch_size:   4,
            num_workers:  1,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_two_epochs_record_history_and_a_checkpoint() {
        let dir  = scratch_dir("run");
        let cfg  = tiny_config(&dir);
        let ckpt = CheckpointManager::new(&dir);
        let logger = MetricsLogger::new(&dir).unwrap();

        let data = TrainingData {
            train:      CifarDataset::new(tiny_split(8)),
            test:       CifarDataset::new(tiny_split(4)),
            normalizer: Normalizer::fit(NormalizerConfig::default(), &[]).unwrap(),
            augmenter:  Some(Augmenter::new(AugmentConfig::default())),
        };

        let outcome = train_loop::<TestBackend>(&cfg, data, &ckpt, &logger, Default::default())
            .unwrap();

        assert_eq!(outcome.history.epochs.len(), 2);
        assert_eq!(outcome.test_score.samples, 4);

        // the first epoch always improves on an empty history
        let best = outcome.best.expect("at least one checkpoint");
        assert!(ckpt.model_file(&best.stem).exists());
        assert_eq!(ckpt.best_checkpoint().unwrap(), best);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_out_of_range_dropout_is_an_error() {
        let dir  = scratch_dir("dropout");
        let cfg  = TrainConfig { dropout: 1.5, ..tiny_config(&dir) };
        let ckpt = CheckpointManager::new(&dir);
        let logger = MetricsLogger::new(&dir).unwrap();

        let data = TrainingData {
            train:      CifarDataset::new(tiny_split(4)),
            test:       CifarDataset::new(tiny_split(2)),
            normalizer: Normalizer::fit(NormalizerConfig::default(), &[]).unwrap(),
            augmenter:  None,
        };

        let err = train_loop::<TestBackend>(&cfg, data, &ckpt, &logger, Default::default())
            .err()
            .expect("dropout 1.5 must be rejected");
        assert!(err.to_string().contains("dropout"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_test_split_is_rejected() {
        let dir  = scratch_dir("empty");
        let cfg  = tiny_config(&dir);
        let ckpt = CheckpointManager::new(&dir);
        let logger = MetricsLogger::new(&dir).unwrap();

        let data = TrainingData {
            train:      CifarDataset::new(tiny_split(4)),
            test:       CifarDataset::new(Vec::new()),
            normalizer: Normalizer::fit(NormalizerConfig::default(), &[]).unwrap(),
            augmenter:  None,
        };

        assert!(train_loop::<TestBackend>(&cfg, data, &ckpt, &logger, Default::default()).is_err());
        fs::remove_dir_all(&dir).ok();
    }
}
