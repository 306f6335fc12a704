// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Scores a model on a data loader: mean cross-entropy, overall
// accuracy and per-class hit counts. The trainer uses `evaluate`
// for per-epoch validation and the final test pass; `Evaluator`
// wraps a model restored from disk for the `evaluate` command.

use anyhow::Result;
use std::sync::Arc;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
};

use crate::data::{batcher::{ImageBatch, ImageBatcher}, dataset::CifarDataset, normalizer::Normalizer};
use crate::domain::image::{Cifar10Class, LabeledImage, NUM_CLASSES};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{ConvNet, ConvNetConfig};

/// Loss/accuracy over a whole split.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalScore {
    /// Mean cross-entropy per sample
    pub loss:      f64,
    /// Fraction of samples classified correctly
    pub accuracy:  f64,
    pub samples:   usize,
    /// (correct, total) per class, indexed by label
    pub per_class: [(usize, usize); NUM_CLASSES],
}

impl EvalScore {
    pub fn class_accuracy(&self, class: Cifar10Class) -> Option<f64> {
        let (correct, total) = self.per_class[class.label() as usize];
        (total > 0).then(|| correct as f64 / total as f64)
    }
}

/// Run `model` over every batch of `loader`.
///
/// Batch losses are weighted by batch size so a short final batch
/// does not skew the mean.
pub fn evaluate<B: Backend>(
    model:  &ConvNet<B>,
    loader: &Arc<dyn DataLoader<ImageBatch<B>>>,
) -> EvalScore {
    let mut loss_sum  = 0.0f64;
    let mut correct   = 0usize;
    let mut samples   = 0usize;
    let mut per_class = [(0usize, 0usize); NUM_CLASSES];

    for batch in loader.iter() {
        let n = batch.targets.dims()[0];
        let logits = model.forward(batch.images);

        let ce = CrossEntropyLossConfig::new().init(&logits.device());
        let batch_loss: f64 = ce
            .forward(logits.clone(), batch.targets.clone())
            .into_scalar()
            .elem::<f64>();
        loss_sum += batch_loss * n as f64;
        samples  += n;

        // argmax(1) returns shape [batch, 1] — flatten to [batch]
        let predicted: Vec<i64> = logits.argmax(1).flatten::<1>(0, 1)
            .into_data().iter::<i64>().collect();
        let targets: Vec<i64> = batch.targets.into_data().iter::<i64>().collect();

        for (p, t) in predicted.iter().zip(&targets) {
            let slot = &mut per_class[*t as usize];
            slot.1 += 1;
            if p == t {
                slot.0 += 1;
                correct += 1;
            }
        }
    }

    EvalScore {
        loss:     if samples > 0 { loss_sum / samples as f64 } else { f64::NAN },
        accuracy: if samples > 0 { correct as f64 / samples as f64 } else { 0.0 },
        samples,
        per_class,
    }
}

/// Build an unshuffled, non-augmenting loader over `images`.
pub fn eval_loader<B: Backend>(
    images:      Vec<LabeledImage>,
    normalizer:  Normalizer,
    batch_size:  usize,
    num_workers: usize,
    device:      B::Device,
) -> Arc<dyn DataLoader<ImageBatch<B>>> {
    DataLoaderBuilder::new(ImageBatcher::<B>::new(device, normalizer))
        .batch_size(batch_size)
        .num_workers(num_workers)
        .build(CifarDataset::new(images))
}

/// A trained model restored from the artifact directory.
pub struct Evaluator<B: Backend> {
    model:       ConvNet<B>,
    normalizer:  Normalizer,
    batch_size:  usize,
    num_workers: usize,
    device:      B::Device,
}

impl<B: Backend> Evaluator<B> {
    /// Rebuild the network from `train_config.json`, load the weights
    /// saved under `stem` and the fitted normaliser.
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        stem:         &str,
        device:       B::Device,
    ) -> Result<Self> {
        let cfg = ckpt_manager.load_config()?;

        let model: ConvNet<B> = ConvNetConfig::new()
            .with_dropout(cfg.dropout)
            .init(&device);
        let model      = ckpt_manager.load_model(model, stem, &device)?;
        let normalizer = ckpt_manager.load_normalizer()?;

        Ok(Self {
            model,
            normalizer,
            batch_size:  cfg.batch_size.max(1),
            num_workers: cfg.num_workers,
            device,
        })
    }

    pub fn score(&self, images: Vec<LabeledImage>) -> EvalScore {
        let loader = eval_loader::<B>(
            images,
            self.normalizer.clone(),
            self.batch_size,
            self.num_workers,
            self.device.clone(),
        );
        evaluate(&self.model, &loader)
    }
}
