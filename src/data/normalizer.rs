// ============================================================
// Layer 4 — Pixel Normaliser
// ============================================================
// Turns raw u8 pixels into the f32 values the network sees.
//
// Steps (applied in order):
//   1. rescale            x * rescale            (1/255 → [0, 1])
//   2. featurewise_center x - mean[c]            (optional)
//   3. featurewise_std    x / (std[c] + 1e-6)    (optional)
//
// The per-channel statistics are fitted once on the rescaled
// training images and then reused unchanged for the test split,
// so both splits go through the same transform.
//
// ZCA whitening is accepted as a flag for configuration parity
// but rejected at fit time.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::domain::image::{LabeledImage, CHANNELS, PLANE_LEN};

const STD_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub rescale:                       f32,
    pub featurewise_center:            bool,
    pub featurewise_std_normalization: bool,
    pub zca_whitening:                 bool,
}

impl NormalizerConfig {
    /// Featurewise statistics on/off together, the "global contrast
    /// normalisation" switch of the training command.
    pub fn with_gcn(mut self, gcn: bool) -> Self {
        self.featurewise_center = gcn;
        self.featurewise_std_normalization = gcn;
        self
    }

    fn needs_statistics(&self) -> bool {
        self.featurewise_center || self.featurewise_std_normalization
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            rescale:                       1.0 / 255.0,
            featurewise_center:            false,
            featurewise_std_normalization: false,
            zca_whitening:                 false,
        }
    }
}

/// A fitted normaliser. Cheap to clone into every batcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    config: NormalizerConfig,
    mean:   [f32; CHANNELS],
    std:    [f32; CHANNELS],
}

impl Normalizer {
    /// Compute whatever statistics the config asks for from `images`.
    pub fn fit(config: NormalizerConfig, images: &[LabeledImage]) -> Result<Self> {
        if config.zca_whitening {
            bail!("ZCA whitening is not supported; disable it to train");
        }

        let mut normalizer = Self { config, mean: [0.0; CHANNELS], std: [1.0; CHANNELS] };
        if !config.needs_statistics() {
            return Ok(normalizer);
        }
        if images.is_empty() {
            bail!("cannot fit featurewise statistics on an empty image set");
        }

        // f64 accumulators: 50k images * 1024 pixels per channel
        let mut sum    = [0f64; CHANNELS];
        let mut sum_sq = [0f64; CHANNELS];
        for img in images {
            for (c, plane) in img.pixels.chunks_exact(PLANE_LEN).enumerate() {
                for &p in plane {
                    let v = p as f64 * config.rescale as f64;
                    sum[c]    += v;
                    sum_sq[c] += v * v;
                }
            }
        }

        let n = (images.len() * PLANE_LEN) as f64;
        for c in 0..CHANNELS {
            let mean = sum[c] / n;
            let var  = (sum_sq[c] / n - mean * mean).max(0.0);
            normalizer.mean[c] = mean as f32;
            normalizer.std[c]  = var.sqrt() as f32;
        }

        tracing::info!(
            "Fitted featurewise statistics: mean={:?} std={:?}",
            normalizer.mean,
            normalizer.std
        );
        Ok(normalizer)
    }

    pub fn mean(&self) -> [f32; CHANNELS] {
        self.mean
    }

    pub fn std(&self) -> [f32; CHANNELS] {
        self.std
    }

    /// Normalise one image into CHW f32 values.
    pub fn apply(&self, image: &LabeledImage) -> Vec<f32> {
        let mut out = Vec::with_capacity(image.pixels.len());
        self.apply_into(image, &mut out);
        out
    }

    /// Same as [`apply`](Self::apply) but appends to an existing buffer,
    /// which lets the batcher fill one flat batch vector.
    pub fn apply_into(&self, image: &LabeledImage, out: &mut Vec<f32>) {
        let cfg = &self.config;
        for (c, plane) in image.pixels.chunks_exact(PLANE_LEN).enumerate() {
            out.extend(plane.iter().map(|&p| {
                let mut v = p as f32 * cfg.rescale;
                if cfg.featurewise_center {
                    v -= self.mean[c];
                }
                if cfg.featurewise_std_normalization {
                    v /= self.std[c] + STD_EPSILON;
                }
                v
            }));
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::{Cifar10Class, PIXELS_LEN};

    fn solid(value: u8) -> LabeledImage {
        LabeledImage::new(vec![value; PIXELS_LEN], Cifar10Class::Dog).unwrap()
    }

    #[test]
    fn test_rescale_maps_to_unit_interval() {
        let n = Normalizer::fit(NormalizerConfig::default(), &[]).unwrap();
        let values = n.apply(&solid(255));
        assert_eq!(values.len(), PIXELS_LEN);
        assert!(values.iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(n.apply(&solid(0)).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_featurewise_fit_centres_each_channel() {
        let images = vec![solid(0), solid(255)];
        let cfg = NormalizerConfig::default().with_gcn(true);
        let n = Normalizer::fit(cfg, &images).unwrap();

        for c in 0..CHANNELS {
            assert!((n.mean()[c] - 0.5).abs() < 1e-6);
            assert!((n.std()[c] - 0.5).abs() < 1e-6);
        }

        let low  = n.apply(&images[0]);
        let high = n.apply(&images[1]);
        assert!((low[0] + 1.0).abs() < 1e-4);
        assert!((high[0] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_zca_is_rejected() {
        let cfg = NormalizerConfig { zca_whitening: true, ..NormalizerConfig::default() };
        assert!(Normalizer::fit(cfg, &[solid(1)]).is_err());
    }

    #[test]
    fn test_featurewise_needs_images() {
        let cfg = NormalizerConfig::default().with_gcn(true);
        assert!(Normalizer::fit(cfg, &[]).is_err());
    }
}
