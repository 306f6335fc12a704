// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<LabeledImage>
// into one image tensor and one target tensor.
//
// How batching works here:
//   Input:  N LabeledImages, each 3x32x32 u8
//   Output: images  [N, 3, 32, 32] f32 (normalised)
//           targets [N]            int (class index)
//
// Every image is (optionally) augmented, normalised and appended
// to one flat Vec<f32>, which is then reshaped in a single call.
// Augmentation is only configured on the training batcher; the
// validation/test batcher passes images through unchanged.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::{augment::Augmenter, normalizer::Normalizer};
use crate::domain::image::{LabeledImage, CHANNELS, IMAGE_SIDE, PIXELS_LEN};

// ─── ImageBatch ───────────────────────────────────────────────────────────────
/// A batch of images ready for the forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// shape: [batch_size, 3, 32, 32]
    pub images: Tensor<B, 4>,

    /// shape: [batch_size], values in 0..10
    pub targets: Tensor<B, 1, Int>,
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    device:     B::Device,
    normalizer: Normalizer,
    augmenter:  Option<Augmenter>,
}

impl<B: Backend> ImageBatcher<B> {
    /// Batcher without augmentation (validation / test).
    pub fn new(device: B::Device, normalizer: Normalizer) -> Self {
        Self { device, normalizer, augmenter: None }
    }

    /// Batcher that perturbs each image before normalising it.
    pub fn with_augmenter(mut self, augmenter: Augmenter) -> Self {
        self.augmenter = Some(augmenter);
        self
    }
}

impl<B: Backend> Batcher<LabeledImage, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<LabeledImage>) -> ImageBatch<B> {
        let batch_size = items.len();
        let mut rng    = rand::thread_rng();

        let mut flat: Vec<f32> = Vec::with_capacity(batch_size * PIXELS_LEN);
        let mut targets: Vec<i32> = Vec::with_capacity(batch_size);

        for item in &items {
            match &self.augmenter {
                Some(aug) => self.normalizer.apply_into(&aug.apply(item, &mut rng), &mut flat),
                None      => self.normalizer.apply_into(item, &mut flat),
            }
            targets.push(item.class.label() as i32);
        }

        let images = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, CHANNELS, IMAGE_SIDE, IMAGE_SIDE]);

        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &self.device);

        ImageBatch { images, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::augment::AugmentConfig;
    use crate::data::normalizer::NormalizerConfig;
    use crate::domain::image::Cifar10Class;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn image(value: u8, class: Cifar10Class) -> LabeledImage {
        LabeledImage::new(vec![value; PIXELS_LEN], class).unwrap()
    }

    fn normalizer() -> Normalizer {
        Normalizer::fit(NormalizerConfig::default(), &[]).unwrap()
    }

    #[test]
    fn test_batch_shapes_and_targets() {
        let device  = Default::default();
        let batcher = ImageBatcher::<TestBackend>::new(device, normalizer());

        let batch = batcher.batch(vec![
            image(0, Cifar10Class::Airplane),
            image(255, Cifar10Class::Horse),
            image(51, Cifar10Class::Truck),
        ]);

        assert_eq!(batch.images.dims(), [3, 3, 32, 32]);
        assert_eq!(batch.targets.dims(), [3]);

        let targets: Vec<i64> = batch.targets.into_data().iter::<i64>().collect();
        assert_eq!(targets, vec![0, 7, 9]);
    }

    #[test]
    fn test_images_are_rescaled() {
        let device  = Default::default();
        let batcher = ImageBatcher::<TestBackend>::new(device, normalizer());

        let batch  = batcher.batch(vec![image(255, Cifar10Class::Cat)]);
        let values: Vec<f32> = batch.images.into_data().iter::<f32>().collect();
        assert!(values.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_augmented_solid_image_stays_solid() {
        // geometric transforms with nearest fill cannot change a constant image
        let device  = Default::default();
        let batcher = ImageBatcher::<TestBackend>::new(device, normalizer())
            .with_augmenter(Augmenter::new(AugmentConfig::default()));

        let batch  = batcher.batch(vec![image(102, Cifar10Class::Deer); 4]);
        let values: Vec<f32> = batch.images.into_data().iter::<f32>().collect();
        assert!(values.iter().all(|&v| (v - 0.4).abs() < 1e-6));
    }
}
