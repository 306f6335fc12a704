use burn::data::dataset::Dataset;

use crate::domain::image::LabeledImage;

/// In-memory split exposed through Burn's `Dataset` trait so the
/// `DataLoader` can index and shuffle it.
pub struct CifarDataset {
    images: Vec<LabeledImage>,
}

impl CifarDataset {
    pub fn new(images: Vec<LabeledImage>) -> Self { Self { images } }

    pub fn images(&self) -> &[LabeledImage] { &self.images }

    pub fn into_images(self) -> Vec<LabeledImage> { self.images }
}

impl Dataset<LabeledImage> for CifarDataset {
    fn get(&self, index: usize) -> Option<LabeledImage> {
        self.images.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}
