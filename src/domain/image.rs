// ============================================================
// Layer 3 — Image Domain Types
// ============================================================
// A CIFAR-10 image is 32x32 pixels with 3 colour channels.
// Pixels are kept as raw bytes in channel-major order (CHW):
//
//   [ R plane (1024 bytes) | G plane (1024) | B plane (1024) ]
//
// which is exactly how the binary dataset stores them, and
// also the [C, H, W] layout the convolution layers expect.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side length of a (square) CIFAR-10 image.
pub const IMAGE_SIDE: usize = 32;

/// Number of colour channels.
pub const CHANNELS: usize = 3;

/// Pixels in one channel plane.
pub const PLANE_LEN: usize = IMAGE_SIDE * IMAGE_SIDE;

/// Bytes of pixel data per image.
pub const PIXELS_LEN: usize = CHANNELS * PLANE_LEN;

/// Number of target classes.
pub const NUM_CLASSES: usize = 10;

/// Which half of the dataset to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Train,
    Test,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test  => write!(f, "test"),
        }
    }
}

/// The ten CIFAR-10 categories, in label order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cifar10Class {
    Airplane,
    Automobile,
    Bird,
    Cat,
    Deer,
    Dog,
    Frog,
    Horse,
    Ship,
    Truck,
}

impl Cifar10Class {
    pub const ALL: [Cifar10Class; NUM_CLASSES] = [
        Cifar10Class::Airplane,
        Cifar10Class::Automobile,
        Cifar10Class::Bird,
        Cifar10Class::Cat,
        Cifar10Class::Deer,
        Cifar10Class::Dog,
        Cifar10Class::Frog,
        Cifar10Class::Horse,
        Cifar10Class::Ship,
        Cifar10Class::Truck,
    ];

    /// Map a raw label byte to its class, `None` if out of range.
    pub fn from_label(label: u8) -> Option<Self> {
        Self::ALL.get(label as usize).copied()
    }

    pub fn label(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Cifar10Class::Airplane   => "airplane",
            Cifar10Class::Automobile => "automobile",
            Cifar10Class::Bird       => "bird",
            Cifar10Class::Cat        => "cat",
            Cifar10Class::Deer       => "deer",
            Cifar10Class::Dog        => "dog",
            Cifar10Class::Frog       => "frog",
            Cifar10Class::Horse      => "horse",
            Cifar10Class::Ship       => "ship",
            Cifar10Class::Truck      => "truck",
        }
    }
}

/// One labelled image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledImage {
    /// CHW pixel bytes, always `PIXELS_LEN` long
    pub pixels: Vec<u8>,
    pub class:  Cifar10Class,
}

impl LabeledImage {
    /// Build an image, returning `None` if the buffer has the wrong size.
    pub fn new(pixels: Vec<u8>, class: Cifar10Class) -> Option<Self> {
        (pixels.len() == PIXELS_LEN).then_some(Self { pixels, class })
    }

    /// Pixel value at channel `c`, row `y`, column `x`.
    pub fn at(&self, c: usize, y: usize, x: usize) -> u8 {
        self.pixels[c * PLANE_LEN + y * IMAGE_SIDE + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip_covers_all_classes() {
        for (i, class) in Cifar10Class::ALL.iter().enumerate() {
            assert_eq!(class.label() as usize, i);
            assert_eq!(Cifar10Class::from_label(i as u8), Some(*class));
        }
        assert_eq!(Cifar10Class::from_label(10), None);
    }

    #[test]
    fn test_rejects_wrong_pixel_count() {
        assert!(LabeledImage::new(vec![0; PIXELS_LEN - 1], Cifar10Class::Cat).is_none());
        assert!(LabeledImage::new(vec![0; PIXELS_LEN], Cifar10Class::Cat).is_some());
    }

    #[test]
    fn test_at_uses_channel_major_layout() {
        let mut pixels = vec![0u8; PIXELS_LEN];
        // blue channel, row 1, column 2
        pixels[2 * PLANE_LEN + IMAGE_SIDE + 2] = 200;
        let img = LabeledImage::new(pixels, Cifar10Class::Ship).unwrap();
        assert_eq!(img.at(2, 1, 2), 200);
        assert_eq!(img.at(0, 1, 2), 0);
    }
}
