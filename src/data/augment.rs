// ============================================================
// Layer 4 — Augmentation Generator
// ============================================================
// Produces a randomly perturbed copy of a training image every
// time the image is drawn into a batch:
//
//   - rotation by a uniform angle in [-rotation_range, +rotation_range] degrees
//   - horizontal shift by a uniform fraction of the width
//   - vertical shift by a uniform fraction of the height
//   - mirror left/right with probability 0.5
//
// The geometric part is done by inverse mapping: for every output
// pixel we compute where it came from in the source image and
// sample it bilinearly. Source coordinates that fall outside the
// image are clamped to the border ("nearest" fill mode), so shifted
// and rotated images never get black corners.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::image::{LabeledImage, CHANNELS, IMAGE_SIDE, PLANE_LEN, PIXELS_LEN};

/// Ranges for the random transforms. All-zero / `false` is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AugmentConfig {
    pub horizontal_flip:    bool,
    /// Maximum rotation in degrees
    pub rotation_range:     f32,
    /// Maximum horizontal shift as a fraction of the width
    pub width_shift_range:  f32,
    /// Maximum vertical shift as a fraction of the height
    pub height_shift_range: f32,
}

impl AugmentConfig {
    pub fn disabled() -> Self {
        Self {
            horizontal_flip:    false,
            rotation_range:     0.0,
            width_shift_range:  0.0,
            height_shift_range: 0.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        !self.horizontal_flip
            && self.rotation_range == 0.0
            && self.width_shift_range == 0.0
            && self.height_shift_range == 0.0
    }
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            horizontal_flip:    true,
            rotation_range:     10.0,
            width_shift_range:  0.1,
            height_shift_range: 0.1,
        }
    }
}

/// One concrete draw of the random parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub angle_deg: f32,
    /// Pixels, positive moves content right
    pub shift_x:   f32,
    /// Pixels, positive moves content down
    pub shift_y:   f32,
    pub flip:      bool,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        angle_deg: 0.0,
        shift_x:   0.0,
        shift_y:   0.0,
        flip:      false,
    };

    fn is_geometric_identity(&self) -> bool {
        self.angle_deg == 0.0 && self.shift_x == 0.0 && self.shift_y == 0.0
    }
}

#[derive(Debug, Clone)]
pub struct Augmenter {
    config: AugmentConfig,
}

impl Augmenter {
    pub fn new(config: AugmentConfig) -> Self {
        Self { config }
    }

    /// Draw a random transform within the configured ranges.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Transform {
        let side = IMAGE_SIDE as f32;
        Transform {
            angle_deg: symmetric(rng, self.config.rotation_range),
            shift_x:   symmetric(rng, self.config.width_shift_range * side),
            shift_y:   symmetric(rng, self.config.height_shift_range * side),
            flip:      self.config.horizontal_flip && rng.gen_bool(0.5),
        }
    }

    /// Return a freshly perturbed copy of `image`.
    pub fn apply<R: Rng + ?Sized>(&self, image: &LabeledImage, rng: &mut R) -> LabeledImage {
        if self.config.is_identity() {
            return image.clone();
        }
        warp(image, &self.sample(rng))
    }
}

fn symmetric<R: Rng + ?Sized>(rng: &mut R, bound: f32) -> f32 {
    if bound > 0.0 { rng.gen_range(-bound..=bound) } else { 0.0 }
}

/// Apply a concrete transform: rotate about the centre, shift, then mirror.
pub fn warp(image: &LabeledImage, t: &Transform) -> LabeledImage {
    let mut out = if t.is_geometric_identity() {
        image.pixels.clone()
    } else {
        resample(&image.pixels, t)
    };

    if t.flip {
        for plane in out.chunks_exact_mut(PLANE_LEN) {
            for row in plane.chunks_exact_mut(IMAGE_SIDE) {
                row.reverse();
            }
        }
    }

    LabeledImage { pixels: out, class: image.class }
}

fn resample(pixels: &[u8], t: &Transform) -> Vec<u8> {
    let centre = (IMAGE_SIDE as f32 - 1.0) / 2.0;
    let (sin, cos) = t.angle_deg.to_radians().sin_cos();
    let mut out = vec![0u8; PIXELS_LEN];

    for y in 0..IMAGE_SIDE {
        for x in 0..IMAGE_SIDE {
            // Undo the shift, then undo the rotation about the centre.
            let dx = x as f32 - t.shift_x - centre;
            let dy = y as f32 - t.shift_y - centre;
            let src_x = cos * dx + sin * dy + centre;
            let src_y = -sin * dx + cos * dy + centre;

            for c in 0..CHANNELS {
                let plane = &pixels[c * PLANE_LEN..(c + 1) * PLANE_LEN];
                out[c * PLANE_LEN + y * IMAGE_SIDE + x] = bilinear(plane, src_x, src_y);
            }
        }
    }
    out
}

fn bilinear(plane: &[u8], x: f32, y: f32) -> u8 {
    let max = (IMAGE_SIDE - 1) as f32;
    let x = x.clamp(0.0, max);
    let y = y.clamp(0.0, max);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(IMAGE_SIDE - 1);
    let y1 = (y0 + 1).min(IMAGE_SIDE - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let px = |yy: usize, xx: usize| plane[yy * IMAGE_SIDE + xx] as f32;
    let top    = px(y0, x0) * (1.0 - fx) + px(y0, x1) * fx;
    let bottom = px(y1, x0) * (1.0 - fx) + px(y1, x1) * fx;
    (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
}
