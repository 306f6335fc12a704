// ============================================================
// Layer 4 — CIFAR-10 Loader
// ============================================================
// Reads the "binary version" of CIFAR-10 from disk.
//
// Directory layout after extracting cifar-10-binary.tar.gz:
//   cifar-10-batches-bin/
//     data_batch_1.bin ... data_batch_5.bin   ← 50 000 train images
//     test_batch.bin                          ← 10 000 test images
//     batches.meta.txt                        ← class names
//
// Every record is 3073 bytes:
//   [label: u8][R plane: 1024][G plane: 1024][B plane: 1024]
// with each plane stored row-major. No headers, no padding.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::image::{Cifar10Class, LabeledImage, Split, PIXELS_LEN};
use crate::domain::traits::ImageSource;

/// Bytes per record (label + pixels).
pub const RECORD_LEN: usize = 1 + PIXELS_LEN;

const EXTRACTED_DIR: &str = "cifar-10-batches-bin";
const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const TEST_FILES: [&str; 1] = ["test_batch.bin"];

const DOWNLOAD_HINT: &str =
    "download https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz and extract it there";

/// Loads CIFAR-10 splits from a directory of `.bin` batch files.
pub struct Cifar10Loader {
    dir: PathBuf,
}

impl Cifar10Loader {
    /// `dir` may be the `cifar-10-batches-bin` directory itself or the
    /// directory it was extracted into.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory that actually holds the batch files.
    fn batches_dir(&self) -> PathBuf {
        let nested = self.dir.join(EXTRACTED_DIR);
        if nested.is_dir() { nested } else { self.dir.clone() }
    }

    fn files_for(split: Split) -> &'static [&'static str] {
        match split {
            Split::Train => &TRAIN_FILES,
            Split::Test  => &TEST_FILES,
        }
    }
}

impl ImageSource for Cifar10Loader {
    fn load(&self, split: Split) -> Result<Vec<LabeledImage>> {
        let dir = self.batches_dir();
        if !dir.is_dir() {
            bail!(
                "CIFAR-10 directory '{}' does not exist; {}",
                dir.display(),
                DOWNLOAD_HINT
            );
        }

        let mut images = Vec::new();
        for name in Self::files_for(split) {
            let path = dir.join(name);
            let batch = load_batch_file(&path)?;
            tracing::debug!("Read {} images from '{}'", batch.len(), path.display());
            images.extend(batch);
        }

        tracing::info!("Loaded {} {} images from '{}'", images.len(), split, dir.display());
        Ok(images)
    }
}

fn load_batch_file(path: &Path) -> Result<Vec<LabeledImage>> {
    let bytes = fs::read(path).with_context(|| {
        format!("Cannot read CIFAR-10 batch '{}'; {}", path.display(), DOWNLOAD_HINT)
    })?;
    parse_records(&bytes).with_context(|| format!("Malformed batch file '{}'", path.display()))
}

/// Decode a buffer of concatenated 3073-byte records.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<LabeledImage>> {
    if bytes.len() % RECORD_LEN != 0 {
        bail!(
            "length {} is not a multiple of the {}-byte record size",
            bytes.len(),
            RECORD_LEN
        );
    }

    bytes
        .chunks_exact(RECORD_LEN)
        .enumerate()
        .map(|(i, record)| {
            let class = Cifar10Class::from_label(record[0])
                .with_context(|| format!("record {i} has invalid label {}", record[0]))?;
            LabeledImage::new(record[1..].to_vec(), class)
                .with_context(|| format!("record {i} has a truncated pixel block"))
        })
        .collect()
}
