//! Training datasets: MNIST IDX files, the auxiliary printed-digit set,
//! and the synthetic "empty cell" class.
//!
//! Class 0 means "empty or noise", not the numeral zero: MNIST zeros are
//! filtered out at load time because they are visually confusable with an
//! empty cell, and synthetic empties take their place.

use std::fs;
use std::path::Path;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::Rng;

use crate::model::INPUT_SIZE;

const IDX_IMAGES_MAGIC: u32 = 2051;
const IDX_LABELS_MAGIC: u32 = 2049;
const AUX_MAGIC: u32 = 0xDEAD_BEEF;

#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("bad magic in {path}: expected {expected:#x}, got {got:#x}")]
    BadMagic {
        path: String,
        expected: u32,
        got: u32,
    },
    #[error("{path}: file truncated (needed {needed} bytes, had {had})")]
    Truncated {
        path: String,
        needed: usize,
        had: usize,
    },
    #[error("image/label counts disagree ({images} images, {labels} labels)")]
    CountMismatch { images: usize, labels: usize },
    #[error("sample size {got} does not match the target dataset ({expected})")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Owned sample set: flat normalized images with parallel labels.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub images: Vec<Vec<f32>>,
    pub labels: Vec<u8>,
    pub image_size: usize,
}

impl Dataset {
    pub fn with_image_size(image_size: usize) -> Self {
        Self {
            images: Vec::new(),
            labels: Vec::new(),
            image_size,
        }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.images.len()
    }

    pub fn push(&mut self, image: Vec<f32>, label: u8) {
        debug_assert_eq!(image.len(), self.image_size);
        self.images.push(image);
        self.labels.push(label);
    }

    /// In-place Fisher-Yates shuffle keeping images and labels parallel.
    pub fn shuffle(&mut self, rng: &mut StdRng) {
        for i in (1..self.count()).rev() {
            let j = rng.gen_range(0..=i);
            self.images.swap(i, j);
            self.labels.swap(i, j);
        }
    }

    /// Split off the first `n` samples into a new dataset.
    pub fn take_front(&mut self, n: usize) -> Dataset {
        let n = n.min(self.count());
        Dataset {
            images: self.images.drain(..n).collect(),
            labels: self.labels.drain(..n).collect(),
            image_size: self.image_size,
        }
    }
}

struct BigEndianCursor<'a> {
    path: &'a str,
    data: &'a [u8],
    pos: usize,
}

impl<'a> BigEndianCursor<'a> {
    fn new(path: &'a str, data: &'a [u8]) -> Self {
        Self { path, data, pos: 0 }
    }

    fn read_u32(&mut self) -> Result<u32, DatasetError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DatasetError> {
        if self.pos + n > self.data.len() {
            return Err(DatasetError::Truncated {
                path: self.path.to_string(),
                needed: self.pos + n,
                had: self.data.len(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }
}

/// Load an MNIST IDX image/label pair, dropping label-0 samples.
pub fn load_mnist(
    images_path: impl AsRef<Path>,
    labels_path: impl AsRef<Path>,
) -> Result<Dataset, DatasetError> {
    let images_path = images_path.as_ref();
    let labels_path = labels_path.as_ref();

    let raw_images = fs::read(images_path)?;
    let raw_labels = fs::read(labels_path)?;

    let ipath = images_path.display().to_string();
    let mut ic = BigEndianCursor::new(&ipath, &raw_images);
    let magic = ic.read_u32()?;
    if magic != IDX_IMAGES_MAGIC {
        return Err(DatasetError::BadMagic {
            path: ipath.clone(),
            expected: IDX_IMAGES_MAGIC,
            got: magic,
        });
    }
    let image_count = ic.read_u32()? as usize;
    let rows = ic.read_u32()? as usize;
    let cols = ic.read_u32()? as usize;
    let image_size = rows * cols;

    let lpath = labels_path.display().to_string();
    let mut lc = BigEndianCursor::new(&lpath, &raw_labels);
    let magic = lc.read_u32()?;
    if magic != IDX_LABELS_MAGIC {
        return Err(DatasetError::BadMagic {
            path: lpath.clone(),
            expected: IDX_LABELS_MAGIC,
            got: magic,
        });
    }
    let label_count = lc.read_u32()? as usize;
    if label_count != image_count {
        return Err(DatasetError::CountMismatch {
            images: image_count,
            labels: label_count,
        });
    }

    let pixels = ic.read_bytes(image_count * image_size)?;
    let labels = lc.read_bytes(label_count)?;

    let mut ds = Dataset::with_image_size(image_size);
    let mut dropped_zeros = 0usize;
    for i in 0..image_count {
        let label = labels[i];
        if label == 0 {
            dropped_zeros += 1;
            continue;
        }
        let img = pixels[i * image_size..(i + 1) * image_size]
            .iter()
            .map(|&p| p as f32 / 255.0)
            .collect();
        ds.push(img, label);
    }

    info!(
        "loaded {} samples from {} ({} zeros dropped)",
        ds.count(),
        images_path.display(),
        dropped_zeros
    );
    Ok(ds)
}

/// Additively load the auxiliary printed-digit dataset into `target`.
///
/// Wire format, big-endian: magic 0xDEADBEEF, count, width, height, then
/// `count` records of one label byte followed by width*height pixels.
/// Label-0 records are skipped. A missing file is not an error; the caller
/// decides whether to treat it as one.
pub fn load_aux_digits(
    path: impl AsRef<Path>,
    target: &mut Dataset,
) -> Result<usize, DatasetError> {
    let path = path.as_ref();
    let raw = fs::read(path)?;
    let p = path.display().to_string();
    let mut c = BigEndianCursor::new(&p, &raw);

    let magic = c.read_u32()?;
    if magic != AUX_MAGIC {
        return Err(DatasetError::BadMagic {
            path: p.clone(),
            expected: AUX_MAGIC,
            got: magic,
        });
    }
    let count = c.read_u32()? as usize;
    let width = c.read_u32()? as usize;
    let height = c.read_u32()? as usize;
    let sample_size = width * height;
    if sample_size != target.image_size {
        return Err(DatasetError::DimensionMismatch {
            expected: target.image_size,
            got: sample_size,
        });
    }

    let mut added = 0usize;
    for _ in 0..count {
        let label = c.read_bytes(1)?[0];
        let pixels = c.read_bytes(sample_size)?;
        if label == 0 {
            continue;
        }
        target.push(pixels.iter().map(|&v| v as f32 / 255.0).collect(), label);
        added += 1;
    }

    info!("folded {} auxiliary samples from {}", added, path.display());
    Ok(added)
}

/// Try the aux loader, logging and skipping when the file is absent.
pub fn load_aux_digits_if_present(path: impl AsRef<Path>, target: &mut Dataset) -> usize {
    let path = path.as_ref();
    if !path.exists() {
        warn!("no auxiliary dataset at {}", path.display());
        return 0;
    }
    match load_aux_digits(path, target) {
        Ok(n) => n,
        Err(err) => {
            warn!("skipping auxiliary dataset {}: {}", path.display(), err);
            0
        }
    }
}

/// Generate synthetic "empty cell" samples (class 0): 70% near-black noise,
/// 20% brighter uniform noise, 10% near-black with a few bright flecks.
pub fn generate_empty_samples(ds: &mut Dataset, count: usize, rng: &mut StdRng) {
    debug_assert_eq!(ds.image_size, INPUT_SIZE);
    for _ in 0..count {
        let kind: f32 = rng.gen();
        let mut img: Vec<f32> = if kind < 0.7 {
            (0..ds.image_size).map(|_| rng.gen_range(0.0..0.05)).collect()
        } else if kind < 0.9 {
            (0..ds.image_size).map(|_| rng.gen_range(0.0..0.15)).collect()
        } else {
            (0..ds.image_size).map(|_| rng.gen_range(0.0..0.05)).collect()
        };
        if kind >= 0.9 {
            let flecks = rng.gen_range(1..=3);
            for _ in 0..flecks {
                let idx = rng.gen_range(0..ds.image_size);
                img[idx] = rng.gen_range(0.7..1.0);
            }
        }
        ds.push(img, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use std::io::Write;

    fn write_idx_pair(
        dir: &Path,
        samples: &[(Vec<u8>, u8)],
        rows: u32,
        cols: u32,
    ) -> (std::path::PathBuf, std::path::PathBuf) {
        let images_path = dir.join("images.idx3-ubyte");
        let labels_path = dir.join("labels.idx1-ubyte");

        let mut img = Vec::new();
        img.extend_from_slice(&IDX_IMAGES_MAGIC.to_be_bytes());
        img.extend_from_slice(&(samples.len() as u32).to_be_bytes());
        img.extend_from_slice(&rows.to_be_bytes());
        img.extend_from_slice(&cols.to_be_bytes());
        for (pixels, _) in samples {
            img.extend_from_slice(pixels);
        }
        fs::File::create(&images_path)
            .unwrap()
            .write_all(&img)
            .unwrap();

        let mut lab = Vec::new();
        lab.extend_from_slice(&IDX_LABELS_MAGIC.to_be_bytes());
        lab.extend_from_slice(&(samples.len() as u32).to_be_bytes());
        for (_, label) in samples {
            lab.push(*label);
        }
        fs::File::create(&labels_path)
            .unwrap()
            .write_all(&lab)
            .unwrap();

        (images_path, labels_path)
    }

    #[test]
    fn mnist_loader_filters_zero_labels() {
        let dir = tempfile::tempdir().unwrap();
        let samples = vec![
            (vec![10u8; 4], 1u8),
            (vec![20u8; 4], 0u8),
            (vec![30u8; 4], 5u8),
        ];
        let (ip, lp) = write_idx_pair(dir.path(), &samples, 2, 2);
        let ds = load_mnist(&ip, &lp).unwrap();
        assert_eq!(ds.count(), 2);
        assert_eq!(ds.labels, vec![1, 5]);
        assert_abs_diff_eq!(ds.images[0][0], 10.0 / 255.0, epsilon = 1e-6);
    }

    #[test]
    fn mnist_loader_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.idx3-ubyte");
        fs::write(&path, 123u32.to_be_bytes()).unwrap();
        let lp = dir.path().join("labels.idx1-ubyte");
        fs::write(&lp, IDX_LABELS_MAGIC.to_be_bytes()).unwrap();
        let err = load_mnist(&path, &lp).unwrap_err();
        assert!(matches!(err, DatasetError::BadMagic { got: 123, .. }));
    }

    #[test]
    fn mnist_loader_rejects_truncated_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let samples = vec![(vec![1u8; 4], 3u8)];
        let (ip, lp) = write_idx_pair(dir.path(), &samples, 2, 2);
        // chop off the last pixel byte
        let mut raw = fs::read(&ip).unwrap();
        raw.pop();
        fs::write(&ip, raw).unwrap();
        assert!(matches!(
            load_mnist(&ip, &lp),
            Err(DatasetError::Truncated { .. })
        ));
    }

    fn write_aux(dir: &Path, records: &[(u8, Vec<u8>)], w: u32, h: u32) -> std::path::PathBuf {
        let path = dir.join("digits.bin");
        let mut raw = Vec::new();
        raw.extend_from_slice(&AUX_MAGIC.to_be_bytes());
        raw.extend_from_slice(&(records.len() as u32).to_be_bytes());
        raw.extend_from_slice(&w.to_be_bytes());
        raw.extend_from_slice(&h.to_be_bytes());
        for (label, pixels) in records {
            raw.push(*label);
            raw.extend_from_slice(pixels);
        }
        fs::write(&path, raw).unwrap();
        path
    }

    #[test]
    fn aux_loader_is_additive_and_skips_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_aux(
            dir.path(),
            &[(7u8, vec![255u8; 4]), (0u8, vec![1u8; 4])],
            2,
            2,
        );
        let mut ds = Dataset::with_image_size(4);
        ds.push(vec![0.0; 4], 1);
        let added = load_aux_digits(&path, &mut ds).unwrap();
        assert_eq!(added, 1);
        assert_eq!(ds.count(), 2);
        assert_eq!(ds.labels, vec![1, 7]);
    }

    #[test]
    fn aux_loader_rejects_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_aux(dir.path(), &[(2u8, vec![0u8; 9])], 3, 3);
        let mut ds = Dataset::with_image_size(4);
        assert!(matches!(
            load_aux_digits(&path, &mut ds),
            Err(DatasetError::DimensionMismatch {
                expected: 4,
                got: 9
            })
        ));
    }

    #[test]
    fn missing_aux_file_is_skipped_quietly() {
        let mut ds = Dataset::with_image_size(4);
        let added = load_aux_digits_if_present("/nonexistent/digits.bin", &mut ds);
        assert_eq!(added, 0);
        assert_eq!(ds.count(), 0);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut ds = Dataset::with_image_size(1);
        for i in 0..100u8 {
            ds.push(vec![i as f32], i % 10);
        }
        let mut before = ds.labels.clone();
        let mut rng = StdRng::seed_from_u64(11);
        ds.shuffle(&mut rng);
        assert_ne!(ds.labels, before, "seeded shuffle should move something");

        let mut after = ds.labels.clone();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);

        // images stay glued to their labels
        for (img, &label) in ds.images.iter().zip(&ds.labels) {
            assert_eq!(img[0] as u8 % 10, label);
        }
    }

    #[test]
    fn empty_samples_stay_in_range_and_labeled_zero() {
        let mut ds = Dataset::with_image_size(INPUT_SIZE);
        let mut rng = StdRng::seed_from_u64(3);
        generate_empty_samples(&mut ds, 200, &mut rng);
        assert_eq!(ds.count(), 200);
        assert!(ds.labels.iter().all(|&l| l == 0));
        for img in &ds.images {
            assert!(img.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
        // the 10% fleck variant is all but guaranteed to appear in 200 draws
        let bright = ds
            .images
            .iter()
            .any(|img| img.iter().any(|&v| v > 0.5));
        assert!(bright);
    }
}
