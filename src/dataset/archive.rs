//! Binary (bird / not-bird) data sources
//!
//! Each class comes from either a `.zip` archive or a plain directory. Images
//! are read in archive (or sorted listing) order up to a per-class cap, then
//! the two classes are shuffled together and a validation share is held out.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use super::burn_dataset::ImageItem;
use super::preprocess::{decode_image, is_image_file, load_image};
use crate::utils::error::{ClassifierError, Result};
use crate::utils::logging::ProgressLogger;

/// Label of positive (bird) images
pub const POSITIVE_LABEL: usize = 1;

/// Label of negative (not-bird) images
pub const NEGATIVE_LABEL: usize = 0;

/// Images between progress lines while reading a source
const PROGRESS_INTERVAL: usize = 1000;

/// Where one class's images live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassSource {
    Zip(PathBuf),
    Directory(PathBuf),
}

impl ClassSource {
    /// `.zip` files are archives, existing directories are folders
    pub fn from_path(path: &Path) -> Result<Self> {
        let is_zip = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);

        if is_zip && path.is_file() {
            Ok(ClassSource::Zip(path.to_path_buf()))
        } else if path.is_dir() {
            Ok(ClassSource::Directory(path.to_path_buf()))
        } else {
            Err(ClassifierError::PathNotFound(path.to_path_buf()))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ClassSource::Zip(p) | ClassSource::Directory(p) => p,
        }
    }
}

impl fmt::Display for ClassSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// Read up to `max_images` decodable images from one source
pub fn load_class_source(
    source: &ClassSource,
    label: usize,
    max_images: usize,
    image_size: usize,
) -> Result<Vec<ImageItem>> {
    info!("Loading images from {} (label {})", source, label);

    let mut progress =
        ProgressLogger::new(&format!("Loaded from {}", source), max_images).with_interval(PROGRESS_INTERVAL);

    let items = match source {
        ClassSource::Zip(path) => load_zip(path, label, max_images, image_size, &mut progress)?,
        ClassSource::Directory(path) => {
            load_directory(path, label, max_images, image_size, &mut progress)
        }
    };

    progress.finish();
    Ok(items)
}

fn load_zip(
    path: &Path,
    label: usize,
    max_images: usize,
    image_size: usize,
    progress: &mut ProgressLogger,
) -> Result<Vec<ImageItem>> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut items = Vec::new();

    for index in 0..archive.len() {
        if items.len() >= max_images {
            break;
        }

        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if !is_image_file(Path::new(&name)) {
            continue;
        }

        let mut bytes = Vec::with_capacity(preallocation(entry.size()));
        entry.read_to_end(&mut bytes)?;

        match decode_image(&bytes, &name, image_size) {
            Ok(image) => {
                items.push(ImageItem::new(image, label, format!("{}:{}", path.display(), name)));
                progress.increment();
            }
            Err(e) => warn!("Skipping archive entry: {}", e),
        }
    }

    Ok(items)
}

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_PREALLOCATION: usize = 64 << 20;

fn preallocation(declared_size: u64) -> usize {
    usize::try_from(declared_size)
        .unwrap_or(MAX_PREALLOCATION)
        .min(MAX_PREALLOCATION)
}

fn load_directory(
    path: &Path,
    label: usize,
    max_images: usize,
    image_size: usize,
    progress: &mut ProgressLogger,
) -> Vec<ImageItem> {
    let files = WalkDir::new(path)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_image_file(p));

    let mut items = Vec::new();
    for file in files {
        if items.len() >= max_images {
            break;
        }
        match load_image(&file, image_size) {
            Ok(image) => {
                items.push(ImageItem::new(image, label, file.to_string_lossy()));
                progress.increment();
            }
            Err(e) => warn!("Skipping image: {}", e),
        }
    }

    items
}

/// Number of items held out for validation from `total`
pub fn validation_count(total: usize, validation_fraction: f64) -> usize {
    if total < 2 {
        return 0;
    }
    let count = (total as f64 * validation_fraction).round() as usize;
    count.clamp(1, total - 1)
}

/// Load both classes, shuffle the union and split off a validation share
pub fn load_binary(
    positive: &ClassSource,
    negative: &ClassSource,
    max_images: usize,
    image_size: usize,
    validation_fraction: f64,
    seed: u64,
) -> Result<(Vec<ImageItem>, Vec<ImageItem>)> {
    let mut items = load_class_source(positive, POSITIVE_LABEL, max_images, image_size)?;
    let positives = items.len();
    items.extend(load_class_source(negative, NEGATIVE_LABEL, max_images, image_size)?);

    info!(
        "Total images loaded: {} ({} positive, {} negative)",
        items.len(),
        positives,
        items.len() - positives
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let n_val = validation_count(items.len(), validation_fraction);
    let validation = items.split_off(items.len() - n_val);

    info!(
        "Training images: {}, validation images: {}",
        items.len(),
        validation.len()
    );

    Ok((items, validation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn png_bytes(shade: u8) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 5, Rgb([shade, 0, 0])))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn write_zip(path: &Path, count: usize) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        zip.start_file("readme.txt", options).unwrap();
        zip.write_all(b"not an image").unwrap();
        for i in 0..count {
            zip.start_file(format!("img/{:03}.png", i), options).unwrap();
            zip.write_all(&png_bytes(i as u8)).unwrap();
        }
        zip.start_file("img/broken.jpg", options).unwrap();
        zip.write_all(b"garbage").unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_validation_count() {
        assert_eq!(validation_count(0, 0.2), 0);
        assert_eq!(validation_count(1, 0.2), 0);
        assert_eq!(validation_count(2, 0.2), 1);
        assert_eq!(validation_count(100, 0.2), 20);
        assert_eq!(validation_count(3, 0.9), 2);
    }

    #[test]
    fn test_preallocation_is_capped() {
        assert_eq!(preallocation(0), 0);
        assert_eq!(preallocation(4096), 4096);
        assert_eq!(preallocation(u64::MAX), MAX_PREALLOCATION);
        assert_eq!(preallocation(MAX_PREALLOCATION as u64 + 1), MAX_PREALLOCATION);
    }

    #[test]
    fn test_source_kind() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("bird.zip");
        write_zip(&zip_path, 1);

        assert_eq!(
            ClassSource::from_path(&zip_path).unwrap(),
            ClassSource::Zip(zip_path.clone())
        );
        assert!(matches!(
            ClassSource::from_path(dir.path()).unwrap(),
            ClassSource::Directory(_)
        ));
        assert!(ClassSource::from_path(&dir.path().join("missing.zip")).is_err());
    }

    #[test]
    fn test_zip_respects_cap_and_skips_bad_entries() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("bird.zip");
        write_zip(&zip_path, 4);
        let source = ClassSource::Zip(zip_path);

        let all = load_class_source(&source, POSITIVE_LABEL, 100, 8).unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|i| i.label == POSITIVE_LABEL));
        assert_eq!(all[0].image.len(), 3 * 8 * 8);
        assert!(all[0].source.ends_with("img/000.png"));

        let capped = load_class_source(&source, POSITIVE_LABEL, 3, 8).unwrap();
        assert_eq!(capped.len(), 3);
    }

    #[test]
    fn test_load_binary_from_directories() {
        let dir = tempfile::tempdir().unwrap();
        let birds = dir.path().join("bird");
        let others = dir.path().join("not-bird");
        std::fs::create_dir_all(&birds).unwrap();
        std::fs::create_dir_all(&others).unwrap();
        for i in 0..6 {
            std::fs::write(birds.join(format!("{}.png", i)), png_bytes(200)).unwrap();
            std::fs::write(others.join(format!("{}.png", i)), png_bytes(10)).unwrap();
        }

        let (train, validation) = load_binary(
            &ClassSource::Directory(birds),
            &ClassSource::Directory(others),
            5,
            4,
            0.2,
            3,
        )
        .unwrap();

        assert_eq!(train.len() + validation.len(), 10);
        assert_eq!(validation.len(), 2);
        let positives = train
            .iter()
            .chain(validation.iter())
            .filter(|i| i.label == POSITIVE_LABEL)
            .count();
        assert_eq!(positives, 5);
    }
}
