//! Class-Folder Dataset Loader
//!
//! Loads a dataset laid out as one directory per class:
//!
//! ```text
//! root_dir/
//! ├── banana/
//! │   ├── image1.jpg
//! │   └── image2.jpg
//! ├── rice/
//! │   └── ...
//! └── ...
//! ```
//!
//! Class indices follow the sorted directory names, and the per-class split
//! takes a fixed number of training and validation images from each class.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::burn_dataset::ImageItem;
use super::preprocess::{is_image_file, load_image};
use crate::utils::error::{ClassifierError, Result};
use crate::utils::format_bar;

/// A single image file with its label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index
    pub label: usize,
    /// Class (directory) name
    pub class_name: String,
}

/// Image files discovered under a class-folder root
#[derive(Debug, Clone)]
pub struct ImageFolder {
    pub root_dir: PathBuf,
    pub samples: Vec<ImageSample>,
    /// Index = label
    pub class_names: Vec<String>,
}

impl ImageFolder {
    /// Discover class directories and their image files
    pub fn scan<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        info!("Scanning image folder: {:?}", root_dir);

        if !root_dir.is_dir() {
            return Err(ClassifierError::PathNotFound(root_dir));
        }

        let mut class_names: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&root_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    class_names.push(name.to_string());
                }
            }
        }
        class_names.sort();

        info!("Found {} classes", class_names.len());

        let mut samples = Vec::new();
        for (label, class_name) in class_names.iter().enumerate() {
            let class_dir = root_dir.join(class_name);

            let mut files: Vec<PathBuf> = WalkDir::new(&class_dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_image_file(p))
                .collect();
            files.sort();

            debug!("Class '{}' (label {}): {} files", class_name, label, files.len());

            samples.extend(files.into_iter().map(|path| ImageSample {
                path,
                label,
                class_name: class_name.clone(),
            }));
        }

        info!("Found {} image files", samples.len());

        Ok(Self {
            root_dir,
            samples,
            class_names,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Samples belonging to one class, in file-name order
    pub fn samples_for_class(&self, label: usize) -> Vec<&ImageSample> {
        self.samples.iter().filter(|s| s.label == label).collect()
    }

    /// Per-class counts
    pub fn stats(&self) -> DatasetStats {
        let mut class_counts = vec![0usize; self.num_classes()];
        for sample in &self.samples {
            class_counts[sample.label] += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            num_classes: self.num_classes(),
            class_counts,
            class_names: self.class_names.clone(),
        }
    }

    /// Decode every class and split it into training and validation items.
    ///
    /// Per class the decoded images are shuffled, the first
    /// `min(train_per_class, n)` go to training and the next
    /// `min(validation_per_class, n - n_train)` to validation. A class with no
    /// usable images is skipped with a warning but keeps its label.
    pub fn split_per_class(
        &self,
        train_per_class: usize,
        validation_per_class: usize,
        image_size: usize,
        seed: u64,
    ) -> (Vec<ImageItem>, Vec<ImageItem>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut train = Vec::new();
        let mut validation = Vec::new();

        for (label, class_name) in self.class_names.iter().enumerate() {
            let samples = self.samples_for_class(label);
            let mut items = load_samples(&samples, image_size);

            info!("Class '{}': {} images", class_name, items.len());
            if items.is_empty() {
                warn!("No images found for class '{}'", class_name);
                continue;
            }

            items.shuffle(&mut rng);

            let (n_train, n_val) = split_sizes(items.len(), train_per_class, validation_per_class);
            let mut rest = items.split_off(n_train);
            rest.truncate(n_val);

            debug!("  -> train: {}, validation: {}", n_train, n_val);

            train.extend(items);
            validation.extend(rest);
        }

        info!(
            "Training images: {}, validation images: {}",
            train.len(),
            validation.len()
        );

        (train, validation)
    }
}

/// `(n_train, n_val)` for a class with `total` images
pub fn split_sizes(total: usize, train_per_class: usize, validation_per_class: usize) -> (usize, usize) {
    let n_train = train_per_class.min(total);
    let n_val = validation_per_class.min(total - n_train);
    (n_train, n_val)
}

/// Decode samples in parallel, keeping input order and skipping failures
pub fn load_samples(samples: &[&ImageSample], image_size: usize) -> Vec<ImageItem> {
    samples
        .par_iter()
        .filter_map(|sample| match load_image(&sample.path, image_size) {
            Ok(image) => Some(ImageItem::new(
                image,
                sample.label,
                sample.path.to_string_lossy(),
            )),
            Err(e) => {
                warn!("Skipping image: {}", e);
                None
            }
        })
        .collect()
}

/// Statistics about a class-folder dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub class_counts: Vec<usize>,
    pub class_names: Vec<String>,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\n📊 Dataset Statistics:");
        println!("  Total samples: {}", self.total_samples);
        println!("  Number of classes: {}", self.num_classes);
        println!("\n  Samples per class:");

        let max = self.class_counts.iter().copied().max().unwrap_or(0);
        for (idx, (name, count)) in self
            .class_names
            .iter()
            .zip(self.class_counts.iter())
            .enumerate()
        {
            println!(
                "    {:3}. {:30} {:5} {}",
                idx,
                name,
                count,
                format_bar(*count, max, 40)
            );
        }
    }

    /// Classes with no image files
    pub fn empty_classes(&self) -> Vec<&str> {
        self.class_names
            .iter()
            .zip(self.class_counts.iter())
            .filter(|&(_, &count)| count == 0)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
