//! Real-image dataset restricted to a single class
//!
//! Images are stored as (num_images, height, width, channels) with values
//! normalized to [0, 1]. The dataset is read-only once built.

use std::path::Path;

use ndarray::{s, Array4, ArrayView4, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tch::{Device, Kind};
use tracing::info;

use super::transforms::nchw_to_nhwc;
use crate::error::{Error, Result};

/// Filtered, normalized image dataset
#[derive(Debug, Clone)]
pub struct ImageDataset {
    images: Array4<f32>,
}

impl ImageDataset {
    /// Wrap an already filtered and normalized image array
    pub fn new(images: Array4<f32>) -> Result<Self> {
        let (n, h, w, c) = images.dim();
        if n == 0 {
            return Err(Error::Dataset("dataset contains no images".to_string()));
        }
        if h == 0 || w == 0 || c == 0 {
            return Err(Error::Dataset(format!(
                "invalid image shape ({}, {}, {})",
                h, w, c
            )));
        }
        if images.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(Error::Dataset(
                "pixel values must be normalized to [0, 1]".to_string(),
            ));
        }
        Ok(Self { images })
    }

    /// Keep only the images whose label equals `class_label`
    pub fn from_labeled(images: Array4<f32>, labels: &[i64], class_label: i64) -> Result<Self> {
        if images.shape()[0] != labels.len() {
            return Err(Error::Dataset(format!(
                "{} images but {} labels",
                images.shape()[0],
                labels.len()
            )));
        }

        let indices: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &label)| label == class_label)
            .map(|(i, _)| i)
            .collect();

        if indices.is_empty() {
            return Err(Error::Dataset(format!(
                "no images with class label {}",
                class_label
            )));
        }

        Self::new(images.select(Axis(0), &indices))
    }

    /// Load the CIFAR-10 training split from its binary batch directory
    ///
    /// The decoded images are already scaled to [0, 1] by the loader; they are
    /// moved to (n, h, w, c) layout and filtered to `class_label`.
    pub fn load_cifar10<P: AsRef<Path>>(dir: P, class_label: i64) -> Result<Self> {
        let dir = dir.as_ref();
        let cifar = tch::vision::cifar::load_dir(dir)?;

        let size = cifar.train_images.size();
        if size.len() != 4 {
            return Err(Error::shape("load_cifar10", &[-1, 3, 32, 32], &size));
        }
        let (n, c, h, w) = (
            size[0] as usize,
            size[1] as usize,
            size[2] as usize,
            size[3] as usize,
        );

        let images_nchw = cifar.train_images.to_device(Device::Cpu).to_kind(Kind::Float);
        let nhwc = nchw_to_nhwc(&images_nchw)?.contiguous().flatten(0, -1);
        let values = Vec::<f32>::try_from(&nhwc)?;
        let labels = Vec::<i64>::try_from(&cifar.train_labels.to_kind(Kind::Int64))?;

        let images = Array4::from_shape_vec((n, h, w, c), values)
            .map_err(|e| Error::Dataset(e.to_string()))?;
        let images = images.mapv(|v| v.clamp(0.0, 1.0));

        let dataset = Self::from_labeled(images, &labels, class_label)?;
        info!(
            "Loaded {} images of class {} from {}",
            dataset.len(),
            class_label,
            dir.display()
        );
        Ok(dataset)
    }

    /// Shuffle image order once with a fixed seed
    pub fn shuffle(&mut self, seed: u64) {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
        self.images = self.images.select(Axis(0), &indices);
    }

    /// Number of images
    pub fn len(&self) -> usize {
        self.images.shape()[0]
    }

    /// Whether the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-image shape as (height, width, channels)
    pub fn image_shape(&self) -> (usize, usize, usize) {
        let (_, h, w, c) = self.images.dim();
        (h, w, c)
    }

    /// Contiguous slice of `size` images starting at `start`
    pub fn batch(&self, start: usize, size: usize) -> Result<ArrayView4<'_, f32>> {
        let end = start + size;
        if end > self.len() {
            return Err(Error::Dataset(format!(
                "batch {}..{} out of range for {} images",
                start,
                end,
                self.len()
            )));
        }
        Ok(self.images.slice(s![start..end, .., .., ..]))
    }
}
