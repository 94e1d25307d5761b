//! # DCGAN for Small Color Images
//!
//! This crate provides a modular implementation of a Deep Convolutional
//! Generative Adversarial Network (DCGAN) trained on one CIFAR-10 class.
//!
//! ## Modules
//!
//! - `data`: CIFAR-10 loading, wrap-around batch cursor and layout transforms
//! - `model`: DCGAN architecture (Generator, Discriminator, adversarial composite)
//! - `training`: Training loop, optimizers, labels and loss functions
//! - `utils`: Configuration, checkpoints and sample images

pub mod data;
pub mod error;
pub mod model;
pub mod training;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use data::{DatasetCursor, ImageDataset};
pub use error::{Error, Result};
pub use model::{Adversarial, Discriminator, Generator, DCGAN};
pub use training::{FileSink, TrainState, Trainer, TrainingConfig, TrainingMetrics, TrainingSink};
pub use utils::{load_checkpoint, save_checkpoint, CheckpointMeta, Config};
