//! Utility module with helper functions
//!
//! This module provides:
//! - Configuration handling
//! - Checkpoint save/load utilities
//! - Sample image writing

mod checkpoint;
mod config;
mod images;

pub use checkpoint::{load_checkpoint, load_checkpoint_meta, meta_path, save_checkpoint, CheckpointMeta};
pub use config::{Config, DataConfig, ModelConfig, TrainingConfigFile};
pub use images::{save_image, save_sample_pair, tensor_to_rgb};
