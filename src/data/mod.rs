//! Data module for the real-image side of training
//!
//! This module provides:
//! - Single-class image dataset with CIFAR-10 loading
//! - Wrap-around cursor over contiguous batches
//! - Validated layout transforms between arrays and tensors

mod cursor;
mod dataset;
pub mod transforms;

pub use cursor::DatasetCursor;
pub use dataset::ImageDataset;
pub use transforms::{batch_to_tensor, nchw_to_nhwc, nhwc_to_nchw};
