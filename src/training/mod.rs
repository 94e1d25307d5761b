//! Training module for DCGAN
//!
//! This module provides:
//! - Training loop with explicit, resumable state
//! - Loss functions (Binary Cross Entropy on logits)
//! - RMSProp optimizers with clipping and learning-rate decay
//! - Label construction, metrics and checkpoint sinks

mod labels;
pub mod losses;
mod metrics;
pub mod optim;
mod sink;
mod trainer;

pub use labels::{adversarial_targets, discriminator_labels, LabelConfig, MAX_LABEL_NOISE};
pub use losses::{adversarial_loss, discriminator_loss};
pub use metrics::TrainingMetrics;
pub use optim::{ParamOptimizer, RmsPropConfig};
pub use sink::{CheckpointEvent, FileSink, TrainingSink};
pub use trainer::{StepOutcome, TrainState, Trainer, TrainingConfig};
