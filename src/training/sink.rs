//! Checkpoint-interval side effects
//!
//! The trainer hands every checkpoint interval to a `TrainingSink`. The
//! file-backed sink writes the checkpoint, one generated and one real image,
//! and the metrics CSV; tests substitute a recording sink.

use std::path::PathBuf;

use tch::Tensor;
use tracing::info;

use super::metrics::TrainingMetrics;
use crate::error::Result;
use crate::model::DCGAN;
use crate::utils::{save_checkpoint, save_sample_pair, CheckpointMeta};

/// State visible at a checkpoint interval
pub struct CheckpointEvent<'a> {
    /// Completed steps (1-based index of the step just run)
    pub step: usize,
    /// Dataset cursor offset for the next step
    pub cursor_offset: usize,
    /// Discriminator loss of this step
    pub disc_loss: f64,
    /// Adversarial loss of this step
    pub gan_loss: f64,
    /// Model after this step's updates
    pub model: &'a DCGAN,
    /// Generated batch of this step, NHWC
    pub generated: &'a Tensor,
    /// Real batch of this step, NHWC
    pub real: &'a Tensor,
    /// Losses recorded so far
    pub metrics: &'a TrainingMetrics,
}

/// Receiver of checkpoint-interval events
pub trait TrainingSink {
    /// Called after every `checkpoint_every`-th step
    fn on_checkpoint(&mut self, event: &CheckpointEvent<'_>) -> Result<()>;
}

/// Writes checkpoints, sample images and metrics to disk
#[derive(Debug, Clone)]
pub struct FileSink {
    output_dir: PathBuf,
    checkpoint_path: PathBuf,
}

impl FileSink {
    /// Images and `metrics.csv` go to `output_dir`; the checkpoint file is overwritten in place
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(output_dir: P, checkpoint_path: Q) -> Self {
        Self {
            output_dir: output_dir.into(),
            checkpoint_path: checkpoint_path.into(),
        }
    }

    /// Path of the metrics file
    pub fn metrics_path(&self) -> PathBuf {
        self.output_dir.join("metrics.csv")
    }
}

impl TrainingSink for FileSink {
    fn on_checkpoint(&mut self, event: &CheckpointEvent<'_>) -> Result<()> {
        let meta = CheckpointMeta::new(
            event.model,
            event.step,
            event.cursor_offset,
            event.disc_loss,
            event.gan_loss,
        );
        save_checkpoint(event.model, &meta, &self.checkpoint_path)?;

        let (generated, real) =
            save_sample_pair(&self.output_dir, event.step, event.generated, event.real)?;
        event.metrics.save_csv(self.metrics_path())?;

        info!(
            "Step {}: saved {} and {}",
            event.step,
            generated.display(),
            real.display()
        );
        Ok(())
    }
}
