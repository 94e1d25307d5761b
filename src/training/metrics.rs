//! Training metrics for monitoring GAN progress
//!
//! Provides structures for tracking and logging per-step losses.

use std::path::Path;

use crate::error::{Error, Result};

/// Losses collected during training
#[derive(Debug, Clone, Default)]
pub struct TrainingMetrics {
    /// Step index (1-based) of each record
    pub steps: Vec<usize>,
    /// Discriminator loss per step
    pub disc_losses: Vec<f64>,
    /// Adversarial (generator) loss per step
    pub gan_losses: Vec<f64>,
}

impl TrainingMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one step
    pub fn record_step(&mut self, step: usize, disc_loss: f64, gan_loss: f64) {
        self.steps.push(step);
        self.disc_losses.push(disc_loss);
        self.gan_losses.push(gan_loss);
    }

    /// Drop every record after `step`
    pub fn truncate_after(&mut self, step: usize) {
        let keep = self.steps.iter().take_while(|&&s| s <= step).count();
        self.steps.truncate(keep);
        self.disc_losses.truncate(keep);
        self.gan_losses.truncate(keep);
    }

    /// Number of recorded steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Latest discriminator loss
    pub fn latest_disc_loss(&self) -> Option<f64> {
        self.disc_losses.last().copied()
    }

    /// Latest adversarial loss
    pub fn latest_gan_loss(&self) -> Option<f64> {
        self.gan_losses.last().copied()
    }

    /// Moving average of discriminator loss
    pub fn disc_loss_ma(&self, window: usize) -> f64 {
        moving_average(&self.disc_losses, window)
    }

    /// Moving average of adversarial loss
    pub fn gan_loss_ma(&self, window: usize) -> f64 {
        moving_average(&self.gan_losses, window)
    }

    /// Check if training appears to have collapsed
    ///
    /// Mode collapse indicators:
    /// - Discriminator loss very low (can easily distinguish)
    /// - Adversarial loss very high (generator can't fool discriminator)
    pub fn check_mode_collapse(&self, window: usize) -> bool {
        if self.len() < window {
            return false;
        }

        self.disc_loss_ma(window) < 0.1 && self.gan_loss_ma(window) > 5.0
    }

    /// Save metrics to CSV file
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record(["step", "disc_loss", "gan_loss"])?;

        for i in 0..self.len() {
            writer.write_record([
                self.steps[i].to_string(),
                self.disc_losses[i].to_string(),
                self.gan_losses[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load metrics from CSV file
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut metrics = Self::new();

        for result in reader.records() {
            let record = result?;
            let parse_err = |field: &str| Error::Dataset(format!("bad metrics field {:?}", field));

            let step = record[0].parse().map_err(|_| parse_err(&record[0]))?;
            let disc = record[1].parse().map_err(|_| parse_err(&record[1]))?;
            let gan = record[2].parse().map_err(|_| parse_err(&record[2]))?;
            metrics.record_step(step, disc, gan);
        }

        Ok(metrics)
    }

    /// History to continue from when resuming after `step`
    ///
    /// Rows past `step` (written after the checkpoint) are dropped; a missing
    /// file yields empty metrics.
    pub fn resume_from_csv<P: AsRef<Path>>(path: P, step: usize) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("No metrics at {}, starting a new history", path.display());
            return Ok(Self::new());
        }

        let mut metrics = Self::load_csv(path)?;
        metrics.truncate_after(step);
        Ok(metrics)
    }
}

/// Calculate moving average of last `window` values
fn moving_average(values: &[f64], window: usize) -> f64 {
    if values.is_empty() || window == 0 {
        return 0.0;
    }

    let n = window.min(values.len());
    let sum: f64 = values.iter().rev().take(n).sum();
    sum / n as f64
}
