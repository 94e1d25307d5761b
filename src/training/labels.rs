//! Target construction for discriminator and composite updates

use serde::{Deserialize, Serialize};
use tch::{Device, Kind, Tensor};

use crate::error::{Error, Result};

/// Largest jitter amplitude accepted
pub const MAX_LABEL_NOISE: f64 = 0.5;

/// Label values and jitter amplitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Target for real images
    pub real: f64,
    /// Target for generated images
    pub fake: f64,
    /// Uniform jitter in [0, noise) added to every discriminator label
    pub noise: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            real: 1.0,
            fake: 0.0,
            noise: 0.05,
        }
    }
}

impl LabelConfig {
    /// Validate label values
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=MAX_LABEL_NOISE).contains(&self.noise) {
            return Err(Error::Config(format!(
                "label noise must be in [0, {}], got {}",
                MAX_LABEL_NOISE, self.noise
            )));
        }
        if self.real == self.fake {
            return Err(Error::Config("real and fake labels must differ".to_string()));
        }
        Ok(())
    }
}

/// Labels for a combined [fake; real] batch, shape (2 * batch_size, 1)
pub fn discriminator_labels(batch_size: i64, config: &LabelConfig, device: Device) -> Tensor {
    let opts = (Kind::Float, device);
    let fake = Tensor::full([batch_size, 1], config.fake, opts);
    let real = Tensor::full([batch_size, 1], config.real, opts);
    let labels = Tensor::cat(&[fake, real], 0);

    let jitter = Tensor::rand([2 * batch_size, 1], opts) * config.noise;
    labels + jitter
}

/// All-real targets for the composite update, shape (batch_size, 1)
pub fn adversarial_targets(batch_size: i64, config: &LabelConfig, device: Device) -> Tensor {
    Tensor::full([batch_size, 1], config.real, (Kind::Float, device))
}
