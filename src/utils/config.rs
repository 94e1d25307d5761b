//! Configuration management
//!
//! Provides unified configuration for the entire DCGAN pipeline. Files are
//! TOML or JSON, picked by extension; missing fields take their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{DiscriminatorConfig, GeneratorConfig};
use crate::training::{LabelConfig, RmsPropConfig, TrainingConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data configuration
    pub data: DataConfig,
    /// Model configuration
    pub model: ModelConfig,
    /// Training configuration
    pub training: TrainingConfigFile,
}

/// Data-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding the CIFAR-10 binary batches
    pub data_dir: String,
    /// Class index kept for training (6 is "frog")
    pub class_label: i64,
    /// Shuffle the filtered images once with this seed
    pub shuffle_seed: Option<u64>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: "data/cifar-10-batches-bin".to_string(),
            class_label: 6,
            shuffle_seed: None,
        }
    }
}

/// Model-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Latent dimension size
    pub latent_dim: i64,
    /// Image height
    pub height: i64,
    /// Image width
    pub width: i64,
    /// Image channels
    pub channels: i64,
    /// Channels of the generator's dense projection
    pub gen_dense_filters: i64,
    /// Channels of the generator's convolutions
    pub gen_filters: i64,
    /// Channels of the discriminator's convolutions
    pub disc_filters: i64,
    /// Dropout rate for discriminator
    pub dropout: f64,
    /// Negative slope of every leaky ReLU
    pub leaky_slope: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            latent_dim: 32,
            height: 32,
            width: 32,
            channels: 3,
            gen_dense_filters: 128,
            gen_filters: 256,
            disc_filters: 128,
            dropout: 0.4,
            leaky_slope: 0.3,
        }
    }
}

/// Training-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfigFile {
    /// Number of training steps
    pub iterations: usize,
    /// Real images per step
    pub batch_size: usize,
    /// Checkpoint and sample frequency in steps
    pub checkpoint_every: usize,
    /// Directory for sample images and metrics
    pub output_dir: String,
    /// Checkpoint file, overwritten at every interval
    pub checkpoint_path: String,
    /// Device: "cpu" or "cuda"
    pub device: String,
    /// Seed for libtorch's generator
    pub seed: Option<i64>,
    /// Show a progress bar
    pub show_progress: bool,
    /// Discriminator optimizer
    pub disc: RmsPropConfig,
    /// Composite (generator) optimizer
    pub gan: RmsPropConfig,
    /// Label values and jitter
    pub labels: LabelConfig,
}

impl Default for TrainingConfigFile {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            batch_size: 20,
            disc: RmsPropConfig::with_lr(8e-4),
            gan: RmsPropConfig::with_lr(4e-4),
            labels: LabelConfig::default(),
            checkpoint_every: 100,
            output_dir: "gan_images".to_string(),
            checkpoint_path: "gan_images/gan.pt".to_string(),
            device: "cpu".to_string(),
            seed: None,
            show_progress: true,
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `.toml` or `.json` depending on the extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if is_toml(path) {
            Self::from_toml(path)
        } else {
            Self::from_json(path)
        }
    }

    /// Save as `.toml` or `.json` depending on the extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if is_toml(path) {
            self.save_toml(path)
        } else {
            self.save_json(path)
        }
    }

    /// Get device from configuration
    pub fn get_device(&self) -> tch::Device {
        match self.training.device.to_lowercase().as_str() {
            "cuda" | "gpu" => {
                if tch::Cuda::is_available() {
                    tch::Device::Cuda(0)
                } else {
                    tracing::warn!("CUDA requested but not available, falling back to CPU");
                    tch::Device::Cpu
                }
            }
            _ => tch::Device::Cpu,
        }
    }

    /// Generator hyperparameters
    pub fn generator_config(&self) -> GeneratorConfig {
        let m = &self.model;
        GeneratorConfig {
            latent_dim: m.latent_dim,
            height: m.height,
            width: m.width,
            channels: m.channels,
            dense_filters: m.gen_dense_filters,
            conv_filters: m.gen_filters,
            leaky_slope: m.leaky_slope,
        }
    }

    /// Discriminator hyperparameters
    pub fn discriminator_config(&self) -> DiscriminatorConfig {
        let m = &self.model;
        DiscriminatorConfig {
            height: m.height,
            width: m.width,
            channels: m.channels,
            filters: m.disc_filters,
            dropout: m.dropout,
            leaky_slope: m.leaky_slope,
        }
    }

    /// Trainer settings
    pub fn to_training_config(&self) -> TrainingConfig {
        let t = &self.training;
        TrainingConfig {
            iterations: t.iterations,
            batch_size: t.batch_size,
            disc_optim: t.disc,
            gan_optim: t.gan,
            labels: t.labels,
            checkpoint_every: t.checkpoint_every,
            show_progress: t.show_progress,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.training.batch_size == 0 {
            return Err(Error::Config("batch size must be > 0".to_string()));
        }
        if self.training.iterations == 0 {
            return Err(Error::Config("number of iterations must be > 0".to_string()));
        }
        if self.training.checkpoint_every == 0 {
            return Err(Error::Config("checkpoint_every must be > 0".to_string()));
        }
        if !(0..10).contains(&self.data.class_label) {
            return Err(Error::Config(format!(
                "class label must be in 0..10, got {}",
                self.data.class_label
            )));
        }
        self.generator_config().validate()?;
        self.discriminator_config().validate()?;
        self.training.disc.validate()?;
        self.training.gan.validate()?;
        self.training.labels.validate()?;
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.data.class_label, 6);
        assert_eq!(config.model.latent_dim, 32);
        assert_eq!(config.training.batch_size, 20);
        assert_eq!(config.training.disc.lr, 8e-4);
        assert_eq!(config.training.gan.lr, 4e-4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let loaded: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.data.data_dir, loaded.data.data_dir);
        assert_eq!(config.training.gan, loaded.training.gan);
    }

    #[test]
    fn test_config_toml_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.training.iterations = 300;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.training.iterations, 300);
        assert_eq!(loaded.training.labels, config.training.labels);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"training": {{"batch_size": 8}}}}"#).unwrap();

        let config = Config::from_json(file.path()).unwrap();
        assert_eq!(config.training.batch_size, 8);
        assert_eq!(config.training.checkpoint_every, 100);
        assert_eq!(config.model.height, 32);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.training.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.height = 30;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.labels.noise = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_configs_agree() {
        let config = Config::default();
        assert_eq!(
            config.generator_config().image_shape(),
            config.discriminator_config().image_shape()
        );
    }
}
