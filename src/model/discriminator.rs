//! Discriminator network for DCGAN
//!
//! The Discriminator scores images as real or fake.
//! Four stride-2 convolutions downsample by 16 before a dense classifier.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

use super::leaky_relu;
use crate::data::transforms::{expect_image_batch, expect_shape, nhwc_to_nchw};
use crate::error::{Error, Result};

/// Number of stride-2 stages; image sides must be divisible by 2^4
const DOWNSAMPLE_STAGES: u32 = 4;

/// Discriminator network configuration
#[derive(Debug, Clone)]
pub struct DiscriminatorConfig {
    /// Input image height
    pub height: i64,
    /// Input image width
    pub width: i64,
    /// Input channels
    pub channels: i64,
    /// Channels of every convolution
    pub filters: i64,
    /// Dropout rate before the dense layer
    pub dropout: f64,
    /// Negative slope of the leaky activations
    pub leaky_slope: f64,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            height: 32,
            width: 32,
            channels: 3,
            filters: 128,
            dropout: 0.4,
            leaky_slope: 0.3,
        }
    }
}

impl DiscriminatorConfig {
    /// Check the architecture can be built for these dimensions
    pub fn validate(&self) -> Result<()> {
        let factor = 2i64.pow(DOWNSAMPLE_STAGES);
        if self.height <= 0 || self.width <= 0 || self.height % factor != 0 || self.width % factor != 0
        {
            return Err(Error::Config(format!(
                "discriminator needs image sides divisible by {}, got {}x{}",
                factor, self.height, self.width
            )));
        }
        if self.channels <= 0 || self.filters <= 0 {
            return Err(Error::Config(
                "discriminator channels and filters must be > 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(Error::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !(0.0..1.0).contains(&self.leaky_slope) {
            return Err(Error::Config(format!(
                "leaky slope must be in [0, 1), got {}",
                self.leaky_slope
            )));
        }
        Ok(())
    }

    /// Input shape of a single image as (height, width, channels)
    pub fn image_shape(&self) -> [i64; 3] {
        [self.height, self.width, self.channels]
    }

    fn flat_size(&self) -> i64 {
        let factor = 2i64.pow(DOWNSAMPLE_STAGES);
        self.filters * (self.height / factor) * (self.width / factor)
    }
}

/// Discriminator network
///
/// Architecture:
/// 1. Four 4x4 stride-2 Conv2d layers with LeakyReLU
/// 2. Flatten, Dropout and Dense layer for final classification
#[derive(Debug)]
pub struct Discriminator {
    config: DiscriminatorConfig,
    convs: Vec<nn::Conv2D>,
    fc: nn::Linear,
}

impl Discriminator {
    /// Create a new Discriminator network
    pub fn new(vs: &nn::Path, config: DiscriminatorConfig) -> Result<Self> {
        config.validate()?;

        let conv_config = nn::ConvConfig {
            stride: 2,
            padding: 1,
            ..Default::default()
        };

        let mut convs = Vec::with_capacity(DOWNSAMPLE_STAGES as usize);
        let mut in_channels = config.channels;
        for i in 0..DOWNSAMPLE_STAGES {
            let name = format!("conv{}", i + 1);
            convs.push(nn::conv2d(vs / name.as_str(), in_channels, config.filters, 4, conv_config));
            in_channels = config.filters;
        }

        let fc = nn::linear(vs / "fc", config.flat_size(), 1, Default::default());

        Ok(Self { config, convs, fc })
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `input` - Tensor of shape (batch_size, height, width, channels)
    /// * `train` - Whether in training mode (affects dropout)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, 1) with logits (not sigmoid)
    pub fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        self.head(&input.permute([0, 3, 1, 2]), train)
    }

    fn head(&self, input_nchw: &Tensor, train: bool) -> Tensor {
        let mut x = input_nchw.shallow_clone();
        for conv in &self.convs {
            x = leaky_relu(&conv.forward(&x), self.config.leaky_slope);
        }

        let x = x.flatten(1, -1);
        let x = x.dropout(self.config.dropout, train);

        self.fc.forward(&x)
    }

    /// Score images (inference mode)
    ///
    /// Returns probability of being real (after sigmoid), shape (batch_size, 1)
    pub fn classify(&self, input: &Tensor) -> Result<Tensor> {
        let batch_size = expect_image_batch(input, self.config.image_shape(), "discriminator input")?;
        let x = nhwc_to_nchw(input)?;

        let scores = self.head(&x, false).sigmoid();
        expect_shape(&scores, &[batch_size, 1], "discriminator output")?;
        Ok(scores)
    }

    /// Get configuration
    pub fn config(&self) -> &DiscriminatorConfig {
        &self.config
    }
}

impl ModuleT for Discriminator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Discriminator::forward_t(self, xs, train)
    }
}
