//! Generator network for DCGAN
//!
//! The Generator transforms latent noise vectors into synthetic images.
//! A dense projection seeds a half-resolution feature map, a single stride-2
//! transposed convolution doubles it to the target size, and a final
//! convolution with tanh produces the output channels.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

use super::leaky_relu;
use crate::data::transforms::{expect_image_batch, expect_shape};
use crate::error::{Error, Result};

/// Generator network configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Size of the latent noise vector
    pub latent_dim: i64,
    /// Output image height (must be even)
    pub height: i64,
    /// Output image width (must be even)
    pub width: i64,
    /// Output channels (3 for RGB)
    pub channels: i64,
    /// Channels of the projected seed feature map
    pub dense_filters: i64,
    /// Channels of the convolution stack
    pub conv_filters: i64,
    /// Negative slope of the leaky activations
    pub leaky_slope: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latent_dim: 32,
            height: 32,
            width: 32,
            channels: 3,
            dense_filters: 128,
            conv_filters: 256,
            leaky_slope: 0.3,
        }
    }
}

impl GeneratorConfig {
    /// Check the architecture can be built for these dimensions
    pub fn validate(&self) -> Result<()> {
        if self.latent_dim <= 0 || self.channels <= 0 {
            return Err(Error::Config(
                "latent_dim and channels must be > 0".to_string(),
            ));
        }
        if self.dense_filters <= 0 || self.conv_filters <= 0 {
            return Err(Error::Config("generator filters must be > 0".to_string()));
        }
        if self.height <= 0 || self.width <= 0 || self.height % 2 != 0 || self.width % 2 != 0 {
            return Err(Error::Config(format!(
                "generator needs positive even image size, got {}x{}",
                self.height, self.width
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

    /// Output shape of a single image as (height, width, channels)
    pub fn image_shape(&self) -> [i64; 3] {
        [self.height, self.width, self.channels]
    }
}

/// Generator network
///
/// Architecture:
/// 1. Dense projection to (dense_filters, H/2, W/2)
/// 2. 5x5 convolution
/// 3. 4x4 stride-2 transposed convolution up to (H, W)
/// 4. Two 5x5 convolutions
/// 5. 7x7 convolution to output channels with tanh
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    fc: nn::Linear,
    conv1: nn::Conv2D,
    upsample: nn::ConvTranspose2D,
    conv2: nn::Conv2D,
    conv3: nn::Conv2D,
    to_image: nn::Conv2D,
}

impl Generator {
    /// Create a new Generator network
    pub fn new(vs: &nn::Path, config: GeneratorConfig) -> Result<Self> {
        config.validate()?;

        let seed_h = config.height / 2;
        let seed_w = config.width / 2;
        let dense = config.dense_filters;
        let filters = config.conv_filters;

        let fc = nn::linear(
            vs / "fc",
            config.latent_dim,
            dense * seed_h * seed_w,
            Default::default(),
        );

        let same5 = nn::ConvConfig {
            padding: 2,
            ..Default::default()
        };
        let conv1 = nn::conv2d(vs / "conv1", dense, filters, 5, same5);

        // Kernel 4 with stride 2 gives every output pixel equal coverage
        let upsample_config = nn::ConvTransposeConfig {
            stride: 2,
            padding: 1,
            ..Default::default()
        };
        let upsample = nn::conv_transpose2d(vs / "upsample", filters, filters, 4, upsample_config);

        let conv2 = nn::conv2d(vs / "conv2", filters, filters, 5, same5);
        let conv3 = nn::conv2d(vs / "conv3", filters, filters, 5, same5);

        let to_image = nn::conv2d(
            vs / "to_image",
            filters,
            config.channels,
            7,
            nn::ConvConfig {
                padding: 3,
                ..Default::default()
            },
        );

        Ok(Self {
            config,
            fc,
            conv1,
            upsample,
            conv2,
            conv3,
            to_image,
        })
    }

    /// Map noise to images
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (batch_size, latent_dim)
    /// * `train` - Whether in training mode
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, height, width, channels) in [-1, 1]
    pub fn forward_t(&self, noise: &Tensor, _train: bool) -> Tensor {
        let batch_size = noise.size()[0];
        let slope = self.config.leaky_slope;

        let x = leaky_relu(&self.fc.forward(noise), slope);
        let x = x.view([
            batch_size,
            self.config.dense_filters,
            self.config.height / 2,
            self.config.width / 2,
        ]);

        let x = leaky_relu(&self.conv1.forward(&x), slope);
        let x = leaky_relu(&self.upsample.forward(&x), slope);
        let x = leaky_relu(&self.conv2.forward(&x), slope);
        let x = leaky_relu(&self.conv3.forward(&x), slope);
        let x = self.to_image.forward(&x).tanh();

        x.permute([0, 2, 3, 1])
    }

    /// Generate images from noise without tracking gradients
    ///
    /// Validates the noise and output shapes.
    pub fn generate(&self, noise: &Tensor) -> Result<Tensor> {
        let batch_size = noise.size().first().copied().unwrap_or(0);
        expect_shape(
            noise,
            &[batch_size, self.config.latent_dim],
            "generator input",
        )?;

        let images = tch::no_grad(|| self.forward_t(noise, false));
        expect_image_batch(&images, self.config.image_shape(), "generator output")?;
        Ok(images)
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Generator::forward_t(self, xs, train)
    }
}
