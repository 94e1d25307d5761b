//! DCGAN wrapper combining Generator and Discriminator
//!
//! Owns both parameter stores and provides generation, scoring and
//! single-file persistence of all parameters.

use std::collections::HashMap;
use std::path::Path;

use tch::{nn::VarStore, Device, Kind, Tensor};

use super::discriminator::{Discriminator, DiscriminatorConfig};
use super::generator::{Generator, GeneratorConfig};
use crate::error::{Error, Result};

const GENERATOR_PREFIX: &str = "generator.";
const DISCRIMINATOR_PREFIX: &str = "discriminator.";

/// Complete DCGAN model
pub struct DCGAN {
    /// Generator network
    pub generator: Generator,
    /// Discriminator network
    pub discriminator: Discriminator,
    /// Variable store for generator
    pub gen_vs: VarStore,
    /// Variable store for discriminator
    pub disc_vs: VarStore,
    /// Device (CPU/GPU)
    pub device: Device,
}

impl DCGAN {
    /// Create a new DCGAN model
    ///
    /// Fails if the generator output shape differs from the discriminator input shape.
    pub fn new(
        gen_config: GeneratorConfig,
        disc_config: DiscriminatorConfig,
        device: Device,
    ) -> Result<Self> {
        if gen_config.image_shape() != disc_config.image_shape() {
            return Err(Error::shape(
                "generator/discriminator image shape",
                &gen_config.image_shape(),
                &disc_config.image_shape(),
            ));
        }

        let gen_vs = VarStore::new(device);
        let disc_vs = VarStore::new(device);

        let generator = Generator::new(&gen_vs.root(), gen_config)?;
        let discriminator = Discriminator::new(&disc_vs.root(), disc_config)?;

        Ok(Self {
            generator,
            discriminator,
            gen_vs,
            disc_vs,
            device,
        })
    }

    /// Sample a batch of standard-normal latent vectors
    ///
    /// # Returns
    ///
    /// Tensor of shape (num_samples, latent_dim)
    pub fn sample_latent(&self, num_samples: i64) -> Tensor {
        Tensor::randn([num_samples, self.latent_dim()], (Kind::Float, self.device))
    }

    /// Generate synthetic images
    ///
    /// # Returns
    ///
    /// Tensor of shape (num_samples, height, width, channels)
    pub fn generate(&self, num_samples: i64) -> Result<Tensor> {
        self.generator.generate(&self.sample_latent(num_samples))
    }

    /// Generate images from specific latent vectors
    pub fn generate_from_noise(&self, noise: &Tensor) -> Result<Tensor> {
        self.generator.generate(noise)
    }

    /// Discriminate images (probability of being real)
    pub fn discriminate(&self, images: &Tensor) -> Result<Tensor> {
        self.discriminator.classify(images)
    }

    /// Save every parameter of both networks into one file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut named: Vec<(String, Tensor)> = Vec::new();
        for (name, tensor) in self.gen_vs.variables() {
            named.push((format!("{}{}", GENERATOR_PREFIX, name), tensor));
        }
        for (name, tensor) in self.disc_vs.variables() {
            named.push((format!("{}{}", DISCRIMINATOR_PREFIX, name), tensor));
        }
        named.sort_by(|a, b| a.0.cmp(&b.0));

        Tensor::save_multi(named.as_slice(), path)?;
        Ok(())
    }

    /// Load parameters of both networks from a file written by [`DCGAN::save`]
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let loaded: HashMap<String, Tensor> = Tensor::load_multi(path)?.into_iter().collect();

        copy_into(&self.gen_vs, &loaded, GENERATOR_PREFIX)?;
        copy_into(&self.disc_vs, &loaded, DISCRIMINATOR_PREFIX)?;
        Ok(())
    }

    /// Get latent dimension
    pub fn latent_dim(&self) -> i64 {
        self.generator.config().latent_dim
    }

    /// Image shape as (height, width, channels)
    pub fn image_shape(&self) -> [i64; 3] {
        self.generator.config().image_shape()
    }

    /// Number of scalar parameters in each network as (generator, discriminator)
    pub fn num_parameters(&self) -> (i64, i64) {
        let count = |vs: &VarStore| -> i64 {
            vs.trainable_variables().iter().map(|t| t.numel() as i64).sum()
        };
        (count(&self.gen_vs), count(&self.disc_vs))
    }
}

fn copy_into(vs: &VarStore, loaded: &HashMap<String, Tensor>, prefix: &str) -> Result<()> {
    for (name, mut var) in vs.variables() {
        let key = format!("{}{}", prefix, name);
        let src = loaded
            .get(&key)
            .ok_or_else(|| Error::Config(format!("checkpoint is missing tensor {}", key)))?;

        if src.size() != var.size() {
            return Err(Error::shape("checkpoint tensor", &var.size(), &src.size()));
        }

        tch::no_grad(|| var.f_copy_(src))?;
    }
    Ok(())
}
