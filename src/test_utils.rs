//! Shared fixtures for unit tests

use ndarray::{Array4, Axis};
use tch::{nn::VarStore, Device, Tensor};

use crate::data::ImageDataset;
use crate::model::{DiscriminatorConfig, GeneratorConfig, DCGAN};

pub fn tiny_generator_config() -> GeneratorConfig {
    GeneratorConfig {
        latent_dim: 8,
        height: 16,
        width: 16,
        channels: 3,
        dense_filters: 4,
        conv_filters: 6,
        leaky_slope: 0.3,
    }
}

pub fn tiny_discriminator_config() -> DiscriminatorConfig {
    DiscriminatorConfig {
        height: 16,
        width: 16,
        channels: 3,
        filters: 4,
        dropout: 0.4,
        leaky_slope: 0.3,
    }
}

pub fn tiny_dcgan() -> DCGAN {
    DCGAN::new(
        tiny_generator_config(),
        tiny_discriminator_config(),
        Device::Cpu,
    )
    .unwrap()
}

/// Dataset of `len` 16x16x3 images; image `i` is filled with `i / len`
pub fn tiny_dataset(len: usize) -> ImageDataset {
    let mut images = Array4::<f32>::zeros((len, 16, 16, 3));
    for i in 0..len {
        images
            .index_axis_mut(Axis(0), i)
            .fill(i as f32 / len as f32);
    }
    ImageDataset::new(images).unwrap()
}

/// Detached copies of every variable in a store
pub fn snapshot(vs: &VarStore) -> Vec<(String, Tensor)> {
    vs.variables()
        .into_iter()
        .map(|(name, t)| (name, t.detach().copy()))
        .collect()
}
