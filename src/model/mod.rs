//! Model module containing GAN architecture components
//!
//! This module provides:
//! - Generator network for creating synthetic images
//! - Discriminator network for distinguishing real from fake
//! - DCGAN wrapper owning both networks and their parameter stores
//! - Adversarial composite that trains the generator through a frozen discriminator

mod adversarial;
mod dcgan;
mod discriminator;
mod generator;

pub use adversarial::{Adversarial, FrozenParams};
pub use dcgan::DCGAN;
pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use generator::{Generator, GeneratorConfig};

use tch::Tensor;

/// Leaky ReLU with a configurable negative slope (`0 <= slope < 1`)
pub(crate) fn leaky_relu(xs: &Tensor, slope: f64) -> Tensor {
    xs.maximum(&(xs * slope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn test_leaky_relu_slope() {
        let xs = Tensor::from_slice(&[-2.0f32, 0.0, 3.0]);
        let ys = leaky_relu(&xs, 0.3);

        assert!((ys.double_value(&[0]) + 0.6).abs() < 1e-6);
        assert_eq!(ys.double_value(&[1]), 0.0);
        assert!((ys.double_value(&[2]) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_leaky_relu_keeps_gradient_on_negatives() {
        let xs = Tensor::full([4], -1.0, (Kind::Float, Device::Cpu)).set_requires_grad(true);
        let ys = leaky_relu(&xs, 0.2).sum(Kind::Float);
        ys.backward();

        let grad = xs.grad();
        assert!((grad.double_value(&[0]) - 0.2).abs() < 1e-6);
    }
}
