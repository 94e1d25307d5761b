//! Adversarial composite: Discriminator(Generator(z))
//!
//! The composite shares the discriminator parameters with the discriminator's
//! own training path. They are frozen only while a composite step runs, and
//! the composite optimizer is bound to the generator store, so a composite
//! update moves generator parameters only.

use tch::nn::VarStore;
use tch::Tensor;

use super::dcgan::DCGAN;
use crate::data::transforms::expect_shape;
use crate::error::Result;
use crate::training::losses::adversarial_loss;
use crate::training::optim::{ParamOptimizer, RmsPropConfig};

/// Scope guard that marks a parameter group non-trainable until dropped
pub struct FrozenParams<'a> {
    vs: &'a mut VarStore,
}

impl<'a> FrozenParams<'a> {
    /// Freeze every variable of `vs` for the lifetime of the guard
    pub fn new(vs: &'a mut VarStore) -> Self {
        vs.freeze();
        Self { vs }
    }
}

impl Drop for FrozenParams<'_> {
    fn drop(&mut self) {
        self.vs.unfreeze();
    }
}

/// Generator-then-discriminator graph with its own optimizer
pub struct Adversarial {
    optimizer: ParamOptimizer,
}

impl Adversarial {
    /// Compile the composite for `model`; the optimizer covers generator parameters
    pub fn new(model: &DCGAN, config: RmsPropConfig) -> Result<Self> {
        let optimizer = ParamOptimizer::rmsprop(&model.gen_vs, config)?;
        Ok(Self { optimizer })
    }

    /// One composite update towards `targets`; returns the scalar loss
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (batch_size, latent_dim)
    /// * `targets` - Tensor of shape (batch_size, 1), normally all real labels
    pub fn train_step(&mut self, model: &mut DCGAN, noise: &Tensor, targets: &Tensor) -> Result<f64> {
        let batch_size = noise.size().first().copied().unwrap_or(0);
        expect_shape(noise, &[batch_size, model.latent_dim()], "adversarial input")?;
        expect_shape(targets, &[batch_size, 1], "adversarial targets")?;

        let DCGAN {
            generator,
            discriminator,
            disc_vs,
            ..
        } = model;

        let _frozen = FrozenParams::new(disc_vs);

        let images = generator.forward_t(noise, true);
        let logits = discriminator.forward_t(&images, true);
        let loss = adversarial_loss(&logits, targets);

        self.optimizer.update(&loss);
        Ok(loss.double_value(&[]))
    }

    /// Optimizer state (update count, current learning rate)
    pub fn optimizer(&self) -> &ParamOptimizer {
        &self.optimizer
    }

    /// Mutable optimizer access, used when resuming
    pub fn optimizer_mut(&mut self) -> &mut ParamOptimizer {
        &mut self.optimizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{snapshot, tiny_dcgan};
    use tch::{Device, Kind};

    #[test]
    fn test_freeze_guard_restores_trainability() {
        let mut model = tiny_dcgan();

        {
            let _frozen = FrozenParams::new(&mut model.disc_vs);
        }

        assert!(model
            .disc_vs
            .trainable_variables()
            .iter()
            .all(|v| v.requires_grad()));
    }

    #[test]
    fn test_parameters_frozen_inside_guard() {
        let mut model = tiny_dcgan();
        let frozen = FrozenParams::new(&mut model.disc_vs);
        let all_frozen = frozen
            .vs
            .variables()
            .values()
            .all(|v| !v.requires_grad());
        drop(frozen);

        assert!(all_frozen);
    }

    #[test]
    fn test_train_step_updates_only_generator() {
        let mut model = tiny_dcgan();
        let mut adversarial = Adversarial::new(&model, RmsPropConfig::with_lr(4e-4)).unwrap();

        let gen_before = snapshot(&model.gen_vs);
        let disc_before = snapshot(&model.disc_vs);

        let noise = model.sample_latent(4);
        let targets = Tensor::ones([4, 1], (Kind::Float, Device::Cpu));
        let loss = adversarial.train_step(&mut model, &noise, &targets).unwrap();

        assert!(loss.is_finite());
        assert_eq!(adversarial.optimizer().updates(), 1);
        assert!(gen_before
            .iter()
            .any(|(name, t)| !t.equal(&model.gen_vs.variables()[name])));
        assert!(disc_before
            .iter()
            .all(|(name, t)| t.equal(&model.disc_vs.variables()[name])));
    }

    #[test]
    fn test_train_step_rejects_mismatched_targets() {
        let mut model = tiny_dcgan();
        let mut adversarial = Adversarial::new(&model, RmsPropConfig::with_lr(4e-4)).unwrap();

        let noise = model.sample_latent(4);
        let targets = Tensor::ones([3, 1], (Kind::Float, Device::Cpu));
        assert!(adversarial.train_step(&mut model, &noise, &targets).is_err());
    }
}
