//! RMSProp optimizer with value clipping and inverse-time learning-rate decay
//!
//! Each network gets its own `ParamOptimizer` bound to one parameter store.
//! Before every update the learning rate is set to `lr / (1 + decay * t)`,
//! where `t` counts updates already applied.

use serde::{Deserialize, Serialize};
use tch::nn::{self, OptimizerConfig};
use tch::Tensor;

use crate::error::{Error, Result};

/// Hyperparameters of one RMSProp optimizer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RmsPropConfig {
    /// Base learning rate
    pub lr: f64,
    /// Every gradient component is clamped to [-clip_value, clip_value]
    pub clip_value: f64,
    /// Inverse-time decay factor applied per update
    pub decay: f64,
    /// Moving-average coefficient of squared gradients
    pub rho: f64,
    /// Numerical stability term
    pub eps: f64,
}

impl Default for RmsPropConfig {
    fn default() -> Self {
        Self {
            lr: 8e-4,
            clip_value: 1.0,
            decay: 1e-8,
            rho: 0.9,
            eps: 1e-7,
        }
    }
}

impl RmsPropConfig {
    /// Config with the given learning rate and the default clip/decay
    pub fn with_lr(lr: f64) -> Self {
        Self {
            lr,
            ..Default::default()
        }
    }

    /// Validate hyperparameters
    pub fn validate(&self) -> Result<()> {
        if !(self.lr > 0.0 && self.lr.is_finite()) {
            return Err(Error::Config(format!("learning rate must be > 0, got {}", self.lr)));
        }
        if !(self.clip_value > 0.0) {
            return Err(Error::Config(format!(
                "clip value must be > 0, got {}",
                self.clip_value
            )));
        }
        if self.decay < 0.0 {
            return Err(Error::Config(format!("decay must be >= 0, got {}", self.decay)));
        }
        if !(0.0..1.0).contains(&self.rho) || self.eps <= 0.0 {
            return Err(Error::Config("rho must be in [0, 1) and eps > 0".to_string()));
        }
        Ok(())
    }

    /// Learning rate for the update with index `updates`
    pub fn lr_at(&self, updates: u64) -> f64 {
        self.lr / (1.0 + self.decay * updates as f64)
    }
}

/// Optimizer bound to one parameter store
pub struct ParamOptimizer {
    inner: nn::Optimizer,
    config: RmsPropConfig,
    updates: u64,
}

impl ParamOptimizer {
    /// Build an RMSProp optimizer over every variable of `vs`
    pub fn rmsprop(vs: &nn::VarStore, config: RmsPropConfig) -> Result<Self> {
        config.validate()?;

        let inner = nn::RmsProp {
            alpha: config.rho,
            eps: config.eps,
            wd: 0.0,
            momentum: 0.0,
            centered: false,
        }
        .build(vs, config.lr)?;

        Ok(Self {
            inner,
            config,
            updates: 0,
        })
    }

    /// Back-propagate `loss`, clip gradients by value and apply one step
    pub fn update(&mut self, loss: &Tensor) {
        self.inner.set_lr(self.current_lr());
        self.inner.backward_step_clip(loss, self.config.clip_value);
        self.updates += 1;
    }

    /// Learning rate that the next update will use
    pub fn current_lr(&self) -> f64 {
        self.config.lr_at(self.updates)
    }

    /// Number of updates applied so far
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Restore the decay schedule position when resuming
    pub fn set_updates(&mut self, updates: u64) {
        self.updates = updates;
    }

    /// Hyperparameters
    pub fn config(&self) -> &RmsPropConfig {
        &self.config
    }
}
