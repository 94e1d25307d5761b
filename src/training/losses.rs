//! Loss functions for GAN training
//!
//! Binary cross-entropy between discriminator scores and (possibly noisy)
//! labels. Scores arrive as logits; `binary_cross_entropy_with_logits` equals
//! BCE applied to the sigmoid score.

use tch::{Reduction, Tensor};

/// Binary cross-entropy on logits against arbitrary targets in [0, 1]
pub fn bce_with_logits(logits: &Tensor, targets: &Tensor) -> Tensor {
    logits.binary_cross_entropy_with_logits::<Tensor>(targets, None, None, Reduction::Mean)
}

/// Discriminator loss over a combined [fake; real] batch
///
/// # Arguments
///
/// * `logits` - Discriminator output on the combined batch, shape (2 * batch, 1)
/// * `labels` - Jittered labels of the same shape
pub fn discriminator_loss(logits: &Tensor, labels: &Tensor) -> Tensor {
    bce_with_logits(logits, labels)
}

/// Composite loss: the generator wants fakes scored as `targets` (the real label)
///
/// # Arguments
///
/// * `fake_logits` - Discriminator output on generated images (logits)
/// * `targets` - Misleading targets, normally all real labels
pub fn adversarial_loss(fake_logits: &Tensor, targets: &Tensor) -> Tensor {
    bce_with_logits(fake_logits, targets)
}
