//! Checkpoint save/load utilities
//!
//! A checkpoint is one parameter file holding both networks plus a JSON
//! sidecar (same path with `.json` appended) with the training state needed to
//! resume. Each save overwrites the previous checkpoint at the same path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::DCGAN;

/// Checkpoint metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Completed training steps
    pub step: usize,
    /// Dataset cursor offset for the next step
    pub cursor_offset: usize,
    /// Discriminator loss at checkpoint
    pub disc_loss: f64,
    /// Adversarial loss at checkpoint
    pub gan_loss: f64,
    /// Timestamp of checkpoint
    pub timestamp: String,
    /// Latent dimension of the saved generator
    pub latent_dim: i64,
    /// Image shape as (height, width, channels)
    pub image_shape: [i64; 3],
}

impl CheckpointMeta {
    /// Metadata for `model` after `step` completed steps, stamped now
    pub fn new(model: &DCGAN, step: usize, cursor_offset: usize, disc_loss: f64, gan_loss: f64) -> Self {
        Self {
            step,
            cursor_offset,
            disc_loss,
            gan_loss,
            timestamp: chrono::Utc::now().to_rfc3339(),
            latent_dim: model.latent_dim(),
            image_shape: model.image_shape(),
        }
    }
}

/// Path of the metadata sidecar for a checkpoint file (`gan.pt` -> `gan.pt.json`)
pub fn meta_path<P: AsRef<Path>>(checkpoint: P) -> PathBuf {
    let mut name = checkpoint.as_ref().as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

/// Save model weights and metadata, overwriting any previous checkpoint
pub fn save_checkpoint<P: AsRef<Path>>(model: &DCGAN, meta: &CheckpointMeta, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    model.save(path)?;

    let meta_json = serde_json::to_string_pretty(meta)?;
    std::fs::write(meta_path(path), meta_json)?;

    tracing::debug!("Saved checkpoint to {}", path.display());
    Ok(())
}

/// Load checkpoint metadata
pub fn load_checkpoint_meta<P: AsRef<Path>>(path: P) -> Result<CheckpointMeta> {
    let content = std::fs::read_to_string(meta_path(path))?;
    let meta: CheckpointMeta = serde_json::from_str(&content)?;
    Ok(meta)
}

/// Load a complete checkpoint into `model`
///
/// Fails if the saved architecture dimensions differ from the model's.
pub fn load_checkpoint<P: AsRef<Path>>(model: &mut DCGAN, path: P) -> Result<CheckpointMeta> {
    let path = path.as_ref();
    let meta = load_checkpoint_meta(path)?;

    if meta.latent_dim != model.latent_dim() || meta.image_shape != model.image_shape() {
        return Err(Error::Config(format!(
            "checkpoint built for latent_dim={} image={:?}, model has latent_dim={} image={:?}",
            meta.latent_dim,
            meta.image_shape,
            model.latent_dim(),
            model.image_shape()
        )));
    }

    model.load(path)?;

    tracing::info!("Loaded checkpoint from {} (step {})", path.display(), meta.step);
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::tiny_dcgan;
    use tempfile::tempdir;

    #[test]
    fn test_checkpoint_meta_serialization() {
        let meta = CheckpointMeta {
            step: 100,
            cursor_offset: 40,
            disc_loss: 0.5,
            gan_loss: 0.6,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            latent_dim: 32,
            image_shape: [32, 32, 3],
        };

        let json = serde_json::to_string(&meta).unwrap();
        let loaded: CheckpointMeta = serde_json::from_str(&json).unwrap();

        assert_eq!(meta, loaded);
    }

    #[test]
    fn test_save_and_load_checkpoint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ckpt").join("gan.pt");

        let model = tiny_dcgan();
        let meta = CheckpointMeta::new(&model, 200, 20, 0.7, 0.8);
        save_checkpoint(&model, &meta, &path).unwrap();

        assert!(path.exists());
        assert!(meta_path(&path).exists());

        let mut restored = tiny_dcgan();
        let loaded = load_checkpoint(&mut restored, &path).unwrap();
        assert_eq!(loaded.step, 200);
        assert_eq!(loaded.cursor_offset, 20);
    }

    #[test]
    fn test_sidecar_never_replaces_parameter_file() {
        assert_eq!(meta_path("out/gan.pt"), PathBuf::from("out/gan.pt.json"));

        let dir = tempdir().unwrap();
        let path = dir.path().join("gan.json");

        let model = tiny_dcgan();
        let meta = CheckpointMeta::new(&model, 3, 0, 0.7, 0.8);
        save_checkpoint(&model, &meta, &path).unwrap();

        assert_ne!(meta_path(&path), path);
        let mut restored = tiny_dcgan();
        assert_eq!(load_checkpoint(&mut restored, &path).unwrap().step, 3);
    }

    #[test]
    fn test_load_rejects_architecture_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gan.pt");

        let model = tiny_dcgan();
        let mut meta = CheckpointMeta::new(&model, 1, 0, 0.7, 0.8);
        meta.latent_dim = 99;
        save_checkpoint(&model, &meta, &path).unwrap();

        let mut restored = tiny_dcgan();
        assert!(matches!(
            load_checkpoint(&mut restored, &path),
            Err(Error::Config(_))
        ));
    }
}
