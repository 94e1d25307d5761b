//! Sample image writing
//!
//! Converts (height, width, channels) tensors with values in [0, 1] into
//! 8-bit RGB images. Values outside [0, 1] are clamped, so generator output
//! in [-1, 1] is written with its negative part as black.

use std::path::{Path, PathBuf};

use image::RgbImage;
use tch::{Device, Kind, Tensor};

use crate::error::{Error, Result};

/// Denormalize one image tensor (h, w, c) into an RGB buffer
///
/// Single-channel images are replicated across RGB.
pub fn tensor_to_rgb(image: &Tensor) -> Result<RgbImage> {
    let size = image.size();
    if size.len() != 3 || !(size[2] == 3 || size[2] == 1) {
        return Err(Error::shape("tensor_to_rgb", &[-1, -1, 3], &size));
    }
    let (height, width) = (size[0], size[1]);

    let rgb = if size[2] == 1 {
        image.expand([height, width, 3], false)
    } else {
        image.shallow_clone()
    };

    let pixels = (rgb.to_device(Device::Cpu).to_kind(Kind::Float).clamp(0.0, 1.0) * 255.0)
        .round()
        .to_kind(Kind::Uint8)
        .contiguous()
        .flatten(0, -1);
    let raw = Vec::<u8>::try_from(&pixels)?;

    RgbImage::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| Error::shape("tensor_to_rgb", &[height, width, 3], &pixels.size()))
}

/// Write one image tensor (h, w, c) as PNG
pub fn save_image<P: AsRef<Path>>(image: &Tensor, path: P) -> Result<()> {
    tensor_to_rgb(image)?.save(path.as_ref())?;
    Ok(())
}

/// Write the first generated and first real image of a step into `dir`
///
/// Files are named `generated_<step>.png` and `real_<step>.png`; the
/// directory is created if absent.
///
/// # Returns
///
/// Paths of the (generated, real) files
pub fn save_sample_pair<P: AsRef<Path>>(
    dir: P,
    step: usize,
    generated: &Tensor,
    real: &Tensor,
) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let generated_path = dir.join(format!("generated_{}.png", step));
    let real_path = dir.join(format!("real_{}.png", step));

    save_image(&generated.get(0), &generated_path)?;
    save_image(&real.get(0), &real_path)?;

    Ok((generated_path, real_path))
}
