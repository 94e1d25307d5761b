//! Explicit shape transforms between pipeline stages
//!
//! Images travel as (batch, height, width, channels). The convolution layers
//! work in (batch, channels, height, width). Every conversion here checks its
//! input and output sizes and reports a `Shape` error naming the stage.

use ndarray::ArrayView4;
use tch::{Device, Tensor};

use crate::error::{Error, Result};

/// Check that a tensor has exactly the expected size
pub fn expect_shape(tensor: &Tensor, expected: &[i64], stage: &'static str) -> Result<()> {
    let actual = tensor.size();
    if actual != expected {
        return Err(Error::shape(stage, expected, &actual));
    }
    Ok(())
}

/// Check rank-4 image batch layout (batch, h, w, c), any batch size
pub fn expect_image_batch(
    tensor: &Tensor,
    image_shape: [i64; 3],
    stage: &'static str,
) -> Result<i64> {
    let size = tensor.size();
    let [h, w, c] = image_shape;
    if size.len() != 4 || size[1] != h || size[2] != w || size[3] != c {
        return Err(Error::shape(stage, &[-1, h, w, c], &size));
    }
    Ok(size[0])
}

/// (batch, h, w, c) -> (batch, c, h, w)
pub fn nhwc_to_nchw(tensor: &Tensor) -> Result<Tensor> {
    let size = tensor.size();
    if size.len() != 4 {
        return Err(Error::shape("nhwc_to_nchw", &[-1, -1, -1, -1], &size));
    }
    Ok(tensor.permute([0, 3, 1, 2]))
}

/// (batch, c, h, w) -> (batch, h, w, c)
pub fn nchw_to_nhwc(tensor: &Tensor) -> Result<Tensor> {
    let size = tensor.size();
    if size.len() != 4 {
        return Err(Error::shape("nchw_to_nhwc", &[-1, -1, -1, -1], &size));
    }
    Ok(tensor.permute([0, 2, 3, 1]))
}

/// Copy an NHWC image batch onto the device as a float tensor
pub fn batch_to_tensor(batch: ArrayView4<'_, f32>, device: Device) -> Result<Tensor> {
    let (n, h, w, c) = batch.dim();
    let values: Vec<f32> = batch.iter().copied().collect();

    let tensor = Tensor::from_slice(&values)
        .view([n as i64, h as i64, w as i64, c as i64])
        .to_device(device);

    expect_shape(
        &tensor,
        &[n as i64, h as i64, w as i64, c as i64],
        "batch_to_tensor",
    )?;
    Ok(tensor)
}
