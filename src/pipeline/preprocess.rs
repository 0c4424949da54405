use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;
use rayon::prelude::*;

use crate::{config::INPUT_SIZE, types::Frame};

pub fn prepare_region(frame: &Frame) -> Result<Array4<f32>> {
    prepare_region_with_size(frame, INPUT_SIZE)
}

/// Stretches the region to `target_size` square (no letterboxing), scales to
/// [0, 1] and adds a batch axis: `[1, target_size, target_size, 3]`, BGR.
pub fn prepare_region_with_size(frame: &Frame, target_size: u32) -> Result<Array4<f32>> {
    if frame.is_empty() {
        return Err(anyhow!(
            "cannot resize a {}x{} region",
            frame.width,
            frame.height
        ));
    }
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(3);
    if frame.bgr.len() != expected_len {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.bgr.len(),
            expected_len
        ));
    }

    let src_image = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.bgr.clone(),
        fir::PixelType::U8x3,
    )?;
    let mut dst_image = fir::images::Image::new(target_size, target_size, fir::PixelType::U8x3);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;

    let resized = dst_image.into_vec();

    let normalized: Vec<f32> = resized
        .par_iter()
        .map(|value| *value as f32 / 255.0)
        .collect();

    Array4::<f32>::from_shape_vec(
        (1, target_size as usize, target_size as usize, 3),
        normalized,
    )
    .map_err(|err| anyhow!("failed to build input tensor: {err}"))
}
