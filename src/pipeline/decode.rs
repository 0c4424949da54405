use anyhow::{Context, Result};
use image::RgbImage;
use rayon::prelude::*;

use crate::types::Frame;

/// Decodes any image codec `image` understands into a BGR frame.
pub fn decode_image(bytes: &[u8]) -> Result<Frame> {
    let decoded = image::load_from_memory(bytes).context("unrecognized or corrupt image data")?;
    Ok(frame_from_rgb(&decoded.to_rgb8()))
}

pub fn frame_from_rgb(image: &RgbImage) -> Frame {
    Frame {
        bgr: rgb_like_swap(image.as_raw()),
        width: image.width(),
        height: image.height(),
    }
}

pub fn frame_from_rgba(rgba: &[u8], width: u32, height: u32) -> Frame {
    let mut bgr = vec![0u8; width as usize * height as usize * 3];
    bgr.par_chunks_mut(3)
        .zip(rgba.par_chunks_exact(4))
        .for_each(|(dst, src)| {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
        });
    Frame { bgr, width, height }
}

fn rgb_like_swap(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; data.len()];
    out.par_chunks_mut(3)
        .zip(data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
        });
    out
}
