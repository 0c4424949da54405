use anyhow::{Result, anyhow};
use serde::Serialize;

/// A decoded 8-bit, 3-channel image in BGR order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub bgr: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(bgr: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected_len = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(3);
        if bgr.len() != expected_len {
            return Err(anyhow!(
                "frame buffer size mismatch: got {}, expected {}",
                bgr.len(),
                expected_len
            ));
        }
        Ok(Self { bgr, width, height })
    }

    /// Frame filled with a single BGR color.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&bgr);
        }
        Self {
            bgr: data,
            width,
            height,
        }
    }

    #[cfg(test)]
    pub(crate) fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.bgr[idx], self.bgr[idx + 1], self.bgr[idx + 2]]
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Copies the pixels inside `bbox` into a new frame.
    pub fn crop(&self, bbox: &BoundingBox) -> Result<Frame> {
        if bbox.width == 0
            || bbox.height == 0
            || bbox.x + bbox.width > self.width
            || bbox.y + bbox.height > self.height
        {
            return Err(anyhow!(
                "crop {bbox:?} outside of {}x{} frame",
                self.width,
                self.height
            ));
        }

        let src_stride = self.width as usize * 3;
        let row_len = bbox.width as usize * 3;
        let mut data = Vec::with_capacity(row_len * bbox.height as usize);
        for row in bbox.y..bbox.y + bbox.height {
            let offset = row as usize * src_stride + bbox.x as usize * 3;
            data.extend_from_slice(&self.bgr[offset..offset + row_len]);
        }

        Ok(Frame {
            bgr: data,
            width: bbox.width,
            height: bbox.height,
        })
    }
}

/// Axis-aligned rectangle in pixel coordinates, `width`/`height` inclusive of
/// both edge pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Final decision for one request.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub index: usize,
    pub confidence: f32,
    pub frames: usize,
}

/// Wire shape returned by both entry points.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct PredictionResponse {
    pub prediction: String,
}

impl From<Prediction> for PredictionResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            prediction: prediction.label,
        }
    }
}
