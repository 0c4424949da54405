use std::path::Path;

use anyhow::{Context, Result, anyhow};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};

use super::sampler::VideoSource;
use crate::types::Frame;

/// Any container/codec the linked OpenCV build can read. Frames arrive BGR.
pub struct OpenCvSource {
    capture: VideoCapture,
}

impl OpenCvSource {
    pub fn open(path: &Path) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("video path is not valid UTF-8: {}", path.display()))?;
        let capture = VideoCapture::from_file(path_str, videoio::CAP_ANY)
            .with_context(|| format!("failed to open video {}", path.display()))?;
        if !capture.is_opened()? {
            return Err(anyhow!("OpenCV could not open {}", path.display()));
        }
        Ok(Self { capture })
    }
}

impl VideoSource for OpenCvSource {
    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut mat = Mat::default();
        if !self.capture.read(&mut mat)? || mat.empty() {
            return Ok(None);
        }
        if mat.channels() != 3 {
            return Err(anyhow!("expected 3-channel frame, got {}", mat.channels()));
        }

        let mat = if mat.is_continuous() {
            mat
        } else {
            mat.try_clone()?
        };
        let width = mat.cols() as u32;
        let height = mat.rows() as u32;
        let bgr = mat.data_bytes()?.to_vec();
        Frame::new(bgr, width, height).map(Some)
    }
}

impl Drop for OpenCvSource {
    fn drop(&mut self) {
        if let Err(err) = self.capture.release() {
            log::warn!("failed to release video capture: {err:?}");
        }
    }
}
