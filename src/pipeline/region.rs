use std::borrow::Cow;

use rayon::prelude::*;

use super::contour::{Mask, find_external_contours};
use crate::{
    config::RegionExtractorConfig,
    types::{BoundingBox, Frame},
};

/// Outcome of looking for a hand in a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Localization {
    Detected { bbox: BoundingBox, area: f64 },
    Fallback(FallbackReason),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FallbackReason {
    /// No pixel fell in the skin-tone range.
    NoContour,
    /// The largest blob's bounding box was under the minimum side length.
    TooSmall(BoundingBox),
}

/// Skin-tone blob proposal. Stateless; every failure path keeps the whole frame.
#[derive(Clone, Debug, Default)]
pub struct RegionExtractor {
    cfg: RegionExtractorConfig,
}

impl RegionExtractor {
    pub fn new(cfg: RegionExtractorConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &RegionExtractorConfig {
        &self.cfg
    }

    pub fn skin_mask(&self, frame: &Frame) -> Mask {
        let skin = self.cfg.skin;
        let data: Vec<bool> = frame
            .bgr
            .par_chunks_exact(3)
            .map(|px| skin.contains(bgr_to_hsv([px[0], px[1], px[2]])))
            .collect();
        Mask::new(frame.width, frame.height, data)
    }

    pub fn locate(&self, frame: &Frame) -> Localization {
        let mask = self.skin_mask(frame);
        let contours = find_external_contours(&mask);

        let mut largest: Option<(f64, BoundingBox)> = None;
        for contour in &contours {
            let area = contour.area();
            if largest.map_or(true, |(best, _)| area > best) {
                largest = Some((area, contour.bounding_box()));
            }
        }

        let Some((area, bbox)) = largest else {
            return Localization::Fallback(FallbackReason::NoContour);
        };

        if bbox.width < self.cfg.min_side || bbox.height < self.cfg.min_side {
            return Localization::Fallback(FallbackReason::TooSmall(bbox));
        }

        Localization::Detected { bbox, area }
    }

    /// Region to classify: the detected crop, or the frame itself.
    pub fn extract<'a>(&self, frame: &'a Frame) -> Cow<'a, Frame> {
        match self.locate(frame) {
            Localization::Detected { bbox, area } => match frame.crop(&bbox) {
                Ok(crop) => {
                    log::debug!("hand region {bbox:?} (area {area:.1})");
                    Cow::Owned(crop)
                }
                Err(err) => {
                    log::warn!("discarding hand region: {err:?}");
                    Cow::Borrowed(frame)
                }
            },
            Localization::Fallback(reason) => {
                log::debug!("no usable hand region ({reason:?}), using full frame");
                Cow::Borrowed(frame)
            }
        }
    }
}

/// BGR to HSV in the 8-bit convention: H in 0..180, S and V in 0..=255.
pub fn bgr_to_hsv([b, g, r]: [u8; 3]) -> [u8; 3] {
    let (bf, gf, rf) = (b as f32, g as f32, r as f32);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v > 0.0 {
        (255.0 * diff / v).round()
    } else {
        0.0
    };

    let h = if diff == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / diff
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    let h = if h < 0.0 { h + 360.0 } else { h };
    let h = ((h / 2.0).round() as u32 % 180) as u8;

    [h, s as u8, v as u8]
}
