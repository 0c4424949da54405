use std::path::PathBuf;

/// Side length of the square classifier input.
pub const INPUT_SIZE: u32 = 224;
/// Upper bound on frames sampled from one video.
pub const MAX_FRAMES: usize = 15;
/// Largest animation canvas decoded for a video, in pixels (3840×2160).
pub const MAX_VIDEO_FRAME_PIXELS: u64 = 3840 * 2160;
/// Detections narrower or shorter than this fall back to the full frame.
pub const MIN_REGION_SIDE: u32 = 60;

const DEFAULT_MODEL_FILENAME: &str = "sign_classifier.onnx";
const DEFAULT_LABELS_FILENAME: &str = "labels.json";

/// Inclusive HSV bounds in the 8-bit convention (hue 0..=180).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkinToneRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl Default for SkinToneRange {
    fn default() -> Self {
        Self {
            lower: [0, 20, 70],
            upper: [20, 255, 255],
        }
    }
}

impl SkinToneRange {
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| hsv[c] >= self.lower[c] && hsv[c] <= self.upper[c])
    }
}

#[derive(Clone, Debug)]
pub struct RegionExtractorConfig {
    pub skin: SkinToneRange,
    pub min_side: u32,
}

impl Default for RegionExtractorConfig {
    fn default() -> Self {
        Self {
            skin: SkinToneRange::default(),
            min_side: MIN_REGION_SIDE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub upload_dir: PathBuf,
    pub max_frames: usize,
    pub region: RegionExtractorConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            labels_path: default_labels_path(),
            upload_dir: PathBuf::from("uploads"),
            max_frames: MAX_FRAMES,
            region: RegionExtractorConfig::default(),
        }
    }
}

pub fn default_model_path() -> PathBuf {
    PathBuf::from("models").join(DEFAULT_MODEL_FILENAME)
}

pub fn default_labels_path() -> PathBuf {
    PathBuf::from("models").join(DEFAULT_LABELS_FILENAME)
}
