pub mod aggregate;
pub mod contour;
pub mod decode;
#[cfg(feature = "video-opencv")]
pub mod opencv_video;
pub mod preprocess;
pub mod region;
pub mod sampler;

// Re-exports for convenience
pub use aggregate::{argmax, mean_probabilities};
pub use decode::decode_image;
pub use preprocess::prepare_region;
pub use region::{FallbackReason, Localization, RegionExtractor};
pub use sampler::{FrameSampler, VideoSource, open_video};
