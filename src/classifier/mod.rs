mod ort;

use ndarray::Array4;

pub use self::ort::OrtClassifier;

/// Maps one `[1, H, W, 3]` input tensor to a probability vector over the
/// label vocabulary. Implementations serialize internally if their backend
/// is not reentrant.
pub trait Classifier: Send + Sync {
    fn classify(&self, input: Array4<f32>) -> anyhow::Result<Vec<f32>>;

    fn label(&self) -> &'static str;
}
