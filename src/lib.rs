//! Sign-language word recognition.
//!
//! A frame is reduced to its most likely hand region by a skin-tone blob
//! heuristic, stretched to the classifier input size and scored by an ONNX
//! classifier. Videos are sampled from the start (at most [`config::MAX_FRAMES`]
//! frames) and decided on the mean of their per-frame probabilities.

pub mod classifier;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod service;
pub mod types;
pub mod vocabulary;

pub use classifier::{Classifier, OrtClassifier};
pub use error::{PredictError, VocabularyError};
pub use service::SignService;
pub use types::{Frame, Prediction, PredictionResponse};
pub use vocabulary::Vocabulary;
