use std::{path::Path, sync::Arc};

use anyhow::{Context, anyhow};
use ndarray::Array4;
use rayon::prelude::*;

use crate::{
    classifier::{Classifier, OrtClassifier},
    config::{INPUT_SIZE, ServiceConfig},
    error::PredictError,
    pipeline::{
        FrameSampler, RegionExtractor, VideoSource, aggregate, decode_image, open_video,
        prepare_region,
    },
    types::{Frame, Prediction},
    vocabulary::Vocabulary,
};

/// Process-wide, read-only prediction context. Cheap to clone and safe to
/// share between concurrent requests.
#[derive(Clone)]
pub struct SignService {
    extractor: RegionExtractor,
    sampler: FrameSampler,
    classifier: Arc<dyn Classifier>,
    vocabulary: Arc<Vocabulary>,
}

impl SignService {
    pub fn new(classifier: Arc<dyn Classifier>, vocabulary: Vocabulary) -> Self {
        Self::with_config(&ServiceConfig::default(), classifier, vocabulary)
    }

    pub fn with_config(
        cfg: &ServiceConfig,
        classifier: Arc<dyn Classifier>,
        vocabulary: Vocabulary,
    ) -> Self {
        Self {
            extractor: RegionExtractor::new(cfg.region.clone()),
            sampler: FrameSampler::new(cfg.max_frames),
            classifier,
            vocabulary: Arc::new(vocabulary),
        }
    }

    /// Loads the vocabulary and ONNX model named by `cfg` and checks they
    /// belong together before any request is served.
    pub fn from_config(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        let vocabulary = Vocabulary::load(&cfg.labels_path)?;
        vocabulary.verify_model(&cfg.model_path)?;
        let classifier = OrtClassifier::load(&cfg.model_path)?;

        let service = Self::with_config(cfg, Arc::new(classifier), vocabulary);
        service
            .verify()
            .context("classifier does not match the label vocabulary")?;
        Ok(service)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn sampler(&self) -> &FrameSampler {
        &self.sampler
    }

    /// Runs a blank input through the classifier to check its output width.
    pub fn verify(&self) -> Result<(), PredictError> {
        let blank = Array4::<f32>::zeros((1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3));
        let scores = self
            .classifier
            .classify(blank)
            .map_err(PredictError::Inference)?;
        aggregate::check_length(&scores, self.vocabulary.len())?;
        log::info!(
            "{} classifier verified against {} labels",
            self.classifier.label(),
            self.vocabulary.len()
        );
        Ok(())
    }

    /// Hand region → tensor → probability vector for one frame.
    pub fn classify_frame(&self, frame: &Frame) -> Result<Vec<f32>, PredictError> {
        if frame.is_empty() {
            return Err(PredictError::Decode(anyhow!(
                "{}x{} frame has no pixels",
                frame.width,
                frame.height
            )));
        }
        let region = self.extractor.extract(frame);
        let input = prepare_region(&region).map_err(PredictError::Inference)?;
        let scores = self
            .classifier
            .classify(input)
            .map_err(PredictError::Inference)?;
        aggregate::check_length(&scores, self.vocabulary.len())?;
        Ok(scores)
    }

    pub fn decide_frame(&self, frame: &Frame) -> Result<Prediction, PredictError> {
        let scores = self.classify_frame(frame)?;
        self.pick(&scores, 1)
    }

    /// Mean of per-frame probabilities; frames are classified independently
    /// and summed in their original order.
    pub fn decide_frames(&self, frames: &[Frame]) -> Result<Prediction, PredictError> {
        if frames.is_empty() {
            return Err(PredictError::EmptyInput);
        }

        let per_frame: Vec<Vec<f32>> = frames
            .par_iter()
            .map(|frame| self.classify_frame(frame))
            .collect::<Result<_, _>>()?;
        let mean = aggregate::mean_probabilities(&per_frame, self.vocabulary.len())?;
        self.pick(&mean, frames.len())
    }

    pub fn predict_image_bytes(&self, bytes: &[u8]) -> Result<Prediction, PredictError> {
        let frame = decode_image(bytes).map_err(PredictError::Decode)?;
        self.decide_frame(&frame)
    }

    pub fn predict_video_source(
        &self,
        source: &mut dyn VideoSource,
    ) -> Result<Prediction, PredictError> {
        let frames = self.sampler.sample(source);
        log::debug!("sampled {} video frames", frames.len());
        self.decide_frames(&frames)
    }

    pub fn predict_video_path(&self, path: &Path) -> Result<Prediction, PredictError> {
        let mut source = open_video(path).map_err(PredictError::Decode)?;
        self.predict_video_source(source.as_mut())
    }

    fn pick(&self, scores: &[f32], frames: usize) -> Result<Prediction, PredictError> {
        let index = aggregate::argmax(scores)
            .ok_or_else(|| PredictError::Inference(anyhow!("classifier produced no usable scores")))?;
        let label = self
            .vocabulary
            .label(index)
            .ok_or(PredictError::VocabularyMismatch {
                expected: self.vocabulary.len(),
                actual: scores.len(),
            })?;

        Ok(Prediction {
            label: label.to_string(),
            index,
            confidence: scores[index],
            frames,
        })
    }
}
