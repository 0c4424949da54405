use std::{path::Path, sync::Mutex};

use anyhow::{Context, Result, anyhow};
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::Classifier;

/// ONNX Runtime session behind a mutex; `Session::run` needs `&mut`.
pub struct OrtClassifier {
    session: Mutex<Session>,
}

impl OrtClassifier {
    pub fn load(model_path: &Path) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;

        log::info!("sign classifier loaded from {}", model_path.display());

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl Classifier for OrtClassifier {
    fn classify(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let tensor = Tensor::from_array(input)?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("classifier session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 1 {
            return Err(anyhow!("model returned no outputs"));
        }

        let scores = outputs[0].try_extract_array::<f32>()?;
        Ok(scores.iter().copied().collect())
    }

    fn label(&self) -> &'static str {
        "ort"
    }
}
