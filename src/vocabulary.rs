use std::{
    collections::HashMap,
    fs::{self, File},
    io::{self, Read},
    path::Path,
};

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::VocabularyError;

/// Ordered class labels; position `i` names output `i` of the classifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    labels: Vec<String>,
    model_sha256: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VocabularyFile {
    Plain(Vec<String>),
    Manifest {
        labels: Vec<String>,
        #[serde(default)]
        model_sha256: Option<String>,
    },
}

impl Vocabulary {
    pub fn new(labels: Vec<String>) -> Result<Self, VocabularyError> {
        if labels.is_empty() {
            return Err(VocabularyError::Empty);
        }
        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(labels.len());
        for (idx, label) in labels.iter().enumerate() {
            if let Some(first) = seen.insert(label.as_str(), idx) {
                return Err(VocabularyError::Duplicate {
                    label: label.clone(),
                    first,
                    second: idx,
                });
            }
        }
        Ok(Self {
            labels,
            model_sha256: None,
        })
    }

    /// Accepts a bare JSON array of labels or
    /// `{ "labels": [...], "model_sha256": "<hex>" }`.
    pub fn load(path: &Path) -> Result<Self, VocabularyError> {
        let raw = fs::read_to_string(path).map_err(|source| VocabularyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: VocabularyFile =
            serde_json::from_str(&raw).map_err(|source| VocabularyError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let vocabulary = match parsed {
            VocabularyFile::Plain(labels) => Self::new(labels)?,
            VocabularyFile::Manifest {
                labels,
                model_sha256,
            } => {
                let mut vocabulary = Self::new(labels)?;
                vocabulary.model_sha256 = model_sha256.map(|hex| hex.trim().to_ascii_lowercase());
                vocabulary
            }
        };

        log::info!(
            "loaded {} labels from {}",
            vocabulary.len(),
            path.display()
        );
        Ok(vocabulary)
    }

    /// Fails if the vocabulary pins a model checksum that `model_path` does
    /// not hash to. Vocabularies without a checksum pass unchecked.
    pub fn verify_model(&self, model_path: &Path) -> Result<(), VocabularyError> {
        let Some(expected) = &self.model_sha256 else {
            log::warn!(
                "vocabulary carries no model checksum; label order is trusted as-is"
            );
            return Ok(());
        };

        let actual = sha256_file(model_path).map_err(|source| VocabularyError::Io {
            path: model_path.to_path_buf(),
            source,
        })?;
        if &actual != expected {
            return Err(VocabularyError::ChecksumMismatch {
                expected: expected.clone(),
                actual,
            });
        }
        Ok(())
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn model_sha256(&self) -> Option<&str> {
        self.model_sha256.as_deref()
    }
}

fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn plain_array_keeps_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "labels.json", br#"["hello", "yes", "no"]"#);
        let vocabulary = Vocabulary::load(&path).unwrap();
        assert_eq!(vocabulary.len(), 3);
        assert_eq!(vocabulary.label(0), Some("hello"));
        assert_eq!(vocabulary.label(2), Some("no"));
        assert_eq!(vocabulary.label(3), None);
        assert_eq!(vocabulary.model_sha256(), None);
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = Vocabulary::new(vec!["a".into(), "b".into(), "a".into()]).unwrap_err();
        assert!(matches!(
            err,
            VocabularyError::Duplicate {
                first: 0,
                second: 2,
                ..
            }
        ));
    }

    #[test]
    fn empty_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "labels.json", b"[]");
        assert!(matches!(
            Vocabulary::load(&path),
            Err(VocabularyError::Empty)
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "labels.json", b"{\"labels\": 3}");
        assert!(matches!(
            Vocabulary::load(&path),
            Err(VocabularyError::Parse { .. })
        ));
    }

    #[test]
    fn manifest_checksum_binds_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let model = write(&dir, "model.onnx", b"abc");
        // sha256("abc")
        let digest = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        let manifest = format!(
            r#"{{"labels": ["x", "y"], "model_sha256": "{}"}}"#,
            digest.to_uppercase()
        );
        let path = write(&dir, "labels.json", manifest.as_bytes());

        let vocabulary = Vocabulary::load(&path).unwrap();
        assert_eq!(vocabulary.model_sha256(), Some(digest));
        vocabulary.verify_model(&model).unwrap();

        let other = write(&dir, "other.onnx", b"abd");
        assert!(matches!(
            vocabulary.verify_model(&other),
            Err(VocabularyError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn missing_checksum_skips_verification() {
        let vocabulary = Vocabulary::new(vec!["x".into()]).unwrap();
        vocabulary
            .verify_model(Path::new("/nonexistent/model.onnx"))
            .unwrap();
    }
}
