use std::{
    collections::VecDeque,
    io::Cursor,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::{Result, anyhow};
use image::{Delay, ImageFormat, Rgb, RgbImage, RgbaImage, codecs::gif::GifEncoder};
use ndarray::Array4;
use sign_lens::{
    Classifier, Frame, PredictError, SignService, Vocabulary,
    config::{MAX_FRAMES, ServiceConfig},
    pipeline::VideoSource,
};

const SKIN: [u8; 3] = [120, 160, 220];
const BLUE: [u8; 3] = [200, 40, 10];

fn vocabulary() -> Vocabulary {
    Vocabulary::new(vec!["hello".into(), "yes".into(), "no".into()]).unwrap()
}

/// Returns the same scores for every input and counts calls.
struct FixedClassifier {
    scores: Vec<f32>,
    calls: AtomicUsize,
}

impl FixedClassifier {
    fn new(scores: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            scores,
            calls: AtomicUsize::new(0),
        })
    }
}

impl Classifier for FixedClassifier {
    fn classify(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        assert_eq!(input.shape(), &[1, 224, 224, 3]);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores.clone())
    }

    fn label(&self) -> &'static str {
        "fixed"
    }
}

/// Picks scores from the blue channel of the top-left input pixel, so each
/// synthetic frame gets its own distribution regardless of call order.
struct ByShadeClassifier {
    table: Vec<(u8, Vec<f32>)>,
}

impl Classifier for ByShadeClassifier {
    fn classify(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let shade = (input[[0, 0, 0, 0]] * 255.0).round() as u8;
        self.table
            .iter()
            .find(|(key, _)| *key == shade)
            .map(|(_, scores)| scores.clone())
            .ok_or_else(|| anyhow!("no scores for shade {shade}"))
    }

    fn label(&self) -> &'static str {
        "by-shade"
    }
}

/// Keeps the last input it saw.
struct RecordingClassifier {
    last: Mutex<Option<Array4<f32>>>,
}

impl Classifier for RecordingClassifier {
    fn classify(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        *self.last.lock().unwrap() = Some(input);
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn label(&self) -> &'static str {
        "recording"
    }
}

struct MemorySource(VecDeque<Frame>);

impl VideoSource for MemorySource {
    fn read_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.0.pop_front())
    }
}

fn white_png() -> Vec<u8> {
    let img = RgbImage::from_pixel(64, 48, Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn white_still_image_is_classified_once() {
    let classifier = FixedClassifier::new(vec![0.1, 0.7, 0.2]);
    let service = SignService::new(classifier.clone(), vocabulary());

    let prediction = service.predict_image_bytes(&white_png()).unwrap();
    assert_eq!(prediction.label, "yes");
    assert_eq!(prediction.index, 1);
    assert_eq!(prediction.frames, 1);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn undecodable_bytes_are_a_decode_error() {
    let service = SignService::new(FixedClassifier::new(vec![0.1, 0.7, 0.2]), vocabulary());
    assert!(matches!(
        service.predict_image_bytes(b"\x89PNG but not really"),
        Err(PredictError::Decode(_))
    ));
}

#[test]
fn identical_frames_keep_their_decision() {
    let classifier = FixedClassifier::new(vec![0.2, 0.6, 0.2]);
    let service = SignService::new(classifier.clone(), vocabulary());
    let frames = vec![Frame::filled(32, 32, [255, 255, 255]); 5];

    let prediction = service.decide_frames(&frames).unwrap();
    assert_eq!(prediction.index, 1);
    assert_eq!(prediction.label, "yes");
    assert!((prediction.confidence - 0.6).abs() < 1e-6);
    assert_eq!(prediction.frames, 5);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 5);
}

#[test]
fn mean_decides_even_when_one_frame_disagrees() {
    let classifier = Arc::new(ByShadeClassifier {
        table: vec![
            (10, vec![0.9, 0.05, 0.05]),
            (20, vec![0.1, 0.8, 0.1]),
            (30, vec![0.7, 0.2, 0.1]),
        ],
    });
    let service = SignService::new(classifier, vocabulary());
    let frames = vec![
        Frame::filled(16, 16, [10, 10, 10]),
        Frame::filled(16, 16, [20, 20, 20]),
        Frame::filled(16, 16, [30, 30, 30]),
    ];

    let prediction = service.decide_frames(&frames).unwrap();
    assert_eq!(prediction.label, "hello");
    assert!((prediction.confidence - 1.7 / 3.0).abs() < 1e-5);
}

#[test]
fn empty_video_is_reported_not_divided() {
    let classifier = FixedClassifier::new(vec![0.2, 0.6, 0.2]);
    let service = SignService::new(classifier.clone(), vocabulary());

    let mut source = MemorySource(VecDeque::new());
    assert!(matches!(
        service.predict_video_source(&mut source),
        Err(PredictError::EmptyInput)
    ));
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn long_video_is_capped_at_frame_budget() {
    let classifier = FixedClassifier::new(vec![0.3, 0.3, 0.4]);
    let service = SignService::new(classifier.clone(), vocabulary());

    let mut source = MemorySource((0..40).map(|_| Frame::filled(8, 8, BLUE)).collect());
    let prediction = service.predict_video_source(&mut source).unwrap();
    assert_eq!(prediction.frames, MAX_FRAMES);
    assert_eq!(prediction.label, "no");
    assert_eq!(classifier.calls.load(Ordering::SeqCst), MAX_FRAMES);
    assert_eq!(source.0.len(), 40 - MAX_FRAMES);
}

#[test]
fn classifier_sees_the_cropped_hand() {
    let mut frame = Frame::filled(200, 160, BLUE);
    for y in 30..130 {
        for x in 50..130 {
            let idx = (y * 200 + x) * 3;
            frame.bgr[idx..idx + 3].copy_from_slice(&SKIN);
        }
    }

    let classifier = Arc::new(RecordingClassifier {
        last: Mutex::new(None),
    });
    let service = SignService::new(classifier.clone(), vocabulary());
    service.decide_frame(&frame).unwrap();

    let input = classifier.last.lock().unwrap().take().unwrap();
    for (y, x) in [(0, 0), (112, 112), (223, 223)] {
        let px = [input[[0, y, x, 0]], input[[0, y, x, 1]], input[[0, y, x, 2]]];
        for (got, want) in px.iter().zip(SKIN) {
            assert!((got - want as f32 / 255.0).abs() < 1e-3, "{px:?} at {y},{x}");
        }
    }
}

#[test]
fn wrong_output_width_is_a_vocabulary_mismatch() {
    let service = SignService::new(FixedClassifier::new(vec![0.5, 0.5]), vocabulary());
    assert!(matches!(
        service.verify(),
        Err(PredictError::VocabularyMismatch {
            expected: 3,
            actual: 2
        })
    ));
    assert!(matches!(
        service.predict_image_bytes(&white_png()),
        Err(PredictError::VocabularyMismatch { .. })
    ));
}

#[test]
fn classifier_failure_is_an_inference_error() {
    let classifier = Arc::new(ByShadeClassifier { table: Vec::new() });
    let service = SignService::new(classifier, vocabulary());
    assert!(matches!(
        service.decide_frame(&Frame::filled(4, 4, [1, 2, 3])),
        Err(PredictError::Inference(_))
    ));
}

#[test]
fn configured_frame_cap_is_honoured() {
    let config = ServiceConfig {
        max_frames: 2,
        ..ServiceConfig::default()
    };
    let classifier = FixedClassifier::new(vec![0.3, 0.3, 0.4]);
    let service = SignService::with_config(&config, classifier.clone(), vocabulary());

    let mut source = MemorySource((0..5).map(|_| Frame::filled(8, 8, BLUE)).collect());
    let prediction = service.predict_video_source(&mut source).unwrap();
    assert_eq!(prediction.frames, 2);
}

#[test]
fn startup_fails_without_vocabulary() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        model_path: dir.path().join("missing.onnx"),
        labels_path: dir.path().join("missing.json"),
        ..ServiceConfig::default()
    };
    assert!(SignService::from_config(&config).is_err());
}

#[test]
fn zero_sized_frame_is_a_decode_error() {
    let classifier = FixedClassifier::new(vec![0.2, 0.6, 0.2]);
    let service = SignService::new(classifier.clone(), vocabulary());

    let err = service.decide_frame(&Frame::filled(0, 12, SKIN)).unwrap_err();
    assert!(matches!(err, PredictError::Decode(_)));
    assert!(err.is_client_error());
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn oversized_animation_canvas_is_a_decode_error() {
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        let frames = (0..2).map(|_| {
            image::Frame::from_parts(
                RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255])),
                0,
                0,
                Delay::from_numer_denom_ms(40, 1),
            )
        });
        encoder.encode_frames(frames).unwrap();
    }
    bytes[6..8].copy_from_slice(&12_000u16.to_le_bytes());
    bytes[8..10].copy_from_slice(&12_000u16.to_le_bytes());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.gif");
    std::fs::write(&path, &bytes).unwrap();

    let classifier = FixedClassifier::new(vec![0.2, 0.6, 0.2]);
    let service = SignService::new(classifier.clone(), vocabulary());
    assert!(matches!(
        service.predict_video_path(&path),
        Err(PredictError::Decode(_))
    ));
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
}
