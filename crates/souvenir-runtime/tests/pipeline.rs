use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use souvenir_core::{
    ClassLabelTable, ClassScores, ClassifierModel, CredentialVerifier, ModelSpec,
    NormalizedTensor, Secret,
};
use souvenir_runtime::{
    format, ClassifierHandle, Failure, FailureKind, Field, ImageUpload, InferencePipeline,
    InferenceRequest,
};

/// Scores every image identically and counts calls.
struct FixedModel {
    spec: ModelSpec,
    scores: Vec<f32>,
    calls: Arc<AtomicUsize>,
}

impl ClassifierModel for FixedModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn predict(&mut self, _input: &NormalizedTensor) -> Result<ClassScores> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ClassScores(self.scores.clone()))
    }
}

/// Picks a class from the mean intensity so different images get different labels.
struct BrightnessModel {
    spec: ModelSpec,
}

impl ClassifierModel for BrightnessModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn predict(&mut self, input: &NormalizedTensor) -> Result<ClassScores> {
        let values = input.as_slice();
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        let peak = ((mean * 20.0).round() as usize).min(20);
        let mut scores = vec![0.0_f32; 21];
        scores[peak] = 0.5 + mean / 2.0;
        Ok(ClassScores(scores))
    }
}

struct FailingModel {
    spec: ModelSpec,
}

impl ClassifierModel for FailingModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn predict(&mut self, _input: &NormalizedTensor) -> Result<ClassScores> {
        bail!("/srv/models/model.onnx: CUDA error 700 illegal address")
    }
}

struct PanickingModel {
    spec: ModelSpec,
}

impl ClassifierModel for PanickingModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn predict(&mut self, _input: &NormalizedTensor) -> Result<ClassScores> {
        panic!("kernel launch failed")
    }
}

fn candle_scores() -> Vec<f32> {
    let mut scores = vec![0.002_f32; 21];
    scores[0] = 0.912_345;
    scores
}

fn boxed(model: impl ClassifierModel) -> Box<dyn ClassifierModel> {
    Box::new(model)
}

fn fixed_model(calls: &Arc<AtomicUsize>) -> Box<dyn ClassifierModel> {
    boxed(FixedModel {
        spec: ModelSpec::image_classifier(21),
        scores: candle_scores(),
        calls: Arc::clone(calls),
    })
}

fn pipeline_with(models: Vec<Box<dyn ClassifierModel>>) -> Result<InferencePipeline> {
    Ok(InferencePipeline::new(
        CredentialVerifier::new(Secret::new("abc123")),
        ClassifierHandle::spawn(models)?,
        ClassLabelTable::souvenirs(),
    ))
}

fn jpeg(width: u32, height: u32, colour: [u8; 3]) -> Result<Vec<u8>> {
    let img = RgbImage::from_pixel(width, height, Rgb(colour));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)?;
    Ok(buf)
}

fn request(token: Option<&str>, image: Option<ImageUpload>) -> InferenceRequest {
    InferenceRequest {
        token: token.map(str::to_string),
        image,
    }
}

#[tokio::test]
async fn valid_token_and_jpeg_yield_a_prediction() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline_with(vec![fixed_model(&calls)])?;

    let upload = ImageUpload::new("candle.jpg", jpeg(640, 480, [230, 200, 150])?);
    let prediction = pipeline.run(request(Some("abc123"), Some(upload))).await?;

    assert_eq!(prediction.label, "Aromatherapy Candle");
    assert_eq!(prediction.confidence, 0.9123);
    assert!(ClassLabelTable::souvenirs().iter().any(|label| label == prediction.label));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn missing_token_stops_before_the_model() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline_with(vec![fixed_model(&calls)])?;

    let upload = ImageUpload::new("candle.jpg", jpeg(32, 32, [1, 2, 3])?);
    let outcome = pipeline.run(request(None, Some(upload))).await;

    assert!(matches!(outcome, Err(Failure::MissingField(Field::Token))));
    let body = format(&outcome);
    assert!(!body.success);
    assert_eq!(body.message, "Missing authorization token");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn missing_or_empty_image_stops_before_the_model() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline_with(vec![fixed_model(&calls)])?;

    let empty_payload = ImageUpload::new("photo.jpg", Vec::new());
    let empty_name = ImageUpload::new("", jpeg(8, 8, [9, 9, 9])?);
    let no_name = ImageUpload {
        file_name: None,
        bytes: jpeg(8, 8, [9, 9, 9])?.into(),
    };

    for image in [None, Some(empty_payload), Some(empty_name), Some(no_name)] {
        // A wrong token must not matter: presence is checked first.
        let outcome = pipeline.run(request(Some("wrong"), image)).await;
        assert!(matches!(outcome, Err(Failure::MissingField(Field::Image))));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn wrong_token_is_unauthorized() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline_with(vec![fixed_model(&calls)])?;

    for token in ["", "abc", "abc1234", "ABC123"] {
        let upload = ImageUpload::new("a.jpg", jpeg(16, 16, [0, 0, 0])?);
        let outcome = pipeline.run(request(Some(token), Some(upload))).await;
        let failure = outcome.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Unauthorized);
        assert_eq!(format(&Err(failure)).message, "Invalid authorization token");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn garbage_payload_is_a_bad_image() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline_with(vec![fixed_model(&calls)])?;

    let upload = ImageUpload::new("x.jpg", b"\x00\x01garbage!".to_vec());
    let outcome = pipeline.run(request(Some("abc123"), Some(upload))).await;

    assert_eq!(outcome.as_ref().unwrap_err().kind(), FailureKind::BadImage);
    assert!(format(&outcome).message.starts_with("Unable to process the uploaded image"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn model_error_is_reported_generically() -> Result<()> {
    let pipeline = pipeline_with(vec![boxed(FailingModel {
        spec: ModelSpec::image_classifier(21),
    })])?;

    let upload = ImageUpload::new("a.jpg", jpeg(64, 64, [10, 20, 30])?);
    let outcome = pipeline.run(request(Some("abc123"), Some(upload))).await;

    assert_eq!(outcome.as_ref().unwrap_err().kind(), FailureKind::InferenceFailure);
    let body = serde_json::to_string(&format(&outcome))?;
    assert!(body.contains("An error occurred while making the prediction."));
    assert!(!body.contains("CUDA"));
    assert!(!body.contains("/srv/models"));
    Ok(())
}

#[tokio::test]
async fn model_panic_is_contained() -> Result<()> {
    let pipeline = pipeline_with(vec![boxed(PanickingModel {
        spec: ModelSpec::image_classifier(21),
    })])?;

    for _ in 0..2 {
        let upload = ImageUpload::new("a.jpg", jpeg(64, 64, [10, 20, 30])?);
        let outcome = pipeline.run(request(Some("abc123"), Some(upload))).await;
        assert_eq!(outcome.unwrap_err().kind(), FailureKind::InferenceFailure);
    }
    Ok(())
}

#[tokio::test]
async fn score_table_drift_is_an_inference_failure() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline_with(vec![boxed(FixedModel {
        spec: ModelSpec::image_classifier(20),
        scores: vec![0.05; 20],
        calls: Arc::clone(&calls),
    })])?;

    let upload = ImageUpload::new("a.png", jpeg(20, 20, [1, 1, 1])?);
    let outcome = pipeline.run(request(Some("abc123"), Some(upload))).await;
    assert_eq!(outcome.unwrap_err().kind(), FailureKind::InferenceFailure);
    Ok(())
}

#[tokio::test]
async fn identical_requests_give_identical_predictions() -> Result<()> {
    let pipeline = pipeline_with(vec![
        boxed(BrightnessModel {
            spec: ModelSpec::image_classifier(21),
        }),
        boxed(BrightnessModel {
            spec: ModelSpec::image_classifier(21),
        }),
    ])?;
    assert_eq!(pipeline.classifier().workers(), 2);

    let bytes = jpeg(333, 111, [180, 90, 45])?;
    let mut seen = Vec::new();
    for _ in 0..4 {
        let upload = ImageUpload::new("same.jpg", bytes.clone());
        seen.push(pipeline.run(request(Some("abc123"), Some(upload))).await?);
    }
    assert!(seen.windows(2).all(|pair| pair[0] == pair[1]));
    for prediction in &seen {
        assert!((0.0..=1.0).contains(&prediction.confidence));
        assert!(ClassLabelTable::souvenirs().iter().any(|label| label == prediction.label));
    }

    let dark = ImageUpload::new("dark.jpg", jpeg(50, 50, [0, 0, 0])?);
    let dark = pipeline.run(request(Some("abc123"), Some(dark))).await?;
    assert_eq!(dark.label, "Aromatherapy Candle");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_are_all_answered() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let pipeline = Arc::new(pipeline_with(vec![fixed_model(&calls), fixed_model(&calls)])?);
    let bytes = jpeg(120, 90, [40, 200, 90])?;

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let pipeline = Arc::clone(&pipeline);
        let upload = ImageUpload::new("c.jpg", bytes.clone());
        tasks.push(tokio::spawn(async move {
            pipeline.run(request(Some("abc123"), Some(upload))).await
        }));
    }
    for task in tasks {
        assert_eq!(task.await??.label, "Aromatherapy Candle");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 16);
    Ok(())
}
