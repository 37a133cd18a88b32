use std::fmt;

use souvenir_core::{
    normalize, AuthError, ClassLabelTable, ClassScores, CredentialVerifier, DecodeError,
    InferenceError,
};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{ClassifierHandle, InferenceRequest};

/// Form fields a request can be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Token,
    Image,
    /// The body could not be read as a form at all.
    Form,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Token => "token",
            Field::Image => "image",
            Field::Form => "form",
        })
    }
}

#[derive(Error, Debug)]
pub enum Failure {
    #[error("missing field: {0}")]
    MissingField(Field),

    #[error("request body exceeds the upload limit")]
    TooLarge,

    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("bad image: {}", .0.detail())]
    BadImage(#[from] DecodeError),

    #[error("inference failed: {0}")]
    InferenceFailure(#[from] InferenceError),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MissingField,
    TooLarge,
    Unauthorized,
    BadImage,
    InferenceFailure,
    InternalError,
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::MissingField(_) => FailureKind::MissingField,
            Failure::TooLarge => FailureKind::TooLarge,
            Failure::Unauthorized(_) => FailureKind::Unauthorized,
            Failure::BadImage(_) => FailureKind::BadImage,
            Failure::InferenceFailure(_) => FailureKind::InferenceFailure,
            Failure::Internal(_) => FailureKind::InternalError,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub label: &'static str,
    /// Score of `label`, rounded to 4 decimal places.
    pub confidence: f64,
}

pub type Outcome = Result<PredictionResult, Failure>;

pub struct InferencePipeline {
    verifier: CredentialVerifier,
    classifier: ClassifierHandle,
    labels: ClassLabelTable,
}

impl InferencePipeline {
    pub fn new(
        verifier: CredentialVerifier,
        classifier: ClassifierHandle,
        labels: ClassLabelTable,
    ) -> Self {
        Self {
            verifier,
            classifier,
            labels,
        }
    }

    pub fn classifier(&self) -> &ClassifierHandle {
        &self.classifier
    }

    pub fn labels(&self) -> &ClassLabelTable {
        &self.labels
    }

    /// Runs one request to completion. Failures are logged here with full
    /// detail before being returned.
    pub async fn run(&self, request: InferenceRequest) -> Outcome {
        let outcome = self.execute(request).await;
        if let Err(failure) = &outcome {
            log_failure(failure);
        }
        outcome
    }

    async fn execute(&self, request: InferenceRequest) -> Outcome {
        let InferenceRequest { token, image } = request;
        let token = token.ok_or(Failure::MissingField(Field::Token))?;
        let image = image
            .filter(|upload| upload.is_present())
            .ok_or(Failure::MissingField(Field::Image))?;

        self.verifier.verify(Some(&token))?;

        let bytes = image.bytes;
        let tensor = tokio::task::spawn_blocking(move || normalize(&bytes))
            .await
            .map_err(|err| Failure::Internal(format!("normalizer task failed: {err}")))??;

        let classification = self.classifier.classify(tensor).await?;
        let prediction = predict_label(&classification.scores, &self.labels)?;

        debug!(
            label = prediction.label,
            confidence = prediction.confidence,
            queued_us = classification.timings.queued_us,
            backend_us = classification.timings.backend_us,
            "image classified"
        );
        Ok(prediction)
    }
}

/// Picks the highest-scoring label.
pub fn predict_label(
    scores: &ClassScores,
    labels: &ClassLabelTable,
) -> Result<PredictionResult, InferenceError> {
    let count_mismatch = || InferenceError::ScoreCount {
        expected: labels.len(),
        got: scores.len(),
    };
    if scores.len() != labels.len() {
        return Err(count_mismatch());
    }
    let (index, score) = scores.argmax().ok_or(InferenceError::NonFinite)?;
    let label = labels.get(index).ok_or_else(count_mismatch)?;
    Ok(PredictionResult {
        label,
        confidence: round_confidence(score),
    })
}

fn round_confidence(score: f32) -> f64 {
    ((f64::from(score) * 10_000.0).round() / 10_000.0).clamp(0.0, 1.0)
}

fn log_failure(failure: &Failure) {
    let kind = failure.kind();
    match failure {
        Failure::MissingField(field) => warn!(?kind, %field, "request rejected"),
        Failure::TooLarge => warn!(?kind, "request rejected"),
        Failure::Unauthorized(reason) => warn!(?kind, %reason, "request rejected"),
        Failure::BadImage(err) => warn!(?kind, detail = %err.detail(), "image rejected"),
        Failure::InferenceFailure(err) => error!(?kind, error = %err, "classification failed"),
        Failure::Internal(detail) => error!(?kind, %detail, "request failed"),
    }
}
