use serde::{Serialize, Serializer};
use souvenir_core::AuthError;

use crate::{Failure, Field, Outcome, PredictionResult};

pub const SUCCESS_MESSAGE: &str = "Model is predicted successfully";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResponse {
    #[serde(serialize_with = "flag_as_string")]
    pub success: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PredictionData>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionData {
    pub result: &'static str,
    pub accuration: f64,
}

impl InferenceResponse {
    pub fn success(prediction: &PredictionResult) -> Self {
        Self {
            success: true,
            message: SUCCESS_MESSAGE,
            data: Some(PredictionData {
                result: prediction.label,
                accuration: prediction.confidence,
            }),
        }
    }

    pub fn failure(failure: &Failure) -> Self {
        Self::rejected(failure_message(failure))
    }

    /// A `success: "false"` envelope with a fixed message.
    pub fn rejected(message: &'static str) -> Self {
        Self {
            success: false,
            message,
            data: None,
        }
    }
}

/// Maps a pipeline outcome to the envelope sent to the client.
pub fn format(outcome: &Outcome) -> InferenceResponse {
    match outcome {
        Ok(prediction) => InferenceResponse::success(prediction),
        Err(failure) => InferenceResponse::failure(failure),
    }
}

/// Client wording for each failure. Never includes error detail.
pub fn failure_message(failure: &Failure) -> &'static str {
    match failure {
        Failure::MissingField(Field::Token) | Failure::Unauthorized(AuthError::Missing) => {
            "Missing authorization token"
        }
        Failure::MissingField(Field::Image) => "Missing image file",
        Failure::MissingField(Field::Form) => {
            "Request must be multipart/form-data with 'token' and 'image' fields"
        }
        Failure::TooLarge => "Uploaded image is too large",
        Failure::Unauthorized(AuthError::Invalid) => "Invalid authorization token",
        Failure::BadImage(_) => {
            "Unable to process the uploaded image. Upload a valid JPEG, PNG, GIF, BMP or WebP file."
        }
        Failure::InferenceFailure(_) => "An error occurred while making the prediction.",
        Failure::Internal(_) => "An internal error occurred.",
    }
}

fn flag_as_string<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *flag { "true" } else { "false" })
}
