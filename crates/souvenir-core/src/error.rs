use thiserror::Error;

use crate::Shape;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing")]
    Missing,
    #[error("invalid")]
    Invalid,
}

#[derive(Error, Debug)]
#[error("unsupported or corrupt image")]
pub struct DecodeError {
    reason: &'static str,
    #[source]
    source: Option<image::ImageError>,
}

impl DecodeError {
    pub fn new(reason: &'static str) -> Self {
        Self {
            reason,
            source: None,
        }
    }

    /// Operator-facing explanation, including the decoder's message if any.
    pub fn detail(&self) -> String {
        match &self.source {
            Some(err) => format!("{}: {err}", self.reason),
            None => self.reason.to_string(),
        }
    }
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        Self {
            reason: "decode failed",
            source: Some(err),
        }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        Self {
            reason: "format detection failed",
            source: Some(image::ImageError::IoError(err)),
        }
    }
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("model invocation failed: {0:#}")]
    Backend(anyhow::Error),

    #[error("model panicked: {0}")]
    Panicked(String),

    #[error("model returned {got} scores, label table has {expected}")]
    ScoreCount { expected: usize, got: usize },

    #[error("model returned non-finite scores")]
    NonFinite,

    #[error("classifier pool is not accepting requests")]
    Unavailable,

    #[error("classifier worker dropped the request")]
    WorkerDropped,
}

/// Raised at startup when a loaded model cannot serve the label table.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContractError {
    #[error("model declares {0} inputs, expected exactly 1")]
    InputCount(usize),

    #[error("model declares no outputs")]
    NoOutputs,

    #[error("model input dtype is {0:?}, expected F32")]
    InputDType(crate::DType),

    #[error("model input shape {declared:?} is not compatible with {expected}")]
    InputShape {
        declared: Vec<Option<usize>>,
        expected: Shape,
    },

    #[error("model output width {declared} does not match {labels} class labels")]
    OutputWidth { declared: usize, labels: usize },
}
