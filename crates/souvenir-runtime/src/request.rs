use bytes::Bytes;
use souvenir_core::{ClassScores, InferenceError, NormalizedTensor};
use tokio::sync::oneshot;

/// An uploaded file as received from the transport.
#[derive(Clone, Debug)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            bytes: bytes.into(),
        }
    }

    /// A usable upload has a non-empty filename and at least one byte.
    pub fn is_present(&self) -> bool {
        self.file_name.as_deref().is_some_and(|name| !name.is_empty()) && !self.bytes.is_empty()
    }
}

/// One `/predict` call. Fields are `None` when the client did not send them.
#[derive(Clone, Debug, Default)]
pub struct InferenceRequest {
    pub token: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug)]
pub(crate) struct ClassifyRequest {
    pub tensor: NormalizedTensor,
    pub enqueued_at: std::time::Instant,
    pub resp_tx: oneshot::Sender<ClassifyResponse>,
}

#[derive(Debug)]
pub(crate) struct ClassifyResponse {
    pub scores: Result<ClassScores, InferenceError>,
    pub timings: Timings,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Timings {
    pub queued_us: u64,
    pub backend_us: u64,
}
