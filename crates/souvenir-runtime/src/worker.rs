use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use souvenir_core::{ClassScores, ClassifierModel, InferenceError, NormalizedTensor};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::request::{ClassifyRequest, ClassifyResponse, Timings};

pub(crate) struct Worker {
    pub id: u32,
    pub inbox: mpsc::Receiver<ClassifyRequest>,
    pub model: Box<dyn ClassifierModel>,
}

impl Worker {
    pub fn run(mut self) {
        info!(worker_id = self.id, "worker started");
        while let Some(req) = self.inbox.blocking_recv() {
            let queued_us = req.enqueued_at.elapsed().as_micros() as u64;

            let t0 = Instant::now();
            let scores = self.classify(&req.tensor);
            let backend_us = t0.elapsed().as_micros() as u64;

            let resp = ClassifyResponse {
                scores,
                timings: Timings {
                    queued_us,
                    backend_us,
                },
            };
            if req.resp_tx.send(resp).is_err() {
                warn!(worker_id = self.id, "caller went away before the result was ready");
            }
        }
        info!(worker_id = self.id, "worker stopped");
    }

    fn classify(&mut self, tensor: &NormalizedTensor) -> Result<ClassScores, InferenceError> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.model.predict(tensor))) {
            Ok(Ok(scores)) => Ok(scores),
            Ok(Err(err)) => Err(InferenceError::Backend(err)),
            Err(payload) => Err(InferenceError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
