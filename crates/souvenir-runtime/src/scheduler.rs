use souvenir_core::InferenceError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::request::ClassifyRequest;

#[derive(Clone, Debug)]
pub(crate) struct SchedulerHandle {
    tx: mpsc::Sender<ClassifyRequest>,
}

impl SchedulerHandle {
    pub async fn submit(&self, req: ClassifyRequest) -> Result<(), InferenceError> {
        self.tx
            .send(req)
            .await
            .map_err(|_| InferenceError::Unavailable)
    }
}

/// Hands requests to workers in round-robin order.
pub(crate) struct Scheduler {
    rx: mpsc::Receiver<ClassifyRequest>,
    worker_txs: Vec<mpsc::Sender<ClassifyRequest>>,
    rr: usize,
}

impl Scheduler {
    pub fn new(
        rx: mpsc::Receiver<ClassifyRequest>,
        worker_txs: Vec<mpsc::Sender<ClassifyRequest>>,
    ) -> Self {
        Self {
            rx,
            worker_txs,
            rr: 0,
        }
    }

    pub fn handle(tx: mpsc::Sender<ClassifyRequest>) -> SchedulerHandle {
        SchedulerHandle { tx }
    }

    pub async fn run(mut self) {
        while let Some(mut req) = self.rx.recv().await {
            // A closed inbox means its worker thread is gone; retire it and
            // retry the same request on the next one.
            loop {
                if self.worker_txs.is_empty() {
                    warn!("no classifier workers left, scheduler stopping");
                    return;
                }
                let idx = self.rr % self.worker_txs.len();
                self.rr = self.rr.wrapping_add(1);
                match self.worker_txs[idx].send(req).await {
                    Ok(()) => break,
                    Err(mpsc::error::SendError(returned)) => {
                        warn!(slot = idx, "classifier worker inbox closed");
                        self.worker_txs.swap_remove(idx);
                        req = returned;
                    }
                }
            }
        }
        debug!("scheduler input closed");
    }
}
