use std::time::Instant;

use anyhow::{ensure, Result};
use souvenir_core::{ClassScores, ClassifierModel, InferenceError, ModelSpec, NormalizedTensor};
use tokio::sync::{mpsc, oneshot};

use crate::request::{ClassifyRequest, Timings};
use crate::scheduler::{Scheduler, SchedulerHandle};
use crate::worker::Worker;

const SCHEDULER_QUEUE: usize = 1024;
const WORKER_QUEUE: usize = 64;

/// Scores from one classify call plus where the time went.
#[derive(Debug, Clone)]
pub struct Classification {
    pub scores: ClassScores,
    pub timings: Timings,
}

/// Cloneable front door to the classifier workers.
#[derive(Clone, Debug)]
pub struct ClassifierHandle {
    scheduler: SchedulerHandle,
    spec: ModelSpec,
    workers: usize,
}

impl ClassifierHandle {
    /// Starts one worker per model. Must be called inside a tokio runtime.
    pub fn spawn(models: Vec<Box<dyn ClassifierModel>>) -> Result<Self> {
        ensure!(!models.is_empty(), "at least one classifier model is required");
        let spec = models[0].spec().clone();
        let workers = models.len();

        let (sched_tx, sched_rx) = mpsc::channel(SCHEDULER_QUEUE);
        let mut worker_txs = Vec::with_capacity(workers);
        for (id, model) in models.into_iter().enumerate() {
            let (w_tx, w_rx) = mpsc::channel(WORKER_QUEUE);
            worker_txs.push(w_tx);
            let worker = Worker {
                id: id as u32,
                inbox: w_rx,
                model,
            };
            tokio::task::spawn_blocking(move || worker.run());
        }

        let scheduler = Scheduler::new(sched_rx, worker_txs);
        tokio::spawn(scheduler.run());

        Ok(Self {
            scheduler: Scheduler::handle(sched_tx),
            spec,
            workers,
        })
    }

    pub async fn classify(&self, tensor: NormalizedTensor) -> Result<Classification, InferenceError> {
        let (tx, rx) = oneshot::channel();
        self.scheduler
            .submit(ClassifyRequest {
                tensor,
                enqueued_at: Instant::now(),
                resp_tx: tx,
            })
            .await?;

        let resp = rx.await.map_err(|_| InferenceError::WorkerDropped)?;
        Ok(Classification {
            scores: resp.scores?,
            timings: resp.timings,
        })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}
