//! Batched, asynchronous soft deletion.
//!
//! Producers push [`DeletionRequest`]s into a bounded channel through a
//! [`DeletionQueue`]. One worker task owns the accumulation buffer and hands
//! it to [`Store::delete_urls`] on every tick of the flush interval. Shutting
//! the worker down drains the channel and performs one last flush.
//!
//! Delivery is at-most-once: a failed flush is logged and its batch dropped.

use crate::error::PipelineError;
use burrow_core::{DeletionRequest, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct DeletionConfig {
    /// Time between two flushes. The first flush happens one full interval
    /// after the pipeline starts.
    #[builder(default = Duration::from_secs(10))]
    pub flush_interval: Duration,
    /// Capacity of the request channel. A full channel makes producers wait.
    #[builder(default = 10)]
    pub capacity: usize,
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    Draining,
    Stopped,
}

pub struct DeletionPipeline;

impl DeletionPipeline {
    /// Spawns the worker task on the current runtime.
    pub fn spawn(store: Arc<dyn Store>, config: DeletionConfig) -> (DeletionQueue, DeletionWorker) {
        // mpsc::channel panics on zero capacity
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(PipelineState::Running);

        let flusher = Flusher {
            store,
            rx,
            shutdown: shutdown_rx,
            state: state_tx,
            buffer: Vec::new(),
        };
        let handle = tokio::spawn(flusher.run(config.flush_interval));

        info!(
            flush_interval = ?config.flush_interval,
            capacity = config.capacity,
            "deletion pipeline started"
        );

        let queue = DeletionQueue {
            tx,
            state: state_rx.clone(),
        };
        let worker = DeletionWorker {
            shutdown: shutdown_tx,
            state: state_rx,
            handle,
        };
        (queue, worker)
    }
}

/// Producer handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DeletionQueue {
    tx: mpsc::Sender<DeletionRequest>,
    state: watch::Receiver<PipelineState>,
}

impl DeletionQueue {
    /// Queues `request` for the next flush, waiting while the channel is full.
    pub async fn enqueue(&self, request: DeletionRequest) -> Result<(), PipelineError> {
        if request.short_codes.is_empty() {
            return Err(PipelineError::EmptyRequest);
        }

        self.tx
            .send(request)
            .await
            .map_err(|_| PipelineError::Closed)
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }
}

/// Owner handle for the worker task.
#[derive(Debug)]
pub struct DeletionWorker {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<PipelineState>,
    handle: JoinHandle<()>,
}

impl DeletionWorker {
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Stops accepting requests, flushes everything already queued and waits
    /// for the worker task to finish.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);

        if let Err(err) = self.handle.await {
            error!(error = %err, "deletion worker terminated abnormally");
        }
    }
}

struct Flusher {
    store: Arc<dyn Store>,
    rx: mpsc::Receiver<DeletionRequest>,
    shutdown: watch::Receiver<bool>,
    state: watch::Sender<PipelineState>,
    buffer: Vec<DeletionRequest>,
}

impl Flusher {
    async fn run(mut self, flush_interval: Duration) {
        let mut ticker = time::interval_at(Instant::now() + flush_interval, flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                // also fires when the worker handle is dropped
                _ = self.shutdown.changed() => break,
                // ahead of recv so a busy channel cannot postpone a flush
                _ = ticker.tick() => self.flush().await,
                request = self.rx.recv() => match request {
                    Some(request) => self.buffer.push(request),
                    None => {
                        debug!("all deletion queues dropped");
                        break;
                    }
                },
            }
        }

        self.state.send_replace(PipelineState::Draining);
        self.rx.close();
        while let Some(request) = self.rx.recv().await {
            self.buffer.push(request);
        }
        self.flush().await;

        self.state.send_replace(PipelineState::Stopped);
        info!("deletion pipeline stopped");
    }

    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut self.buffer);
        match self.store.delete_urls(&batch).await {
            Ok(()) => debug!(requests = batch.len(), "flushed deletion requests"),
            Err(err) => {
                error!(error = %err, requests = batch.len(), "failed to flush deletion requests")
            }
        }
    }
}
