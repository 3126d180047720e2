// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A pool of worker threads compiling paths as their change events come in.

use crate::errors::RenderError;
use crate::renderer::{RemoveReport, RenderReport, RspRenderer};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use topology::{PathId, RspEvent};
use tracing::{debug, error, info, warn};

/// What handling an event did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Rendered(RenderReport),
    Removed(RemoveReport),
}

/// The result of one event, published by the worker that handled it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOutcome {
    pub path_id: PathId,
    pub name: String,
    pub result: Result<Outcome, RenderError>,
}

/// Runs an [`RspRenderer`] on a fixed pool of named threads.
///
/// Events of one path always go to the same worker, so they are handled in the order they
/// were submitted. Events of different paths may be handled concurrently.
pub struct RenderService {
    queues: Vec<Sender<RspEvent>>,
    workers: Vec<JoinHandle<()>>,
    outcomes: Receiver<RenderOutcome>,
}

fn worker_loop(renderer: &RspRenderer, events: &Receiver<RspEvent>, outcomes: &Sender<RenderOutcome>) {
    while let Ok(event) = events.recv() {
        debug!("Handling {event}");
        let result = renderer.handle(&event);
        if let Err(e) = &result {
            error!("Failed to handle {event}: {e}");
        }
        let outcome = RenderOutcome {
            path_id: event.path_id(),
            name: event.name().to_owned(),
            result,
        };
        debug!("{outcome}");
        if outcomes.send(outcome).is_err() {
            debug!("Nobody listens to outcomes any more");
        }
    }
}

impl RenderService {
    /// Start `renderer.params().workers` workers, each with a queue of
    /// `renderer.params().queue_depth` events. The tracing configuration of the parameters, if
    /// any, is applied first.
    pub fn start(renderer: Arc<RspRenderer>) -> Result<Self, RenderError> {
        renderer.params().apply_tracing()?;
        let workers = renderer.params().workers;
        let depth = renderer.params().queue_depth;
        let (outcome_tx, outcomes) = unbounded();
        let mut service = Self {
            queues: Vec::with_capacity(workers),
            workers: Vec::with_capacity(workers),
            outcomes,
        };
        for id in 0..workers {
            let (tx, rx) = bounded::<RspEvent>(depth);
            let renderer = renderer.clone();
            let outcome_tx = outcome_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("render-worker-{id}"))
                .spawn(move || worker_loop(&renderer, &rx, &outcome_tx))
                .map_err(|e| RenderError::Spawn(e.to_string()))?;
            service.queues.push(tx);
            service.workers.push(handle);
        }
        info!("Started {workers} render workers");
        Ok(service)
    }

    fn queue(&self, path: PathId) -> Result<&Sender<RspEvent>, RenderError> {
        let len = u32::try_from(self.queues.len()).map_err(|_| RenderError::ServiceStopped)?;
        if len == 0 {
            return Err(RenderError::ServiceStopped);
        }
        let index = usize::try_from(path.as_u32() % len).map_err(|_| RenderError::ServiceStopped)?;
        self.queues.get(index).ok_or(RenderError::ServiceStopped)
    }

    /// Queue `event`, waiting for room if the worker of its path is busy.
    pub fn submit(&self, event: RspEvent) -> Result<(), RenderError> {
        self.queue(event.path_id())?
            .send(event)
            .map_err(|_| RenderError::ServiceStopped)
    }

    /// Queue `event` if there is room, else drop it and fail with [`RenderError::QueueFull`].
    pub fn try_submit(&self, event: RspEvent) -> Result<(), RenderError> {
        self.queue(event.path_id())?
            .try_send(event)
            .map_err(|e| match e {
                TrySendError::Full(event) => {
                    warn!("Render queue full, rejecting {event}");
                    RenderError::QueueFull
                }
                TrySendError::Disconnected(_) => RenderError::ServiceStopped,
            })
    }

    /// The outcomes of handled events, in the order they completed.
    #[must_use]
    pub fn outcomes(&self) -> &Receiver<RenderOutcome> {
        &self.outcomes
    }

    /// Stop taking events, let the workers drain their queues and wait for them.
    pub fn shutdown(&mut self) {
        self.queues.clear();
        for worker in self.workers.drain(..) {
            let name = worker.thread().name().unwrap_or("render-worker").to_owned();
            if worker.join().is_err() {
                error!("Worker {name} panicked");
            }
        }
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
