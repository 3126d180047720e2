// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A flow sink that serializes writes through a bounded queue served by one writer thread.

use crate::rule::FlowRule;
use crate::sink::{FlowSink, SinkError};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use topology::PathId;
use tracing::{debug, info, warn};

enum Job {
    Apply {
        node: String,
        rule: FlowRule,
        reply: Sender<Result<(), SinkError>>,
    },
    RemoveAll {
        path: PathId,
        reply: Sender<Result<usize, SinkError>>,
    },
}

/// Wraps a [`FlowSink`] so that all writes go through a bounded queue.
///
/// Callers of [`FlowSink::apply`] and [`FlowSink::remove_all`] block until the writer has
/// processed their request, and while the queue is full. [`QueuedFlowSink::try_apply`] fails
/// with [`SinkError::QueueFull`] instead of waiting for room.
pub struct QueuedFlowSink {
    tx: Option<Sender<Job>>,
    writer: Option<JoinHandle<()>>,
}

fn writer_loop(inner: &Arc<dyn FlowSink>, rx: &Receiver<Job>) {
    while let Ok(job) = rx.recv() {
        match job {
            Job::Apply { node, rule, reply } => {
                let result = inner.apply(&node, &rule);
                if let Err(e) = &result {
                    warn!("Failed to apply rule on {node}: {e}");
                }
                // the caller may have given up waiting
                let _ = reply.send(result);
            }
            Job::RemoveAll { path, reply } => {
                let _ = reply.send(inner.remove_all(path));
            }
        }
    }
    debug!("Flow writer queue closed");
}

impl QueuedFlowSink {
    /// Start a writer thread forwarding to `inner`, with room for `depth` pending requests.
    pub fn new(inner: Arc<dyn FlowSink>, depth: usize) -> Result<Self, SinkError> {
        let (tx, rx) = bounded::<Job>(depth);
        let writer = thread::Builder::new()
            .name("flow-writer".to_string())
            .spawn(move || writer_loop(&inner, &rx))
            .map_err(|e| SinkError::Spawn(e.to_string()))?;
        info!("Started flow writer with queue depth {depth}");
        Ok(Self {
            tx: Some(tx),
            writer: Some(writer),
        })
    }

    fn sender(&self) -> Result<&Sender<Job>, SinkError> {
        self.tx.as_ref().ok_or(SinkError::Closed)
    }

    /// Like [`FlowSink::apply`], but fail right away if the queue is full.
    pub fn try_apply(&self, node: &str, rule: &FlowRule) -> Result<(), SinkError> {
        let (reply, result) = bounded(1);
        let job = Job::Apply {
            node: node.to_owned(),
            rule: rule.clone(),
            reply,
        };
        match self.sender()?.try_send(job) {
            Ok(()) => result.recv().map_err(|_| SinkError::WorkerGone)?,
            Err(TrySendError::Full(_)) => Err(SinkError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(SinkError::WorkerGone),
        }
    }
}

impl FlowSink for QueuedFlowSink {
    fn apply(&self, node: &str, rule: &FlowRule) -> Result<(), SinkError> {
        let (reply, result) = bounded(1);
        self.sender()?
            .send(Job::Apply {
                node: node.to_owned(),
                rule: rule.clone(),
                reply,
            })
            .map_err(|_| SinkError::WorkerGone)?;
        result.recv().map_err(|_| SinkError::WorkerGone)?
    }

    fn remove_all(&self, path: PathId) -> Result<usize, SinkError> {
        let (reply, result) = bounded(1);
        self.sender()?
            .send(Job::RemoveAll { path, reply })
            .map_err(|_| SinkError::WorkerGone)?;
        result.recv().map_err(|_| SinkError::WorkerGone)?
    }
}

impl Drop for QueuedFlowSink {
    fn drop(&mut self) {
        // closing the queue lets the writer drain it and exit
        self.tx.take();
        if let Some(writer) = self.writer.take()
            && writer.join().is_err()
        {
            warn!("Flow writer thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFlowSink;
    use crate::rule::{Cookie, FlowAction, FlowMatch};
    use crate::table::TableId;
    use std::sync::{Barrier, Mutex};

    fn rule(metadata: u64) -> FlowRule {
        FlowRule::new(
            TableId::new(0),
            250,
            FlowMatch::any().metadata(metadata),
            vec![FlowAction::Drop],
            Cookie::for_path(PathId::new(3)),
        )
    }

    #[test]
    fn writes_go_through() {
        let memory = Arc::new(MemoryFlowSink::new());
        let queued = QueuedFlowSink::new(memory.clone(), 4).unwrap();
        queued.apply("SFF-A", &rule(1)).unwrap();
        queued.try_apply("SFF-A", &rule(2)).unwrap();
        assert_eq!(memory.len(), 2);
        assert_eq!(queued.remove_all(PathId::new(3)), Ok(2));
        assert!(memory.is_empty());
    }

    #[test]
    fn errors_are_reported() {
        let memory = Arc::new(MemoryFlowSink::failing_after(0));
        let queued = QueuedFlowSink::new(memory, 1).unwrap();
        assert!(matches!(
            queued.apply("SFF-A", &rule(1)),
            Err(SinkError::Rejected { .. })
        ));
    }

    /// A sink whose writer blocks until released, to fill the queue.
    struct Gate {
        entered: Barrier,
        release: Mutex<()>,
    }
    impl FlowSink for Gate {
        fn apply(&self, _node: &str, _rule: &FlowRule) -> Result<(), SinkError> {
            self.entered.wait();
            let _held = self.release.lock().unwrap();
            Ok(())
        }
        fn remove_all(&self, _path: PathId) -> Result<usize, SinkError> {
            Ok(0)
        }
    }

    #[test]
    fn full_queue_is_reported() {
        let gate = Arc::new(Gate {
            entered: Barrier::new(2),
            release: Mutex::new(()),
        });
        let held = gate.release.lock().unwrap();
        let queued = Arc::new(QueuedFlowSink::new(gate.clone(), 1).unwrap());

        // first request keeps the writer busy
        let busy = {
            let queued = queued.clone();
            thread::spawn(move || queued.apply("SFF-A", &rule(1)))
        };
        gate.entered.wait();

        // second request fills the queue, third does not fit
        let queued_2 = {
            let queued = queued.clone();
            thread::spawn(move || queued.apply("SFF-A", &rule(2)))
        };
        while queued.tx.as_ref().unwrap().is_empty() {
            thread::yield_now();
        }
        assert_eq!(queued.try_apply("SFF-A", &rule(3)), Err(SinkError::QueueFull));

        drop(held);
        gate.entered.wait();
        assert_eq!(busy.join().unwrap(), Ok(()));
        assert_eq!(queued_2.join().unwrap(), Ok(()));
    }
}
