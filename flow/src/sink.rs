// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The boundary towards the switches

use crate::rule::FlowRule;
use topology::PathId;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("Forwarder {node} rejected rule: {reason}")]
    Rejected { node: String, reason: String },
    #[error("Flow sink is closed")]
    Closed,
    #[error("Flow writer queue is full")]
    QueueFull,
    #[error("Flow writer is gone")]
    WorkerGone,
    #[error("Could not start flow writer: {0}")]
    Spawn(String),
}

/// Something that programs rules into forwarders.
///
/// Applying a rule whose key (node, table, match, cookie) is already installed replaces it, so
/// applying the same rule twice leaves the same state as applying it once. A rule with the
/// `Remove` intent uninstalls the rule with its key, if any.
pub trait FlowSink: Send + Sync {
    fn apply(&self, node: &str, rule: &FlowRule) -> Result<(), SinkError>;

    /// Remove every rule installed with the cookie of `path`, on every forwarder and table.
    /// Returns how many rules were removed.
    fn remove_all(&self, path: PathId) -> Result<usize, SinkError>;
}
