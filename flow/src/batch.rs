// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A set of rules built together and applied together.

use crate::rule::{FlowKey, FlowRule};
use crate::sink::{FlowSink, SinkError};
use ordermap::OrderMap;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Rules to be applied to one or more forwarders, in insertion order.
///
/// A batch holds at most one rule per [`FlowKey`]: pushing a rule with the key of an existing
/// one replaces it in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowBatch {
    rules: OrderMap<FlowKey, FlowRule>,
}

impl FlowBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule for `node`. Returns false if it replaced a rule with the same key.
    pub fn push(&mut self, node: &str, rule: FlowRule) -> bool {
        let key = rule.key(node);
        match self.rules.insert(key, rule) {
            Some(previous) => {
                debug!(
                    "Replacing rule on {node} table {} with the same match",
                    previous.table
                );
                false
            }
            None => true,
        }
    }

    /// Move all rules of `other` at the end of this batch.
    pub fn append(&mut self, other: FlowBatch) {
        for (key, rule) in other.rules {
            self.rules.insert(key, rule);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlowRule)> {
        self.rules.iter().map(|(key, rule)| (key.node.as_str(), rule))
    }

    /// The rules of one forwarder.
    pub fn rules_on<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a FlowRule> + 'a {
        self.iter()
            .filter(move |(n, _)| *n == node)
            .map(|(_, rule)| rule)
    }

    /// The forwarders the batch touches.
    #[must_use]
    pub fn nodes(&self) -> BTreeSet<&str> {
        self.rules.keys().map(|key| key.node.as_str()).collect()
    }

    /// Keep only the rules for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &FlowRule) -> bool) {
        self.rules.retain(|key, rule| keep(&key.node, rule));
    }

    /// Apply every rule, in order, stopping at the first failure.
    ///
    /// On failure, the rules applied so far are removed again before the error is returned.
    pub fn apply_to(&self, sink: &dyn FlowSink) -> Result<usize, SinkError> {
        for (applied, (node, rule)) in self.iter().enumerate() {
            if let Err(e) = sink.apply(node, rule) {
                self.roll_back(sink, applied);
                return Err(e);
            }
        }
        Ok(self.len())
    }

    fn roll_back(&self, sink: &dyn FlowSink, applied: usize) {
        debug!("Rolling back {applied} rules");
        for (node, rule) in self.iter().take(applied) {
            if let Err(e) = sink.apply(node, &rule.clone().into_removal()) {
                warn!("Could not roll back rule on {node} table {}: {e}", rule.table);
            }
        }
    }

    /// Remove every rule of the batch from `sink`, one by one.
    pub fn remove_from(&self, sink: &dyn FlowSink) -> Result<usize, SinkError> {
        for (node, rule) in self.iter() {
            sink.apply(node, &rule.clone().into_removal())?;
        }
        Ok(self.len())
    }
}
