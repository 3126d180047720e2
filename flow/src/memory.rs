// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A flow sink keeping installed rules in memory

use crate::rule::{Cookie, FlowIntent, FlowKey, FlowRule};
use crate::sink::{FlowSink, SinkError};
use ordermap::OrderMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use topology::PathId;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Installed {
    rules: OrderMap<FlowKey, FlowRule>,
    apply_calls: usize,
    remove_calls: usize,
    fail_after: Option<usize>,
}

/// A [`FlowSink`] that installs rules in a table in memory.
///
/// It stands in for a real switch and lets the installed state be inspected.
#[derive(Debug, Default)]
pub struct MemoryFlowSink {
    state: Mutex<Installed>,
}

impl MemoryFlowSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every `apply` once `n` rules have been applied.
    #[must_use]
    pub fn failing_after(n: usize) -> Self {
        let sink = Self::default();
        sink.lock().fail_after = Some(n);
        sink
    }

    fn lock(&self) -> MutexGuard<'_, Installed> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of calls to [`FlowSink::apply`], including failed ones.
    #[must_use]
    pub fn apply_calls(&self) -> usize {
        self.lock().apply_calls
    }

    #[must_use]
    pub fn remove_calls(&self) -> usize {
        self.lock().remove_calls
    }

    /// Number of installed rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().rules.is_empty()
    }

    /// A copy of the installed rules, in installation order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(FlowKey, FlowRule)> {
        self.lock()
            .rules
            .iter()
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect()
    }

    /// The rules installed on one forwarder.
    #[must_use]
    pub fn rules_on(&self, node: &str) -> Vec<FlowRule> {
        self.lock()
            .rules
            .iter()
            .filter(|(k, _)| k.node == node)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// The rules installed for one path.
    #[must_use]
    pub fn rules_for_path(&self, path: PathId) -> Vec<(String, FlowRule)> {
        self.lock()
            .rules
            .iter()
            .filter(|(k, _)| k.cookie == Cookie::for_path(path))
            .map(|(k, r)| (k.node.clone(), r.clone()))
            .collect()
    }
}

impl FlowSink for MemoryFlowSink {
    fn apply(&self, node: &str, rule: &FlowRule) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.apply_calls += 1;
        if let Some(budget) = state.fail_after {
            if budget == 0 {
                warn!("Rejecting rule for {node}: injected failure");
                return Err(SinkError::Rejected {
                    node: node.to_owned(),
                    reason: "injected failure".to_owned(),
                });
            }
            state.fail_after = Some(budget - 1);
        }
        let key = rule.key(node);
        match rule.intent {
            FlowIntent::Add => {
                state.rules.insert(key, rule.clone());
            }
            FlowIntent::Remove => {
                state.rules.remove(&key);
            }
        }
        Ok(())
    }

    fn remove_all(&self, path: PathId) -> Result<usize, SinkError> {
        let mut state = self.lock();
        state.remove_calls += 1;
        let before = state.rules.len();
        let cookie = Cookie::for_path(path);
        state.rules.retain(|key, _| key.cookie != cookie);
        let removed = before - state.rules.len();
        debug!("Removed {removed} rules of path {path}");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{FlowAction, FlowMatch};
    use crate::table::TableId;
    use pretty_assertions::assert_eq;

    fn rule(path: u32, metadata: u64) -> FlowRule {
        FlowRule::new(
            TableId::new(2),
            450,
            FlowMatch::any().metadata(metadata),
            vec![FlowAction::GotoTable(TableId::new(3))],
            Cookie::for_path(PathId::new(path)),
        )
    }

    #[test]
    fn apply_is_idempotent() {
        let once = MemoryFlowSink::new();
        once.apply("SFF-A", &rule(1, 1)).unwrap();

        let twice = MemoryFlowSink::new();
        twice.apply("SFF-A", &rule(1, 1)).unwrap();
        twice.apply("SFF-A", &rule(1, 1)).unwrap();

        assert_eq!(once.snapshot(), twice.snapshot());
        assert_eq!(twice.apply_calls(), 2);
    }

    #[test]
    fn remove_intent_and_remove_all() {
        let sink = MemoryFlowSink::new();
        sink.apply("SFF-A", &rule(1, 1)).unwrap();
        sink.apply("SFF-B", &rule(1, 1)).unwrap();
        sink.apply("SFF-A", &rule(2, 2)).unwrap();
        assert_eq!(sink.len(), 3);

        sink.apply("SFF-B", &rule(1, 1).into_removal()).unwrap();
        assert_eq!(sink.rules_on("SFF-B"), vec![]);

        assert_eq!(sink.remove_all(PathId::new(1)), Ok(1));
        assert_eq!(sink.rules_for_path(PathId::new(1)), vec![]);
        assert_eq!(sink.rules_for_path(PathId::new(2)).len(), 1);
        assert_eq!(sink.remove_all(PathId::new(1)), Ok(0));
    }

    #[test]
    fn injected_failure() {
        let sink = MemoryFlowSink::failing_after(1);
        assert!(sink.apply("SFF-A", &rule(1, 1)).is_ok());
        assert!(matches!(
            sink.apply("SFF-A", &rule(1, 2)),
            Err(SinkError::Rejected { .. })
        ));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.apply_calls(), 2);
    }
}
