// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bookkeeping of the forwarders whose table-miss rules are installed.

use crate::concurrency::sync::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::PoisonError;
use topology::PathId;
use tracing::debug;

/// The forwarders that received their table-miss (match-any) rules, with the paths going
/// through each of them.
///
/// Shared by all compiles of a renderer. A forwarder gets its table-miss rules with the first
/// path using it and loses them with the last one.
#[derive(Debug)]
pub struct NodeRegistry {
    nodes: Mutex<BTreeMap<String, BTreeSet<PathId>>>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn is_initialized(&self, node: &str) -> bool {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(node)
    }

    /// The nodes among `nodes` which have not been initialized yet, in the order given.
    pub fn pending<'a>(&self, nodes: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        let known = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        let mut pending: Vec<&str> = vec![];
        for node in nodes {
            if !known.contains_key(node) && !pending.contains(&node) {
                pending.push(node);
            }
        }
        pending
    }

    /// Record that `path` now goes through `nodes`, and through no other node.
    ///
    /// Only call this once the rules of the path were applied. Returns the nodes the path left
    /// which no other path goes through.
    pub fn attach<'a>(&self, path: PathId, nodes: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let nodes: BTreeSet<&str> = nodes.into_iter().collect();
        let mut known = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        for (node, paths) in known.iter_mut() {
            if !nodes.contains(node.as_str()) {
                paths.remove(&path);
            }
        }
        for node in nodes {
            let paths = known.entry(node.to_owned()).or_default();
            if paths.is_empty() {
                debug!("Forwarder {node} initialized");
            }
            paths.insert(path);
        }
        let unused: Vec<String> = known
            .iter()
            .filter(|(_, paths)| paths.is_empty())
            .map(|(node, _)| node.clone())
            .collect();
        for node in &unused {
            known.remove(node);
            debug!("Forwarder {node} no longer used");
        }
        unused
    }

    /// Record that `path` is gone. Returns the nodes no path goes through any more.
    pub fn detach(&self, path: PathId) -> Vec<String> {
        self.attach(path, [])
    }

    /// The paths going through `node`.
    #[must_use]
    pub fn paths_on(&self, node: &str) -> Vec<PathId> {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(node)
            .map(|paths| paths.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Forget about `node`, e.g. after it was reset, so that it gets initialized again.
    pub fn forget(&self, node: &str) -> bool {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(node)
            .is_some()
    }

    #[must_use]
    pub fn initialized(&self) -> Vec<String> {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
