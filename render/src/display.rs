// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display implementations, for logs and debugging

use crate::graph::{GraphEntry, GraphNode, SffGraph};
use crate::renderer::{RemoveReport, RenderReport};
use crate::service::{Outcome, RenderOutcome};
use std::fmt::Display;

impl Display for GraphNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphNode::Ingress => write!(f, "INGRESS"),
            GraphNode::Egress => write!(f, "EGRESS"),
            GraphNode::Forwarder(name) => write!(f, "{name}"),
        }
    }
}

impl Display for GraphEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)?;
        if let Some(function) = &self.function {
            write!(f, " [{function}]")?;
        }
        write!(f, " path {} si {}", self.path_id, self.service_index)
    }
}

impl Display for SffGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in self.entries() {
            write!(f, "  {entry}")?;
            let path = entry.path_id;
            if let Some(node) = entry.dst.forwarder() {
                let ingress = self.ingress_dpl(node, path).unwrap_or("?");
                let egress = self.egress_dpl(node, path).unwrap_or("?");
                write!(f, " (in: {ingress}, out: {egress})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Display for RenderReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "path {}: {} rules on [{}]",
            self.path_id,
            self.rules,
            self.nodes.join(", ")
        )?;
        if !self.warnings.is_empty() {
            write!(f, ", {} rules skipped", self.warnings.len())?;
        }
        Ok(())
    }
}

impl Display for RemoveReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "path {}: {} rules removed", self.path_id, self.removed)?;
        if !self.released.is_empty() {
            write!(f, ", released [{}]", self.released.join(", "))?;
        }
        Ok(())
    }
}

impl Display for RenderOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            Ok(Outcome::Rendered(report)) => write!(f, "{}: rendered {report}", self.name),
            Ok(Outcome::Removed(report)) => write!(f, "{}: removed {report}", self.name),
            Err(e) => write!(f, "{}: failed: {e}", self.name),
        }
    }
}
