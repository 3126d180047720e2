// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Choice of the data plane locators joining adjacent forwarders of a path.

use crate::errors::RenderError;
use crate::graph::{GraphNode, SffGraph};
use std::collections::HashMap;
use std::sync::Arc;
use topology::{PathId, PathTransport, ServiceFunctionForwarder, SffDataPlaneLocator};
use tracing::debug;

const INGRESS: &str = "INGRESS";
const EGRESS: &str = "EGRESS";

struct Matcher<'a> {
    graph: &'a mut SffGraph,
    forwarders: &'a HashMap<String, Arc<ServiceFunctionForwarder>>,
    transport: PathTransport,
    path: PathId,
}

impl<'a> Matcher<'a> {
    fn forwarder(&self, name: &str) -> Result<&'a ServiceFunctionForwarder, RenderError> {
        self.forwarders
            .get(name)
            .map(|sff| &**sff)
            .ok_or_else(|| self.incompatible(name, name))
    }

    fn incompatible(&self, from: &str, to: &str) -> RenderError {
        RenderError::IncompatibleLocator {
            path: self.path,
            transport: self.transport,
            from: from.to_owned(),
            to: to.to_owned(),
        }
    }

    /// A forwarder with a single locator uses it both ways.
    fn assign_single_locators(&mut self) -> Result<(), RenderError> {
        let names: Vec<String> = self
            .graph
            .forwarders()
            .into_iter()
            .map(str::to_owned)
            .collect();
        for name in names {
            let sff = self.forwarder(&name)?;
            if let [only] = sff.locators.as_slice() {
                if only.transport() != self.transport.locator_transport() {
                    return Err(self.incompatible(&name, &name));
                }
                debug!("{name} has a single locator {}, used both ways", only.name);
                self.graph.set_ingress_dpl(&name, self.path, &only.name);
                self.graph.set_egress_dpl(&name, self.path, &only.name);
            }
        }
        Ok(())
    }

    /// Locators of `sff` usable on one side: the one already assigned on that side if any,
    /// otherwise every locator of the right transport but the one assigned on the other side.
    fn candidates(
        &self,
        sff: &'a ServiceFunctionForwarder,
        assigned: Option<&str>,
        other_side: Option<&str>,
    ) -> Vec<&'a SffDataPlaneLocator> {
        let wanted = self.transport.locator_transport();
        sff.locators
            .iter()
            .filter(|l| l.transport() == wanted)
            .filter(|l| match assigned {
                Some(name) => l.name == name,
                None => Some(l.name.as_str()) != other_side,
            })
            .collect()
    }

    fn egress_candidates(&self, sff: &'a ServiceFunctionForwarder) -> Vec<&'a SffDataPlaneLocator> {
        self.candidates(
            sff,
            self.graph.egress_dpl(&sff.name, self.path),
            self.graph.ingress_dpl(&sff.name, self.path),
        )
    }

    fn ingress_candidates(
        &self,
        sff: &'a ServiceFunctionForwarder,
    ) -> Vec<&'a SffDataPlaneLocator> {
        self.candidates(
            sff,
            self.graph.ingress_dpl(&sff.name, self.path),
            self.graph.egress_dpl(&sff.name, self.path),
        )
    }

    /// Pick the first compatible (upstream egress, downstream ingress) pair, in list order.
    fn match_edge(&mut self, src: &str, dst: &str) -> Result<(), RenderError> {
        let up = self.forwarder(src)?;
        let down = self.forwarder(dst)?;
        let downstream = self.ingress_candidates(down);
        let pair = self.egress_candidates(up).into_iter().find_map(|egress| {
            downstream
                .iter()
                .find(|ingress| egress.dpl.locator.is_compatible(&ingress.dpl.locator))
                .map(|ingress| (egress, *ingress))
        });
        let Some((egress, ingress)) = pair else {
            return Err(self.incompatible(src, dst));
        };
        debug!(
            "Path {}: {src}/{} -> {dst}/{}",
            self.path, egress.name, ingress.name
        );
        self.graph.set_egress_dpl(src, self.path, &egress.name);
        self.graph.set_ingress_dpl(dst, self.path, &ingress.name);
        Ok(())
    }

    fn match_path_ingress(&mut self, name: &str) -> Result<(), RenderError> {
        let sff = self.forwarder(name)?;
        let Some(ingress) = self.ingress_candidates(sff).first().copied() else {
            return Err(self.incompatible(INGRESS, name));
        };
        self.graph.set_ingress_dpl(name, self.path, &ingress.name);
        Ok(())
    }

    fn match_path_egress(&mut self, name: &str) -> Result<(), RenderError> {
        let sff = self.forwarder(name)?;
        let Some(egress) = self.egress_candidates(sff).first().copied() else {
            return Err(self.incompatible(name, EGRESS));
        };
        self.graph.set_egress_dpl(name, self.path, &egress.name);
        self.graph.set_path_egress(self.path, egress.clone());
        Ok(())
    }
}

/// Assign ingress and egress locators to every forwarder of `graph`.
///
/// `forwarders` must hold every forwarder of the graph. Edges between distinct forwarders are
/// matched first, in path order; then the ingress of the first forwarder and the egress of the
/// last one are taken among their remaining locators. Any edge left without a locator pair
/// fails the whole path.
pub fn assign_locators(
    graph: &mut SffGraph,
    forwarders: &HashMap<String, Arc<ServiceFunctionForwarder>>,
    transport: PathTransport,
    path: PathId,
) -> Result<(), RenderError> {
    let edges: Vec<(GraphNode, GraphNode)> = graph
        .entries()
        .iter()
        .map(|e| (e.src.clone(), e.dst.clone()))
        .collect();
    let mut matcher = Matcher {
        graph,
        forwarders,
        transport,
        path,
    };
    matcher.assign_single_locators()?;

    for (src, dst) in &edges {
        if let (GraphNode::Forwarder(src), GraphNode::Forwarder(dst)) = (src, dst)
            && src != dst
        {
            matcher.match_edge(src, dst)?;
        }
    }
    if let Some((_, GraphNode::Forwarder(first))) = edges.first() {
        matcher.match_path_ingress(first)?;
    }
    if let Some((GraphNode::Forwarder(last), _)) = edges.last() {
        matcher.match_path_egress(last)?;
    }
    Ok(())
}
