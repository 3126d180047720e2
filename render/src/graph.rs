// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The forwarding graph of a rendered service path: the ordered edges between the forwarders
//! a path goes through, plus the locators assigned at both ends of every forwarder.

use net::nsh::Si;
use ordermap::OrderMap;
use topology::{PathId, RenderedServicePath, SffDataPlaneLocator};
use tracing::debug;

/// An end of a graph edge.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GraphNode {
    /// Where traffic enters the chain. Never resolved against the topology.
    Ingress,
    /// Where traffic leaves the chain. Never resolved against the topology.
    Egress,
    Forwarder(String),
}

impl GraphNode {
    /// The forwarder name, unless this is one of the sentinels.
    #[must_use]
    pub fn forwarder(&self) -> Option<&str> {
        match self {
            GraphNode::Forwarder(name) => Some(name),
            GraphNode::Ingress | GraphNode::Egress => None,
        }
    }
}

/// One edge of the graph: traffic goes from `src` to `dst`, where `function` (if any) is applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphEntry {
    pub src: GraphNode,
    pub dst: GraphNode,
    pub function: Option<String>,
    pub path_id: PathId,
    pub service_index: Si,
}

/// The graph of one path, built for one compile and discarded afterwards.
#[derive(Clone, Debug, Default)]
pub struct SffGraph {
    entries: Vec<GraphEntry>,
    ingress_dpl: OrderMap<(String, PathId), String>,
    egress_dpl: OrderMap<(String, PathId), String>,
    path_egress: OrderMap<PathId, SffDataPlaneLocator>,
}

impl SffGraph {
    /// Lay the hops of `rsp` out, in ascending hop number, between the ingress and egress
    /// sentinels. A path with N hops yields N + 1 entries.
    #[must_use]
    pub fn build(rsp: &RenderedServicePath) -> Self {
        let mut entries = Vec::with_capacity(rsp.hops.len() + 1);
        let mut prev = GraphNode::Ingress;
        for hop in rsp.hops_in_order() {
            let next = GraphNode::Forwarder(hop.forwarder.clone());
            entries.push(GraphEntry {
                src: prev,
                dst: next.clone(),
                function: hop.function.clone(),
                path_id: rsp.path_id,
                service_index: hop.service_index,
            });
            prev = next;
        }
        entries.push(GraphEntry {
            src: prev,
            dst: GraphNode::Egress,
            function: None,
            path_id: rsp.path_id,
            service_index: Si::new(0),
        });
        debug!("Built graph of {} entries for path {}", entries.len(), rsp.path_id);
        Self {
            entries,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[GraphEntry] {
        &self.entries
    }

    /// The distinct forwarders of the graph, in order of first appearance.
    #[must_use]
    pub fn forwarders(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = vec![];
        for name in self.entries.iter().filter_map(|e| e.dst.forwarder()) {
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }

    /// Record the ingress locator of `node`. The first assignment wins.
    pub fn set_ingress_dpl(&mut self, node: &str, path: PathId, dpl: &str) {
        self.ingress_dpl
            .entry((node.to_owned(), path))
            .or_insert_with(|| dpl.to_owned());
    }

    /// Record the egress locator of `node`. The first assignment wins.
    pub fn set_egress_dpl(&mut self, node: &str, path: PathId, dpl: &str) {
        self.egress_dpl
            .entry((node.to_owned(), path))
            .or_insert_with(|| dpl.to_owned());
    }

    pub fn set_path_egress(&mut self, path: PathId, dpl: SffDataPlaneLocator) {
        self.path_egress.insert(path, dpl);
    }

    #[must_use]
    pub fn ingress_dpl(&self, node: &str, path: PathId) -> Option<&str> {
        self.ingress_dpl
            .get(&(node.to_owned(), path))
            .map(String::as_str)
    }

    #[must_use]
    pub fn egress_dpl(&self, node: &str, path: PathId) -> Option<&str> {
        self.egress_dpl
            .get(&(node.to_owned(), path))
            .map(String::as_str)
    }

    #[must_use]
    pub fn path_egress(&self, path: PathId) -> Option<&SffDataPlaneLocator> {
        self.path_egress.get(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use topology::testing::{empty_path, path_1};
    use topology::{PathTransport, RenderedServicePath, RspHop};

    fn fwd(name: &str) -> GraphNode {
        GraphNode::Forwarder(name.to_string())
    }

    #[test]
    fn path_1_graph() {
        let graph = SffGraph::build(&path_1(PathTransport::Vlan));
        let edges: Vec<_> = graph
            .entries()
            .iter()
            .map(|e| (e.src.clone(), e.dst.clone(), e.function.clone()))
            .collect();
        assert_eq!(
            edges,
            vec![
                (GraphNode::Ingress, fwd("SFF-A"), Some("fw1".to_string())),
                (fwd("SFF-A"), fwd("SFF-B"), Some("dpi1".to_string())),
                (fwd("SFF-B"), GraphNode::Egress, None),
            ]
        );
        assert_eq!(graph.entries()[2].service_index, Si::new(0));
        assert_eq!(graph.forwarders(), vec!["SFF-A", "SFF-B"]);
    }

    #[test]
    fn zero_hops_is_pass_through() {
        let graph = SffGraph::build(&empty_path(PathTransport::Nsh));
        assert_eq!(graph.entries().len(), 1);
        assert_eq!(graph.entries()[0].src, GraphNode::Ingress);
        assert_eq!(graph.entries()[0].dst, GraphNode::Egress);
        assert!(graph.forwarders().is_empty());
    }

    #[test]
    fn hop_numbers_define_the_order() {
        let mut rsp = RenderedServicePath::new("shuffled", 5, PathTransport::Mpls);
        rsp.hops.push(RspHop::new(1, "SFF-B", Some("dpi1"), 254));
        rsp.hops.push(RspHop::new(0, "SFF-A", Some("fw1"), 255));
        let graph = SffGraph::build(&rsp);
        assert_eq!(graph.entries()[0].dst, fwd("SFF-A"));
        assert_eq!(graph.entries()[1].src, fwd("SFF-A"));
        assert_eq!(graph.entries()[1].dst, fwd("SFF-B"));
    }

    #[test]
    fn first_assignment_wins() {
        let mut graph = SffGraph::default();
        let path = PathId::new(1);
        graph.set_ingress_dpl("SFF-A", path, "ingress");
        graph.set_ingress_dpl("SFF-A", path, "other");
        assert_eq!(graph.ingress_dpl("SFF-A", path), Some("ingress"));
        assert_eq!(graph.egress_dpl("SFF-A", path), None);
    }

    #[test]
    fn entry_count_property() {
        bolero::check!()
            .with_type::<Vec<(u8, bool)>>()
            .for_each(|hops| {
                let mut rsp = RenderedServicePath::new("prop", 1, PathTransport::Vlan);
                for (i, (si, with_function)) in hops.iter().take(64).enumerate() {
                    let function = with_function.then_some("fw1");
                    rsp.hops.push(RspHop::new(
                        u8::try_from(i).unwrap(),
                        &format!("SFF-{i}"),
                        function,
                        *si,
                    ));
                }
                let n = rsp.hops.len();
                let graph = SffGraph::build(&rsp);
                assert_eq!(graph.entries().len(), n + 1);
                assert_eq!(graph.entries()[0].src, GraphNode::Ingress);
                assert_eq!(graph.entries()[n].dst, GraphNode::Egress);
                for pair in graph.entries().windows(2) {
                    assert_eq!(pair[0].dst, pair[1].src);
                }
            });
    }
}
