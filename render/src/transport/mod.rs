// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Transport strategies: the encapsulation-specific part of rule emission.
//!
//! A strategy is selected once per path, from the path's transport type. It first allocates
//! the path's identifiers, then is called, for every graph entry in hop order, to emit the
//! rules of the four tables (transport-ingress, path-mapper, next-hop and transport-egress).
//! Rules go to an [`Emitter`], which also collects the warnings of rules that had to be
//! skipped.

mod mpls;
mod nsh;
mod tagged;
mod vlan;

pub use mpls::{Mpls, MplsStrategy};
pub use nsh::NshStrategy;
pub use tagged::{TagEncap, Tagged};
pub use vlan::{Vlan, VlanStrategy};

use crate::errors::{LocatorWarning, RenderError};
use crate::graph::{GraphEntry, GraphNode};
use crate::ids::IdAllocator;
use flow::{Cookie, FlowAction, FlowBatch, FlowMatch, FlowRule, TableId, TableLayout};
use net::nsh::Si;
use topology::{
    PathId, PathTransport, RenderedServicePath, ServiceFunction, ServiceFunctionForwarder,
    SffDataPlaneLocator,
};
use tracing::warn;

const TRANSPORT_INGRESS: &str = "transport-ingress";
const NEXT_HOP: &str = "next-hop";
const TRANSPORT_EGRESS: &str = "transport-egress";

/// Everything a strategy needs to know about one graph entry, resolved against the topology.
#[derive(Debug, Clone, Copy)]
pub struct HopContext<'a> {
    /// Position of the entry in the graph: hop `k` for `k < N`, `N` for the final entry.
    pub index: usize,
    pub entry: &'a GraphEntry,
    pub src: Option<&'a ServiceFunctionForwarder>,
    pub dst: Option<&'a ServiceFunctionForwarder>,
    pub function: Option<&'a ServiceFunction>,
    /// The function applied by the previous entry, if any.
    pub prev_function: Option<&'a ServiceFunction>,
    pub prev_service_index: Option<Si>,
    pub src_ingress: Option<&'a SffDataPlaneLocator>,
    pub src_egress: Option<&'a SffDataPlaneLocator>,
    pub dst_ingress: Option<&'a SffDataPlaneLocator>,
    /// The locator the path leaves the chain through.
    pub path_egress: Option<&'a SffDataPlaneLocator>,
}

impl HopContext<'_> {
    /// True for the entry leading to the egress sentinel.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.entry.dst == GraphNode::Egress
    }

    /// The source forwarder, when it is a real node distinct from the destination.
    #[must_use]
    pub fn upstream(&self) -> Option<&ServiceFunctionForwarder> {
        match (self.src, self.dst) {
            (Some(src), Some(dst)) if src.name == dst.name => None,
            (src, _) => src,
        }
    }

    /// The port of the destination forwarder the function of this entry is attached to.
    #[must_use]
    pub fn function_port(&self) -> Option<u32> {
        let function = self.function?;
        self.dst?
            .binding(&function.name)?
            .port
            .map(|p| p.port)
    }

    /// How traffic leaves the source forwarder at the end of the chain: back through the port
    /// it came in if the node uses a single locator both ways, else through its egress port.
    #[must_use]
    pub fn final_output(&self) -> Option<FlowAction> {
        let egress = self.src_egress?;
        if self.src_ingress.is_some_and(|ingress| ingress.name == egress.name) {
            Some(FlowAction::OutputInPort)
        } else {
            egress.port_number().map(FlowAction::Output)
        }
    }
}

/// Buffers the rules of one compile.
#[derive(Debug)]
pub struct Emitter {
    path: PathId,
    tables: TableLayout,
    cookie: Cookie,
    batch: FlowBatch,
    warnings: Vec<LocatorWarning>,
}

impl Emitter {
    #[must_use]
    pub fn new(path: PathId, tables: TableLayout) -> Self {
        Self {
            path,
            tables,
            cookie: Cookie::for_path(path),
            batch: FlowBatch::new(),
            warnings: vec![],
        }
    }

    #[must_use]
    pub fn path(&self) -> PathId {
        self.path
    }

    #[must_use]
    pub fn tables(&self) -> &TableLayout {
        &self.tables
    }

    #[must_use]
    pub fn batch(&self) -> &FlowBatch {
        &self.batch
    }

    pub fn rule(
        &mut self,
        node: &str,
        table: TableId,
        priority: u16,
        matches: FlowMatch,
        actions: Vec<FlowAction>,
    ) {
        let rule = FlowRule::new(table, priority, matches, actions, self.cookie);
        self.batch.push(node, rule);
    }

    /// Record a rule skipped for lack of a locator or address.
    pub fn skip(&mut self, node: &str, stage: &'static str, reason: impl Into<String>) {
        let warning = LocatorWarning {
            path: self.path,
            node: node.to_owned(),
            stage,
            reason: reason.into(),
        };
        warn!("{warning}");
        self.warnings.push(warning);
    }

    #[must_use]
    pub fn finish(self) -> (FlowBatch, Vec<LocatorWarning>) {
        (self.batch, self.warnings)
    }
}

/// Encapsulation-specific rule emission.
pub trait TransportStrategy {
    fn transport(&self) -> PathTransport;

    /// Reserve the encapsulation identifiers of every hop of `rsp`. Called once, before any
    /// rule is emitted.
    fn allocate_path_identifiers(&mut self, rsp: &RenderedServicePath) -> Result<(), RenderError>;

    fn configure_transport_ingress(&self, hop: &HopContext<'_>, out: &mut Emitter);

    fn configure_path_mapper(&self, hop: &HopContext<'_>, out: &mut Emitter);

    fn configure_next_hop(&self, hop: &HopContext<'_>, out: &mut Emitter);

    fn configure_transport_egress(&self, hop: &HopContext<'_>, out: &mut Emitter);

    /// Emit the rules of all four tables for one entry.
    fn configure_hop(&self, hop: &HopContext<'_>, out: &mut Emitter) {
        self.configure_transport_ingress(hop, out);
        self.configure_path_mapper(hop, out);
        self.configure_next_hop(hop, out);
        self.configure_transport_egress(hop, out);
    }
}

/// The identifier pools strategies draw from.
#[derive(Debug)]
pub struct IdPools {
    pub vlan: IdAllocator,
    pub mpls: IdAllocator,
}

impl IdPools {
    /// Return the identifiers held by `path` in the pool of `transport`.
    pub fn release(&self, transport: PathTransport, path: PathId) {
        match transport {
            PathTransport::Vlan => self.vlan.release(path),
            PathTransport::Mpls => self.mpls.release(path),
            PathTransport::Nsh => {}
        }
    }
}

/// The strategy for paths of the given transport type.
#[must_use]
pub fn strategy_for(transport: PathTransport, pools: &IdPools) -> Box<dyn TransportStrategy + '_> {
    match transport {
        PathTransport::Vlan => Box::new(VlanStrategy::new(&pools.vlan)),
        PathTransport::Mpls => Box::new(MplsStrategy::new(&pools.mpls)),
        PathTransport::Nsh => Box::new(NshStrategy::default()),
    }
}
