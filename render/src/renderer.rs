// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The forwarding plan compiler: from a rendered service path to the flow rules of every
//! forwarder it goes through.

use crate::accessor::TopologyAccessor;
use crate::concurrency::sync::{Mutex, MutexGuard};
use crate::errors::{LocatorWarning, RenderError, ResolutionError};
use crate::graph::SffGraph;
use crate::ids::IdAllocator;
use crate::matcher::assign_locators;
use crate::params::{PRIORITY_MATCH_ANY, RendererParams};
use crate::registry::NodeRegistry;
use crate::service::Outcome;
use crate::transport::{Emitter, HopContext, IdPools, strategy_for};
use flow::{Cookie, FlowAction, FlowBatch, FlowMatch, FlowRule, FlowSink};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use topology::{
    PathId, PathTransport, RenderedServicePath, RspEvent, ServiceFunction,
    ServiceFunctionForwarder, TopologyStore,
};
use tracing::{debug, error, info};

/// The rules a compile would install, before anything is sent to the flow sink.
#[derive(Debug)]
pub struct RenderPlan {
    pub graph: SffGraph,
    pub batch: FlowBatch,
    pub warnings: Vec<LocatorWarning>,
}

/// Summary of a successful compile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderReport {
    pub path_id: PathId,
    /// Number of rules applied, table-miss rules included.
    pub rules: usize,
    pub nodes: Vec<String>,
    pub warnings: Vec<LocatorWarning>,
}

/// Summary of a path removal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoveReport {
    pub path_id: PathId,
    /// Number of rules of the path removed.
    pub removed: usize,
    /// Forwarders no path goes through any more, which lost their table-miss rules too.
    pub released: Vec<String>,
}

/// The topology objects a path refers to, fetched once per compile.
#[derive(Default)]
struct Resolved {
    forwarders: HashMap<String, Arc<ServiceFunctionForwarder>>,
    functions: HashMap<String, Arc<ServiceFunction>>,
}

impl Resolved {
    fn forwarder(&self, name: Option<&str>) -> Option<&ServiceFunctionForwarder> {
        self.forwarders.get(name?).map(|sff| &**sff)
    }

    fn function(&self, name: Option<&String>) -> Option<&ServiceFunction> {
        self.functions.get(name?).map(|sf| &**sf)
    }

    fn hop<'a>(&'a self, graph: &'a SffGraph, index: usize) -> Option<HopContext<'a>> {
        let entries = graph.entries();
        let entry = entries.get(index)?;
        let path = entry.path_id;
        let prev = index.checked_sub(1).and_then(|i| entries.get(i));
        let src = self.forwarder(entry.src.forwarder());
        let dst = self.forwarder(entry.dst.forwarder());
        Some(HopContext {
            index,
            entry,
            src,
            dst,
            function: self.function(entry.function.as_ref()),
            prev_function: self.function(prev.and_then(|p| p.function.as_ref())),
            prev_service_index: prev.map(|p| p.service_index),
            src_ingress: src.and_then(|s| s.locator(graph.ingress_dpl(&s.name, path)?)),
            src_egress: src.and_then(|s| s.locator(graph.egress_dpl(&s.name, path)?)),
            dst_ingress: dst.and_then(|d| d.locator(graph.ingress_dpl(&d.name, path)?)),
            path_egress: graph.path_egress(path),
        })
    }
}

/// Compiles rendered service paths into flow rules and applies them to a [`FlowSink`].
///
/// A renderer is shared by all compiles: identifier pools and the registry of initialized
/// forwarders live here, everything else is created for one compile and dropped after it.
pub struct RspRenderer {
    store: Arc<dyn TopologyStore>,
    sink: Arc<dyn FlowSink>,
    params: RendererParams,
    pools: IdPools,
    registry: NodeRegistry,
    /// Serializes the sink writes of concurrent compiles.
    writes: Mutex<()>,
}

impl RspRenderer {
    pub fn new(
        store: Arc<dyn TopologyStore>,
        sink: Arc<dyn FlowSink>,
        params: RendererParams,
    ) -> Result<Self, RenderError> {
        params.validate()?;
        let pools = IdPools {
            vlan: IdAllocator::new(PathTransport::Vlan, params.vlan, params.allocation),
            mpls: IdAllocator::new(PathTransport::Mpls, params.mpls, params.allocation),
        };
        Ok(Self {
            store,
            sink,
            params,
            pools,
            registry: NodeRegistry::new(),
            writes: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn params(&self) -> &RendererParams {
        &self.params
    }

    #[must_use]
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Fetch every forwarder and function of `rsp`, checking that each function is attached to
    /// the forwarder of its hop.
    fn resolve(&self, rsp: &RenderedServicePath) -> Result<Resolved, ResolutionError> {
        let mut accessor = TopologyAccessor::new(self.store.as_ref());
        let mut resolved = Resolved::default();
        for hop in rsp.hops_in_order() {
            let forwarder = accessor.get_forwarder(&hop.forwarder)?;
            if let Some(name) = &hop.function {
                let function = accessor.get_function(name)?;
                if forwarder.binding(name).is_none() {
                    return Err(ResolutionError::NotBound {
                        function: name.clone(),
                        forwarder: forwarder.name.clone(),
                    });
                }
                resolved.functions.insert(name.clone(), function);
            }
            resolved.forwarders.insert(hop.forwarder.clone(), forwarder);
        }
        Ok(resolved)
    }

    /// The table-miss rules of `nodes`.
    fn node_defaults<'a>(&self, nodes: impl IntoIterator<Item = &'a str>) -> FlowBatch {
        let tables = self.params.tables;
        let mut batch = FlowBatch::new();
        for node in nodes {
            let stages = [
                (tables.transport_ingress, FlowAction::Drop),
                (tables.path_mapper, FlowAction::GotoTable(tables.next_hop)),
                (tables.next_hop, FlowAction::GotoTable(tables.transport_egress)),
                (tables.transport_egress, FlowAction::Drop),
            ];
            for (table, action) in stages {
                let rule = FlowRule::new(
                    table,
                    PRIORITY_MATCH_ANY,
                    FlowMatch::any(),
                    vec![action],
                    Cookie::NodeDefault,
                );
                batch.push(node, rule);
            }
        }
        batch
    }

    /// Remove the table-miss rules of forwarders no path goes through any more.
    fn clear_nodes(&self, nodes: &[String]) -> Result<(), RenderError> {
        if nodes.is_empty() {
            return Ok(());
        }
        self.node_defaults(nodes.iter().map(String::as_str))
            .remove_from(self.sink.as_ref())?;
        info!("Removed table-miss rules of {}", nodes.join(", "));
        Ok(())
    }

    /// Compile `rsp` without touching the flow sink.
    ///
    /// Identifiers are reserved for the path, so that a later [`RspRenderer::render`] of the
    /// same path uses the same ones. The plan includes the table-miss rules of the forwarders
    /// no installed path goes through yet.
    #[tracing::instrument(level = "debug", skip_all, fields(rsp = %rsp.name, path = %rsp.path_id))]
    pub fn plan(&self, rsp: &RenderedServicePath) -> Result<RenderPlan, RenderError> {
        rsp.validate()?;
        let path = rsp.path_id;
        let mut graph = SffGraph::build(rsp);
        let resolved = self
            .resolve(rsp)
            .map_err(|source| RenderError::Resolution { path, source })?;
        assign_locators(&mut graph, &resolved.forwarders, rsp.transport, path)?;
        debug!("Forwarding graph of {rsp}:\n{graph}");

        let mut strategy = strategy_for(rsp.transport, &self.pools);
        strategy.allocate_path_identifiers(rsp)?;
        let mut out = Emitter::new(path, self.params.tables);
        for index in 0..graph.entries().len() {
            if let Some(hop) = resolved.hop(&graph, index) {
                strategy.configure_hop(&hop, &mut out);
            }
        }
        let (mut batch, warnings) = out.finish();
        batch.append(self.node_defaults(self.registry.pending(graph.forwarders())));
        debug!(
            "Planned {} rules on {} forwarders, {} warnings",
            batch.len(),
            batch.nodes().len(),
            warnings.len()
        );
        Ok(RenderPlan {
            graph,
            batch,
            warnings,
        })
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace whatever the sink holds for `path` with `plan`. Callers hold the write lock.
    fn install(&self, path: PathId, plan: RenderPlan) -> Result<RenderReport, RenderError> {
        let RenderPlan {
            graph,
            mut batch,
            warnings,
        } = plan;
        let forwarders = graph.forwarders();
        // other paths may have come or gone since the plan was made
        batch.retain(|_, rule| rule.cookie != Cookie::NodeDefault);
        batch.append(self.node_defaults(self.registry.pending(forwarders.iter().copied())));

        let stale = self.sink.remove_all(path)?;
        if stale > 0 {
            debug!("Removed {stale} previous rules of path {path}");
        }
        let rules = match batch.apply_to(self.sink.as_ref()) {
            Ok(rules) => rules,
            Err(e) => {
                error!("Failed to apply rules of path {path}: {e}");
                if let Err(cleanup) = self.sink.remove_all(path) {
                    error!("Failed to clean up path {path}: {cleanup}");
                }
                // the previous rules of the path are gone as well
                let released = self.registry.detach(path);
                if let Err(cleanup) = self.clear_nodes(&released) {
                    error!("Failed to clean up forwarders left by path {path}: {cleanup}");
                }
                return Err(e.into());
            }
        };
        let released = self.registry.attach(path, forwarders.iter().copied());
        self.clear_nodes(&released)?;
        let nodes: Vec<String> = batch.nodes().into_iter().map(str::to_owned).collect();
        Ok(RenderReport {
            path_id: path,
            rules,
            nodes,
            warnings,
        })
    }

    /// Compile `rsp` and apply the result, replacing any rules the path had before.
    ///
    /// Nothing is sent to the sink unless the whole path compiled. If the sink fails half-way,
    /// the rules of the path are removed again.
    #[tracing::instrument(level = "debug", skip_all, fields(rsp = %rsp.name, path = %rsp.path_id))]
    pub fn render(&self, rsp: &RenderedServicePath) -> Result<RenderReport, RenderError> {
        let plan = self.plan(rsp)?;
        let _writes = self.lock_writes();
        let report = self.install(rsp.path_id, plan)?;
        info!(
            "Rendered {rsp}: {} rules on {} forwarders",
            report.rules,
            report.nodes.len()
        );
        Ok(report)
    }

    /// Re-render a path after a change. The rules and identifiers of `old` are only given up
    /// once `new` is installed.
    #[tracing::instrument(level = "debug", skip_all, fields(rsp = %new.name, path = %new.path_id))]
    pub fn update(
        &self,
        old: &RenderedServicePath,
        new: &RenderedServicePath,
    ) -> Result<RenderReport, RenderError> {
        let plan = self.plan(new)?;
        let _writes = self.lock_writes();
        let report = self.install(new.path_id, plan)?;
        if old.path_id != new.path_id {
            let removed = self.sink.remove_all(old.path_id)?;
            debug!("Removed {removed} rules of former path id {}", old.path_id);
            let released = self.registry.detach(old.path_id);
            self.clear_nodes(&released)?;
        }
        if old.transport != new.transport || old.path_id != new.path_id {
            self.pools.release(old.transport, old.path_id);
        }
        info!("Updated {new}: {} rules", report.rules);
        Ok(report)
    }

    /// Remove every rule of `rsp` and give its identifiers back. Forwarders no other path goes
    /// through lose their table-miss rules too.
    #[tracing::instrument(level = "debug", skip_all, fields(rsp = %rsp.name, path = %rsp.path_id))]
    pub fn remove(&self, rsp: &RenderedServicePath) -> Result<RemoveReport, RenderError> {
        let _writes = self.lock_writes();
        let removed = self.sink.remove_all(rsp.path_id)?;
        let released = self.registry.detach(rsp.path_id);
        self.clear_nodes(&released)?;
        self.pools.release(rsp.transport, rsp.path_id);
        info!("Removed {rsp}: {removed} rules");
        Ok(RemoveReport {
            path_id: rsp.path_id,
            removed,
            released,
        })
    }

    pub fn handle(&self, event: &RspEvent) -> Result<Outcome, RenderError> {
        match event {
            RspEvent::Created(rsp) => self.render(rsp).map(Outcome::Rendered),
            RspEvent::Updated { old, new } => self.update(old, new).map(Outcome::Rendered),
            RspEvent::Deleted(rsp) => self.remove(rsp).map(Outcome::Removed),
        }
    }
}
