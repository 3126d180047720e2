// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Rule emission shared by the transports tagging frames with one identifier per hop.

use super::{Emitter, HopContext, NEXT_HOP, TRANSPORT_EGRESS, TransportStrategy};
use crate::errors::RenderError;
use crate::ids::IdAllocator;
use crate::params::{
    PRIORITY_NEXT_HOP, PRIORITY_NEXT_HOP_FROM_SF, PRIORITY_PATH_MAPPER,
    PRIORITY_TRANSPORT_EGRESS, PRIORITY_TRANSPORT_INGRESS,
};
use flow::{FlowAction, FlowMatch};
use std::fmt::Display;
use topology::{PathTransport, RenderedServicePath, SffDataPlaneLocator};
use tracing::debug;

/// A tag pushed on frames to identify the hop they belong to.
pub trait TagEncap {
    type Tag: Copy + Display + TryFrom<u32, Error: Display>;
    const TRANSPORT: PathTransport;

    fn match_tag(matches: FlowMatch, tag: Self::Tag) -> FlowMatch;
    fn push(tag: Self::Tag) -> FlowAction;
    fn pop() -> FlowAction;
}

/// Strategy for tag-based transports.
///
/// Every hop gets its own tag. The path-mapper replaces the tag with the path id, carried as
/// metadata through the next-hop and egress tables, and the egress table pushes the tag of the
/// hop the frame is sent to.
pub struct Tagged<'a, E: TagEncap> {
    ids: &'a IdAllocator,
    tags: Vec<E::Tag>,
}

impl<'a, E: TagEncap> Tagged<'a, E> {
    #[must_use]
    pub fn new(ids: &'a IdAllocator) -> Self {
        Self { ids, tags: vec![] }
    }

    /// The tags of the hops of the path, once allocated.
    #[must_use]
    pub fn tags(&self) -> &[E::Tag] {
        &self.tags
    }

    fn tag(&self, hop: &HopContext<'_>) -> Option<E::Tag> {
        self.tags.get(hop.index).copied()
    }

    fn metadata(out: &Emitter) -> u64 {
        u64::from(out.path().as_u32())
    }

    /// Match of the traffic coming back from the last function, on the last forwarder.
    fn final_match<'h>(
        hop: &HopContext<'h>,
        out: &mut Emitter,
        stage: &'static str,
    ) -> Option<(&'h str, FlowMatch)> {
        let src = hop.src?;
        let Some(last) = hop.prev_function else {
            out.skip(&src.name, stage, "no service function on the last hop");
            return None;
        };
        let Some(last_mac) = last.mac() else {
            out.skip(&src.name, stage, format!("{} has no MAC locator", last.name));
            return None;
        };
        let matches = FlowMatch::any()
            .metadata(Self::metadata(out))
            .eth_src(last_mac);
        Some((&src.name, matches))
    }

    fn final_next_hop(hop: &HopContext<'_>, out: &mut Emitter) {
        let Some((node, matches)) = Self::final_match(hop, out, NEXT_HOP) else {
            return;
        };
        let Some(mac) = hop.path_egress.and_then(SffDataPlaneLocator::mac) else {
            out.skip(node, NEXT_HOP, "path egress locator has no MAC");
            return;
        };
        let tables = *out.tables();
        out.rule(
            node,
            tables.next_hop,
            PRIORITY_NEXT_HOP_FROM_SF,
            matches,
            vec![
                FlowAction::SetEthDst(mac),
                FlowAction::GotoTable(tables.transport_egress),
            ],
        );
    }

    fn final_egress(hop: &HopContext<'_>, out: &mut Emitter) {
        let Some((node, matches)) = Self::final_match(hop, out, TRANSPORT_EGRESS) else {
            return;
        };
        let Some(output) = hop.final_output() else {
            out.skip(node, TRANSPORT_EGRESS, "egress locator has no port");
            return;
        };
        let table = out.tables().transport_egress;
        out.rule(node, table, PRIORITY_TRANSPORT_EGRESS, matches, vec![output]);
    }
}

impl<E: TagEncap> TransportStrategy for Tagged<'_, E> {
    fn transport(&self) -> PathTransport {
        E::TRANSPORT
    }

    fn allocate_path_identifiers(&mut self, rsp: &RenderedServicePath) -> Result<(), RenderError> {
        let ids = self.ids.allocate(rsp.path_id, rsp.hops.len())?;
        self.tags = ids
            .into_iter()
            .map(|id| {
                E::Tag::try_from(id).map_err(|e| RenderError::InvalidIdentifier {
                    transport: E::TRANSPORT,
                    reason: e.to_string(),
                })
            })
            .collect::<Result<_, _>>()?;
        if let (Some(first), Some(last)) = (self.tags.first(), self.tags.last()) {
            debug!("Path {}: {} tags {first}..={last}", rsp.path_id, E::TRANSPORT);
        }
        Ok(())
    }

    fn configure_transport_ingress(&self, hop: &HopContext<'_>, out: &mut Emitter) {
        let (Some(dst), Some(tag)) = (hop.dst, self.tag(hop)) else {
            return;
        };
        let tables = *out.tables();
        out.rule(
            &dst.name,
            tables.transport_ingress,
            PRIORITY_TRANSPORT_INGRESS,
            E::match_tag(FlowMatch::any(), tag),
            vec![FlowAction::GotoTable(tables.path_mapper)],
        );
    }

    fn configure_path_mapper(&self, hop: &HopContext<'_>, out: &mut Emitter) {
        let (Some(dst), Some(tag)) = (hop.dst, self.tag(hop)) else {
            return;
        };
        let tables = *out.tables();
        let metadata = Self::metadata(out);
        out.rule(
            &dst.name,
            tables.path_mapper,
            PRIORITY_PATH_MAPPER,
            E::match_tag(FlowMatch::any(), tag),
            vec![
                E::pop(),
                FlowAction::WriteMetadata(metadata),
                FlowAction::GotoTable(tables.next_hop),
            ],
        );
    }

    fn configure_next_hop(&self, hop: &HopContext<'_>, out: &mut Emitter) {
        if hop.is_final() {
            Self::final_next_hop(hop, out);
            return;
        }
        let Some(dst) = hop.dst else {
            return;
        };
        let Some(function) = hop.function else {
            out.skip(&dst.name, NEXT_HOP, "no service function on this hop");
            return;
        };
        let Some(mac) = function.mac() else {
            out.skip(&dst.name, NEXT_HOP, format!("{} has no MAC locator", function.name));
            return;
        };
        let tables = *out.tables();
        let mut matches = FlowMatch::any().metadata(Self::metadata(out));
        let mut priority = PRIORITY_NEXT_HOP;
        if let Some(prev) = hop.prev_function {
            let Some(prev_mac) = prev.mac() else {
                out.skip(&dst.name, NEXT_HOP, format!("{} has no MAC locator", prev.name));
                return;
            };
            matches = matches.eth_src(prev_mac);
            priority = PRIORITY_NEXT_HOP_FROM_SF;
        }
        let actions = vec![
            FlowAction::SetEthDst(mac),
            FlowAction::GotoTable(tables.transport_egress),
        ];
        if let Some(upstream) = hop.upstream() {
            out.rule(
                &upstream.name,
                tables.next_hop,
                priority,
                matches.clone(),
                actions.clone(),
            );
        }
        out.rule(&dst.name, tables.next_hop, priority, matches, actions);
    }

    fn configure_transport_egress(&self, hop: &HopContext<'_>, out: &mut Emitter) {
        if hop.is_final() {
            Self::final_egress(hop, out);
            return;
        }
        let (Some(dst), Some(tag)) = (hop.dst, self.tag(hop)) else {
            return;
        };
        let Some(function) = hop.function else {
            out.skip(&dst.name, TRANSPORT_EGRESS, "no service function on this hop");
            return;
        };
        let Some(mac) = function.mac() else {
            out.skip(
                &dst.name,
                TRANSPORT_EGRESS,
                format!("{} has no MAC locator", function.name),
            );
            return;
        };
        let tables = *out.tables();
        let matches = FlowMatch::any()
            .metadata(Self::metadata(out))
            .eth_dst(mac);

        if let Some(upstream) = hop.upstream() {
            match hop.src_egress.and_then(SffDataPlaneLocator::port_number) {
                Some(port) => out.rule(
                    &upstream.name,
                    tables.transport_egress,
                    PRIORITY_TRANSPORT_EGRESS,
                    matches.clone(),
                    vec![E::push(tag), FlowAction::Output(port)],
                ),
                None => out.skip(&upstream.name, TRANSPORT_EGRESS, "egress locator has no port"),
            }
        }
        match hop.function_port() {
            Some(port) => out.rule(
                &dst.name,
                tables.transport_egress,
                PRIORITY_TRANSPORT_EGRESS,
                matches,
                vec![E::push(tag), FlowAction::Output(port)],
            ),
            None => out.skip(
                &dst.name,
                TRANSPORT_EGRESS,
                format!("{} is attached to no port", function.name),
            ),
        }
    }
}
