// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! NSH over VXLAN-GPE transport.
//!
//! The service path identifier is the path id and the service index comes with every hop, so
//! nothing is allocated and no path-mapper table is needed: every table matches on the
//! (path, index) pair directly.

use super::{Emitter, HopContext, NEXT_HOP, TRANSPORT_EGRESS, TRANSPORT_INGRESS, TransportStrategy};
use crate::errors::RenderError;
use crate::params::{PRIORITY_NEXT_HOP, PRIORITY_TRANSPORT_EGRESS, PRIORITY_TRANSPORT_INGRESS};
use flow::{FlowAction, FlowMatch};
use net::nsh::{Si, Spi};
use std::net::{IpAddr, Ipv4Addr};
use topology::{PathTransport, RenderedServicePath, SffDataPlaneLocator};
use tracing::debug;

#[derive(Debug, Default)]
pub struct NshStrategy {
    spi: Option<Spi>,
}

fn ipv4(addr: Option<IpAddr>, what: &str) -> Result<Ipv4Addr, String> {
    match addr {
        Some(IpAddr::V4(ip)) => Ok(ip),
        Some(IpAddr::V6(ip)) => Err(format!("{what} has IPv6 address {ip}")),
        None => Err(format!("{what} has no IP locator")),
    }
}

impl NshStrategy {
    #[must_use]
    pub fn spi(&self) -> Option<Spi> {
        self.spi
    }

    /// The NSH header of the traffic this entry handles.
    ///
    /// Traffic coming back from the last function carries the index that function left.
    fn header(
        &self,
        hop: &HopContext<'_>,
        out: &mut Emitter,
        stage: &'static str,
    ) -> Option<(Spi, Si)> {
        let spi = self.spi?;
        if !hop.is_final() {
            return Some((spi, hop.entry.service_index));
        }
        let src = hop.src?;
        match hop.prev_service_index.and_then(Si::decremented) {
            Some(si) => Some((spi, si)),
            None => {
                out.skip(&src.name, stage, "service index exhausted on the last hop");
                None
            }
        }
    }
}

impl TransportStrategy for NshStrategy {
    fn transport(&self) -> PathTransport {
        PathTransport::Nsh
    }

    fn allocate_path_identifiers(&mut self, rsp: &RenderedServicePath) -> Result<(), RenderError> {
        let spi = Spi::new(rsp.path_id.as_u32())
            .map_err(|_| RenderError::InvalidPathId(rsp.path_id))?;
        debug!("Path {}: service path identifier {spi}", rsp.path_id);
        self.spi = Some(spi);
        Ok(())
    }

    fn configure_transport_ingress(&self, hop: &HopContext<'_>, out: &mut Emitter) {
        let Some((spi, si)) = self.header(hop, out, TRANSPORT_INGRESS) else {
            return;
        };
        let tables = *out.tables();
        let nodes = [hop.dst, hop.upstream()];
        for node in nodes.into_iter().flatten() {
            out.rule(
                &node.name,
                tables.transport_ingress,
                PRIORITY_TRANSPORT_INGRESS,
                FlowMatch::any().nsh(spi, si),
                vec![FlowAction::GotoTable(tables.next_hop)],
            );
        }
    }

    fn configure_path_mapper(&self, _hop: &HopContext<'_>, _out: &mut Emitter) {}

    fn configure_next_hop(&self, hop: &HopContext<'_>, out: &mut Emitter) {
        let Some((spi, si)) = self.header(hop, out, NEXT_HOP) else {
            return;
        };
        let tables = *out.tables();
        let next_hop = |out: &mut Emitter, node: &str, target: Result<Ipv4Addr, String>| {
            match target {
                Ok(ip) => out.rule(
                    node,
                    tables.next_hop,
                    PRIORITY_NEXT_HOP,
                    FlowMatch::any().nsh(spi, si),
                    vec![
                        FlowAction::SetTunnelIpv4Dst(ip),
                        FlowAction::GotoTable(tables.transport_egress),
                    ],
                ),
                Err(reason) => out.skip(node, NEXT_HOP, reason),
            }
        };

        if hop.is_final() {
            if let Some(src) = hop.src {
                let target = ipv4(
                    hop.path_egress.and_then(SffDataPlaneLocator::ip),
                    "path egress locator",
                );
                next_hop(out, &src.name, target);
            }
            return;
        }
        let Some(dst) = hop.dst else {
            return;
        };
        if let Some(upstream) = hop.upstream() {
            let target = ipv4(
                hop.dst_ingress.and_then(SffDataPlaneLocator::ip),
                &format!("ingress locator of {}", dst.name),
            );
            next_hop(out, &upstream.name, target);
        }
        let target = match hop.function {
            Some(function) => ipv4(function.ip(), &function.name),
            None => Err("no service function on this hop".to_string()),
        };
        next_hop(out, &dst.name, target);
    }

    fn configure_transport_egress(&self, hop: &HopContext<'_>, out: &mut Emitter) {
        let Some((spi, si)) = self.header(hop, out, TRANSPORT_EGRESS) else {
            return;
        };
        let table = out.tables().transport_egress;
        let egress = |out: &mut Emitter, node: &str, output: Option<FlowAction>| match output {
            Some(output) => out.rule(
                node,
                table,
                PRIORITY_TRANSPORT_EGRESS,
                FlowMatch::any().nsh(spi, si),
                vec![FlowAction::SetNsp(spi), FlowAction::SetNsi(si), output],
            ),
            None => out.skip(node, TRANSPORT_EGRESS, "no output port"),
        };

        if hop.is_final() {
            if let Some(src) = hop.src {
                egress(out, &src.name, hop.final_output());
            }
            return;
        }
        let Some(dst) = hop.dst else {
            return;
        };
        if let Some(upstream) = hop.upstream() {
            let port = hop.src_egress.and_then(SffDataPlaneLocator::port_number);
            egress(out, &upstream.name, port.map(FlowAction::Output));
        }
        egress(out, &dst.name, hop.function_port().map(FlowAction::Output));
    }
}

#[cfg(all(test, not(feature = "shuttle")))]
mod tests {
    use super::*;
    use crate::transport::tests::Fixture;
    use flow::TableId;
    use pretty_assertions::assert_eq;
    use topology::testing::{DPI1_IP, FW1_IP, path_1, sff_ip};
    use topology::{PathId, RenderedServicePath};

    fn next_hop_targets(batch: &flow::FlowBatch, node: &str) -> Vec<(u8, Ipv4Addr)> {
        batch
            .rules_on(node)
            .filter(|r| r.table == TableId::new(2))
            .filter_map(|r| match r.actions.first() {
                Some(FlowAction::SetTunnelIpv4Dst(ip)) => {
                    Some((r.matches.nsi.map_or(0, Si::as_u8), *ip))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn path_1_rules() {
        let fixture = Fixture::new(path_1(PathTransport::Nsh));
        let mut strategy = NshStrategy::default();
        let (batch, warnings) = fixture.emit(&mut strategy).finish();
        assert!(warnings.is_empty());
        assert_eq!(strategy.spi().map(Spi::as_u32), Some(1));
        assert_eq!(batch.len(), 12);
        // no path-mapper table
        assert!(batch.iter().all(|(_, r)| r.table != TableId::new(1)));

        assert_eq!(
            next_hop_targets(&batch, "SFF-A"),
            vec![(255, FW1_IP), (254, sff_ip(2, 1))]
        );
        assert_eq!(
            next_hop_targets(&batch, "SFF-B"),
            vec![(254, DPI1_IP), (253, sff_ip(2, 2))]
        );

        let spi = Spi::new(1).unwrap();
        let last = batch
            .rules_on("SFF-B")
            .find(|r| r.table == TableId::new(3) && r.matches.nsi == Some(Si::new(253)))
            .unwrap();
        assert_eq!(
            last.actions,
            vec![
                FlowAction::SetNsp(spi),
                FlowAction::SetNsi(Si::new(253)),
                FlowAction::Output(22)
            ]
        );
    }

    #[test]
    fn path_id_must_fit_the_header() {
        let mut strategy = NshStrategy::default();
        let rsp = RenderedServicePath::new("too-big", 0x0100_0000, PathTransport::Nsh);
        assert_eq!(
            strategy.allocate_path_identifiers(&rsp),
            Err(RenderError::InvalidPathId(PathId::new(0x0100_0000)))
        );
        assert_eq!(strategy.spi(), None);
    }

    #[test]
    fn exhausted_index_skips_the_final_rules() {
        let rsp = RenderedServicePath::new("short", 7, PathTransport::Nsh)
            .with_hop("SFF-A", Some("fw1"), 0);
        let fixture = Fixture::new(rsp);
        let mut strategy = NshStrategy::default();
        let (batch, warnings) = fixture.emit(&mut strategy).finish();
        assert_eq!(batch.len(), 3);
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().all(|w| w.node == "SFF-A"));
    }
}
