// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Sample topologies for tests.
//!
//! Two forwarders, SFF-A and SFF-B, each with an "ingress" and an "egress" locator of the
//! requested transport. SFF-A hosts the firewall fw1, SFF-B the DPI engine dpi1. SFF-C has a
//! single locator and hosts nat1.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use crate::forwarder::{PortInfo, ServiceFunctionForwarder};
use crate::function::{ServiceFunction, SfType};
use crate::locator::DataPlaneLocator;
use crate::path::{PathTransport, RenderedServicePath};
use crate::store::TopologyDb;
use net::eth::Mac;
use net::mpls::MplsLabel;
use net::nsh::VXLAN_GPE_PORT;
use std::net::{IpAddr, Ipv4Addr};

pub const FW1_MAC: Mac = Mac([0x02, 0x00, 0x00, 0x00, 0x01, 0x01]);
pub const DPI1_MAC: Mac = Mac([0x02, 0x00, 0x00, 0x00, 0x02, 0x01]);
pub const NAT1_MAC: Mac = Mac([0x02, 0x00, 0x00, 0x00, 0x03, 0x01]);
pub const FW1_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 1, 1);
pub const DPI1_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 2, 1);
pub const NAT1_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 3, 1);

/// Port of forwarder `sff` (1 = A, 2 = B, 3 = C) behind locator `slot`.
#[must_use]
pub fn port(sff: u32, slot: u32) -> u32 {
    sff * 10 + slot
}

/// The MAC of the switch port behind locator `slot` of forwarder `sff`.
#[must_use]
pub fn port_mac(sff: u8, slot: u8) -> Mac {
    Mac([0x02, 0x00, 0x00, 0xff, sff, slot])
}

/// The IP of locator `slot` of forwarder `sff`.
#[must_use]
pub fn sff_ip(sff: u8, slot: u8) -> Ipv4Addr {
    Ipv4Addr::new(192, 168, sff, slot)
}

fn sff_locator(transport: PathTransport, sff: u8, slot: u8) -> DataPlaneLocator {
    match transport {
        PathTransport::Vlan => DataPlaneLocator::ethernet(Some(port_mac(sff, slot)), None),
        PathTransport::Mpls => {
            DataPlaneLocator::mpls(MplsLabel::new(1000 * u32::from(sff) + u32::from(slot)).unwrap())
        }
        PathTransport::Nsh => {
            DataPlaneLocator::vxlan_gpe(IpAddr::V4(sff_ip(sff, slot)), VXLAN_GPE_PORT)
        }
    }
}

fn port_info(sff: u8, slot: u8) -> Option<PortInfo> {
    Some(PortInfo::new(port(u32::from(sff), u32::from(slot))).with_mac(port_mac(sff, slot)))
}

fn function(name: &str, kind: SfType, mac: Mac, ip: Ipv4Addr) -> ServiceFunction {
    ServiceFunction::new(name, kind)
        .with_locator("eth0", DataPlaneLocator::ethernet(Some(mac), None))
        .with_locator(
            "gpe0",
            DataPlaneLocator::vxlan_gpe(IpAddr::V4(ip), VXLAN_GPE_PORT),
        )
}

#[must_use]
pub fn fw1() -> ServiceFunction {
    function("fw1", SfType::Firewall, FW1_MAC, FW1_IP)
}
#[must_use]
pub fn dpi1() -> ServiceFunction {
    function("dpi1", SfType::Dpi, DPI1_MAC, DPI1_IP)
}
#[must_use]
pub fn nat1() -> ServiceFunction {
    function("nat1", SfType::Napt44, NAT1_MAC, NAT1_IP)
}

/// SFF-A: locators "egress" (slot 2) then "ingress" (slot 1); fw1 on slot 9.
#[must_use]
pub fn sff_a(transport: PathTransport) -> ServiceFunctionForwarder {
    ServiceFunctionForwarder::new("SFF-A")
        .with_locator("egress", sff_locator(transport, 1, 2), port_info(1, 2))
        .with_locator("ingress", sff_locator(transport, 1, 1), port_info(1, 1))
        .with_function(
            "fw1",
            DataPlaneLocator::ethernet(None, None),
            port_info(1, 9),
        )
}

/// SFF-B: locators "ingress" (slot 1) then "egress" (slot 2); dpi1 on slot 9.
#[must_use]
pub fn sff_b(transport: PathTransport) -> ServiceFunctionForwarder {
    ServiceFunctionForwarder::new("SFF-B")
        .with_locator("ingress", sff_locator(transport, 2, 1), port_info(2, 1))
        .with_locator("egress", sff_locator(transport, 2, 2), port_info(2, 2))
        .with_function(
            "dpi1",
            DataPlaneLocator::ethernet(None, None),
            port_info(2, 9),
        )
}

/// SFF-C: a single "trunk" locator (slot 1); nat1 on slot 9.
#[must_use]
pub fn sff_c(transport: PathTransport) -> ServiceFunctionForwarder {
    ServiceFunctionForwarder::new("SFF-C")
        .with_locator("trunk", sff_locator(transport, 3, 1), port_info(3, 1))
        .with_function(
            "nat1",
            DataPlaneLocator::ethernet(None, None),
            port_info(3, 9),
        )
}

/// A store holding all of the above, with forwarder locators of the given transport.
#[must_use]
pub fn topology(transport: PathTransport) -> TopologyDb {
    let db = TopologyDb::new();
    db.add_function(fw1()).unwrap();
    db.add_function(dpi1()).unwrap();
    db.add_function(nat1()).unwrap();
    db.add_forwarder(sff_a(transport)).unwrap();
    db.add_forwarder(sff_b(transport)).unwrap();
    db.add_forwarder(sff_c(transport)).unwrap();
    db
}

/// `path-1`: SFF-A/fw1 then SFF-B/dpi1.
#[must_use]
pub fn path_1(transport: PathTransport) -> RenderedServicePath {
    RenderedServicePath::new("path-1", 1, transport)
        .with_hop("SFF-A", Some("fw1"), 255)
        .with_hop("SFF-B", Some("dpi1"), 254)
}

/// `path-2`: SFF-A/fw1, SFF-B/dpi1 then SFF-C/nat1.
#[must_use]
pub fn path_2(transport: PathTransport) -> RenderedServicePath {
    RenderedServicePath::new("path-2", 2, transport)
        .with_hop("SFF-A", Some("fw1"), 255)
        .with_hop("SFF-B", Some("dpi1"), 254)
        .with_hop("SFF-C", Some("nat1"), 253)
}

/// A path with no hops at all.
#[must_use]
pub fn empty_path(transport: PathTransport) -> RenderedServicePath {
    RenderedServicePath::new("empty", 99, transport)
}
