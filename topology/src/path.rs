// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Rendered service paths: ordered chains of (forwarder, function) hops.

use crate::errors::TopologyError;
use crate::locator::LocatorTransport;
use net::nsh::Si;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

/// Externally allocated, globally unique identifier of a rendered service path.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(u32);

impl PathId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for PathId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for PathId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The encapsulation used between the hops of a path.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathTransport {
    Vlan,
    Mpls,
    Nsh,
}

impl PathTransport {
    /// The locator transport a forwarder locator must have to carry this path.
    #[must_use]
    pub fn locator_transport(self) -> LocatorTransport {
        match self {
            PathTransport::Vlan => LocatorTransport::Ethernet,
            PathTransport::Mpls => LocatorTransport::Mpls,
            PathTransport::Nsh => LocatorTransport::VxlanGpe,
        }
    }
}

impl Display for PathTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathTransport::Vlan => write!(f, "vlan"),
            PathTransport::Mpls => write!(f, "mpls"),
            PathTransport::Nsh => write!(f, "nsh"),
        }
    }
}

/// One hop of a rendered service path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RspHop {
    pub hop: u8,
    pub forwarder: String,
    pub function: Option<String>,
    pub service_index: Si,
}

impl RspHop {
    #[must_use]
    pub fn new(hop: u8, forwarder: &str, function: Option<&str>, service_index: u8) -> Self {
        Self {
            hop,
            forwarder: forwarder.to_owned(),
            function: function.map(str::to_owned),
            service_index: Si::new(service_index),
        }
    }
}

/// A snapshot of an instantiated service chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedServicePath {
    pub name: String,
    pub path_id: PathId,
    pub transport: PathTransport,
    pub hops: Vec<RspHop>,
}

impl RenderedServicePath {
    #[must_use]
    pub fn new(name: &str, path_id: u32, transport: PathTransport) -> Self {
        Self {
            name: name.to_owned(),
            path_id: PathId(path_id),
            transport,
            hops: vec![],
        }
    }
    #[must_use]
    pub fn with_hop(mut self, forwarder: &str, function: Option<&str>, service_index: u8) -> Self {
        let hop = u8::try_from(self.hops.len()).unwrap_or(u8::MAX);
        self.hops
            .push(RspHop::new(hop, forwarder, function, service_index));
        self
    }

    /// The hops sorted by ascending hop number, whatever order they were stored in.
    #[must_use]
    pub fn hops_in_order(&self) -> Vec<&RspHop> {
        let mut hops: Vec<&RspHop> = self.hops.iter().collect();
        hops.sort_by_key(|h| h.hop);
        hops
    }

    /// Check that the path is named and that no two hops share a number.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.name.is_empty() {
            return Err(TopologyError::EmptyName("rendered service path"));
        }
        let mut numbers = BTreeSet::new();
        for hop in &self.hops {
            if !numbers.insert(hop.hop) {
                return Err(TopologyError::DuplicateHop(self.path_id, hop.hop));
            }
            if hop.forwarder.is_empty() {
                return Err(TopologyError::EmptyName("hop forwarder"));
            }
        }
        Ok(())
    }
}

impl Display for RenderedServicePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rsp {} (id {}, {}, {} hops)",
            self.name,
            self.path_id,
            self.transport,
            self.hops.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hops_are_walked_by_number() {
        let mut rsp = RenderedServicePath::new("path-1", 1, PathTransport::Vlan);
        rsp.hops.push(RspHop::new(2, "SFF-C", Some("nat1"), 253));
        rsp.hops.push(RspHop::new(0, "SFF-A", Some("fw1"), 255));
        rsp.hops.push(RspHop::new(1, "SFF-B", Some("dpi1"), 254));

        let order: Vec<&str> = rsp
            .hops_in_order()
            .iter()
            .map(|h| h.forwarder.as_str())
            .collect();
        assert_eq!(order, vec!["SFF-A", "SFF-B", "SFF-C"]);
    }

    #[test]
    fn duplicate_hop_numbers_are_rejected() {
        let mut rsp = RenderedServicePath::new("path-1", 7, PathTransport::Mpls);
        rsp.hops.push(RspHop::new(0, "SFF-A", Some("fw1"), 255));
        rsp.hops.push(RspHop::new(0, "SFF-B", Some("dpi1"), 254));
        assert_eq!(
            rsp.validate(),
            Err(TopologyError::DuplicateHop(PathId::new(7), 0))
        );
    }

    #[test]
    fn transport_maps_to_locator_transport() {
        assert_eq!(
            PathTransport::Vlan.locator_transport(),
            LocatorTransport::Ethernet
        );
        assert_eq!(PathTransport::Mpls.locator_transport(), LocatorTransport::Mpls);
        assert_eq!(
            PathTransport::Nsh.locator_transport(),
            LocatorTransport::VxlanGpe
        );
    }

    #[test]
    fn path_from_yaml() {
        let yaml = r"
name: path-1
path_id: 1
transport: nsh
hops:
  - hop: 0
    forwarder: SFF-A
    function: fw1
    service_index: 255
  - hop: 1
    forwarder: SFF-B
    function: null
    service_index: 254
";
        let rsp: RenderedServicePath = serde_yaml_ng::from_str(yaml).unwrap();
        let expected = RenderedServicePath::new("path-1", 1, PathTransport::Nsh)
            .with_hop("SFF-A", Some("fw1"), 255)
            .with_hop("SFF-B", None, 254);
        assert_eq!(rsp, expected);
        assert!(rsp.validate().is_ok());
    }
}
