// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Flow rules: a table, a match, a list of actions and the cookie tying them to a path.

use crate::table::TableId;
use net::eth::{EthType, Mac};
use net::mpls::MplsLabel;
use net::nsh::{Si, Spi};
use net::vlan::Vid;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use topology::PathId;

/// Tag identifying the owner of a rule, so that rules can be removed in bulk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Cookie {
    /// Rules installed once per forwarder, independent of any path.
    NodeDefault,
    /// Rules installed for one service path.
    Path(PathId),
}

impl Cookie {
    const PATH_FLAG: u64 = 1 << 32;

    #[must_use]
    pub fn for_path(path: PathId) -> Self {
        Cookie::Path(path)
    }

    #[must_use]
    pub fn path(self) -> Option<PathId> {
        match self {
            Cookie::Path(path) => Some(path),
            Cookie::NodeDefault => None,
        }
    }

    /// The 64-bit value written to the switch.
    #[must_use]
    pub fn raw(self) -> u64 {
        match self {
            Cookie::NodeDefault => 0,
            Cookie::Path(path) => Self::PATH_FLAG | u64::from(path.as_u32()),
        }
    }
}

/// Header fields a rule matches on. Unset fields are wildcards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowMatch {
    pub in_port: Option<u32>,
    pub eth_type: Option<EthType>,
    pub eth_src: Option<Mac>,
    pub eth_dst: Option<Mac>,
    pub vlan: Option<Vid>,
    pub mpls_label: Option<MplsLabel>,
    pub nsp: Option<Spi>,
    pub nsi: Option<Si>,
    pub metadata: Option<u64>,
}

impl FlowMatch {
    /// A match on anything.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn is_any(&self) -> bool {
        *self == Self::default()
    }
    #[must_use]
    pub fn in_port(mut self, port: u32) -> Self {
        self.in_port = Some(port);
        self
    }
    #[must_use]
    pub fn eth_type(mut self, eth_type: EthType) -> Self {
        self.eth_type = Some(eth_type);
        self
    }
    #[must_use]
    pub fn eth_src(mut self, mac: Mac) -> Self {
        self.eth_src = Some(mac);
        self
    }
    #[must_use]
    pub fn eth_dst(mut self, mac: Mac) -> Self {
        self.eth_dst = Some(mac);
        self
    }
    /// Match a VLAN tag. Implies the VLAN ethertype.
    #[must_use]
    pub fn vlan(mut self, vid: Vid) -> Self {
        self.eth_type = Some(EthType::VLAN);
        self.vlan = Some(vid);
        self
    }
    /// Match an MPLS label. Implies the MPLS unicast ethertype.
    #[must_use]
    pub fn mpls_label(mut self, label: MplsLabel) -> Self {
        self.eth_type = Some(EthType::MPLS_UNICAST);
        self.mpls_label = Some(label);
        self
    }
    /// Match an NSH service path and index.
    #[must_use]
    pub fn nsh(mut self, nsp: Spi, nsi: Si) -> Self {
        self.nsp = Some(nsp);
        self.nsi = Some(nsi);
        self
    }
    #[must_use]
    pub fn metadata(mut self, metadata: u64) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// What a rule does to the packets it matches.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowAction {
    PushVlan(Vid),
    PopVlan,
    PushMpls(MplsLabel),
    /// Pop the outer label; the payload has the given ethertype.
    PopMpls(EthType),
    SetEthSrc(Mac),
    SetEthDst(Mac),
    SetTunnelIpv4Dst(Ipv4Addr),
    SetNsp(Spi),
    SetNsi(Si),
    WriteMetadata(u64),
    GotoTable(TableId),
    Output(u32),
    /// Send the packet back through the port it came from.
    OutputInPort,
    Drop,
}

/// Whether a rule is to be installed or removed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowIntent {
    Add,
    Remove,
}

/// The identity of a rule on a forwarder. Applying a rule with an existing key replaces it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowKey {
    pub node: String,
    pub table: TableId,
    pub matches: FlowMatch,
    pub cookie: Cookie,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRule {
    pub table: TableId,
    pub priority: u16,
    pub matches: FlowMatch,
    pub actions: Vec<FlowAction>,
    pub cookie: Cookie,
    pub intent: FlowIntent,
}

impl FlowRule {
    #[must_use]
    pub fn new(
        table: TableId,
        priority: u16,
        matches: FlowMatch,
        actions: Vec<FlowAction>,
        cookie: Cookie,
    ) -> Self {
        Self {
            table,
            priority,
            matches,
            actions,
            cookie,
            intent: FlowIntent::Add,
        }
    }

    /// The same rule, to be removed rather than installed.
    #[must_use]
    pub fn into_removal(mut self) -> Self {
        self.intent = FlowIntent::Remove;
        self
    }

    #[must_use]
    pub fn key(&self, node: &str) -> FlowKey {
        FlowKey {
            node: node.to_owned(),
            table: self.table,
            matches: self.matches.clone(),
            cookie: self.cookie,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_raw_values_do_not_collide() {
        assert_eq!(Cookie::NodeDefault.raw(), 0);
        assert_ne!(Cookie::for_path(PathId::new(0)).raw(), 0);
        assert_eq!(
            Cookie::for_path(PathId::new(7)).path(),
            Some(PathId::new(7))
        );
        assert_eq!(Cookie::NodeDefault.path(), None);
    }

    #[test]
    fn tag_matches_imply_ethertype() {
        let vid = Vid::new(100).unwrap();
        let m = FlowMatch::any().vlan(vid);
        assert_eq!(m.eth_type, Some(EthType::VLAN));
        let label = MplsLabel::new(100).unwrap();
        let m = FlowMatch::any().mpls_label(label);
        assert_eq!(m.eth_type, Some(EthType::MPLS_UNICAST));
        assert!(FlowMatch::any().is_any());
        assert!(!m.is_any());
    }
}
