// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Data plane locators: where (and how) a function or forwarder can be reached.

use net::eth::Mac;
use net::mpls::MplsLabel;
use net::vlan::Vid;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::IpAddr;

/// The transport encapsulation a locator belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocatorTransport {
    /// Plain ethernet, optionally 802.1Q tagged.
    Ethernet,
    /// MPLS over ethernet.
    Mpls,
    /// VXLAN-GPE carrying NSH.
    VxlanGpe,
    /// LISP data plane.
    Lisp,
    /// Function-specific locator resolved by the function itself.
    Function,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacLocator {
    pub mac: Option<Mac>,
    pub vlan: Option<Vid>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpLocator {
    pub ip: IpAddr,
    pub port: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MplsLocator {
    pub label: MplsLabel,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LispLocator {
    pub eid: IpAddr,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionLocator {
    pub name: String,
}

/// The addressing carried by a data plane locator.
///
/// This is a closed set: adding a locator kind forces every `match` on it to be revisited.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Locator {
    Mac(MacLocator),
    Ip(IpLocator),
    Mpls(MplsLocator),
    Lisp(LispLocator),
    Function(FunctionLocator),
}

impl Locator {
    #[must_use]
    pub fn mac(&self) -> Option<Mac> {
        match self {
            Locator::Mac(MacLocator { mac, .. }) => *mac,
            _ => None,
        }
    }
    #[must_use]
    pub fn vlan(&self) -> Option<Vid> {
        match self {
            Locator::Mac(MacLocator { vlan, .. }) => *vlan,
            _ => None,
        }
    }
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            Locator::Ip(IpLocator { ip, .. }) => Some(*ip),
            _ => None,
        }
    }
    #[must_use]
    pub fn mpls_label(&self) -> Option<MplsLabel> {
        match self {
            Locator::Mpls(MplsLocator { label }) => Some(*label),
            _ => None,
        }
    }

    /// Tell if a locator on an upstream node and one on a downstream node can face each other
    /// on the same link, before any path identifier has been assigned.
    ///
    /// * Mac: when both carry a VLAN, it must be the same one. Otherwise any MAC locator goes.
    /// * Mpls: labels are assigned later, so any pair is acceptable.
    /// * Ip: the destination ports must agree.
    /// * Lisp and Function locators are never paired.
    #[must_use]
    pub fn is_compatible(&self, downstream: &Locator) -> bool {
        match (self, downstream) {
            (Locator::Mac(up), Locator::Mac(down)) => match (up.vlan, down.vlan) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            },
            (Locator::Mpls(_), Locator::Mpls(_)) => true,
            (Locator::Ip(up), Locator::Ip(down)) => up.port == down.port,
            // lisp, function, or different locator kinds
            _ => false,
        }
    }
}

/// A locator together with the transport that owns it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataPlaneLocator {
    pub transport: LocatorTransport,
    pub locator: Locator,
}

impl DataPlaneLocator {
    #[must_use]
    pub fn new(transport: LocatorTransport, locator: Locator) -> Self {
        Self { transport, locator }
    }
    #[must_use]
    pub fn ethernet(mac: Option<Mac>, vlan: Option<Vid>) -> Self {
        Self::new(
            LocatorTransport::Ethernet,
            Locator::Mac(MacLocator { mac, vlan }),
        )
    }
    #[must_use]
    pub fn mpls(label: MplsLabel) -> Self {
        Self::new(LocatorTransport::Mpls, Locator::Mpls(MplsLocator { label }))
    }
    #[must_use]
    pub fn vxlan_gpe(ip: IpAddr, port: u16) -> Self {
        Self::new(
            LocatorTransport::VxlanGpe,
            Locator::Ip(IpLocator { ip, port }),
        )
    }
}

impl Display for LocatorTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LocatorTransport::Ethernet => "ethernet",
            LocatorTransport::Mpls => "mpls",
            LocatorTransport::VxlanGpe => "vxlan-gpe",
            LocatorTransport::Lisp => "lisp",
            LocatorTransport::Function => "function",
        };
        write!(f, "{name}")
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Mac(MacLocator { mac, vlan }) => {
                match mac {
                    Some(mac) => write!(f, "mac {mac}")?,
                    None => write!(f, "mac (none)")?,
                }
                if let Some(vlan) = vlan {
                    write!(f, " vlan {vlan}")?;
                }
                Ok(())
            }
            Locator::Ip(IpLocator { ip, port }) => write!(f, "ip {ip}:{port}"),
            Locator::Mpls(MplsLocator { label }) => write!(f, "mpls {label}"),
            Locator::Lisp(LispLocator { eid }) => write!(f, "lisp {eid}"),
            Locator::Function(FunctionLocator { name }) => write!(f, "function {name}"),
        }
    }
}
