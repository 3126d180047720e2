// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Service functions

use crate::locator::{DataPlaneLocator, Locator};
use net::eth::Mac;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::IpAddr;

/// The kind of processing a service function applies.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SfType {
    Firewall,
    Dpi,
    Napt44,
    Qos,
    Ids,
    HttpHeaderEnrichment,
    Other(String),
}

/// A named data plane locator of a service function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SfDataPlaneLocator {
    pub name: String,
    pub dpl: DataPlaneLocator,
}

impl SfDataPlaneLocator {
    #[must_use]
    pub fn new(name: &str, dpl: DataPlaneLocator) -> Self {
        Self {
            name: name.to_owned(),
            dpl,
        }
    }
}

/// A service function: a firewall, a DPI engine, a NAT box...
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFunction {
    pub name: String,
    pub kind: SfType,
    pub locators: Vec<SfDataPlaneLocator>,
}

impl ServiceFunction {
    #[must_use]
    pub fn new(name: &str, kind: SfType) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            locators: vec![],
        }
    }
    #[must_use]
    pub fn with_locator(mut self, name: &str, dpl: DataPlaneLocator) -> Self {
        self.locators.push(SfDataPlaneLocator::new(name, dpl));
        self
    }

    fn locator_values(&self) -> impl Iterator<Item = &Locator> {
        self.locators.iter().map(|l| &l.dpl.locator)
    }

    /// The MAC address of the first MAC locator that has one.
    #[must_use]
    pub fn mac(&self) -> Option<Mac> {
        self.locator_values().find_map(Locator::mac)
    }

    /// The address of the first IP locator.
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        self.locator_values().find_map(Locator::ip)
    }
}

impl Display for SfType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SfType::Firewall => write!(f, "firewall"),
            SfType::Dpi => write!(f, "dpi"),
            SfType::Napt44 => write!(f, "napt44"),
            SfType::Qos => write!(f, "qos"),
            SfType::Ids => write!(f, "ids"),
            SfType::HttpHeaderEnrichment => write!(f, "http-header-enrichment"),
            SfType::Other(other) => write!(f, "{other}"),
        }
    }
}
