// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Service function forwarders: the switches that steer traffic between service functions.

use crate::errors::TopologyError;
use crate::locator::{DataPlaneLocator, LocatorTransport};
use net::eth::Mac;
use ordermap::OrderMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::IpAddr;

/// Southbound augmentation of a locator: the switch port (and its MAC, if known) behind it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortInfo {
    pub port: u32,
    pub mac: Option<Mac>,
}

impl PortInfo {
    #[must_use]
    pub fn new(port: u32) -> Self {
        Self { port, mac: None }
    }
    #[must_use]
    pub fn with_mac(mut self, mac: Mac) -> Self {
        self.mac = Some(mac);
        self
    }
}

/// A named data plane locator of a forwarder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SffDataPlaneLocator {
    pub name: String,
    pub dpl: DataPlaneLocator,
    pub port: Option<PortInfo>,
}

impl SffDataPlaneLocator {
    #[must_use]
    pub fn transport(&self) -> LocatorTransport {
        self.dpl.transport
    }
    /// The MAC of this locator: the one in the locator itself, else the one of its port.
    #[must_use]
    pub fn mac(&self) -> Option<Mac> {
        self.dpl
            .locator
            .mac()
            .or_else(|| self.port.and_then(|p| p.mac))
    }
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        self.dpl.locator.ip()
    }
    #[must_use]
    pub fn port_number(&self) -> Option<u32> {
        self.port.map(|p| p.port)
    }
}

/// How a service function is attached to a forwarder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SfBinding {
    pub function: String,
    /// The forwarder-side locator facing the function.
    pub sff_sf_locator: DataPlaneLocator,
    pub port: Option<PortInfo>,
}

/// A service function forwarder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFunctionForwarder {
    pub name: String,
    pub locators: Vec<SffDataPlaneLocator>,
    pub dictionary: OrderMap<String, SfBinding>,
}

impl ServiceFunctionForwarder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            locators: vec![],
            dictionary: OrderMap::new(),
        }
    }
    #[must_use]
    pub fn with_locator(mut self, name: &str, dpl: DataPlaneLocator, port: Option<PortInfo>) -> Self {
        self.locators.push(SffDataPlaneLocator {
            name: name.to_owned(),
            dpl,
            port,
        });
        self
    }
    #[must_use]
    pub fn with_function(
        mut self,
        function: &str,
        sff_sf_locator: DataPlaneLocator,
        port: Option<PortInfo>,
    ) -> Self {
        self.dictionary.insert(
            function.to_owned(),
            SfBinding {
                function: function.to_owned(),
                sff_sf_locator,
                port,
            },
        );
        self
    }

    #[must_use]
    pub fn locator(&self, name: &str) -> Option<&SffDataPlaneLocator> {
        self.locators.iter().find(|l| l.name == name)
    }

    /// Look up how `function` is attached to this forwarder.
    #[must_use]
    pub fn binding(&self, function: &str) -> Option<&SfBinding> {
        self.dictionary.get(function)
    }

    /// Check that the forwarder has a name and that its locator names are unique.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.name.is_empty() {
            return Err(TopologyError::EmptyName("service function forwarder"));
        }
        let mut seen = HashSet::new();
        for locator in &self.locators {
            if locator.name.is_empty() {
                return Err(TopologyError::EmptyName("forwarder data plane locator"));
            }
            if !seen.insert(locator.name.as_str()) {
                return Err(TopologyError::DuplicateLocator(
                    self.name.clone(),
                    locator.name.clone(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_mac_falls_back_to_port() {
        let port_mac = Mac([0x02, 0, 0, 0, 0xaa, 0x01]);
        let sff = ServiceFunctionForwarder::new("SFF-A").with_locator(
            "eth0",
            DataPlaneLocator::ethernet(None, None),
            Some(PortInfo::new(3).with_mac(port_mac)),
        );
        let dpl = sff.locator("eth0").unwrap();
        assert_eq!(dpl.mac(), Some(port_mac));
        assert_eq!(dpl.port_number(), Some(3));
        assert!(sff.locator("eth1").is_none());
    }

    #[test]
    fn duplicate_locator_names_are_rejected() {
        let sff = ServiceFunctionForwarder::new("SFF-A")
            .with_locator("eth0", DataPlaneLocator::ethernet(None, None), None)
            .with_locator("eth0", DataPlaneLocator::ethernet(None, None), None);
        assert_eq!(
            sff.validate(),
            Err(TopologyError::DuplicateLocator(
                "SFF-A".to_string(),
                "eth0".to_string()
            ))
        );
        assert_eq!(
            ServiceFunctionForwarder::new("").validate(),
            Err(TopologyError::EmptyName("service function forwarder"))
        );
    }

    #[test]
    fn binding_lookup() {
        let sff = ServiceFunctionForwarder::new("SFF-A").with_function(
            "fw1",
            DataPlaneLocator::ethernet(None, None),
            Some(PortInfo::new(7)),
        );
        assert_eq!(sff.binding("fw1").and_then(|b| b.port), Some(PortInfo::new(7)));
        assert!(sff.binding("dpi1").is_none());
    }
}
