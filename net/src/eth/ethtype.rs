// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ethernet type field values used when matching encapsulated traffic

use std::fmt::Display;

/// The ethertype of a frame, in native endianness.
#[repr(transparent)]
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct EthType(u16);

impl EthType {
    /// Ethernet type for [IPv4](https://en.wikipedia.org/wiki/IPv4)
    pub const IPV4: EthType = EthType(0x0800);
    /// Ethernet type for [IPv6](https://en.wikipedia.org/wiki/IPv6)
    pub const IPV6: EthType = EthType(0x86DD);
    /// Ethernet type for [VLAN](https://en.wikipedia.org/wiki/IEEE_802.1Q)
    pub const VLAN: EthType = EthType(0x8100);
    /// Ethernet type for [MPLS](https://en.wikipedia.org/wiki/Multiprotocol_Label_Switching) unicast
    pub const MPLS_UNICAST: EthType = EthType(0x8847);
    /// Ethernet type for NSH carried directly over ethernet ([RFC 8300])
    ///
    /// [RFC 8300]: https://datatracker.ietf.org/doc/html/rfc8300#section-9.1
    pub const NSH: EthType = EthType(0x894F);

    /// Map a raw u16 into an [`EthType`]
    #[must_use]
    pub const fn new(raw: u16) -> EthType {
        EthType(raw)
    }

    /// Get the raw `u16` value
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl Display for EthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

#[cfg(any(test, feature = "bolero"))]
mod contract {
    use super::EthType;
    use bolero::{Driver, TypeGenerator};

    impl TypeGenerator for EthType {
        fn generate<D: Driver>(u: &mut D) -> Option<Self> {
            Some(EthType::new(u.produce()?))
        }
    }
}
