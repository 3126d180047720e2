// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Network Service Header ([RFC 8300]) service path identifiers.
//!
//! With NSH the service path is explicit in every packet: the 24-bit service path identifier
//! ([`Spi`]) names the path and the 8-bit service index ([`Si`]) names the position along it.
//!
//! [RFC 8300]: https://datatracker.ietf.org/doc/html/rfc8300#section-2.3

use std::fmt::Display;

/// The well-known UDP destination port of VXLAN-GPE, which carries NSH between forwarders.
pub const VXLAN_GPE_PORT: u16 = 4790;

/// A 24-bit NSH service path identifier.
#[repr(transparent)]
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct Spi(u32);

/// Error returned when a value does not fit the 24-bit service path identifier field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0} does not fit a 24-bit service path identifier (max is {MAX})", MAX = Spi::MAX)]
pub struct InvalidSpi(pub u32);

impl Spi {
    /// The largest legal [`Spi`].
    pub const MAX: u32 = 0x00FF_FFFF;

    /// Create a new [`Spi`].
    ///
    /// # Errors
    ///
    /// Fails if the value does not fit in 24 bits.
    pub fn new(spi: u32) -> Result<Self, InvalidSpi> {
        if spi > Self::MAX {
            Err(InvalidSpi(spi))
        } else {
            Ok(Spi(spi))
        }
    }

    /// The raw value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<Spi> for u32 {
    fn from(spi: Spi) -> u32 {
        spi.0
    }
}

impl TryFrom<u32> for Spi {
    type Error = InvalidSpi;

    fn try_from(spi: u32) -> Result<Self, Self::Error> {
        Spi::new(spi)
    }
}

impl Display for Spi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An 8-bit NSH service index. Every service function decrements it by one.
#[repr(transparent)]
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Si(u8);

impl Si {
    /// Wrap a raw service index.
    #[must_use]
    pub const fn new(si: u8) -> Self {
        Si(si)
    }

    /// The raw value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// The index a packet carries after one more service function has processed it.
    ///
    /// Returns `None` once the index is exhausted.
    #[must_use]
    pub const fn decremented(self) -> Option<Si> {
        match self.0.checked_sub(1) {
            Some(si) => Some(Si(si)),
            None => None,
        }
    }
}

impl From<u8> for Si {
    fn from(si: u8) -> Self {
        Si(si)
    }
}

impl Display for Si {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
