// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! MPLS label validation.

use std::fmt::Display;

/// An [MPLS] label usable to identify a service path hop.
///
/// Labels are 20-bit values.  Values `0..=15` are reserved by [RFC 3032] (explicit null, router
/// alert, ...) and are rejected here since a service path must never collide with them.
///
/// [MPLS]: https://en.wikipedia.org/wiki/Multiprotocol_Label_Switching
/// [RFC 3032]: https://datatracker.ietf.org/doc/html/rfc3032#section-2.1
#[repr(transparent)]
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct MplsLabel(u32);

/// Errors which can occur when converting a `u32` to an [`MplsLabel`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[must_use]
pub enum InvalidMplsLabel {
    /// The label is in the range reserved by RFC 3032.
    #[error("MPLS label {0} is reserved (labels 0-15)")]
    Reserved(u32),
    /// The value does not fit the 20-bit label field.
    #[error("{0} is too large to be an MPLS label (max is {MAX})", MAX = MplsLabel::MAX)]
    TooLarge(u32),
}

impl MplsLabel {
    /// The smallest unreserved label.
    pub const MIN: u32 = 16;
    /// The largest 20-bit label.
    pub const MAX: u32 = 0x000F_FFFF;

    /// Create a new [`MplsLabel`].
    ///
    /// # Errors
    ///
    /// Fails if the label is reserved or does not fit in 20 bits.
    pub fn new(label: u32) -> Result<Self, InvalidMplsLabel> {
        match label {
            0..Self::MIN => Err(InvalidMplsLabel::Reserved(label)),
            Self::MIN..=Self::MAX => Ok(MplsLabel(label)),
            _ => Err(InvalidMplsLabel::TooLarge(label)),
        }
    }

    /// Get the raw label value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<MplsLabel> for u32 {
    fn from(label: MplsLabel) -> u32 {
        label.0
    }
}

impl TryFrom<u32> for MplsLabel {
    type Error = InvalidMplsLabel;

    fn try_from(label: u32) -> Result<Self, Self::Error> {
        MplsLabel::new(label)
    }
}

impl Display for MplsLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mpls_label_bounds() {
        bolero::check!()
            .with_type()
            .cloned()
            .for_each(|raw: u32| match MplsLabel::new(raw) {
                Ok(label) => {
                    assert_eq!(label.as_u32(), raw);
                    assert!((MplsLabel::MIN..=MplsLabel::MAX).contains(&raw));
                }
                Err(InvalidMplsLabel::Reserved(x)) => assert!(x < MplsLabel::MIN),
                Err(InvalidMplsLabel::TooLarge(x)) => assert!(x > MplsLabel::MAX),
            });
    }

    #[test]
    fn mpls_label_edges() {
        assert_eq!(MplsLabel::new(15), Err(InvalidMplsLabel::Reserved(15)));
        assert!(MplsLabel::new(16).is_ok());
        assert!(MplsLabel::new(MplsLabel::MAX).is_ok());
        assert_eq!(
            MplsLabel::new(MplsLabel::MAX + 1),
            Err(InvalidMplsLabel::TooLarge(MplsLabel::MAX + 1))
        );
    }
}
