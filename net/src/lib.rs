// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)] // Validation logic should always be strictly safe
#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Strictly validated identifiers carried by service chaining encapsulations.
//!
//! None of the types here parse or emit packets. They exist so that the rest of the workspace
//! cannot hold (or program into a switch) a VLAN tag, MPLS label or NSH path identifier which the
//! wire format could not represent.

pub mod eth;
pub mod mpls;
pub mod nsh;
pub mod vlan;
