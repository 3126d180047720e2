// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ethernet addressing and ethertypes

pub mod ethtype;
pub mod mac;

pub use ethtype::EthType;
pub use mac::Mac;
