// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Synchronization primitives for state shared between concurrent compiles.
//! With the `shuttle` feature, they are replaced by their randomized-scheduling counterparts.

#[cfg(not(feature = "shuttle"))]
pub use std::sync;

#[cfg(feature = "shuttle")]
pub use shuttle::sync;
