// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Service chaining topology model: service functions, the forwarders they are bound to and the
//! rendered service paths steering traffic through them. These objects are owned by an external
//! store; the renderer only ever reads them.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod errors;
pub mod event;
pub mod forwarder;
pub mod function;
pub mod locator;
pub mod path;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use errors::TopologyError; // re-export
pub use event::RspEvent; // re-export
pub use forwarder::{PortInfo, ServiceFunctionForwarder, SfBinding, SffDataPlaneLocator}; // re-export
pub use function::{ServiceFunction, SfDataPlaneLocator, SfType}; // re-export
pub use locator::{DataPlaneLocator, Locator, LocatorTransport}; // re-export
pub use path::{PathId, PathTransport, RenderedServicePath, RspHop}; // re-export
pub use store::{TopologyDb, TopologyStore}; // re-export

use tracectl::trace_target;
trace_target!("topology", LevelFilter::INFO, &["topology"]);
