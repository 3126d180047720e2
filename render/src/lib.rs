// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Forwarding plan compiler for service function chaining.
//!
//! A rendered service path (an ordered list of forwarder / service function hops) is turned
//! into the flow rules each forwarder needs to steer traffic along the chain:
//!
//! 1. the [`graph`] builder lays the hops out as a list of edges between forwarders,
//! 2. the [`matcher`] picks, for every edge, the pair of data plane locators facing each other,
//! 3. a [`transport`] strategy (VLAN, MPLS or NSH) allocates the path identifiers and emits the
//!    rules of the transport-ingress, path-mapper, next-hop and transport-egress tables,
//! 4. the [`RspRenderer`] applies the resulting batch to a [`flow::FlowSink`], all or nothing.
//!
//! The [`RenderService`] runs the renderer on a pool of worker threads, fed by path events.

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

pub mod accessor;
mod concurrency;
mod display;
pub mod errors;
pub mod graph;
pub mod ids;
pub mod matcher;
pub mod params;
pub mod registry;
pub mod renderer;
pub mod service;
pub mod transport;

pub use errors::{LocatorWarning, ParamsError, RenderError, ResolutionError}; // re-export
pub use graph::{GraphEntry, GraphNode, SffGraph}; // re-export
pub use params::{IdAllocation, IdPoolParams, RendererParams, RendererParamsBuilder}; // re-export
pub use renderer::{RemoveReport, RenderPlan, RenderReport, RspRenderer}; // re-export
pub use service::{Outcome, RenderOutcome, RenderService}; // re-export

use tracectl::trace_target;
trace_target!("render", LevelFilter::INFO, &["render"]);
