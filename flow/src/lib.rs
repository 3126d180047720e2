// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Switch flow rules and the sinks that program them.
//!
//! Rules are abstract: tables, matches and actions are described here, while the encoding
//! towards a switch is the business of a [`FlowSink`] implementation.

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

pub mod batch;
mod display;
pub mod memory;
pub mod queued;
pub mod rule;
pub mod sink;
pub mod table;

pub use batch::FlowBatch; // re-export
pub use memory::MemoryFlowSink; // re-export
pub use queued::QueuedFlowSink; // re-export
pub use rule::{Cookie, FlowAction, FlowIntent, FlowKey, FlowMatch, FlowRule}; // re-export
pub use sink::{FlowSink, SinkError}; // re-export
pub use table::{TableId, TableLayout, TableLayoutError}; // re-export

use tracectl::trace_target;
trace_target!("flow", LevelFilter::INFO, &["flow"]);
