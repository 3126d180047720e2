// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Runtime control of tracing: targets are declared per crate at build time and their levels
//! can be changed, by name or by tag, while the process runs.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

pub mod control;
pub mod display;
pub mod targets;

// re-exports
pub use control::{TargetCfg, TraceCtl, TraceCtlError, get_trace_ctl};
pub use tracing_subscriber::filter::LevelFilter;
