// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors and warnings of the forwarding plan compiler

use flow::{SinkError, TableLayoutError};
use std::fmt::Display;
use thiserror::Error;
use topology::{PathId, PathTransport, TopologyError};
use tracectl::TraceCtlError;

/// A name used by a path could not be resolved against the topology.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ResolutionError {
    #[error("No service function forwarder named '{0}'")]
    NoSuchForwarder(String),
    #[error("No service function named '{0}'")]
    NoSuchFunction(String),
    #[error("Service function '{function}' is not bound to forwarder '{forwarder}'")]
    NotBound { function: String, forwarder: String },
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RenderError {
    #[error("Path {path}: {source}")]
    Resolution {
        path: PathId,
        #[source]
        source: ResolutionError,
    },
    #[error("Path {path}: no {transport} locator pair between {from} and {to}")]
    IncompatibleLocator {
        path: PathId,
        transport: PathTransport,
        from: String,
        to: String,
    },
    #[error("Path {path}: no room for {hops} {transport} identifiers")]
    IdSpaceExhausted {
        path: PathId,
        transport: PathTransport,
        hops: usize,
    },
    #[error("Path id {0} does not fit an NSH service path identifier")]
    InvalidPathId(PathId),
    #[error("Invalid {transport} identifier: {reason}")]
    InvalidIdentifier {
        transport: PathTransport,
        reason: String,
    },
    #[error("Invalid path: {0}")]
    Topology(#[from] TopologyError),
    #[error("Flow sink failure: {0}")]
    Sink(#[from] SinkError),
    #[error("Invalid renderer parameters: {0}")]
    Params(#[from] ParamsError),
    #[error("Render service is stopped")]
    ServiceStopped,
    #[error("Render queue is full")]
    QueueFull,
    #[error("Could not start render worker: {0}")]
    Spawn(String),
}

/// A rule that could not be emitted because a locator or address was missing.
///
/// This does not fail the compile: the rule is skipped and the warning is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorWarning {
    pub path: PathId,
    pub node: String,
    pub stage: &'static str,
    pub reason: String,
}

impl Display for LocatorWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "path {} on {}: skipped {} rule: {}",
            self.path, self.node, self.stage, self.reason
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParamsError {
    #[error("{pool} pool: range {first}-{last} is empty or out of {min}-{max}")]
    InvalidRange {
        pool: &'static str,
        first: u32,
        last: u32,
        min: u32,
        max: u32,
    },
    #[error("{pool} pool: increments must not be zero")]
    ZeroIncrement { pool: &'static str },
    #[error("{pool} pool: per-path block of {per_path} exceeds the range of {range}")]
    BlockTooLarge {
        pool: &'static str,
        per_path: u32,
        range: u32,
    },
    #[error("At least one render worker is needed")]
    ZeroWorkers,
    #[error("Queue depth must not be zero")]
    ZeroQueueDepth,
    #[error(transparent)]
    Tables(#[from] TableLayoutError),
    #[error("Invalid tracing config: {0}")]
    Tracing(#[from] TraceCtlError),
    #[error("Cannot parse renderer parameters: {0}")]
    Parse(String),
}
