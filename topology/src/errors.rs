// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Reasons why topology objects may be rejected

use crate::path::PathId;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("A service function with name '{0}' already exists")]
    DuplicateFunction(String),
    #[error("A service function forwarder with name '{0}' already exists")]
    DuplicateForwarder(String),
    #[error("Forwarder '{0}' has more than one data plane locator named '{1}'")]
    DuplicateLocator(String, String),
    #[error("Path {0} has more than one hop numbered {1}")]
    DuplicateHop(PathId, u8),
    #[error("No service function named '{0}'")]
    NoSuchFunction(String),
    #[error("No service function forwarder named '{0}'")]
    NoSuchForwarder(String),
    #[error("Empty name for {0}")]
    EmptyName(&'static str),
}
