// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Change notifications for rendered service paths

use crate::path::{PathId, RenderedServicePath};
use std::fmt::Display;

/// A change to a rendered service path. Every event carries a full snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RspEvent {
    Created(RenderedServicePath),
    Updated {
        old: RenderedServicePath,
        new: RenderedServicePath,
    },
    Deleted(RenderedServicePath),
}

impl RspEvent {
    /// The path the event is about. For updates, the path-id of the new snapshot.
    #[must_use]
    pub fn path_id(&self) -> PathId {
        match self {
            RspEvent::Created(rsp) | RspEvent::Deleted(rsp) | RspEvent::Updated { new: rsp, .. } => {
                rsp.path_id
            }
        }
    }
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            RspEvent::Created(rsp) | RspEvent::Deleted(rsp) | RspEvent::Updated { new: rsp, .. } => {
                &rsp.name
            }
        }
    }
}

impl Display for RspEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RspEvent::Created(rsp) => write!(f, "created {rsp}"),
            RspEvent::Updated { new, .. } => write!(f, "updated {new}"),
            RspEvent::Deleted(rsp) => write!(f, "deleted {rsp}"),
        }
    }
}
