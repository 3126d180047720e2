// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Flow tables used to steer service chain traffic

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Index of a flow table in a forwarder pipeline.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(u8);

impl TableId {
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Table {next} ({next_name}) must come after table {prev} ({prev_name})")]
pub struct TableLayoutError {
    pub prev_name: &'static str,
    pub prev: TableId,
    pub next_name: &'static str,
    pub next: TableId,
}

/// Where the four stages of service chain processing live in a forwarder pipeline.
///
/// Every stage jumps forward to the next one, so the tables must be strictly increasing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableLayout {
    pub transport_ingress: TableId,
    pub path_mapper: TableId,
    pub next_hop: TableId,
    pub transport_egress: TableId,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            transport_ingress: TableId(0),
            path_mapper: TableId(1),
            next_hop: TableId(2),
            transport_egress: TableId(3),
        }
    }
}

impl TableLayout {
    /// The tables of the pipeline, in processing order.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, TableId); 4] {
        [
            ("transport-ingress", self.transport_ingress),
            ("path-mapper", self.path_mapper),
            ("next-hop", self.next_hop),
            ("transport-egress", self.transport_egress),
        ]
    }

    pub fn validate(&self) -> Result<(), TableLayoutError> {
        let stages = self.stages();
        for pair in stages.windows(2) {
            let ((prev_name, prev), (next_name, next)) = (pair[0], pair[1]);
            if next <= prev {
                return Err(TableLayoutError {
                    prev_name,
                    prev,
                    next_name,
                    next,
                });
            }
        }
        Ok(())
    }
}
