// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Renderer parameters

use crate::errors::ParamsError;
use derive_builder::Builder;
use flow::TableLayout;
use net::mpls::MplsLabel;
use net::vlan::Vid;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracectl::get_trace_ctl;

/// Lowest rule priority: the table-miss rules installed once per forwarder.
pub const PRIORITY_MATCH_ANY: u16 = 5;
pub const PRIORITY_TRANSPORT_INGRESS: u16 = 250;
pub const PRIORITY_PATH_MAPPER: u16 = 350;
pub const PRIORITY_NEXT_HOP: u16 = 450;
/// Next-hop rules also matching the MAC of the function the traffic comes from.
pub const PRIORITY_NEXT_HOP_FROM_SF: u16 = PRIORITY_NEXT_HOP + 1;
pub const PRIORITY_TRANSPORT_EGRESS: u16 = 650;

/// A range of encapsulation identifiers, handed out in blocks of `per_path`, one identifier
/// every `per_hop` inside a block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdPoolParams {
    pub first: u32,
    pub last: u32,
    pub per_path: u32,
    pub per_hop: u32,
}

impl IdPoolParams {
    #[must_use]
    pub const fn vlan() -> Self {
        Self {
            first: 100,
            last: 4094,
            per_path: 100,
            per_hop: 1,
        }
    }
    #[must_use]
    pub const fn mpls() -> Self {
        Self {
            first: 100,
            last: 1_048_575,
            per_path: 100,
            per_hop: 1,
        }
    }

    /// The number of identifiers in the pool.
    #[must_use]
    pub fn range(&self) -> u32 {
        self.last.saturating_sub(self.first).saturating_add(1)
    }

    /// The number of hops a block can hold.
    #[must_use]
    pub fn hops_per_block(&self) -> u32 {
        // per_path - 1 is the last offset in a block
        (self.per_path - 1) / self.per_hop + 1
    }

    fn validate(&self, pool: &'static str, min: u32, max: u32) -> Result<(), ParamsError> {
        if self.first < min || self.last > max || self.first > self.last {
            return Err(ParamsError::InvalidRange {
                pool,
                first: self.first,
                last: self.last,
                min,
                max,
            });
        }
        if self.per_path == 0 || self.per_hop == 0 {
            return Err(ParamsError::ZeroIncrement { pool });
        }
        if self.per_path > self.range() {
            return Err(ParamsError::BlockTooLarge {
                pool,
                per_path: self.per_path,
                range: self.range(),
            });
        }
        Ok(())
    }
}

/// How identifier blocks are handed out to paths.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdAllocation {
    /// One shared counter, advancing by one block per path (wrapping at the end of the pool).
    #[default]
    Sequential,
    /// The block is derived from the path id: no shared state, but paths whose ids are equal
    /// modulo the number of blocks share identifiers.
    PathDerived,
}

/// Parameters of the forwarding plan compiler and of the render service.
#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererParams {
    #[builder(default)]
    pub tables: TableLayout,

    #[builder(default = IdPoolParams::vlan())]
    pub vlan: IdPoolParams,

    #[builder(default = IdPoolParams::mpls())]
    pub mpls: IdPoolParams,

    #[builder(default)]
    pub allocation: IdAllocation,

    #[builder(default = 2)]
    pub workers: usize,

    #[builder(default = 64)]
    pub queue_depth: usize,

    #[builder(setter(into, strip_option), default)]
    pub tracing: Option<String>,
}

impl Default for RendererParams {
    fn default() -> Self {
        Self {
            tables: TableLayout::default(),
            vlan: IdPoolParams::vlan(),
            mpls: IdPoolParams::mpls(),
            allocation: IdAllocation::default(),
            workers: 2,
            queue_depth: 64,
            tracing: None,
        }
    }
}

impl RendererParams {
    /// Load parameters from YAML. Missing fields take their default value.
    pub fn from_yaml(yaml: &str) -> Result<Self, ParamsError> {
        let params: Self =
            serde_yaml_ng::from_str(yaml).map_err(|e| ParamsError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        self.tables.validate()?;
        self.vlan
            .validate("vlan", Vid::MIN.as_u16().into(), Vid::MAX.as_u16().into())?;
        self.mpls
            .validate("mpls", MplsLabel::MIN, MplsLabel::MAX)?;
        if self.workers == 0 {
            return Err(ParamsError::ZeroWorkers);
        }
        if self.queue_depth == 0 {
            return Err(ParamsError::ZeroQueueDepth);
        }
        Ok(())
    }

    /// Hand the tracing configuration, if any, to the tracing controller.
    pub fn apply_tracing(&self) -> Result<(), ParamsError> {
        if let Some(tracing) = &self.tracing {
            get_trace_ctl().setup_from_string(tracing)?;
        }
        Ok(())
    }
}

impl Display for RendererParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let t = &self.tables;
        writeln!(f, "Renderer parameters")?;
        writeln!(
            f,
            "  tables     : ingress {} / path-mapper {} / next-hop {} / egress {}",
            t.transport_ingress, t.path_mapper, t.next_hop, t.transport_egress
        )?;
        writeln!(
            f,
            "  vlan ids   : {}-{} (+{} per path, +{} per hop)",
            self.vlan.first, self.vlan.last, self.vlan.per_path, self.vlan.per_hop
        )?;
        writeln!(
            f,
            "  mpls labels: {}-{} (+{} per path, +{} per hop)",
            self.mpls.first, self.mpls.last, self.mpls.per_path, self.mpls.per_hop
        )?;
        writeln!(f, "  allocation : {:?}", self.allocation)?;
        write!(
            f,
            "  workers    : {} (queue depth {})",
            self.workers, self.queue_depth
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow::TableId;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_defaults_match_default() {
        let built = RendererParamsBuilder::default().build().unwrap();
        assert_eq!(built, RendererParams::default());
        assert!(built.validate().is_ok());
    }

    #[test]
    fn builder_overrides() {
        let params = RendererParamsBuilder::default()
            .allocation(IdAllocation::PathDerived)
            .workers(4_usize)
            .tracing("render=debug")
            .build()
            .unwrap();
        assert_eq!(params.allocation, IdAllocation::PathDerived);
        assert_eq!(params.workers, 4);
        assert_eq!(params.tracing.as_deref(), Some("render=debug"));
    }

    #[test]
    fn yaml_partial() {
        let yaml = r"
allocation: path-derived
vlan:
  first: 10
  last: 1009
  per_path: 10
  per_hop: 1
tables:
  transport_ingress: 10
  path_mapper: 11
  next_hop: 12
  transport_egress: 13
";
        let params = RendererParams::from_yaml(yaml).unwrap();
        assert_eq!(params.allocation, IdAllocation::PathDerived);
        assert_eq!(params.vlan.first, 10);
        assert_eq!(params.mpls, IdPoolParams::mpls());
        assert_eq!(params.tables.next_hop, TableId::new(12));
        assert_eq!(params.workers, 2);
    }

    #[test]
    fn yaml_errors() {
        assert!(matches!(
            RendererParams::from_yaml("nonsense: 3"),
            Err(ParamsError::Parse(_))
        ));
        assert_eq!(
            RendererParams::from_yaml("workers: 0"),
            Err(ParamsError::ZeroWorkers)
        );
    }

    #[test]
    fn pool_validation() {
        let mut params = RendererParams::default();
        params.vlan.last = 4095;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::InvalidRange { pool: "vlan", .. })
        ));

        let mut params = RendererParams::default();
        params.mpls.first = 3;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::InvalidRange { pool: "mpls", .. })
        ));

        let mut params = RendererParams::default();
        params.vlan.per_hop = 0;
        assert_eq!(
            params.validate(),
            Err(ParamsError::ZeroIncrement { pool: "vlan" })
        );

        let mut params = RendererParams::default();
        params.vlan = IdPoolParams {
            first: 100,
            last: 149,
            per_path: 100,
            per_hop: 1,
        };
        assert_eq!(
            params.validate(),
            Err(ParamsError::BlockTooLarge {
                pool: "vlan",
                per_path: 100,
                range: 50
            })
        );

        let mut params = RendererParams::default();
        params.queue_depth = 0;
        assert_eq!(params.validate(), Err(ParamsError::ZeroQueueDepth));
    }

    #[test]
    fn hops_per_block() {
        assert_eq!(IdPoolParams::vlan().hops_per_block(), 100);
        let pool = IdPoolParams {
            first: 100,
            last: 4094,
            per_path: 100,
            per_hop: 10,
        };
        assert_eq!(pool.hops_per_block(), 10);
    }
}
