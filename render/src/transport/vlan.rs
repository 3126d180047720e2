// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! 802.1Q transport: one VLAN id per hop.

use super::tagged::{TagEncap, Tagged};
use flow::{FlowAction, FlowMatch};
use net::vlan::Vid;
use topology::PathTransport;

pub struct Vlan;

impl TagEncap for Vlan {
    type Tag = Vid;
    const TRANSPORT: PathTransport = PathTransport::Vlan;

    fn match_tag(matches: FlowMatch, tag: Vid) -> FlowMatch {
        matches.vlan(tag)
    }
    fn push(tag: Vid) -> FlowAction {
        FlowAction::PushVlan(tag)
    }
    fn pop() -> FlowAction {
        FlowAction::PopVlan
    }
}

pub type VlanStrategy<'a> = Tagged<'a, Vlan>;

#[cfg(all(test, not(feature = "shuttle")))]
mod tests {
    use super::*;
    use crate::ids::IdAllocator;
    use crate::params::{IdAllocation, IdPoolParams};
    use crate::transport::tests::Fixture;
    use flow::{Cookie, FlowRule, TableId};
    use pretty_assertions::assert_eq;
    use topology::PathId;
    use topology::testing::{DPI1_MAC, FW1_MAC, path_1, port_mac};

    fn vid(v: u16) -> Vid {
        Vid::new(v).unwrap()
    }

    fn rule(table: u8, priority: u16, matches: FlowMatch, actions: Vec<FlowAction>) -> FlowRule {
        FlowRule::new(
            TableId::new(table),
            priority,
            matches,
            actions,
            Cookie::for_path(PathId::new(1)),
        )
    }

    #[test]
    fn path_1_rules() {
        let ids = IdAllocator::new(PathTransport::Vlan, IdPoolParams::vlan(), IdAllocation::Sequential);
        let fixture = Fixture::new(path_1(PathTransport::Vlan));
        let mut strategy = VlanStrategy::new(&ids);
        let (batch, warnings) = fixture.emit(&mut strategy).finish();
        assert_eq!(strategy.tags(), &[vid(100), vid(101)]);
        assert!(warnings.is_empty());
        assert_eq!(batch.len(), 12);

        let on_a: Vec<&FlowRule> = batch.rules_on("SFF-A").collect();
        let meta = FlowMatch::any().metadata(1);
        assert_eq!(
            on_a,
            vec![
                &rule(0, 250, FlowMatch::any().vlan(vid(100)), vec![FlowAction::GotoTable(TableId::new(1))]),
                &rule(
                    1,
                    350,
                    FlowMatch::any().vlan(vid(100)),
                    vec![
                        FlowAction::PopVlan,
                        FlowAction::WriteMetadata(1),
                        FlowAction::GotoTable(TableId::new(2))
                    ]
                ),
                &rule(
                    2,
                    450,
                    meta.clone(),
                    vec![FlowAction::SetEthDst(FW1_MAC), FlowAction::GotoTable(TableId::new(3))]
                ),
                &rule(
                    3,
                    650,
                    meta.clone().eth_dst(FW1_MAC),
                    vec![FlowAction::PushVlan(vid(100)), FlowAction::Output(19)]
                ),
                &rule(
                    2,
                    451,
                    meta.clone().eth_src(FW1_MAC),
                    vec![FlowAction::SetEthDst(DPI1_MAC), FlowAction::GotoTable(TableId::new(3))]
                ),
                &rule(
                    3,
                    650,
                    meta.clone().eth_dst(DPI1_MAC),
                    vec![FlowAction::PushVlan(vid(101)), FlowAction::Output(12)]
                ),
            ]
        );

        let on_b: Vec<&FlowRule> = batch.rules_on("SFF-B").collect();
        assert_eq!(on_b.len(), 6);
        assert!(on_b.contains(&&rule(
            3,
            650,
            meta.clone().eth_dst(DPI1_MAC),
            vec![FlowAction::PushVlan(vid(101)), FlowAction::Output(29)]
        )));
        assert!(on_b.contains(&&rule(
            2,
            451,
            meta.clone().eth_src(DPI1_MAC),
            vec![FlowAction::SetEthDst(port_mac(2, 2)), FlowAction::GotoTable(TableId::new(3))]
        )));
        assert!(on_b.contains(&&rule(
            3,
            650,
            meta.eth_src(DPI1_MAC),
            vec![FlowAction::Output(22)]
        )));
    }

    #[test]
    fn function_without_mac_is_skipped() {
        let ids = IdAllocator::new(PathTransport::Vlan, IdPoolParams::vlan(), IdAllocation::Sequential);
        let mut fixture = Fixture::new(path_1(PathTransport::Vlan));
        // dpi1 only keeps its VXLAN-GPE locator
        let mut dpi1 = topology::testing::dpi1();
        dpi1.locators.retain(|l| l.name != "eth0");
        fixture.functions.insert("dpi1".to_string(), std::sync::Arc::new(dpi1));

        let mut strategy = VlanStrategy::new(&ids);
        let (batch, warnings) = fixture.emit(&mut strategy).finish();
        // next-hop and egress of hop 1, and both final rules
        assert_eq!(warnings.len(), 4);
        assert!(warnings.iter().all(|w| w.reason.contains("dpi1")));
        // hop 0 is complete, hop 1 only gets its ingress and path-mapper rules
        assert_eq!(batch.len(), 6);
    }
}
