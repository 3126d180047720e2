// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! End-to-end compiles over the sample topology, against an in-memory flow sink.

#![cfg(not(feature = "shuttle"))]

use flow::{Cookie, FlowAction, FlowKey, FlowRule, FlowSink, MemoryFlowSink, QueuedFlowSink, SinkError};
use pretty_assertions::assert_eq;
use sfc_render::{
    IdAllocation, RenderError, RendererParams, RendererParamsBuilder, ResolutionError, RspRenderer,
};
use std::collections::HashMap;
use std::sync::Arc;
use topology::testing::{empty_path, path_1, path_2, topology};
use topology::{PathId, PathTransport, RenderedServicePath, RspEvent};
use tracing_test::traced_test;

fn setup(transport: PathTransport, sink: Arc<dyn FlowSink>) -> RspRenderer {
    RspRenderer::new(
        Arc::new(topology(transport)),
        sink,
        RendererParams::default(),
    )
    .unwrap()
}

/// What the sink holds, regardless of installation order.
fn installed(sink: &MemoryFlowSink) -> HashMap<FlowKey, FlowRule> {
    sink.snapshot().into_iter().collect()
}

fn memory_renderer(transport: PathTransport) -> (RspRenderer, Arc<MemoryFlowSink>) {
    let sink = Arc::new(MemoryFlowSink::new());
    (setup(transport, sink.clone()), sink)
}

#[test]
#[traced_test]
fn vlan_path_programs_both_forwarders_and_removes_cleanly() {
    let (renderer, sink) = memory_renderer(PathTransport::Vlan);
    let rsp = path_1(PathTransport::Vlan);
    let report = renderer.render(&rsp).unwrap();
    assert_eq!(report.nodes, vec!["SFF-A", "SFF-B"]);
    assert!(report.warnings.is_empty());

    for node in ["SFF-A", "SFF-B"] {
        let tables: Vec<u8> = sink
            .rules_on(node)
            .iter()
            .filter(|r| r.cookie == Cookie::for_path(rsp.path_id))
            .map(|r| r.table.as_u8())
            .collect();
        for table in 0..4 {
            assert!(tables.contains(&table), "{node} has no rule in table {table}");
        }
    }
    assert_eq!(sink.rules_for_path(rsp.path_id).len(), 12);

    let removed = renderer.remove(&rsp).unwrap();
    assert_eq!(removed.removed, 12);
    assert_eq!(removed.released, vec!["SFF-A", "SFF-B"]);
    assert!(sink.is_empty());
    assert!(renderer.registry().initialized().is_empty());
    assert!(logs_contain("Removed rsp path-1"));
}

#[test]
fn unresolvable_paths_apply_nothing() {
    let (renderer, sink) = memory_renderer(PathTransport::Vlan);
    // nat1 lives on SFF-C
    let rsp = RenderedServicePath::new("misplaced", 4, PathTransport::Vlan)
        .with_hop("SFF-A", Some("fw1"), 255)
        .with_hop("SFF-B", Some("nat1"), 254);
    assert_eq!(
        renderer.render(&rsp),
        Err(RenderError::Resolution {
            path: PathId::new(4),
            source: ResolutionError::NotBound {
                function: "nat1".to_string(),
                forwarder: "SFF-B".to_string(),
            },
        })
    );

    let rsp = RenderedServicePath::new("nowhere", 5, PathTransport::Vlan)
        .with_hop("SFF-X", Some("fw1"), 255);
    assert_eq!(
        renderer.render(&rsp),
        Err(RenderError::Resolution {
            path: PathId::new(5),
            source: ResolutionError::NoSuchForwarder("SFF-X".to_string()),
        })
    );
    assert_eq!(sink.apply_calls(), 0);
    assert_eq!(sink.remove_calls(), 0);
    assert!(renderer.registry().initialized().is_empty());
}

#[test]
fn transport_mismatch_applies_nothing() {
    let (renderer, sink) = memory_renderer(PathTransport::Vlan);
    let result = renderer.render(&path_1(PathTransport::Mpls));
    assert!(matches!(
        result,
        Err(RenderError::IncompatibleLocator {
            transport: PathTransport::Mpls,
            ..
        })
    ));
    assert_eq!(sink.apply_calls(), 0);
}

#[test]
fn zero_hop_path_is_a_no_op() {
    for transport in [PathTransport::Vlan, PathTransport::Mpls, PathTransport::Nsh] {
        let (renderer, sink) = memory_renderer(transport);
        let report = renderer.render(&empty_path(transport)).unwrap();
        assert_eq!(report.rules, 0);
        assert!(report.nodes.is_empty());
        assert_eq!(sink.apply_calls(), 0);
        assert!(sink.is_empty());
    }
}

#[test]
fn rendering_twice_changes_nothing() {
    for transport in [PathTransport::Vlan, PathTransport::Mpls, PathTransport::Nsh] {
        let (renderer, sink) = memory_renderer(transport);
        renderer.render(&path_2(transport)).unwrap();
        let first = installed(&sink);
        renderer.render(&path_2(transport)).unwrap();
        assert_eq!(installed(&sink), first);
    }
}

#[test]
fn render_then_remove_leaves_an_empty_sink() {
    for transport in [PathTransport::Vlan, PathTransport::Mpls, PathTransport::Nsh] {
        let (renderer, sink) = memory_renderer(transport);
        renderer.render(&path_1(transport)).unwrap();
        assert_eq!(sink.len(), 20, "{transport}");
        renderer.remove(&path_1(transport)).unwrap();
        assert!(sink.is_empty(), "{transport}: {} rules left", sink.len());
    }
}

#[test]
fn shared_forwarders_keep_their_table_miss_rules() {
    let (renderer, sink) = memory_renderer(PathTransport::Vlan);
    renderer.render(&path_1(PathTransport::Vlan)).unwrap();
    renderer.render(&path_2(PathTransport::Vlan)).unwrap();

    let removed = renderer.remove(&path_1(PathTransport::Vlan)).unwrap();
    assert!(removed.released.is_empty());
    // 18 rules of path-2, table-miss rules of the three forwarders
    assert_eq!(sink.len(), 30);

    let removed = renderer.remove(&path_2(PathTransport::Vlan)).unwrap();
    assert_eq!(removed.released, vec!["SFF-A", "SFF-B", "SFF-C"]);
    assert!(sink.is_empty());
}

#[test]
fn render_then_remove_restores_previous_state() {
    let (renderer, sink) = memory_renderer(PathTransport::Vlan);
    renderer.render(&path_2(PathTransport::Vlan)).unwrap();
    let before = sink.snapshot();

    renderer.render(&path_1(PathTransport::Vlan)).unwrap();
    assert_eq!(sink.len(), before.len() + 12);
    renderer.remove(&path_1(PathTransport::Vlan)).unwrap();
    assert_eq!(sink.snapshot(), before);
}

#[test]
#[traced_test]
fn sink_failure_leaves_no_half_wired_path() {
    let sink = Arc::new(MemoryFlowSink::failing_after(5));
    let renderer = setup(PathTransport::Vlan, sink.clone());
    let result = renderer.render(&path_1(PathTransport::Vlan));
    assert_eq!(
        result,
        Err(RenderError::Sink(SinkError::Rejected {
            node: "SFF-B".to_string(),
            reason: "injected failure".to_string(),
        }))
    );
    assert!(sink.is_empty());
    // once before applying, once to clean up
    assert_eq!(sink.remove_calls(), 2);
    assert!(renderer.registry().initialized().is_empty());
    assert!(logs_contain("Failed to apply rules of path 1"));
}

#[test]
fn every_transport_renders_path_1() {
    for transport in [PathTransport::Vlan, PathTransport::Mpls, PathTransport::Nsh] {
        let (renderer, sink) = memory_renderer(transport);
        let report = renderer.render(&path_1(transport)).unwrap();
        assert_eq!(report.rules, 20, "{transport}");
        assert!(report.warnings.is_empty(), "{transport}");
        assert_eq!(sink.rules_for_path(PathId::new(1)).len(), 12, "{transport}");
    }
}

#[test]
fn nsh_paths_carry_the_path_id() {
    let (renderer, sink) = memory_renderer(PathTransport::Nsh);
    renderer.render(&path_2(PathTransport::Nsh)).unwrap();
    let rules = sink.rules_for_path(PathId::new(2));
    assert!(
        rules
            .iter()
            .all(|(_, r)| r.matches.nsp.map(net::nsh::Spi::as_u32) == Some(2))
    );
    // the last forwarder has a single locator and sends traffic back where it came from
    assert!(
        rules
            .iter()
            .any(|(node, r)| node == "SFF-C" && r.actions.last() == Some(&FlowAction::OutputInPort))
    );
}

#[test]
fn update_moves_rules_to_the_new_path_id() {
    let (renderer, sink) = memory_renderer(PathTransport::Mpls);
    let old = path_1(PathTransport::Mpls);
    renderer.render(&old).unwrap();

    let mut new = path_2(PathTransport::Mpls);
    new.path_id = PathId::new(7);
    let report = renderer.update(&old, &new).unwrap();
    assert_eq!(report.path_id, PathId::new(7));
    assert!(sink.rules_for_path(PathId::new(1)).is_empty());
    assert_eq!(sink.rules_for_path(PathId::new(7)).len(), 18);
}

#[test]
fn failed_update_keeps_the_old_path() {
    let (renderer, sink) = memory_renderer(PathTransport::Vlan);
    let old = path_1(PathTransport::Vlan);
    renderer.render(&old).unwrap();
    let before = installed(&sink);

    // no MPLS locators in this topology
    let mut new = path_1(PathTransport::Mpls);
    new.path_id = PathId::new(3);
    assert!(matches!(
        renderer.update(&old, &new),
        Err(RenderError::IncompatibleLocator { .. })
    ));
    assert_eq!(installed(&sink), before);

    // path-1 still holds VLAN ids 100 and 101
    renderer.render(&path_2(PathTransport::Vlan)).unwrap();
    let vids: Vec<u16> = sink
        .rules_for_path(PathId::new(2))
        .iter()
        .filter_map(|(_, r)| r.matches.vlan.map(net::vlan::Vid::as_u16))
        .collect();
    assert!(!vids.is_empty());
    assert!(vids.iter().all(|vid| *vid >= 200), "{vids:?}");
}

#[test]
fn events_drive_the_renderer() {
    let (renderer, sink) = memory_renderer(PathTransport::Vlan);
    let rsp = path_1(PathTransport::Vlan);
    renderer.handle(&RspEvent::Created(rsp.clone())).unwrap();
    renderer
        .handle(&RspEvent::Updated {
            old: rsp.clone(),
            new: rsp.clone(),
        })
        .unwrap();
    assert_eq!(sink.rules_for_path(rsp.path_id).len(), 12);
    renderer.handle(&RspEvent::Deleted(rsp.clone())).unwrap();
    assert!(sink.rules_for_path(rsp.path_id).is_empty());
}

#[test]
fn path_derived_identifiers_do_not_depend_on_history() {
    let tags = |warm_up: bool| {
        let sink = Arc::new(MemoryFlowSink::new());
        let params = RendererParamsBuilder::default()
            .allocation(IdAllocation::PathDerived)
            .build()
            .unwrap();
        let renderer =
            RspRenderer::new(Arc::new(topology(PathTransport::Vlan)), sink.clone(), params)
                .unwrap();
        if warm_up {
            renderer.render(&path_1(PathTransport::Vlan)).unwrap();
        }
        renderer.render(&path_2(PathTransport::Vlan)).unwrap();
        let mut vids: Vec<u16> = sink
            .rules_for_path(PathId::new(2))
            .iter()
            .filter_map(|(_, r)| r.matches.vlan.map(net::vlan::Vid::as_u16))
            .collect();
        vids.sort_unstable();
        vids.dedup();
        vids
    };
    assert_eq!(tags(false), vec![300, 301, 302]);
    assert_eq!(tags(true), tags(false));
}

#[test]
fn queued_sink_in_front_of_memory_sink() {
    let memory = Arc::new(MemoryFlowSink::new());
    let queued = QueuedFlowSink::new(memory.clone(), 8).unwrap();
    let renderer = setup(PathTransport::Vlan, Arc::new(queued));
    let report = renderer.render(&path_2(PathTransport::Vlan)).unwrap();
    assert_eq!(memory.len(), report.rules);
    renderer.remove(&path_2(PathTransport::Vlan)).unwrap();
    assert!(memory.is_empty());
}
