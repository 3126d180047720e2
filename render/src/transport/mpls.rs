// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! MPLS transport: one label per hop.

use super::tagged::{TagEncap, Tagged};
use flow::{FlowAction, FlowMatch};
use net::eth::EthType;
use net::mpls::MplsLabel;
use topology::PathTransport;

pub struct Mpls;

impl TagEncap for Mpls {
    type Tag = MplsLabel;
    const TRANSPORT: PathTransport = PathTransport::Mpls;

    fn match_tag(matches: FlowMatch, tag: MplsLabel) -> FlowMatch {
        matches.mpls_label(tag)
    }
    fn push(tag: MplsLabel) -> FlowAction {
        FlowAction::PushMpls(tag)
    }
    // the chain only carries IPv4 below the label
    fn pop() -> FlowAction {
        FlowAction::PopMpls(EthType::IPV4)
    }
}

pub type MplsStrategy<'a> = Tagged<'a, Mpls>;
