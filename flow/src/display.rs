// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display implementations

use crate::batch::FlowBatch;
use crate::rule::{Cookie, FlowAction, FlowIntent, FlowMatch, FlowRule};
use std::fmt::Display;

impl Display for Cookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.raw())
    }
}

impl Display for FlowMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_any() {
            return write!(f, "any");
        }
        let mut sep = "";
        let mut field = |f: &mut std::fmt::Formatter<'_>, name: &str, value: &dyn Display| {
            let r = write!(f, "{sep}{name}={value}");
            sep = ",";
            r
        };
        if let Some(v) = &self.in_port {
            field(f, "in_port", v)?;
        }
        if let Some(v) = &self.eth_type {
            field(f, "eth_type", v)?;
        }
        if let Some(v) = &self.eth_src {
            field(f, "eth_src", v)?;
        }
        if let Some(v) = &self.eth_dst {
            field(f, "eth_dst", v)?;
        }
        if let Some(v) = &self.vlan {
            field(f, "vlan", v)?;
        }
        if let Some(v) = &self.mpls_label {
            field(f, "mpls", v)?;
        }
        if let Some(v) = &self.nsp {
            field(f, "nsp", v)?;
        }
        if let Some(v) = &self.nsi {
            field(f, "nsi", v)?;
        }
        if let Some(v) = &self.metadata {
            field(f, "metadata", v)?;
        }
        Ok(())
    }
}

impl Display for FlowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowAction::PushVlan(vid) => write!(f, "push_vlan:{vid}"),
            FlowAction::PopVlan => write!(f, "pop_vlan"),
            FlowAction::PushMpls(label) => write!(f, "push_mpls:{label}"),
            FlowAction::PopMpls(eth_type) => write!(f, "pop_mpls:{eth_type}"),
            FlowAction::SetEthSrc(mac) => write!(f, "set_eth_src:{mac}"),
            FlowAction::SetEthDst(mac) => write!(f, "set_eth_dst:{mac}"),
            FlowAction::SetTunnelIpv4Dst(ip) => write!(f, "set_tun_dst:{ip}"),
            FlowAction::SetNsp(nsp) => write!(f, "set_nsp:{nsp}"),
            FlowAction::SetNsi(nsi) => write!(f, "set_nsi:{nsi}"),
            FlowAction::WriteMetadata(m) => write!(f, "write_metadata:{m}"),
            FlowAction::GotoTable(t) => write!(f, "goto_table:{t}"),
            FlowAction::Output(port) => write!(f, "output:{port}"),
            FlowAction::OutputInPort => write!(f, "output:in_port"),
            FlowAction::Drop => write!(f, "drop"),
        }
    }
}

impl Display for FlowRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let intent = match self.intent {
            FlowIntent::Add => "add",
            FlowIntent::Remove => "del",
        };
        write!(
            f,
            "{intent} table={} prio={} cookie={} match[{}] actions[",
            self.table, self.priority, self.cookie, self.matches
        )?;
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{action}")?;
        }
        write!(f, "]")
    }
}

impl Display for FlowBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "─── flow batch ({} rules) ───", self.len())?;
        for (node, rule) in self.iter() {
            writeln!(f, "  {node:<16} {rule}")?;
        }
        Ok(())
    }
}
