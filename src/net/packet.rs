//! Packets: immutable values, no behavior (spec §4.2).

use super::ids::{FlowId, LinkId, NodeId};
use crate::sim::time::SimTime;
use std::collections::BTreeMap;

pub const DATA_SIZE: u32 = 1024;
pub const ACK_SIZE: u32 = 64;
pub const ROUTING_REQUEST_SIZE: u32 = 64;
pub const ROUTING_REPLY_SIZE: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Data,
    Ack,
    RoutingRequest,
    RoutingReply,
}

/// A router's advertised next hop for one destination: either "I am the
/// destination" (never excluded by split horizon) or a concrete outgoing
/// link (excluded when it equals the link the advertisement arrived on).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextHop {
    Direct,
    Link(LinkId),
}

/// The wire form of a routing table: dest-id → (advertiser's next hop,
/// distance). Global and comparable across nodes because `LinkId`s are
/// arena-wide, not node-local.
pub type RoutingSnapshot = BTreeMap<NodeId, (NextHop, f64)>;

#[derive(Debug, Clone)]
pub struct Packet {
    pub source: NodeId,
    pub dest: NodeId,
    pub kind: PacketKind,
    pub size: u32,
    pub flow_id: Option<FlowId>,
    pub index: Option<u64>,
    pub send_timestamp: Option<SimTime>,
    pub routing_table: Option<RoutingSnapshot>,
}

impl Packet {
    pub fn data(
        source: NodeId,
        dest: NodeId,
        flow_id: FlowId,
        index: u64,
        send_timestamp: Option<SimTime>,
    ) -> Self {
        Packet {
            source,
            dest,
            kind: PacketKind::Data,
            size: DATA_SIZE,
            flow_id: Some(flow_id),
            index: Some(index),
            send_timestamp,
            routing_table: None,
        }
    }

    pub fn ack(
        source: NodeId,
        dest: NodeId,
        flow_id: FlowId,
        index: u64,
        send_timestamp: Option<SimTime>,
    ) -> Self {
        Packet {
            source,
            dest,
            kind: PacketKind::Ack,
            size: ACK_SIZE,
            flow_id: Some(flow_id),
            index: Some(index),
            send_timestamp,
            routing_table: None,
        }
    }

    pub fn routing_request(source: NodeId, dest: NodeId) -> Self {
        Packet {
            source,
            dest,
            kind: PacketKind::RoutingRequest,
            size: ROUTING_REQUEST_SIZE,
            flow_id: None,
            index: None,
            send_timestamp: None,
            routing_table: None,
        }
    }

    pub fn routing_reply(source: NodeId, dest: NodeId, table: RoutingSnapshot) -> Self {
        Packet {
            source,
            dest,
            kind: PacketKind::RoutingReply,
            size: ROUTING_REPLY_SIZE,
            flow_id: None,
            index: None,
            send_timestamp: None,
            routing_table: Some(table),
        }
    }
}
