//! Event records and dispatch targets.
//!
//! Replaces the teacher's `dyn Event` trait object with a closed, tagged
//! variant: dispatch at every target is an exhaustive match, never a
//! downcast.

use crate::net::ids::{FlowId, LinkId, NodeId};
use crate::net::packet::Packet;
use crate::sim::time::SimTime;
use std::fmt;

/// Where an event is delivered. Nodes (hosts and routers) share one variant
/// since both are addressed the same way in the arena; links are distinct
/// because only `LinkTick` ever targets one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Node(NodeId),
    Link(LinkId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(id) => write!(f, "node {id}"),
            Target::Link(id) => write!(f, "link {id}"),
        }
    }
}

/// The payload of an event, tagged by kind. `Packet` is cloned into
/// `PacketArrival` rather than referenced, matching the spec's "packets are
/// immutable once emitted" rule — no aliasing back into a link's buffer.
#[derive(Debug, Clone)]
pub enum EventKind {
    PacketArrival(Packet),
    LinkTick,
    FlowUpdate(FlowId),
    WindowUpdate(FlowId),
    RoutingUpdate,
    /// One staggered leg of a RoutingUpdate: send a RoutingRequest out a
    /// single link. Exists so the `+10*i` stagger described in §4.8 goes
    /// through the ordinary event queue instead of faking the clock.
    RoutingRequestDispatch(LinkId),
}

impl EventKind {
    /// Stable name for diagnostics (`SimError::UnknownEventKind`).
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::PacketArrival(_) => "PacketArrival",
            EventKind::LinkTick => "LinkTick",
            EventKind::FlowUpdate(_) => "FlowUpdate",
            EventKind::WindowUpdate(_) => "WindowUpdate",
            EventKind::RoutingUpdate => "RoutingUpdate",
            EventKind::RoutingRequestDispatch(_) => "RoutingRequestDispatch",
        }
    }
}

/// An immutable, queued event. `seq` is assigned once at construction by
/// `Simulator::enqueue` and never reused.
#[derive(Debug, Clone)]
pub struct Event {
    pub timestamp: SimTime,
    pub target: Target,
    pub kind: EventKind,
    pub seq: u64,
}
