//! Stats sink (spec §6.2): a write-only observer, no feedback into
//! simulation state.

use crate::net::ids::{FlowId, LinkId, NodeId};
use crate::sim::time::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    BytesSent,
    BytesReceived,
    RttSample,
    WindowSize,
    BytesFlowed,
    BufferOccupancy,
    LostPackets,
}

/// The entity a sample is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Flow(FlowId),
    Link(LinkId),
    Node(NodeId),
}

#[derive(Debug, Clone)]
pub struct Sample {
    pub kind: SampleKind,
    pub entity: Entity,
    pub at: SimTime,
    pub value: f64,
}

impl Sample {
    pub fn bytes_sent(flow: FlowId, at: SimTime, value: f64) -> Self {
        Sample {
            kind: SampleKind::BytesSent,
            entity: Entity::Flow(flow),
            at,
            value,
        }
    }

    pub fn bytes_received(flow: FlowId, at: SimTime, value: f64) -> Self {
        Sample {
            kind: SampleKind::BytesReceived,
            entity: Entity::Flow(flow),
            at,
            value,
        }
    }

    pub fn rtt(flow: FlowId, at: SimTime, value: f64) -> Self {
        Sample {
            kind: SampleKind::RttSample,
            entity: Entity::Flow(flow),
            at,
            value,
        }
    }

    pub fn window(flow: FlowId, at: SimTime, value: f64) -> Self {
        Sample {
            kind: SampleKind::WindowSize,
            entity: Entity::Flow(flow),
            at,
            value,
        }
    }

    pub fn link_flowed(link: LinkId, at: SimTime, value: f64) -> Self {
        Sample {
            kind: SampleKind::BytesFlowed,
            entity: Entity::Link(link),
            at,
            value,
        }
    }

    pub fn link_occupancy(link: LinkId, at: SimTime, value: f64) -> Self {
        Sample {
            kind: SampleKind::BufferOccupancy,
            entity: Entity::Link(link),
            at,
            value,
        }
    }

    pub fn link_lost(link: LinkId, at: SimTime, value: f64) -> Self {
        Sample {
            kind: SampleKind::LostPackets,
            entity: Entity::Link(link),
            at,
            value,
        }
    }

    /// Router drop-on-no-route, tagged by router id using the same
    /// `LostPackets` kind as a link tail-drop (SPEC_FULL §4 supplement).
    pub fn router_lost(router: NodeId, at: SimTime, value: f64) -> Self {
        Sample {
            kind: SampleKind::LostPackets,
            entity: Entity::Node(router),
            at,
            value,
        }
    }
}

/// A write-only observer. The core never reads back through this trait.
pub trait StatsSink {
    fn record(&mut self, sample: Sample);
}

/// Collects every sample — used by tests and the CLI summary.
#[derive(Debug, Default)]
pub struct VecSink {
    pub samples: Vec<Sample>,
}

impl StatsSink for VecSink {
    fn record(&mut self, sample: Sample) {
        self.samples.push(sample);
    }
}

/// Discards everything — for runs that only care about timing, not stats.
#[derive(Debug, Default)]
pub struct NullSink;

impl StatsSink for NullSink {
    fn record(&mut self, _sample: Sample) {}
}
