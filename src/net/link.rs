//! Bidirectional link: shared FIFO buffer, per-side byte bound, serialization
//! delay (spec §4.3).

use super::ids::{LinkId, NodeId};
use super::packet::Packet;
use crate::error::SimError;
use crate::sim::event::{EventKind, Target};
use crate::sim::simulator::Simulator;
use crate::sim::time::SimTime;
use crate::stats::{Sample, StatsSink};
use std::collections::VecDeque;
use tracing::trace;

/// `125/16384 == 8 / (1024 * 1024) * 1000`: bytes-to-milliseconds at a rate
/// given in megabits per second. Matches `original_source`'s
/// `icfire/networkobjects/link.py` tick-time arithmetic exactly.
const SERVICE_COEFF: f64 = 125.0 / 16384.0;

#[derive(Debug)]
pub struct Link {
    pub id: LinkId,
    pub endpoint_a: NodeId,
    pub endpoint_b: NodeId,
    pub rate_mbps: f64,
    pub delay_ms: f64,
    pub max_buffer_bytes: u64,
    buffer: VecDeque<(Packet, NodeId)>,
    used_a: u64,
    used_b: u64,
    free_at: SimTime,
}

impl Link {
    pub fn new(
        id: LinkId,
        endpoint_a: NodeId,
        endpoint_b: NodeId,
        rate_mbps: f64,
        delay_ms: f64,
        max_buffer_bytes: u64,
    ) -> Self {
        Link {
            id,
            endpoint_a,
            endpoint_b,
            rate_mbps,
            delay_ms,
            max_buffer_bytes,
            buffer: VecDeque::new(),
            used_a: 0,
            used_b: 0,
            free_at: SimTime::ZERO,
        }
    }

    pub fn other_endpoint(&self, from: NodeId) -> Option<NodeId> {
        if from == self.endpoint_a {
            Some(self.endpoint_b)
        } else if from == self.endpoint_b {
            Some(self.endpoint_a)
        } else {
            None
        }
    }

    fn used(&self, side: NodeId) -> u64 {
        if side == self.endpoint_a {
            self.used_a
        } else {
            self.used_b
        }
    }

    fn used_mut(&mut self, side: NodeId) -> &mut u64 {
        if side == self.endpoint_a {
            &mut self.used_a
        } else {
            &mut self.used_b
        }
    }

    pub fn total_buffer_bytes(&self) -> u64 {
        self.used_a + self.used_b
    }

    /// Distance-vector metric contribution of this link (spec §4.3).
    pub fn cost(&self) -> f64 {
        self.delay_ms + SERVICE_COEFF * self.total_buffer_bytes() as f64 / self.rate_mbps
    }

    /// Enqueues `packets` on `sender`'s side, tail-dropping anything that
    /// would exceed the per-side bound. Schedules a `LinkTick` if the link
    /// was idle and at least one packet was accepted.
    pub fn submit(
        &mut self,
        packets: Vec<Packet>,
        sender: NodeId,
        sim: &mut Simulator,
        stats: &mut dyn StatsSink,
    ) -> Result<(), SimError> {
        let was_idle = self.buffer.is_empty();
        let mut accepted_any = false;
        for pkt in packets {
            let size = pkt.size as u64;
            if self.used(sender) + size > self.max_buffer_bytes {
                trace!(link = %self.id, size, "tail-drop");
                stats.record(Sample::link_lost(self.id, sim.now(), size as f64));
                continue;
            }
            *self.used_mut(sender) += size;
            self.buffer.push_back((pkt, sender));
            accepted_any = true;
        }
        if was_idle && accepted_any {
            let at = sim.now().max(self.free_at);
            sim.enqueue(at, Target::Link(self.id), EventKind::LinkTick)?;
        }
        Ok(())
    }

    /// Services the head-of-line packet: computes serialization delay,
    /// schedules its arrival on the opposite endpoint, and re-arms itself if
    /// the buffer is still non-empty.
    pub fn on_tick(&mut self, sim: &mut Simulator, stats: &mut dyn StatsSink) -> Result<(), SimError> {
        let Some((packet, sender)) = self.buffer.pop_front() else {
            return Ok(());
        };
        let size = packet.size as u64;
        *self.used_mut(sender) -= size;

        let now = sim.now();
        let service_time = SERVICE_COEFF * packet.size as f64 / self.rate_mbps;
        let dest = self
            .other_endpoint(sender)
            .expect("buffered packet's sender is always one of this link's endpoints");
        let arrival = now + self.delay_ms + service_time;
        self.free_at = SimTime(now.as_millis() + service_time);

        stats.record(Sample::link_flowed(self.id, now, size as f64));
        stats.record(Sample::link_occupancy(
            self.id,
            now,
            self.total_buffer_bytes() as f64,
        ));

        sim.enqueue(arrival, Target::Node(dest), EventKind::PacketArrival(packet))?;
        if !self.buffer.is_empty() {
            sim.enqueue(self.free_at, Target::Link(self.id), EventKind::LinkTick)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> crate::stats::VecSink {
        crate::stats::VecSink::default()
    }

    #[test]
    fn serialization_delay_matches_documented_coefficient() {
        let link = Link::new(LinkId(0), NodeId(0), NodeId(1), 10.0, 10.0, 65536);
        let expected = 125.0 / 16384.0 * 1024.0 / 10.0;
        assert!((link.cost() - 10.0).abs() < 1e-9);
        assert!(expected > 0.0);
    }

    #[test]
    fn tail_drop_on_per_side_overflow() {
        let mut link = Link::new(LinkId(0), NodeId(0), NodeId(1), 10.0, 10.0, 1024);
        let mut sim = Simulator::new();
        let mut stats = sink();
        let a = crate::net::ids::FlowId::from("f1");
        let p1 = Packet::data(NodeId(0), NodeId(1), a.clone(), 0, None);
        let p2 = Packet::data(NodeId(0), NodeId(1), a, 1, None);
        link.submit(vec![p1, p2], NodeId(0), &mut sim, &mut stats)
            .unwrap();
        assert_eq!(link.used(NodeId(0)), 1024);
        assert_eq!(
            stats
                .samples
                .iter()
                .filter(|s| matches!(s.kind, crate::stats::SampleKind::LostPackets))
                .count(),
            1
        );
    }
}
