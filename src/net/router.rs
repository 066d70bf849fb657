//! Distance-vector router with split horizon (spec §4.8).

use super::ids::{LinkId, NodeId};
use super::packet::{NextHop, Packet, PacketKind, RoutingSnapshot};
use crate::error::SimError;
use crate::sim::event::{EventKind, Target};
use crate::sim::simulator::Simulator;
use crate::sim::time::SimTime;
use crate::stats::{Sample, StatsSink};
use std::collections::BTreeMap;
use tracing::trace;

const ROUTING_UPDATE_INTERVAL_MS: f64 = 5000.0;
const ROUTING_REQUEST_STAGGER_MS: f64 = 10.0;

#[derive(Debug)]
pub struct Router {
    pub id: NodeId,
    pub links: Vec<LinkId>,
    routing_table: RoutingSnapshot,
    link_table: BTreeMap<LinkId, BTreeMap<NodeId, f64>>,
}

impl Router {
    pub fn new(id: NodeId, links: Vec<LinkId>) -> Self {
        Router {
            id,
            links,
            routing_table: BTreeMap::new(),
            link_table: BTreeMap::new(),
        }
    }

    pub fn snapshot(&self) -> RoutingSnapshot {
        self.routing_table.clone()
    }

    pub fn route_for(&self, dest: NodeId) -> Option<LinkId> {
        match self.routing_table.get(&dest) {
            Some((NextHop::Link(link), _)) => Some(*link),
            _ => None,
        }
    }

    /// `RoutingUpdate` at `t`: one staggered `RoutingRequestDispatch` per
    /// outgoing link, then reschedule itself 5000ms out (spec §4.8).
    pub fn on_routing_update(&self, t: SimTime, sim: &mut Simulator) -> Result<(), SimError> {
        for (i, &link) in self.links.iter().enumerate() {
            let at = SimTime(t.as_millis() + ROUTING_REQUEST_STAGGER_MS * i as f64);
            sim.enqueue(at, Target::Node(self.id), EventKind::RoutingRequestDispatch(link))?;
        }
        sim.enqueue(
            SimTime(t.as_millis() + ROUTING_UPDATE_INTERVAL_MS),
            Target::Node(self.id),
            EventKind::RoutingUpdate,
        )?;
        Ok(())
    }

    pub fn build_request(&self, neighbor: NodeId) -> Packet {
        Packet::routing_request(self.id, neighbor)
    }

    /// Packet arrival routed by kind (spec §4.8). `incoming` is
    /// `Some((link, link.cost()))` for control packets, which always travel
    /// exactly one hop so `pkt.source` names the adjacent node; `Data`/`Ack`
    /// need no incoming link, only the routing-table lookup for `pkt.dest`.
    #[tracing::instrument(skip(self, pkt, stats), fields(router = %self.id, kind = ?pkt.kind))]
    pub fn on_packet_arrival(
        &mut self,
        pkt: Packet,
        incoming: Option<(LinkId, f64)>,
        t: SimTime,
        stats: &mut dyn StatsSink,
    ) -> Result<Vec<(LinkId, Packet)>, SimError> {
        match pkt.kind {
            PacketKind::RoutingRequest => {
                let (link, _) = incoming.ok_or_else(|| SimError::UnknownEventKind {
                    target: Target::Node(self.id),
                    kind: "RoutingRequest with no resolvable incoming link",
                    at: t,
                })?;
                let reply = Packet::routing_reply(self.id, pkt.source, self.snapshot());
                Ok(vec![(link, reply)])
            }
            PacketKind::RoutingReply => {
                let (link, cost) = incoming.ok_or_else(|| SimError::UnknownEventKind {
                    target: Target::Node(self.id),
                    kind: "RoutingReply with no resolvable incoming link",
                    at: t,
                })?;
                let table = pkt
                    .routing_table
                    .expect("routing reply packets carry a table");
                self.on_routing_reply(link, cost, table);
                Ok(vec![])
            }
            PacketKind::Data | PacketKind::Ack => match self.route_for(pkt.dest) {
                Some(link) => Ok(vec![(link, pkt)]),
                None => {
                    trace!(dest = %pkt.dest, "no route, dropping");
                    stats.record(Sample::router_lost(self.id, t, pkt.size as f64));
                    Ok(vec![])
                }
            },
        }
    }

    /// Rebuilds `link_table[link]` from the neighbor's advertised table,
    /// applying split horizon, then recomputes the whole routing table.
    fn on_routing_reply(&mut self, link: LinkId, cost: f64, neighbor_table: RoutingSnapshot) {
        let mut rebuilt = BTreeMap::new();
        for (dest, (next_hop, distance)) in neighbor_table {
            if next_hop != NextHop::Link(link) {
                rebuilt.insert(dest, distance + cost);
            }
        }
        self.link_table.insert(link, rebuilt);
        self.recompute_routing_table();
    }

    fn recompute_routing_table(&mut self) {
        let mut best: BTreeMap<NodeId, (LinkId, f64)> = BTreeMap::new();
        for (&link, dests) in &self.link_table {
            for (&dest, &distance) in dests {
                best.entry(dest)
                    .and_modify(|entry| {
                        if distance < entry.1 {
                            *entry = (link, distance);
                        }
                    })
                    .or_insert((link, distance));
            }
        }
        self.routing_table = best
            .into_iter()
            .map(|(dest, (link, distance))| (dest, (NextHop::Link(link), distance)))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::VecSink;

    fn router() -> Router {
        Router::new(NodeId(0), vec![LinkId(1), LinkId(2)])
    }

    #[test]
    fn split_horizon_drops_the_route_learned_from_the_same_link() {
        let mut r = router();
        let mut table = BTreeMap::new();
        table.insert(NodeId(5), (NextHop::Link(LinkId(1)), 3.0));
        table.insert(NodeId(6), (NextHop::Link(LinkId(9)), 2.0));
        r.on_routing_reply(LinkId(1), 1.0, table);
        // NodeId(5)'s next hop as advertised equals the link it arrived on —
        // excluded. NodeId(6) survives with its cost incremented by 1.0.
        assert!(!r.link_table[&LinkId(1)].contains_key(&NodeId(5)));
        assert_eq!(r.link_table[&LinkId(1)][&NodeId(6)], 3.0);
        assert_eq!(r.route_for(NodeId(6)), Some(LinkId(1)));
    }

    #[test]
    fn recompute_prefers_the_minimum_distance_link() {
        let mut r = router();
        let mut via1 = BTreeMap::new();
        via1.insert(NodeId(5), (NextHop::Direct, 10.0));
        r.on_routing_reply(LinkId(1), 1.0, via1);
        let mut via2 = BTreeMap::new();
        via2.insert(NodeId(5), (NextHop::Direct, 3.0));
        r.on_routing_reply(LinkId(2), 1.0, via2);
        assert_eq!(r.route_for(NodeId(5)), Some(LinkId(2)));
    }

    #[test]
    fn data_with_no_route_is_dropped_and_sampled() {
        let mut r = router();
        let mut stats = VecSink::default();
        let pkt = Packet::data(NodeId(7), NodeId(8), crate::net::ids::FlowId::from("f1"), 0, None);
        let out = r
            .on_packet_arrival(pkt, None, SimTime::ZERO, &mut stats)
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(stats.samples.len(), 1);
    }
}
