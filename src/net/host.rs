//! Host: single-link endpoint owning a flow sender/receiver per flow id
//! (spec §4.4).

use super::flow::{FlowReceiver, FlowSender};
use super::ids::{FlowId, LinkId, NodeId};
use super::packet::{NextHop, Packet, PacketKind};
use crate::error::SimError;
use crate::sim::event::{EventKind, Target};
use crate::sim::simulator::Simulator;
use crate::sim::time::SimTime;
use crate::stats::StatsSink;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug)]
pub struct Host {
    pub id: NodeId,
    pub link: LinkId,
    senders: HashMap<FlowId, FlowSender>,
    receivers: HashMap<FlowId, FlowReceiver>,
}

impl Host {
    pub fn new(id: NodeId, link: LinkId) -> Self {
        Host {
            id,
            link,
            senders: HashMap::new(),
            receivers: HashMap::new(),
        }
    }

    pub fn add_sender(&mut self, sender: FlowSender) {
        self.senders.insert(sender.id.clone(), sender);
    }

    pub fn add_receiver(&mut self, receiver: FlowReceiver) {
        self.receivers.insert(receiver.id.clone(), receiver);
    }

    pub fn sender(&self, flow: &FlowId) -> Option<&FlowSender> {
        self.senders.get(flow)
    }

    pub fn all_flows_done(&self) -> bool {
        self.senders.values().all(|s| s.done)
    }

    /// Packet arrival routed by kind (spec §4.2/§4.4). Returns packets to
    /// submit onto this host's one outgoing link; `Network` performs the
    /// submission since the `Link` lives in its arena.
    #[tracing::instrument(skip(self, pkt, stats), fields(host = %self.id, kind = ?pkt.kind))]
    pub fn on_packet_arrival(
        &mut self,
        pkt: Packet,
        t: SimTime,
        stats: &mut dyn StatsSink,
    ) -> Result<Vec<Packet>, SimError> {
        match pkt.kind {
            PacketKind::RoutingRequest => {
                let mut table = BTreeMap::new();
                table.insert(self.id, (NextHop::Direct, 0.0));
                Ok(vec![Packet::routing_reply(self.id, pkt.source, table)])
            }
            PacketKind::Ack => {
                let flow = pkt.flow_id.clone().expect("ack packets carry a flow id");
                let sender =
                    self.senders
                        .get_mut(&flow)
                        .ok_or_else(|| SimError::MissingEndpoint {
                            flow: flow.clone(),
                            node: self.id,
                        })?;
                Ok(sender.on_ack(&pkt, t, stats))
            }
            PacketKind::Data => {
                let flow = pkt.flow_id.clone().expect("data packets carry a flow id");
                let receiver =
                    self.receivers
                        .get_mut(&flow)
                        .ok_or_else(|| SimError::MissingEndpoint {
                            flow: flow.clone(),
                            node: self.id,
                        })?;
                Ok(vec![receiver.on_data(&pkt, t, stats)])
            }
            PacketKind::RoutingReply => Err(SimError::UnknownEventKind {
                target: Target::Node(self.id),
                kind: "RoutingReply at a host",
                at: t,
            }),
        }
    }

    /// `FlowUpdate(flow)`: drives `sendPackets`/retransmit-timeout checking
    /// and unconditionally re-arms itself at `now + rto` (spec §4.4).
    pub fn on_flow_update(
        &mut self,
        flow: &FlowId,
        t: SimTime,
        sim: &mut Simulator,
        stats: &mut dyn StatsSink,
    ) -> Result<Vec<Packet>, SimError> {
        let sender = self
            .senders
            .get_mut(flow)
            .ok_or_else(|| SimError::MissingEndpoint {
                flow: flow.clone(),
                node: self.id,
            })?;
        let (packets, rto) = sender.on_timer_tick(t, stats);
        sim.enqueue(
            SimTime(t.as_millis() + rto),
            Target::Node(self.id),
            EventKind::FlowUpdate(flow.clone()),
        )?;
        Ok(packets)
    }

    /// `WindowUpdate(flow)`, FAST only: re-arms at `now + 2*srtt` only while
    /// the flow isn't done (spec §4.6).
    pub fn on_window_update(
        &mut self,
        flow: &FlowId,
        t: SimTime,
        sim: &mut Simulator,
        stats: &mut dyn StatsSink,
    ) -> Result<(), SimError> {
        let sender = self
            .senders
            .get_mut(flow)
            .ok_or_else(|| SimError::MissingEndpoint {
                flow: flow.clone(),
                node: self.id,
            })?;
        sender.on_window_update(t, stats);
        if !sender.done {
            sim.enqueue(
                SimTime(t.as_millis() + 2.0 * sender.srtt),
                Target::Node(self.id),
                EventKind::WindowUpdate(flow.clone()),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::flow::SenderVariant;
    use crate::stats::VecSink;

    fn host() -> Host {
        Host::new(NodeId(0), LinkId(0))
    }

    #[test]
    fn routing_request_gets_trivial_self_reply() {
        let mut h = host();
        let mut stats = VecSink::default();
        let req = Packet::routing_request(NodeId(9), NodeId(0));
        let out = h.on_packet_arrival(req, SimTime::ZERO, &mut stats).unwrap();
        assert_eq!(out.len(), 1);
        let table = out[0].routing_table.as_ref().unwrap();
        assert_eq!(table.get(&NodeId(0)), Some(&(NextHop::Direct, 0.0)));
    }

    #[test]
    fn ack_for_unknown_flow_is_a_missing_endpoint_error() {
        let mut h = host();
        let mut stats = VecSink::default();
        let ack = Packet::ack(NodeId(1), NodeId(0), FlowId::from("nope"), 1, None);
        let err = h.on_packet_arrival(ack, SimTime::ZERO, &mut stats).unwrap_err();
        assert!(matches!(err, SimError::MissingEndpoint { .. }));
    }

    #[test]
    fn flow_update_rearms_unconditionally() {
        let mut h = host();
        h.add_sender(FlowSender::new(
            FlowId::from("f1"),
            NodeId(0),
            NodeId(1),
            2048,
            SenderVariant::reno(),
        ));
        let mut sim = Simulator::new();
        let mut stats = VecSink::default();
        // Must not error even though the flow has sent nothing yet — the
        // self-rearm is unconditional regardless of whether packets went out.
        let packets = h
            .on_flow_update(&FlowId::from("f1"), SimTime::ZERO, &mut sim, &mut stats)
            .unwrap();
        assert!(!packets.is_empty());
    }
}
