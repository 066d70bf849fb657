//! The arena: owns every host, router, link and flow; the sole entity that
//! ever holds a `&mut` to more than one node at a time (spec §3 "no cycles
//! are owned").

use super::flow::{FlowKind, FlowReceiver, FlowSender};
use super::host::Host;
use super::ids::{FlowId, LinkId, NodeId};
use super::link::Link;
use super::router::Router;
use crate::config::NetworkDescriptor;
use crate::error::{ConfigError, SimError};
use crate::sim::event::{Event, EventKind, Target};
use crate::sim::simulator::Simulator;
use crate::sim::time::SimTime;
use crate::stats::StatsSink;
use std::collections::HashMap;

#[derive(Debug)]
enum NodeKind {
    Host(Host),
    Router(Router),
}

pub struct Network {
    nodes: Vec<Option<NodeKind>>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    stats: Box<dyn StatsSink>,
}

impl Network {
    pub fn other_endpoint(&self, link: LinkId, from: NodeId) -> Option<NodeId> {
        self.links.get(link.0)?.other_endpoint(from)
    }

    pub fn link_cost(&self, link: LinkId) -> f64 {
        self.links[link.0].cost()
    }

    pub fn link_between(&self, a: NodeId, b: NodeId) -> Option<LinkId> {
        self.edges
            .get(&(a, b))
            .or_else(|| self.edges.get(&(b, a)))
            .copied()
    }

    pub fn all_flows_done(&self) -> bool {
        self.nodes.iter().all(|node| match node {
            Some(NodeKind::Host(host)) => host.all_flows_done(),
            _ => true,
        })
    }

    fn submit_on_link(
        &mut self,
        link: LinkId,
        sender: NodeId,
        packets: Vec<super::packet::Packet>,
        sim: &mut Simulator,
    ) -> Result<(), SimError> {
        if packets.is_empty() {
            return Ok(());
        }
        let Network { links, stats, .. } = self;
        links[link.0].submit(packets, sender, sim, stats.as_mut())
    }

    /// Dispatches one event to its target. Mirrors `Simulator::step`'s
    /// "pops, advances clock, dispatches" contract (spec §4.1); unhandled
    /// (target, kind) combinations are `SimError::UnknownEventKind`.
    pub fn dispatch(&mut self, event: &Event, sim: &mut Simulator) -> Result<(), SimError> {
        match event.target {
            Target::Node(id) => self.dispatch_node(id, event, sim),
            Target::Link(id) => self.dispatch_link(id, event, sim),
        }
    }

    fn dispatch_link(
        &mut self,
        id: LinkId,
        event: &Event,
        sim: &mut Simulator,
    ) -> Result<(), SimError> {
        match &event.kind {
            EventKind::LinkTick => {
                let Network { links, stats, .. } = self;
                let link = links
                    .get_mut(id.0)
                    .expect("link ids are only ever issued by this arena");
                link.on_tick(sim, stats.as_mut())
            }
            other => Err(SimError::UnknownEventKind {
                target: event.target,
                kind: other.label(),
                at: event.timestamp,
            }),
        }
    }

    fn dispatch_node(
        &mut self,
        id: NodeId,
        event: &Event,
        sim: &mut Simulator,
    ) -> Result<(), SimError> {
        let mut node = self
            .nodes
            .get_mut(id.0)
            .and_then(|slot| slot.take())
            .expect("node ids are only ever issued by this arena");

        let result = self.dispatch_to_node(&mut node, id, event, sim);
        self.nodes[id.0] = Some(node);
        result
    }

    fn dispatch_to_node(
        &mut self,
        node: &mut NodeKind,
        id: NodeId,
        event: &Event,
        sim: &mut Simulator,
    ) -> Result<(), SimError> {
        let t = event.timestamp;
        match (&mut *node, &event.kind) {
            (NodeKind::Host(host), EventKind::PacketArrival(pkt)) => {
                let packets = host.on_packet_arrival(pkt.clone(), t, self.stats.as_mut())?;
                let link = host.link;
                self.submit_on_link(link, id, packets, sim)
            }
            (NodeKind::Host(host), EventKind::FlowUpdate(flow)) => {
                let packets = host.on_flow_update(flow, t, sim, self.stats.as_mut())?;
                let link = host.link;
                self.submit_on_link(link, id, packets, sim)
            }
            (NodeKind::Host(host), EventKind::WindowUpdate(flow)) => {
                host.on_window_update(flow, t, sim, self.stats.as_mut())
            }
            (NodeKind::Router(router), EventKind::PacketArrival(pkt)) => {
                let incoming = self
                    .link_between(pkt.source, id)
                    .map(|link| (link, self.link_cost(link)));
                let outputs =
                    router.on_packet_arrival(pkt.clone(), incoming, t, self.stats.as_mut())?;
                for (link, out_pkt) in outputs {
                    self.submit_on_link(link, id, vec![out_pkt], sim)?;
                }
                Ok(())
            }
            (NodeKind::Router(router), EventKind::RoutingUpdate) => {
                router.on_routing_update(t, sim)
            }
            (NodeKind::Router(router), EventKind::RoutingRequestDispatch(link)) => {
                let neighbor = self
                    .other_endpoint(*link, id)
                    .ok_or(SimError::NoSuchLink { a: id, b: id })?;
                let pkt = router.build_request(neighbor);
                self.submit_on_link(*link, id, vec![pkt], sim)
            }
            (_, other) => Err(SimError::UnknownEventKind {
                target: event.target,
                kind: other.label(),
                at: t,
            }),
        }
    }

    /// Builds the arena and the initial event set from a parsed descriptor
    /// (spec §4.9): one `FlowUpdate` per flow, one `RoutingUpdate` per
    /// dynamic router, one `WindowUpdate` per FAST flow.
    pub fn bootstrap(
        descriptor: &NetworkDescriptor,
        stats: Box<dyn StatsSink>,
    ) -> Result<(Network, Vec<(SimTime, Target, EventKind)>), ConfigError> {
        let mut ids: HashMap<String, NodeId> = HashMap::new();
        let mut nodes: Vec<Option<NodeKind>> = Vec::new();

        for h in &descriptor.hosts {
            let id = NodeId(nodes.len());
            ids.insert(h.id.clone(), id);
            nodes.push(None);
        }
        for r in &descriptor.routers {
            let id = NodeId(nodes.len());
            ids.insert(r.id.clone(), id);
            nodes.push(None);
        }

        let resolve = |ids: &HashMap<String, NodeId>, s: &str| {
            ids.get(s)
                .copied()
                .ok_or_else(|| ConfigError::UnknownNode(s.to_string()))
        };

        let mut links = Vec::with_capacity(descriptor.links.len());
        let mut edges = HashMap::new();
        let mut node_links: HashMap<NodeId, Vec<LinkId>> = HashMap::new();
        for spec in &descriptor.links {
            let a = resolve(&ids, &spec.source_id)?;
            let b = resolve(&ids, &spec.target_id)?;
            let link_id = LinkId(links.len());
            links.push(Link::new(
                link_id,
                a,
                b,
                spec.rate,
                spec.delay,
                (spec.buffsize * 1024.0) as u64,
            ));
            edges.insert((a, b), link_id);
            node_links.entry(a).or_default().push(link_id);
            node_links.entry(b).or_default().push(link_id);
        }

        for h in &descriptor.hosts {
            let id = ids[&h.id];
            let owned = node_links.remove(&id).unwrap_or_default();
            if owned.len() != 1 {
                return Err(ConfigError::InvalidHostLinks {
                    host: h.id.clone(),
                    link_count: owned.len(),
                });
            }
            nodes[id.0] = Some(NodeKind::Host(Host::new(id, owned[0])));
        }

        let mut dynamic_routers: Vec<(NodeId, f64)> = Vec::new();
        for r in &descriptor.routers {
            let id = ids[&r.id];
            let owned = node_links.remove(&id).unwrap_or_default();
            nodes[id.0] = Some(NodeKind::Router(Router::new(id, owned)));
            if !r.static_routing {
                dynamic_routers.push((id, r.init_time));
            }
        }

        let mut network = Network {
            nodes,
            links,
            edges,
            stats,
        };

        let mut initial = Vec::new();
        for (id, init_time) in dynamic_routers {
            initial.push((
                SimTime::millis(init_time),
                Target::Node(id),
                EventKind::RoutingUpdate,
            ));
        }

        for flow in &descriptor.flows {
            let source = resolve(&ids, &flow.source_id)?;
            let dest = resolve(&ids, &flow.dest_id)?;
            let kind = FlowKind::parse(&flow.flow_type).ok_or_else(|| {
                ConfigError::UnknownFlowType(flow.name.clone(), flow.flow_type.clone())
            })?;
            let variant = kind.to_variant(4);
            let is_fast = variant.is_fast();
            let flow_id = FlowId::from(flow.name.clone());
            let sender = FlowSender::new(flow_id.clone(), source, dest, flow.bytes, variant);
            let receiver = FlowReceiver::new(flow_id.clone(), dest);

            match network.nodes[source.0].as_mut() {
                Some(NodeKind::Host(host)) => host.add_sender(sender),
                _ => return Err(ConfigError::UnknownNode(flow.source_id.clone())),
            }
            match network.nodes[dest.0].as_mut() {
                Some(NodeKind::Host(host)) => host.add_receiver(receiver),
                _ => return Err(ConfigError::UnknownNode(flow.dest_id.clone())),
            }

            let start = SimTime::millis(flow.timestamp);
            initial.push((
                start,
                Target::Node(source),
                EventKind::FlowUpdate(flow_id.clone()),
            ));
            if is_fast {
                initial.push((start, Target::Node(source), EventKind::WindowUpdate(flow_id)));
            }
        }

        Ok((network, initial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::VecSink;

    fn two_host_descriptor() -> NetworkDescriptor {
        serde_json::from_str(
            r#"{
                "hosts": [{"id": "h1"}, {"id": "h2"}],
                "routers": [],
                "links": [{"id": "l1", "source_id": "h1", "target_id": "h2", "rate": 10.0, "delay": 10.0, "buffsize": 64.0}],
                "flows": [{"name": "f1", "source_id": "h1", "dest_id": "h2", "bytes": 10000, "timestamp": 100.0, "flowType": "TCPRenoFlow"}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn bootstrap_produces_one_flow_update_per_flow() {
        let descriptor = two_host_descriptor();
        let (network, initial) =
            Network::bootstrap(&descriptor, Box::new(VecSink::default())).unwrap();
        assert!(!network.all_flows_done());
        assert_eq!(initial.len(), 1);
        assert!(matches!(initial[0].2, EventKind::FlowUpdate(_)));
    }

    #[test]
    fn bootstrap_rejects_a_host_with_no_links() {
        let mut descriptor = two_host_descriptor();
        descriptor.hosts.push(crate::config::HostSpec { id: "h3".into() });
        let err = Network::bootstrap(&descriptor, Box::new(VecSink::default())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHostLinks { link_count: 0, .. }));
    }

    #[test]
    fn end_to_end_reno_flow_completes() {
        let descriptor = two_host_descriptor();
        let (mut network, initial) =
            Network::bootstrap(&descriptor, Box::new(VecSink::default())).unwrap();
        let mut sim = Simulator::new();
        for (at, target, kind) in initial {
            sim.enqueue(at, target, kind).unwrap();
        }
        let outcome = sim.run(&mut network, 100_000).unwrap();
        assert!(matches!(
            outcome,
            crate::sim::simulator::RunOutcome::Completed { .. }
        ));
        assert!(network.all_flows_done());
    }
}
