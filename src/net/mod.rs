//! Network objects: packets, links, hosts, routers, and the arena that owns
//! them all.

pub mod flow;
pub mod host;
pub mod ids;
pub mod link;
pub mod network;
pub mod packet;
pub mod router;

pub use flow::{FlowKind, FlowReceiver, FlowSender, SenderVariant};
pub use host::Host;
pub use ids::{FlowId, LinkId, NodeId};
pub use link::Link;
pub use network::Network;
pub use packet::{NextHop, Packet, PacketKind, RoutingSnapshot};
pub use router::Router;
