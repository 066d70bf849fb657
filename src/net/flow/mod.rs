//! Flow state machines: TCP-like senders and the cumulative-ack receiver.

pub mod receiver;
pub mod sender;

pub use receiver::FlowReceiver;
pub use sender::{FlowSender, SenderVariant};

/// Closed flow-type enum (spec §9 "Dynamic class lookup by string"). The
/// descriptor's `flowType` string maps onto this via [`FlowKind::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Reno,
    Fast,
    SimpleWindow1,
    SimpleWindowN,
}

impl FlowKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TCPRenoFlow" => Some(FlowKind::Reno),
            "FastTCPFlow" => Some(FlowKind::Fast),
            "SuperSimpleFlow" => Some(FlowKind::SimpleWindow1),
            "SuperSimpleFlow2" => Some(FlowKind::SimpleWindowN),
            _ => None,
        }
    }

    pub fn to_variant(self, simple_window: u64) -> SenderVariant {
        match self {
            FlowKind::Reno => SenderVariant::reno(),
            FlowKind::Fast => SenderVariant::fast(),
            FlowKind::SimpleWindow1 => SenderVariant::simple_window(1),
            FlowKind::SimpleWindowN => SenderVariant::simple_window(simple_window),
        }
    }
}
