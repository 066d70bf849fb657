//! Fatal/programmer-error taxonomy (spec §7).
//!
//! Ordinary network pathology (loss, dup-acks, timeouts) is never an error
//! here — it's data, recorded through [`crate::stats::StatsSink`]. `SimError`
//! exists only for conditions that indicate a broken invariant.

use crate::net::ids::{FlowId, NodeId};
use crate::sim::event::Target;
use crate::sim::time::SimTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("{target} cannot handle event kind {kind} at {at}")]
    UnknownEventKind {
        target: Target,
        kind: &'static str,
        at: SimTime,
    },

    #[error("event scheduled at {scheduled} is before the clock at {clock}")]
    TimeRegression { scheduled: SimTime, clock: SimTime },

    #[error("host {host} must own exactly one link, has {link_count}")]
    InvalidHostLinks { host: NodeId, link_count: usize },

    #[error("flow {flow} references missing endpoint {node}")]
    MissingEndpoint { flow: FlowId, node: NodeId },

    #[error("no link connects node {a} and node {b}")]
    NoSuchLink { a: NodeId, b: NodeId },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read network descriptor from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse network descriptor: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("network descriptor references unknown node id {0}")]
    UnknownNode(String),

    #[error("flow {0} has unknown flow-type {1:?}")]
    UnknownFlowType(String, String),

    #[error("host {host} must own exactly one link, descriptor gives it {link_count}")]
    InvalidHostLinks { host: String, link_count: usize },
}
