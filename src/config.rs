//! Network descriptor loading (spec §6.1): JSON topology + flow list. Kept
//! outside the core per spec's explicit scope boundary ("topology loading...
//! external collaborators through narrow interfaces").

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct HostSpec {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterSpec {
    pub id: String,
    pub init_time: f64,
    pub static_routing: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkSpec {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    /// Mbps.
    pub rate: f64,
    /// ms.
    pub delay: f64,
    /// KB; converted to bytes (×1024) at bootstrap.
    pub buffsize: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlowSpec {
    pub name: String,
    pub source_id: String,
    pub dest_id: String,
    /// Total bytes to send; 0 means continuous (unbounded `final_index`).
    pub bytes: u64,
    /// Start time, ms.
    pub timestamp: f64,
    #[serde(rename = "flowType")]
    pub flow_type: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NetworkDescriptor {
    #[serde(default)]
    pub hosts: Vec<HostSpec>,
    #[serde(default)]
    pub routers: Vec<RouterSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
    #[serde(default)]
    pub flows: Vec<FlowSpec>,
}

impl NetworkDescriptor {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let descriptor = serde_json::from_str(&text)?;
        Ok(descriptor)
    }
}
