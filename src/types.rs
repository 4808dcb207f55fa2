use serde::{Deserialize, Serialize};

use futures_util::Stream;
use std::pin::Pin;

/// Liveness state of a node. `Unknown` only exists while a probe round is
/// in flight; a finalized snapshot never contains it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    Unknown,
    Reachable,
    Unreachable,
}

/// One mesh node as reported by the gateway.
///
/// `network_address` is derived from the gateway's reporting address and is
/// only used for probing; the field encoder strips it before upload.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    pub id: String,
    pub mesh_address: String,
    pub network_address: String,
    pub reachable: Reachability,
}

/// The gateway itself, as seen from its own report.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MasterDescriptor {
    pub id: String,
    pub mesh_address: String,
    pub reporting_address: String,
}

/// The latest view of the whole mesh. Replaced wholesale on every accepted
/// gateway report; no history is kept.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct TopologySnapshot {
    pub master: MasterDescriptor,
    pub nodes: Vec<NodeDescriptor>,
}

impl TopologySnapshot {
    /// What the query path serves before any round has finalized.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// POST /api/gateway body. All three fields are required; serde rejects a
/// body missing any of them before any processing starts.
#[derive(Deserialize, Clone, Debug)]
pub struct GatewayReport {
    #[serde(rename = "masterNodeId")]
    pub master_node_id: String,
    #[serde(rename = "masterAddress")]
    pub master_address: String,
    #[serde(rename = "nodeList")]
    pub node_list: String,
}

/// POST /api/sensor body. A reading must carry at least one of
/// `temperature` or `light`; the handler enforces that.
#[derive(Deserialize, Clone, Debug)]
pub struct SensorReading {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    pub temperature: Option<String>,
    pub light: Option<String>,
    #[serde(rename = "meshAddress")]
    pub mesh_address: Option<String>,
    pub lat: Option<String>,
    pub long: Option<String>,
}

pub type GenericBoxedStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;
