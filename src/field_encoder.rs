use crate::types::{NodeDescriptor, Reachability, TopologySnapshot};
use serde::Serialize;
use tracing::warn;

/// Slot layout for the size-constrained telemetry transport. Each node
/// slot carries at most `chunk_size` nodes and the whole upload uses at
/// most `max_slots` slots, slot 1 being reserved for the master. Choose
/// `chunk_size` conservatively for the target transport's per-field length
/// limit; the encoder does not measure raw payload length itself.
#[derive(Debug, Clone, Copy)]
pub struct EncoderConfig {
    pub chunk_size: usize,
    pub max_slots: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        // 6 nodes per field, 6 node fields: a 36 node cap.
        Self {
            chunk_size: 6,
            max_slots: 7,
        }
    }
}

/// A node as uploaded to the sink: the probing-only network address is
/// stripped to save payload space.
#[derive(Serialize)]
struct WireNode<'a> {
    id: &'a str,
    #[serde(rename = "meshAddress")]
    mesh_address: &'a str,
    reachable: Reachability,
}

impl<'a> From<&'a NodeDescriptor> for WireNode<'a> {
    fn from(node: &'a NodeDescriptor) -> Self {
        Self {
            id: &node.id,
            mesh_address: &node.mesh_address,
            reachable: node.reachable,
        }
    }
}

/// Serialize a finalized snapshot into ordered `(slot, payload)` pairs.
///
/// `field1` holds the master descriptor; `field2..` hold consecutive node
/// chunks in original report order. Nodes beyond the slot capacity are
/// dropped, not sampled: the transport cap is real and applies only here,
/// the store keeps the full list for the query path.
///
/// `chunk_size` must be non-zero; the CLI enforces that at startup.
pub fn encode_snapshot(
    snapshot: &TopologySnapshot,
    config: EncoderConfig,
) -> Vec<(String, String)> {
    let chunk_size = config.chunk_size;
    let node_slots = config.max_slots.saturating_sub(1);
    let capacity = chunk_size * node_slots;

    let mut slots = Vec::with_capacity(1 + node_slots);
    slots.push((
        "field1".to_string(),
        serde_json::to_string(&snapshot.master).unwrap(),
    ));

    if snapshot.nodes.len() > capacity {
        warn!(
            "encoded topology truncated to {} of {} nodes",
            capacity,
            snapshot.nodes.len()
        );
    }

    for (i, chunk) in snapshot
        .nodes
        .chunks(chunk_size)
        .take(node_slots)
        .enumerate()
    {
        let wire: Vec<WireNode> = chunk.iter().map(WireNode::from).collect();
        slots.push((
            format!("field{}", i + 2),
            serde_json::to_string(&wire).unwrap(),
        ));
    }

    slots
}
