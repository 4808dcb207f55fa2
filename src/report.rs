use crate::types::{NodeDescriptor, Reachability};
use thiserror::Error;
use tracing::warn;

/// Separates node records inside the gateway's `nodeList` string.
pub const RECORD_DELIMITER: &str = "||";
/// Separates the node id from its mesh address inside one record.
pub const FIELD_DELIMITER: char = '|';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record has no field delimiter")]
    MissingFieldDelimiter,
    #[error("record has an empty node id")]
    EmptyNodeId,
    #[error("duplicate node id {0:?}")]
    DuplicateNodeId(String),
}

/// Result of parsing one gateway node list. Records that fail validation
/// are dropped and counted rather than failing the whole report.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedReport {
    pub nodes: Vec<NodeDescriptor>,
    pub rejected: usize,
}

/// Parse the gateway's flat node list into descriptors.
///
/// Each node's network address is the reporting address up to and including
/// its last `.`, followed by the node id (the mesh assigns node ids that
/// double as the final address octet). An empty list is valid and yields no
/// descriptors. Duplicate node ids are rejected so that probe results can
/// never be correlated ambiguously; first occurrence wins.
pub fn parse_node_list(reporting_address: &str, raw: &str) -> ParsedReport {
    let prefix = address_prefix(reporting_address);
    let mut parsed = ParsedReport::default();

    for record in raw.split(RECORD_DELIMITER) {
        if record.is_empty() {
            continue;
        }
        match parse_record(record, &prefix, &parsed.nodes) {
            Ok(node) => parsed.nodes.push(node),
            Err(e) => {
                warn!("rejected node record {:?}: {}", record, e);
                parsed.rejected += 1;
            }
        }
    }

    parsed
}

fn parse_record(
    record: &str,
    prefix: &str,
    accepted: &[NodeDescriptor],
) -> Result<NodeDescriptor, RecordError> {
    let (id, mesh_address) = record
        .split_once(FIELD_DELIMITER)
        .ok_or(RecordError::MissingFieldDelimiter)?;
    if id.is_empty() {
        return Err(RecordError::EmptyNodeId);
    }
    if accepted.iter().any(|n| n.id == id) {
        return Err(RecordError::DuplicateNodeId(id.to_string()));
    }
    Ok(NodeDescriptor {
        id: id.to_string(),
        mesh_address: mesh_address.to_string(),
        network_address: format!("{}{}", prefix, id),
        reachable: Reachability::Unknown,
    })
}

/// The reporting address up to and including its last `.`, or empty if the
/// address has none.
fn address_prefix(reporting_address: &str) -> String {
    match reporting_address.rfind('.') {
        Some(i) => reporting_address[..=i].to_string(),
        None => String::new(),
    }
}
