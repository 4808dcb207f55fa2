use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// One sensor node's channel on the telemetry sink.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Channel {
    #[serde(rename = "_id")]
    pub node_id: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

#[derive(Debug, Error)]
pub enum ChannelMapError {
    #[error("failed to read channels file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse channels file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Maps a sensor node id to its per-channel routing credential. Readings
/// from nodes with no channel are dropped.
#[derive(Clone, Debug, Default)]
pub struct ChannelMap {
    channels: Vec<Channel>,
}

impl ChannelMap {
    /// Load the map from a JSON array of `{"_id": ..., "apiKey": ...}`.
    pub fn load(path: &Path) -> Result<Self, ChannelMapError> {
        let raw = fs::read_to_string(path)?;
        let channels = serde_json::from_str(&raw)?;
        Ok(Self { channels })
    }

    pub fn api_key(&self, node_id: &str) -> Option<&str> {
        self.channels
            .iter()
            .find(|c| c.node_id == node_id)
            .map(|c| c.api_key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_key_by_node_id() {
        let map = ChannelMap {
            channels: vec![
                Channel {
                    node_id: "03".to_string(),
                    api_key: "KEY3".to_string(),
                },
                Channel {
                    node_id: "04".to_string(),
                    api_key: "KEY4".to_string(),
                },
            ],
        };
        assert_eq!(map.api_key("04"), Some("KEY4"));
        assert_eq!(map.api_key("05"), None);
    }

    #[test]
    fn parses_channel_file_format() {
        let channels: Vec<Channel> =
            serde_json::from_str(r#"[{"_id": "03", "apiKey": "KEY3"}]"#).unwrap();
        assert_eq!(channels[0].node_id, "03");
        assert_eq!(channels[0].api_key, "KEY3");
    }
}
