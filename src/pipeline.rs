use crate::channels::ChannelMap;
use crate::coordinator;
use crate::field_encoder::{self, EncoderConfig};
use crate::probe::Prober;
use crate::report;
use crate::snapshot_store::SnapshotStore;
use crate::telemetry::TelemetrySink;
use crate::types::{GatewayReport, MasterDescriptor, SensorReading, TopologySnapshot};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Everything a request handler needs, cheaply cloneable per connection.
#[derive(Clone)]
pub struct AppContext {
    pub store: SnapshotStore,
    pub sink: TelemetrySink,
    pub channels: ChannelMap,
    pub network_api_key: String,
    pub encoder: EncoderConfig,
    pub probe_timeout: Duration,
    pub prober: Arc<dyn Prober>,
}

/// Run one accepted gateway report through the whole pipeline: parse,
/// probe, publish, encode, deliver.
///
/// `generation` is minted by the handler the moment the report is accepted,
/// so a later report always supersedes an earlier one even if their rounds
/// overlap. A superseded round finishes normally but neither publishes to
/// the store nor uploads to the sink.
pub async fn process_gateway_report(
    ctx: AppContext,
    generation: u64,
    report: GatewayReport,
    reporting_address: String,
) {
    let parsed = report::parse_node_list(&reporting_address, &report.node_list);
    if parsed.rejected > 0 {
        warn!(
            "gateway report carried {} malformed node records",
            parsed.rejected
        );
    }

    let mut nodes = parsed.nodes;
    coordinator::run_probe_round(&mut nodes, ctx.prober.as_ref(), ctx.probe_timeout).await;

    let snapshot = TopologySnapshot {
        master: MasterDescriptor {
            id: report.master_node_id,
            mesh_address: report.master_address,
            reporting_address,
        },
        nodes,
    };

    let slots = field_encoder::encode_snapshot(&snapshot, ctx.encoder);
    if ctx.store.publish(generation, snapshot) {
        ctx.sink.deliver(slots, ctx.network_api_key.clone());
    }
}

/// Pass a single sensor reading through to the sink on the node's own
/// channel. Bypasses the topology pipeline entirely.
pub fn process_sensor_reading(ctx: &AppContext, reading: SensorReading, reporting_address: String) {
    let Some(api_key) = ctx.channels.api_key(&reading.node_id) else {
        warn!(
            "no telemetry channel for node {}; reading dropped",
            reading.node_id
        );
        return;
    };
    let slots = sensor_slots(&reading, &reporting_address);
    ctx.sink.deliver(slots, api_key.to_string());
}

/// Slot layout for a sensor reading, matching the channel field numbering
/// on the sink: 1 = node id, 2 = network address, 3 = measurement,
/// 5 = mesh address, plus the `lat`/`long` pair when the node supplies
/// coordinates.
pub fn sensor_slots(reading: &SensorReading, reporting_address: &str) -> Vec<(String, String)> {
    let mut slots = vec![
        ("field1".to_string(), reading.node_id.clone()),
        ("field2".to_string(), reporting_address.to_string()),
    ];
    if let Some(value) = reading.temperature.as_ref().or(reading.light.as_ref()) {
        slots.push(("field3".to_string(), value.clone()));
    }
    if let Some(mesh_address) = &reading.mesh_address {
        slots.push(("field5".to_string(), mesh_address.clone()));
    }
    // GPS-carrying nodes supply coordinates as a pair; forward them only
    // when both halves are present.
    if let (Some(lat), Some(long)) = (&reading.lat, &reading.long) {
        slots.push(("lat".to_string(), lat.clone()));
        slots.push(("long".to_string(), long.clone()));
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reachability;
    use async_trait::async_trait;
    use tokio::time;

    /// Answers every probe as reachable after a fixed delay.
    struct SlowProber {
        delay: Duration,
    }

    #[async_trait]
    impl Prober for SlowProber {
        async fn probe(&self, _address: &str) -> bool {
            time::sleep(self.delay).await;
            true
        }
    }

    fn test_ctx(prober: Arc<dyn Prober>) -> AppContext {
        AppContext {
            store: SnapshotStore::new(),
            // Nothing listens here; delivery failures are fire-and-forget.
            sink: TelemetrySink::new("http://127.0.0.1:9/update".to_string()),
            channels: ChannelMap::default(),
            network_api_key: "NETKEY".to_string(),
            encoder: EncoderConfig::default(),
            probe_timeout: Duration::from_secs(2),
            prober,
        }
    }

    fn gateway_report(master_id: &str, node_list: &str) -> GatewayReport {
        GatewayReport {
            master_node_id: master_id.to_string(),
            master_address: "0".to_string(),
            node_list: node_list.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn finalized_round_is_served_with_no_unknown_nodes() {
        let ctx = test_ctx(Arc::new(SlowProber {
            delay: Duration::from_millis(50),
        }));

        let generation = ctx.store.begin_round();
        process_gateway_report(
            ctx.clone(),
            generation,
            gateway_report("00", "03|13||04|14"),
            "10.0.0.1".to_string(),
        )
        .await;

        let snapshot = ctx.store.current();
        assert_eq!(snapshot.master.id, "00");
        assert_eq!(snapshot.master.reporting_address, "10.0.0.1");
        assert_eq!(snapshot.nodes.len(), 2);
        assert!(snapshot
            .nodes
            .iter()
            .all(|n| n.reachable != Reachability::Unknown));
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_round_never_overwrites_newer_snapshot() {
        let ctx = test_ctx(Arc::new(SlowProber {
            delay: Duration::from_secs(1),
        }));

        // Round 1 has nodes to probe, so it is still in flight when
        // round 2 (an empty report, which finalizes immediately) lands.
        let first = ctx.store.begin_round();
        let slow = tokio::spawn(process_gateway_report(
            ctx.clone(),
            first,
            gateway_report("m1", "03|13"),
            "10.0.0.1".to_string(),
        ));
        tokio::task::yield_now().await;

        let second = ctx.store.begin_round();
        process_gateway_report(
            ctx.clone(),
            second,
            gateway_report("m2", ""),
            "10.0.0.1".to_string(),
        )
        .await;
        assert_eq!(ctx.store.current().master.id, "m2");

        slow.await.unwrap();
        assert_eq!(ctx.store.current().master.id, "m2");
    }

    #[test]
    fn sensor_slots_map_temperature_reading() {
        let reading = SensorReading {
            node_id: "03".to_string(),
            temperature: Some("21.5".to_string()),
            light: None,
            mesh_address: Some("13".to_string()),
            lat: None,
            long: None,
        };
        let slots = sensor_slots(&reading, "10.0.0.3");
        assert_eq!(
            slots,
            vec![
                ("field1".to_string(), "03".to_string()),
                ("field2".to_string(), "10.0.0.3".to_string()),
                ("field3".to_string(), "21.5".to_string()),
                ("field5".to_string(), "13".to_string()),
            ]
        );
    }

    #[test]
    fn sensor_slots_fall_back_to_light_reading() {
        let reading = SensorReading {
            node_id: "04".to_string(),
            temperature: None,
            light: Some("812".to_string()),
            mesh_address: None,
            lat: None,
            long: None,
        };
        let slots = sensor_slots(&reading, "10.0.0.4");
        assert_eq!(slots[2], ("field3".to_string(), "812".to_string()));
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn sensor_slots_forward_supplied_coordinates() {
        let reading = SensorReading {
            node_id: "03".to_string(),
            temperature: Some("21.5".to_string()),
            light: None,
            mesh_address: None,
            lat: Some("52.069629".to_string()),
            long: Some("4.275921".to_string()),
        };
        let slots = sensor_slots(&reading, "10.0.0.3");
        assert!(slots.contains(&("lat".to_string(), "52.069629".to_string())));
        assert!(slots.contains(&("long".to_string(), "4.275921".to_string())));
    }

    #[test]
    fn sensor_slots_drop_a_half_supplied_coordinate_pair() {
        let reading = SensorReading {
            node_id: "03".to_string(),
            temperature: Some("21.5".to_string()),
            light: None,
            mesh_address: None,
            lat: Some("52.069629".to_string()),
            long: None,
        };
        let slots = sensor_slots(&reading, "10.0.0.3");
        assert!(slots.iter().all(|(slot, _)| slot != "lat" && slot != "long"));
    }
}
