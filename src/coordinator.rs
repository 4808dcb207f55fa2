use crate::probe::Prober;
use crate::types::{NodeDescriptor, Reachability};
use futures_util::future::join_all;
use std::time::Duration;
use tokio::time;
use tracing::debug;

/// Run one probe round over a freshly parsed node list.
///
/// Every descriptor is probed concurrently; the descriptor's index is
/// captured at dispatch, so a completed probe always lands on the node it
/// was issued for regardless of completion order. The round is finalized
/// when this function returns: `join_all` is the only join point, and after
/// it no descriptor is left in the `Unknown` state. A probe that exceeds
/// `probe_timeout` is recorded as unreachable so the round always
/// terminates.
pub async fn run_probe_round(
    nodes: &mut [NodeDescriptor],
    prober: &dyn Prober,
    probe_timeout: Duration,
) {
    if nodes.is_empty() {
        return;
    }

    let probes: Vec<_> = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let address = node.network_address.clone();
            async move {
                let alive = match time::timeout(probe_timeout, prober.probe(&address)).await {
                    Ok(alive) => alive,
                    Err(_) => false,
                };
                (index, alive)
            }
        })
        .collect();

    for (index, alive) in join_all(probes).await {
        nodes[index].reachable = if alive {
            Reachability::Reachable
        } else {
            Reachability::Unreachable
        };
    }

    debug!("probe round finalized over {} nodes", nodes.len());
}
