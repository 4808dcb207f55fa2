use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::trace;

/// The reachability capability: given a node's network address, report
/// whether it currently responds. Implementations do not need to bound
/// their own latency; the coordinator wraps every probe in a timeout.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, address: &str) -> bool;
}

/// Probes by attempting a TCP connection to the node's HTTP port. The
/// sensor nodes answer on the same port the gateway posts from.
pub struct TcpProber {
    pub port: u16,
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, address: &str) -> bool {
        match TcpStream::connect((address, self.port)).await {
            Ok(_) => {
                trace!("probe ok for {}", address);
                true
            }
            Err(e) => {
                trace!("probe failed for {}: {}", address, e);
                false
            }
        }
    }
}
