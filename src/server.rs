use crate::types::GenericBoxedStream;
use async_stream::stream;
use futures_util::{Stream, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{error, info};

/// Turn a bound listener into a stream of accepted connections. Accept
/// errors are logged and skipped; the stream itself never ends.
pub fn tcp_accept_stream(listener: TcpListener) -> impl Stream<Item = (TcpStream, SocketAddr)> {
    stream! {
        loop {
            match listener.accept().await {
                Ok(pair) => yield pair,
                Err(e) => {
                    error!("TCP accept error: {}", e);
                    continue;
                }
            }
        }
    }
}

/// Drive an accept stream until it ends or shutdown is signaled, handing
/// each item to the handler.
pub async fn serve_stream<T>(
    mut stream: GenericBoxedStream<T>,
    shutdown_notify: Arc<Notify>,
    handler: impl Fn(T) -> tokio::task::JoinHandle<()> + Send + Sync + 'static,
) {
    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(item) => {
                    handler(item);
                }
                None => {
                    info!("Stream ended");
                    break;
                }
            },
            _ = shutdown_notify.notified() => {
                info!("Shutdown requested");
                break;
            }
        }
    }
}
