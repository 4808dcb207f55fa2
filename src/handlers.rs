use crate::pipeline::{self, AppContext};
use crate::types::{GatewayReport, SensorReading};
use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::{Body, Method, Request, Response, StatusCode};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tracing::error;

pub async fn handle_connection(stream: TcpStream, ctx: AppContext, peer: SocketAddr) {
    // The reporting address of everything on this connection is the peer
    // itself; node network addresses are derived from it.
    let peer_ip = peer.ip().to_string();
    let service = service_fn(move |req| {
        let ctx = ctx.clone();
        let peer_ip = peer_ip.clone();
        async move { route_request(req, ctx, peer_ip).await }
    });

    if let Err(e) = Http::new().serve_connection(stream, service).await {
        error!("connection error: {}", e);
    }
}

pub async fn route_request(
    req: Request<Body>,
    ctx: AppContext,
    peer_ip: String,
) -> Result<Response<Body>, hyper::Error> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") => {
            let version = env!("CARGO_PKG_VERSION");
            let build = option_env!("GIT_COMMIT_HASH").unwrap_or("unknown");
            let json = format!(r#"{{ "version": "{}", "build": "{}" }}"#, version, build);
            Ok(Response::builder()
                .header("Content-Type", "application/json")
                .body(Body::from(json))
                .unwrap())
        }

        // The query path always serves the complete snapshot of the last
        // finalized round; the encoder's node cap never applies here.
        (&Method::GET, "/lastmap.json") => {
            let json = serde_json::to_string(&ctx.store.current()).unwrap();
            Ok(Response::builder()
                .header("Content-Type", "application/json")
                .body(Body::from(json))
                .unwrap())
        }

        (&Method::POST, "/api/gateway") => {
            let body = hyper::body::to_bytes(req.into_body()).await?;
            match serde_json::from_slice::<GatewayReport>(&body) {
                Ok(report) => {
                    // Mint the generation before handing off, so arrival
                    // order decides which round is newest.
                    let generation = ctx.store.begin_round();
                    tokio::spawn(pipeline::process_gateway_report(
                        ctx.clone(),
                        generation,
                        report,
                        peer_ip,
                    ));
                    Ok(Response::builder()
                        .body(Body::from("{\"status\": \"accepted\"}"))
                        .unwrap())
                }
                Err(_) => Ok(bad_request()),
            }
        }

        (&Method::POST, "/api/sensor") => {
            let body = hyper::body::to_bytes(req.into_body()).await?;
            match serde_json::from_slice::<SensorReading>(&body) {
                Ok(reading) if reading.temperature.is_some() || reading.light.is_some() => {
                    pipeline::process_sensor_reading(&ctx, reading, peer_ip);
                    Ok(Response::builder()
                        .body(Body::from("{\"status\": \"accepted\"}"))
                        .unwrap())
                }
                _ => Ok(bad_request()),
            }
        }

        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("{\"error\": \"not found\"}"))
            .unwrap()),
    }
}

fn bad_request() -> Response<Body> {
    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .body(Body::from("{\"error\": \"bad request\"}"))
        .unwrap()
}
