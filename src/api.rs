use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sysinfo::System;
use tokio_rustls::TlsConnector;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, instrument, warn};

use crate::config::NetdashConfig;
use crate::error::{NetdashError, Result};
use crate::monitor::SessionManager;
use crate::tools;
use crate::tools::connections::ConnectionEntry;
use crate::tools::tls::CertificateInfo;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<NetdashConfig>,
    monitor: Arc<SessionManager>,
    http_client: reqwest::Client,
    tls_connector: TlsConnector,
    process_table: Arc<Mutex<System>>,
}

impl AppState {
    pub fn new(config: Arc<NetdashConfig>) -> Result<Self> {
        let monitor = Arc::new(SessionManager::new(config.sample_interval()));
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("netdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NetdashError::Internal(e.to_string()))?;

        Ok(Self {
            config,
            monitor,
            http_client,
            tls_connector: tools::tls::connector(),
            process_table: Arc::new(Mutex::new(System::new())),
        })
    }

    pub fn monitor(&self) -> Arc<SessionManager> {
        self.monitor.clone()
    }
}

#[derive(Debug, Deserialize)]
struct PingRequest {
    host: Option<String>,
}

#[derive(Debug, Serialize)]
struct PingResponse {
    output: String,
}

#[derive(Debug, Deserialize)]
struct DnsLookupRequest {
    host: Option<String>,
}

#[derive(Debug, Serialize)]
struct DnsLookupResponse {
    host: String,
    ip_address: String,
}

#[derive(Debug, Deserialize)]
struct PortScanRequest {
    target: Option<String>,
    ports: Option<String>,
}

#[derive(Debug, Serialize)]
struct PortScanResponse {
    target: String,
    open_ports: Vec<u16>,
}

#[derive(Debug, Deserialize)]
struct SslCheckRequest {
    domain: Option<String>,
}

#[derive(Debug, Serialize)]
struct SslCheckResponse {
    domain: String,
    certificate: CertificateInfo,
}

#[derive(Debug, Deserialize)]
struct IpGeoRequest {
    ip_address: Option<String>,
}

#[derive(Debug, Serialize)]
struct ConnectionsResponse {
    connections: Vec<ConnectionEntry>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Build the dashboard router: tool endpoints plus the streaming channel.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ping/", post(ping_host))
        .route("/api/dns-lookup/", post(dns_lookup))
        .route("/api/port-scan/", post(port_scan))
        .route("/api/ssl-check/", post(ssl_cert_check))
        .route("/api/ip-geo/", post(ip_geolocation))
        .route("/api/connections/", get(network_connections))
        .route("/ws/network-monitor/", get(network_monitor))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(error: &NetdashError) -> Response {
    (
        error.status_code(),
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Present-and-non-blank check for required request fields, applied
/// before any externally visible action.
fn required(field: Option<String>, name: &'static str) -> Result<String> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(NetdashError::MissingField(name)),
    }
}

#[instrument(skip(state))]
async fn ping_host(
    State(state): State<AppState>,
    Json(request): Json<PingRequest>,
) -> Response {
    let host = match required(request.host, "Host") {
        Ok(host) => host,
        Err(e) => return error_response(&e),
    };

    match tools::ping::run(&host, &state.config).await {
        Ok(output) => (StatusCode::OK, Json(PingResponse { output })).into_response(),
        Err(e) => {
            warn!("ping against {host} failed: {e}");
            error_response(&e)
        }
    }
}

#[instrument]
async fn dns_lookup(Json(request): Json<DnsLookupRequest>) -> Response {
    let host = match required(request.host, "Host") {
        Ok(host) => host,
        Err(e) => return error_response(&e),
    };

    match tools::dns::resolve(&host).await {
        Ok(ip) => (
            StatusCode::OK,
            Json(DnsLookupResponse {
                host,
                ip_address: ip.to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

#[instrument(skip(state))]
async fn port_scan(
    State(state): State<AppState>,
    Json(request): Json<PortScanRequest>,
) -> Response {
    let target = match required(request.target, "Target host") {
        Ok(target) => target,
        Err(e) => return error_response(&e),
    };
    let ports_spec = request
        .ports
        .unwrap_or_else(|| tools::port_scan::DEFAULT_PORTS.to_string());
    let ports = match tools::port_scan::parse_ports(&ports_spec) {
        Ok(ports) => ports,
        Err(e) => return error_response(&e),
    };

    let open_ports =
        tools::port_scan::scan(&target, &ports, state.config.port_probe_timeout()).await;
    (StatusCode::OK, Json(PortScanResponse { target, open_ports })).into_response()
}

#[instrument(skip(state))]
async fn ssl_cert_check(
    State(state): State<AppState>,
    Json(request): Json<SslCheckRequest>,
) -> Response {
    let domain = match required(request.domain, "Domain") {
        Ok(domain) => domain,
        Err(e) => return error_response(&e),
    };

    match tools::tls::inspect(&domain, &state.tls_connector, &state.config).await {
        Ok(certificate) => (
            StatusCode::OK,
            Json(SslCheckResponse {
                domain,
                certificate,
            }),
        )
            .into_response(),
        Err(e) => {
            warn!("certificate check for {domain} failed: {e}");
            error_response(&e)
        }
    }
}

#[instrument(skip(state))]
async fn ip_geolocation(
    State(state): State<AppState>,
    Json(request): Json<IpGeoRequest>,
) -> Response {
    let ip_address = match required(request.ip_address, "IP address") {
        Ok(ip_address) => ip_address,
        Err(e) => return error_response(&e),
    };

    match tools::geo::lookup(&state.http_client, &ip_address, &state.config).await {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(e) => error_response(&e),
    }
}

#[instrument(skip(state))]
async fn network_connections(State(state): State<AppState>) -> Response {
    let process_table = state.process_table.clone();
    let result = tokio::task::spawn_blocking(move || tools::connections::list(&process_table)).await;

    match result {
        Ok(Ok(connections)) => {
            (StatusCode::OK, Json(ConnectionsResponse { connections })).into_response()
        }
        Ok(Err(e)) => {
            warn!("connection listing failed: {e}");
            error_response(&e)
        }
        Err(e) => error_response(&NetdashError::Connections(e.to_string())),
    }
}

/// Upgrade to the live throughput stream.
async fn network_monitor(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let monitor = state.monitor.clone();
    ws.on_upgrade(move |socket| stream_network_stats(socket, monitor))
}

/// Pump sampler messages to one client until it goes away.
///
/// When the sampler finishes on its own (one diagnostic after a failed
/// read), the socket stays open and simply stops producing; the session
/// is torn down once the client disconnects.
async fn stream_network_stats(socket: WebSocket, monitor: Arc<SessionManager>) {
    let mut session = monitor.connect();
    debug!(session_id = %session.id(), "network monitor client connected");

    let (mut sink, mut stream) = socket.split();
    let mut producing = true;
    loop {
        tokio::select! {
            message = session.next_message(), if producing => match message {
                Some(message) => {
                    let Ok(payload) = serde_json::to_string(&message) else {
                        break;
                    };
                    if sink.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                None => producing = false,
            },
            incoming = stream.next() => match incoming {
                // No client payload is expected on this channel.
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    monitor.disconnect(&mut session).await;
}
