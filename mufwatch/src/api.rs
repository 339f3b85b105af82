//! JSON API over HTTP/1.
//!
//! | Method | Path                           | Body                                   |
//! |--------|--------------------------------|----------------------------------------|
//! | GET    | `/api/muf/latest`              | [`Snapshot`], values rounded to 0.1 MHz |
//! | GET    | `/api/muf/series?window=<min>` | `[SeriesPoint]`, window defaults to 60  |
//! | POST   | `/api/muf/refresh`             | [`Snapshot`] after a forced refresh     |
//! | GET    | `/health`                      | `{status, timestamp_ms, data_points}`   |
//!
//! Unknown paths answer 404 and known paths with the wrong method 405.
//! Missing data is never an error: stations without readings are reported
//! with `ABSENT` freshness.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use mufwatch_core::{RefreshScheduler, WindowedStore};
use mufwatch_types::{SeriesPoint, Snapshot};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Decimal places for MUF values in responses.
pub const RESPONSE_DECIMALS: i32 = 1;

/// Series window when `?window=` is not given, in minutes.
pub const DEFAULT_WINDOW_MINUTES: u64 = 60;

type ApiResponse = Response<Full<Bytes>>;

/// Everything a request handler needs.
#[derive(Debug, Clone)]
pub struct ApiState {
    store: Arc<WindowedStore>,
    scheduler: RefreshScheduler,
}

impl ApiState {
    /// Serve reads from the scheduler's store and forced refreshes through it.
    pub fn new(scheduler: RefreshScheduler) -> Self {
        Self {
            store: scheduler.store().clone(),
            scheduler,
        }
    }

    /// The store responses are read from.
    pub fn store(&self) -> &Arc<WindowedStore> {
        &self.store
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp_ms: u64,
    data_points: usize,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Accept connections on `listener` until `shutdown` turns true.
///
/// In-flight connections are left to finish on their own tasks.
pub async fn serve(
    listener: TcpListener,
    state: Arc<ApiState>,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "JSON API listening");

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let state = state.clone();
                async move { handle_request(req, &state).await }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!(%peer, "API connection error: {}", e);
            }
        });
    }

    info!("JSON API stopped");
    Ok(())
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: &ApiState,
) -> Result<ApiResponse, Infallible> {
    let response = route(state, req.method(), req.uri().path(), req.uri().query()).await;
    debug!(
        method = %req.method(),
        path = req.uri().path(),
        status = response.status().as_u16(),
        "Handled request"
    );
    Ok(response)
}

/// Dispatch one request.
pub async fn route(
    state: &ApiState,
    method: &Method,
    path: &str,
    query: Option<&str>,
) -> ApiResponse {
    match (path, method) {
        ("/api/muf/latest", &Method::GET) => latest(state),
        ("/api/muf/series", &Method::GET) => series(state, query),
        ("/api/muf/refresh", &Method::POST) => refresh(state).await,
        ("/health", &Method::GET) => health(state),
        ("/api/muf/latest" | "/api/muf/series" | "/health", _) => method_not_allowed("GET"),
        ("/api/muf/refresh", _) => method_not_allowed("POST"),
        _ => error_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

fn latest(state: &ApiState) -> ApiResponse {
    let snapshot: Snapshot = state.store.latest().rounded(RESPONSE_DECIMALS);
    json_response(StatusCode::OK, &snapshot)
}

fn series(state: &ApiState, query: Option<&str>) -> ApiResponse {
    let minutes = match window_minutes(query) {
        Ok(minutes) => minutes,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, &message),
    };

    let points: Vec<SeriesPoint> = state
        .store
        .series(Duration::from_secs(minutes.saturating_mul(60)))
        .into_iter()
        .map(|p| p.rounded(RESPONSE_DECIMALS))
        .collect();

    json_response(StatusCode::OK, &points)
}

async fn refresh(state: &ApiState) -> ApiResponse {
    info!("Forced refresh requested");
    let report = state.scheduler.refresh_now().await;
    if !report.is_complete() {
        warn!(failed = report.failed().count(), "Forced refresh incomplete");
    }
    latest(state)
}

fn health(state: &ApiState) -> ApiResponse {
    let body = Health {
        status: "healthy",
        timestamp_ms: state.store.now_ms(),
        data_points: state.store.sample_count(),
    };
    json_response(StatusCode::OK, &body)
}

/// Read `window=<minutes>` from a query string.
fn window_minutes(query: Option<&str>) -> Result<u64, String> {
    let raw = query
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "window")
        .map(|(_, value)| value);

    match raw {
        None => Ok(DEFAULT_WINDOW_MINUTES),
        Some(value) => match value.parse::<u64>() {
            Ok(minutes) if minutes > 0 => Ok(minutes),
            _ => Err(format!(
                "window must be a positive number of minutes, got '{}'",
                value
            )),
        },
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> ApiResponse {
    match serde_json::to_vec(body) {
        Ok(bytes) => with_body(status, "application/json", bytes),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            with_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain",
                "Internal Server Error",
            )
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> ApiResponse {
    json_response(
        status,
        &ErrorBody {
            error: message.to_string(),
        },
    )
}

fn method_not_allowed(allow: &'static str) -> ApiResponse {
    let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}

fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> ApiResponse {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
