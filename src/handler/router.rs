//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation,
//! route matching, and dispatching.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::body::Body;
use hyper::header::{HeaderMap, RANGE, USER_AGENT};
use hyper::{Method, Request, Response};
use tracing::{debug, warn};

use super::artifacts;
use crate::config::{AppState, LoggingConfig};
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub headers: &'a HeaderMap,
    pub is_head: bool,
}

/// Access log line of one request, written once the response is known
#[derive(Debug)]
pub struct AccessRecord {
    entry: AccessLogEntry,
    format: String,
    started: Instant,
}

impl AccessRecord {
    fn start<B>(req: &Request<B>, peer_addr: SocketAddr, logging: &LoggingConfig) -> Option<Self> {
        if !logging.access_log {
            return None;
        }

        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            req.method().to_string(),
            req.uri().path().to_string(),
        );
        entry.http_version = format!("{:?}", req.version())
            .trim_start_matches("HTTP/")
            .to_string();
        entry.range = header_string(req.headers(), &RANGE);
        entry.user_agent = header_string(req.headers(), &USER_AGENT);

        Some(Self {
            entry,
            format: logging.access_log_format.clone(),
            started: Instant::now(),
        })
    }

    /// Write the access log line
    pub fn finish(mut self, status: u16, body_bytes: u64) {
        self.entry.status = status;
        self.entry.body_bytes = body_bytes;
        self.entry.request_time_us =
            u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&self.entry, &self.format);
    }
}

fn header_string(headers: &HeaderMap, name: &hyper::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Log a response whose body is already complete
pub fn respond(access: Option<AccessRecord>, response: Response<ResponseBody>) -> Response<ResponseBody> {
    if let Some(access) = access {
        let body_bytes = response.body().size_hint().exact().unwrap_or(0);
        access.finish(response.status().as_u16(), body_bytes);
    }
    response
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let access = AccessRecord::start(&req, peer_addr, &state.config.logging);
    let ctx = RequestContext {
        method: req.method(),
        path: req.uri().path(),
        headers: req.headers(),
        is_head: req.method() == Method::HEAD,
    };

    // 1. Check HTTP method
    if let Some(resp) = check_http_method(ctx.method) {
        return Ok(respond(access, resp));
    }

    // 2. Dispatch
    Ok(route_request(&ctx, &state, access).await)
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method) -> Option<Response<ResponseBody>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            warn!("Method not allowed: {method}");
            Some(http::build_405_response())
        }
    }
}

/// Route request based on path and configuration
async fn route_request(
    ctx: &RequestContext<'_>,
    state: &Arc<AppState>,
    access: Option<AccessRecord>,
) -> Response<ResponseBody> {
    // 0. Health check endpoints (highest priority, always fast)
    let health = &state.config.health;
    if health.enabled && (ctx.path == health.liveness_path || ctx.path == health.readiness_path) {
        return respond(access, http::build_health_response("ok"));
    }

    // 1. Artifact downloads under the route prefix
    let artifacts_config = &state.config.artifacts;
    let Some(encoded) = ctx.path.strip_prefix(artifacts_config.route_prefix.as_str()) else {
        debug!("No route for path: {}", ctx.path);
        return respond(access, http::build_404_response());
    };
    let name = match urlencoding::decode(encoded) {
        Ok(name) => name.into_owned(),
        Err(e) => {
            debug!("Artifact name '{encoded}' is not valid UTF-8: {e}");
            return respond(access, http::build_404_response());
        }
    };

    // 2. Checksum file of an artifact
    if let Some(artifact) = name.strip_suffix(artifacts_config.checksum_suffix.as_str()) {
        if !artifact.is_empty() {
            return artifacts::serve_checksum(ctx, artifact, &name, state, access).await;
        }
    }

    artifacts::serve_artifact(ctx, &name, state, access).await
}
