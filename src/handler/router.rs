//! Request routing module
//!
//! hyper entry point: answers preflight and health checks, hands everything
//! else to the dispatcher and writes the access log.

use crate::config::AppState;
use crate::handler::dispatch::dispatch;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body as _, Bytes};
use hyper::header::{REFERER, USER_AGENT};
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let user_agent = header_str(&req, USER_AGENT);

    let response = route_request(&req, user_agent.as_deref(), &state).await;

    if state.access_log() {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            req.method().to_string(),
            req.uri().path().to_string(),
        );
        entry.query = req.uri().query().map(ToString::to_string);
        entry.http_version = version_label(req.version()).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.referer = header_str(&req, REFERER);
        entry.user_agent = user_agent;
        entry.image_number = response
            .headers()
            .get("X-Image-Number")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn route_request(
    req: &Request<hyper::body::Incoming>,
    user_agent: Option<&str>,
    state: &AppState,
) -> Response<Full<Bytes>> {
    // 1. CORS preflight, any path
    if req.method() == Method::OPTIONS {
        return http::build_options_response();
    }

    // 2. Health checks (GET/HEAD only; other methods fall through to the dispatcher)
    let is_read = matches!(*req.method(), Method::GET | Method::HEAD);
    if is_read && state.config.health.is_health_path(req.uri().path()) {
        return http::build_health_response("ok");
    }

    // 3. Everything else is an image (or help) request, whatever the path
    let mut rng = fastrand::Rng::new();
    let reply = dispatch(
        req.uri().query(),
        user_agent,
        &state.config.images,
        &state.fetcher,
        &mut rng,
    )
    .await;
    http::build_reply_response(reply, req.uri())
}

fn header_str(
    req: &Request<hyper::body::Incoming>,
    name: hyper::header::HeaderName,
) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
