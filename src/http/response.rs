//! HTTP response building module
//!
//! Builders for the hyper responses the server sends, plus the conversion of a
//! host-neutral [`Reply`] into a hyper response.

use crate::handler::Reply;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode, Uri};

pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Build the CORS preflight answer (200, no body)
pub fn build_options_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build health check response
pub fn build_health_response(body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain")
        .header("Cache-Control", "no-cache")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error("health", &e);
            Response::new(Full::new(Bytes::from_static(body.as_bytes())))
        })
}

/// Convert a dispatcher reply into a hyper response
///
/// A reply that cannot be expressed as an HTTP response (e.g. a header value
/// with forbidden bytes) turns into the internal error response for `uri`.
pub fn build_reply_response(reply: Reply, uri: &Uri) -> Response<Full<Bytes>> {
    let status = reply.status;
    let mut builder = Response::builder().status(status);
    for (name, value) in &reply.headers {
        builder = builder.header(*name, value.as_str());
    }
    builder.body(Full::new(reply.body)).unwrap_or_else(|e| {
        log_build_error(status.as_str(), &e);
        build_internal_error_response(&e.to_string(), uri)
    })
}

/// Build the 500 response for failures outside the fetch path
///
/// Body carries the message, the request URL and an RFC 3339 timestamp.
pub fn build_internal_error_response(message: &str, uri: &Uri) -> Response<Full<Bytes>> {
    let body = format!(
        "❌ 内部错误\n\n错误消息: {message}\n请求地址: {uri}\n时间戳: {}",
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    );
    let mut resp = Response::new(Full::new(Bytes::from(body)));
    *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    resp.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static(TEXT_PLAIN_UTF8),
    );
    resp
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
