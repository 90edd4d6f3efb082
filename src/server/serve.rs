// Server loop module
// Accepts connections until shutdown is requested

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// How long in-flight connections get to finish after shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Accept loop
///
/// Must run inside a `LocalSet`: connections are served with `spawn_local`.
/// Returns once `shutdown` is notified and open connections have drained (or
/// the drain timeout elapsed).
pub async fn run_server(listener: TcpListener, state: Arc<AppState>, shutdown: Arc<Notify>) {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = shutdown.notified() => break,
        }
    }

    // Stop accepting before waiting on in-flight requests
    drop(listener);
    drain_connections(&active_connections).await;
}

async fn drain_connections(active_connections: &AtomicUsize) {
    let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
    while active_connections.load(Ordering::SeqCst) > 0 {
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutting down with {} connection(s) still open",
                active_connections.load(Ordering::SeqCst)
            ));
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    logger::log_info("All connections closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::image::UpstreamFetcher;
    use crate::server::create_listener;
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::Response;
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn test_state() -> Arc<AppState> {
        let mut cfg = Config::load_from("definitely-missing-picapi-config").unwrap();
        cfg.logging.access_log = false;
        Arc::new(AppState::new(&cfg).unwrap())
    }

    #[tokio::test]
    async fn test_serves_help_preflight_and_health_then_stops() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
                let addr = listener.local_addr().unwrap();
                let shutdown = Arc::new(Notify::new());
                let server = tokio::task::spawn_local(run_server(
                    listener,
                    test_state(),
                    Arc::clone(&shutdown),
                ));

                let help = raw_request(
                    addr,
                    "GET /anything HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
                )
                .await;
                assert!(help.starts_with("HTTP/1.1 200 OK"), "{help}");
                assert!(help.contains("text/plain; charset=utf-8"));
                assert!(help.contains("3306"));

                let preflight = raw_request(
                    addr,
                    "OPTIONS /?img=h HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
                )
                .await;
                assert!(preflight.starts_with("HTTP/1.1 200 OK"), "{preflight}");
                assert!(preflight.to_ascii_lowercase().contains("access-control-allow-methods: get, post, options"));

                let health = raw_request(
                    addr,
                    "GET /healthz HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
                )
                .await;
                assert!(health.starts_with("HTTP/1.1 200 OK"), "{health}");
                assert!(health.ends_with("ok"));

                // Only GET and HEAD hit the health endpoint
                let posted = raw_request(
                    addr,
                    "POST /healthz HTTP/1.1\r\nHost: x\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                )
                .await;
                assert!(posted.starts_with("HTTP/1.1 200 OK"), "{posted}");
                assert!(posted.contains("3306"), "{posted}");
                assert!(!posted.ends_with("ok"));

                shutdown.notify_one();
                server.await.unwrap();
            })
            .await;
    }

    /// Remote host that waits `delay` before answering with a small image
    async fn spawn_slow_upstream(delay: Duration) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let service = service_fn(move |_req| async move {
                        tokio::time::sleep(delay).await;
                        Ok::<_, Infallible>(Response::new(Full::new(Bytes::from_static(
                            b"RIFF....WEBP",
                        ))))
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_slow_upstream_outlives_read_timeout() {
        let upstream = spawn_slow_upstream(Duration::from_millis(1500)).await;

        let mut cfg = Config::load_from("definitely-missing-picapi-config").unwrap();
        cfg.logging.access_log = false;
        cfg.performance.read_timeout = 1;
        cfg.images.base_url = format!("http://{upstream}");
        let state = Arc::new(AppState {
            config: cfg,
            fetcher: UpstreamFetcher::without_proxy(),
        });

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
                let addr = listener.local_addr().unwrap();
                let shutdown = Arc::new(Notify::new());
                let server =
                    tokio::task::spawn_local(run_server(listener, state, Arc::clone(&shutdown)));

                let image = raw_request(
                    addr,
                    "GET /?img=h HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
                )
                .await;
                assert!(image.starts_with("HTTP/1.1 200 OK"), "{image}");
                assert!(image.to_ascii_lowercase().contains("x-image-number: "), "{image}");
                assert!(image.ends_with("RIFF....WEBP"), "{image}");

                shutdown.notify_one();
                server.await.unwrap();
            })
            .await;
    }
}
