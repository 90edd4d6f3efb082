// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use std::sync::Arc;
use tokio::sync::Notify;

use crate::logger;

/// Start signal handlers (Unix)
///
/// Spawns a background task that notifies `shutdown` once SIGTERM or SIGINT
/// arrives. If the handlers cannot be registered, only Ctrl+C is watched.
#[cfg(unix)]
pub fn start_signal_handler(shutdown: Arc<Notify>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    logger::log_warning(&format!(
                        "Failed to register signal handlers: {e}; watching Ctrl+C only"
                    ));
                    wait_ctrl_c(shutdown).await;
                    return;
                }
            };

        logger::log_debug(&format!(
            "[Signal] SIGTERM/SIGINT handlers registered, pid {}",
            std::process::id()
        ));

        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM received",
            _ = sigint.recv() => "SIGINT received",
        };
        logger::log_shutdown(name);
        shutdown.notify_one();
    });
}

/// Non-Unix fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(shutdown: Arc<Notify>) {
    tokio::spawn(wait_ctrl_c(shutdown));
}

async fn wait_ctrl_c(shutdown: Arc<Notify>) {
    if let Ok(()) = tokio::signal::ctrl_c().await {
        logger::log_shutdown("Ctrl+C received");
        shutdown.notify_one();
    }
}
