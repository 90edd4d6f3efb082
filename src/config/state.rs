// Application state module
// Immutable configuration plus the resources shared by every request

use super::types::Config;
use crate::image::UpstreamFetcher;

/// Application state
///
/// Built once at startup and shared by `Arc`; nothing in here changes while
/// the server runs.
pub struct AppState {
    pub config: Config,
    pub fetcher: UpstreamFetcher,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            config: config.clone(),
            fetcher: UpstreamFetcher::new()?,
        })
    }

    /// Whether access log entries should be written
    pub const fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}
