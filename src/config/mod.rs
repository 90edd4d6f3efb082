// Configuration module entry point
// Loads the immutable application configuration and the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, ImageConfig};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Sources, lowest priority first: built-in defaults, the optional config
    /// file, `PICAPI__*` environment variables, and finally the bare `PORT`
    /// variable understood by most hosting platforms.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let images = ImageConfig::default();
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("PICAPI").separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("images.max_horizontal", i64::from(images.max_horizontal))?
            .set_default("images.max_vertical", i64::from(images.max_vertical))?
            .set_default("images.base_url", images.base_url)?
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.images.max_horizontal == 0 || self.images.max_vertical == 0 {
            return Err(config::ConfigError::Message(
                "images.max_horizontal and images.max_vertical must be at least 1".to_string(),
            ));
        }
        if self.images.base_url.is_empty() {
            return Err(config::ConfigError::Message(
                "images.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
