use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Bare port variable set by most hosting platforms. Wins over every other source.
pub const PORT_VAR: &str = "PORT";

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebSocketConfig {
    pub path: String,
    pub heartbeat_interval_secs: u64,
    pub client_timeout_secs: u64,
}

impl WebSocketConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StaticFilesConfig {
    pub dir: String,
    pub index_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub max_age: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub websocket: WebSocketConfig,
    pub static_files: StaticFilesConfig,
    pub cors: CorsConfig,
}

/// `PORT` when set to something non-blank. An empty `PORT` counts as unset.
fn port_override() -> Option<String> {
    env::var(PORT_VAR)
        .ok()
        .map(|port| port.trim().to_string())
        .filter(|port| !port.is_empty())
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        Self::builder()?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_SERVER__PORT=5001` would set `Settings.server.port`
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            )
            .set_override_option("server.port", port_override())?
            .build()?
            .try_deserialize()
    }

    /// Built-in defaults only, ignoring config files and the environment.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", "development")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("websocket.path", "/ws")?
            .set_default("websocket.heartbeat_interval_secs", 5)?
            .set_default("websocket.client_timeout_secs", 10)?
            .set_default("static_files.dir", "public")?
            .set_default("static_files.index_file", "index.html")?
            .set_default("cors.enabled", false)?
            .set_default("cors.max_age", 3600)
    }
}
