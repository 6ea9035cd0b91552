use std::path::Path;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

/// Default config file looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Base URL of the fabric backend
    #[arg(long, env = "FABRIC_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Seconds between backend health checks
    #[arg(long, env = "STATUS_POLL_INTERVAL_SECS")]
    pub poll_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Directory served under `/static` (stylesheet and vendored scripts).
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl BackendConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    pub status_poll_interval_secs: u64,
    pub toast_duration_ms: u64,
    pub auto_create: bool,
}

impl UiConfig {
    #[must_use]
    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_secs(self.status_poll_interval_secs)
    }

    #[must_use]
    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            status_poll_interval_secs: 30,
            toast_duration_ms: 5000,
            auto_create: true,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Load configuration with precedence: CLI flag (or its env var) >
    /// `FABRIC_` env vars > config file > defaults.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.static_dir", "static")?
            .set_default("backend.base_url", "http://localhost:8000")?
            .set_default("backend.request_timeout_secs", 120)?
            .set_default("ui.status_poll_interval_secs", 30)?
            .set_default("ui.toast_duration_ms", 5000)?
            .set_default("ui.auto_create", true)?;

        // An explicit file must exist; the working-directory default is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
            }
            None => builder,
        };

        // E.g. FABRIC_SERVER__PORT=8080
        builder = builder.add_source(
            Environment::with_prefix("FABRIC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(url) = cli.backend_url {
            builder = builder.set_override("backend.base_url", url)?;
        }
        if let Some(secs) = cli.poll_interval_secs {
            builder = builder.set_override("ui.status_poll_interval_secs", secs)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        url::Url::parse(&self.backend.base_url).map_err(|e| {
            config::ConfigError::Message(format!(
                "backend.base_url {:?} is not a valid URL: {e}",
                self.backend.base_url
            ))
        })?;
        if self.server.static_dir.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "server.static_dir must not be empty".to_string(),
            ));
        }
        if self.ui.status_poll_interval_secs == 0 {
            return Err(config::ConfigError::Message(
                "ui.status_poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
