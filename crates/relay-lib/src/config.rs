// ============================
// crates/relay-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::{IpAddr, SocketAddr};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Interface the server binds to
    pub bind_addr: String,
    /// Port the server listens on
    pub port: u16,
    /// Origins allowed to open a connection
    pub allowed_origins: Vec<String>,
    /// Log level
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 5000,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default config file location plus
    /// `RELAY_`-prefixed environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from("config/default")
    }

    /// Load settings from an explicit config file path (extension optional),
    /// still honoring environment overrides. A missing file falls back to
    /// the built-in defaults.
    pub fn load_from(path: &str) -> Result<Self> {
        let defaults = Settings::default();
        let cfg = Config::builder()
            .set_default("bind_addr", defaults.bind_addr)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("allowed_origins", defaults.allowed_origins)?
            .set_default("log_level", defaults.log_level)?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("RELAY")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins"),
            )
            .build()
            .context("failed to assemble configuration")?;

        let settings: Settings = cfg
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings are internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("port must be non-zero");
        }

        if self.bind_addr.parse::<IpAddr>().is_err() {
            bail!("bind_addr {:?} is not a valid IP address", self.bind_addr);
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            bail!(
                "log_level must be one of {:?}, got {:?}",
                LOG_LEVELS,
                self.log_level
            );
        }

        if self.allowed_origins.is_empty() {
            bail!("allowed_origins must name at least one origin");
        }
        for origin in &self.allowed_origins {
            if !origin.starts_with("http://") && !origin.starts_with("https://") {
                bail!("allowed origin {origin:?} must be an http(s) origin");
            }
        }

        Ok(())
    }

    /// The socket address the server should bind.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .bind_addr
            .parse()
            .with_context(|| format!("invalid bind_addr {:?}", self.bind_addr))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
