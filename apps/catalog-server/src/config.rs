//! Layered server configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the YAML file given
//! with `--config`, `APP__*` environment variables (`__` separates nested
//! keys, e.g. `APP__SERVER__BIND_ADDR`), then command-line overrides.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use data_catalog::{DataCatalogConfig, StorageConfig};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

/// DSN used by `--mock`.
pub const MOCK_DSN: &str = "sqlite::memory:";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub catalog: DataCatalogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub request_timeout_secs: u64,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8087".to_owned(),
            request_timeout_secs: 30,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// # Errors
    /// Fails when `bind_addr` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .with_context(|| format!("invalid bind address '{}'", self.bind_addr))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `data_catalog=debug,info`.
    /// `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Command-line values that take precedence over every other source.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub verbose: u8,
    pub mock: bool,
}

impl AppConfig {
    /// Merges defaults, the optional YAML file and the environment.
    ///
    /// # Errors
    /// Fails when a source cannot be parsed or holds unknown keys.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed("APP__").split("__"))
            .extract()
            .context("failed to parse configuration")
    }

    /// # Errors
    /// Fails when `--port` is given but the configured bind address is invalid.
    pub fn apply_cli_overrides(&mut self, cli: &CliOverrides) -> Result<()> {
        if let Some(port) = cli.port {
            let mut addr = self.server.socket_addr()?;
            addr.set_port(port);
            self.server.bind_addr = addr.to_string();
        }

        match cli.verbose {
            0 => {}
            1 => "info".clone_into(&mut self.logging.level),
            2 => "debug".clone_into(&mut self.logging.level),
            _ => "trace".clone_into(&mut self.logging.level),
        }

        if cli.mock {
            self.catalog.storage = StorageConfig::Database {
                dsn: MOCK_DSN.to_owned(),
                max_connections: None,
            };
        }
        Ok(())
    }

    /// Checks everything that can be checked without opening storage.
    ///
    /// # Errors
    /// Fails on an invalid bind address, a zero timeout or an empty DSN.
    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;
        anyhow::ensure!(
            self.server.request_timeout_secs > 0,
            "server.request_timeout_secs must be positive"
        );
        if let StorageConfig::Database { dsn, .. } = &self.catalog.storage {
            anyhow::ensure!(!dsn.trim().is_empty(), "catalog.storage.dsn must not be empty");
        }
        Ok(())
    }

    /// Effective configuration as YAML, with credentials masked.
    ///
    /// # Errors
    /// Fails when serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        let mut printable = self.clone();
        printable.catalog.storage = self.catalog.storage.redacted();
        serde_saphyr::to_string(&printable).context("failed to render configuration")
    }
}
