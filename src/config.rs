// src/config.rs

//! Manages server configuration: loading, defaults, and validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::core::events::DEFAULT_EVENT_QUEUE_CAPACITY;
use crate::core::protocol::frame::DEFAULT_MAX_PAYLOAD;

/// Configuration for the operator HTTP server (admin routes and `/metrics`).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdminConfig {
    /// If true, the admin HTTP server is started.
    #[serde(default = "default_admin_enabled")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_admin_port")]
    pub port: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: default_admin_enabled(),
            host: default_host(),
            port: default_admin_port(),
        }
    }
}

fn default_admin_enabled() -> bool {
    true
}
fn default_admin_port() -> u16 {
    8080
}

/// A raw representation of the config file before validation.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_max_clients")]
    max_clients: usize,
    #[serde(default = "default_upload_dir")]
    upload_dir: PathBuf,
    #[serde(default = "default_event_queue_capacity")]
    event_queue_capacity: usize,
    #[serde(default = "default_outbound_queue_capacity")]
    outbound_queue_capacity: usize,
    #[serde(default = "default_max_payload_bytes")]
    max_payload_bytes: usize,
    #[serde(default)]
    shutdown_notice: Option<String>,
    #[serde(default)]
    admin: AdminConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    9000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_clients() -> usize {
    1024
}
fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}
fn default_event_queue_capacity() -> usize {
    DEFAULT_EVENT_QUEUE_CAPACITY
}
fn default_outbound_queue_capacity() -> usize {
    1024
}
fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD
}

/// Represents the final, validated server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub max_clients: usize,
    /// Directory that receives uploaded files.
    pub upload_dir: PathBuf,
    pub event_queue_capacity: usize,
    /// Per-connection queue of frames waiting to be written.
    pub outbound_queue_capacity: usize,
    pub max_payload_bytes: usize,
    /// Broadcast as a server notice to every client when shutting down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown_notice: Option<String>,
    #[serde(default)]
    pub admin: AdminConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_clients: default_max_clients(),
            upload_dir: default_upload_dir(),
            event_queue_capacity: default_event_queue_capacity(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            max_payload_bytes: default_max_payload_bytes(),
            shutdown_notice: None,
            admin: AdminConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config in '{path}'"))
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw_config: RawConfig =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;

        let config = Config {
            host: raw_config.host,
            port: raw_config.port,
            log_level: raw_config.log_level,
            max_clients: raw_config.max_clients,
            upload_dir: raw_config.upload_dir,
            event_queue_capacity: raw_config.event_queue_capacity,
            outbound_queue_capacity: raw_config.outbound_queue_capacity,
            max_payload_bytes: raw_config.max_payload_bytes,
            shutdown_notice: raw_config
                .shutdown_notice
                .filter(|notice| !notice.trim().is_empty()),
            admin: raw_config.admin,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients cannot be 0"));
        }
        if self.upload_dir.as_os_str().is_empty() {
            return Err(anyhow!("upload_dir cannot be empty"));
        }
        if self.event_queue_capacity == 0 {
            return Err(anyhow!("event_queue_capacity cannot be 0"));
        }
        if self.outbound_queue_capacity == 0 {
            return Err(anyhow!("outbound_queue_capacity cannot be 0"));
        }
        if self.max_payload_bytes == 0 {
            return Err(anyhow!("max_payload_bytes cannot be 0"));
        }
        if self.max_payload_bytes > u32::MAX as usize {
            return Err(anyhow!(
                "max_payload_bytes cannot exceed {} (the frame length field is 32 bits)",
                u32::MAX
            ));
        }
        if self.event_queue_capacity < self.max_clients {
            warn!(
                "event_queue_capacity ({}) is smaller than max_clients ({}). Events may be dropped under load.",
                self.event_queue_capacity, self.max_clients
            );
        }

        if self.admin.enabled {
            if self.admin.port == 0 {
                return Err(anyhow!("admin.port cannot be 0"));
            }
            if self.admin.port == self.port {
                return Err(anyhow!(
                    "admin.port cannot be the same as the main server port"
                ));
            }
        }
        Ok(())
    }
}
