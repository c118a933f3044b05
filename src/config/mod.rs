//! Configuration management for WebPad GW
//!
//! Handles loading and validating the YAML configuration file. The file is
//! optional; a missing file falls back to defaults so the gateway runs with
//! zero setup.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::mapper::MapperSettings;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pad: PadConfig,
}

/// HTTP/WebSocket server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory with the web frontend; served as a fallback when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_dir: Option<PathBuf>,
}

/// Virtual pad configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PadConfig {
    #[serde(default)]
    pub backend: PadBackend,
    /// Flip stick Y sign (wire up-positive → device down-positive)
    #[serde(default = "default_true")]
    pub invert_y: bool,
    /// Accept the client → device vibration-set message shape
    #[serde(default = "default_true")]
    pub allow_vibration_intent: bool,
}

/// Which backend drives the virtual pad
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PadBackend {
    /// ViGEm on Windows when available, console otherwise
    #[default]
    Auto,
    Console,
    Vigem,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            web_dir: None,
        }
    }
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            backend: PadBackend::Auto,
            invert_y: true,
            allow_vibration_intent: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {path}"))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when the file exists, defaults otherwise
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            info!("No config file at {path}, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }
        if let Some(dir) = &self.server.web_dir {
            if !dir.is_dir() {
                anyhow::bail!("server.web_dir is not a directory: {}", dir.display());
            }
        }
        Ok(())
    }

    /// Socket address to bind the server to
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid server address: {}:{}",
                    self.server.host, self.server.port
                )
            })
    }
}

impl From<&PadConfig> for MapperSettings {
    fn from(pad: &PadConfig) -> Self {
        Self {
            invert_y: pad.invert_y,
            allow_vibration_intent: pad.allow_vibration_intent,
        }
    }
}
