//! Configuration types for Hearth.
//!
//! `HearthConfig` represents the top-level `config.toml` that controls the
//! HTTP listener, the upstream model server, and storage location.

use serde::{Deserialize, Serialize};

use crate::llm::ChatOptions;

/// Top-level configuration for the Hearth gateway.
///
/// Loaded from `~/.hearth/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HearthConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allow any origin (for a browser front end served elsewhere).
    #[serde(default = "default_true")]
    pub permissive_cors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            permissive_cors: default_true(),
        }
    }
}

/// Upstream model server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model used when a request omits `model`.
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Upper bound on a single streamed reply.
    #[serde(default = "default_max_stream_secs")]
    pub max_stream_secs: u64,
    #[serde(default)]
    pub options: ChatOptions,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_stream_secs() -> u64 {
    600
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_model: default_model(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_stream_secs: default_max_stream_secs(),
            options: ChatOptions::default(),
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file name, relative to the data directory.
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

fn default_database_file() -> String {
    "hearth.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
        }
    }
}
