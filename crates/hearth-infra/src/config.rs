//! Data directory resolution and `config.toml` loading.
//!
//! Falls back to [`HearthConfig::default()`] when the file is missing or
//! malformed so the gateway always starts.

use std::path::{Path, PathBuf};

use hearth_types::config::HearthConfig;

/// Resolve the data directory.
///
/// Uses `HEARTH_DATA_DIR` if set, otherwise `~/.hearth`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HEARTH_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".hearth");
    }

    PathBuf::from(".hearth")
}

/// Load configuration from `{data_dir}/config.toml`.
pub async fn load_config(data_dir: &Path) -> HearthConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return HearthConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return HearthConfig::default();
        }
    };

    match toml::from_str::<HearthConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            HearthConfig::default()
        }
    }
}
