// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor configuration.
//!
//! Stored as RON in `animaflow.ron`:
//! - `service`: render service endpoint, node registry URL, channel timing
//! - `canvas`: frame sizing, duplicate offset, node size estimates
//!
//! Every field has a default, so a partial file (or none at all) is valid.

use animaflow_editor_bridge::ChannelConfig;
use animaflow_editor_graph::graph::DUPLICATE_OFFSET;
use animaflow_editor_graph::{CanvasController, ContainmentConfig, EstimatedBounds, Point};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "animaflow.ron";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("Config file {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// The file is not valid RON for this schema
    #[error("Invalid config {path}: {source}")]
    Parse {
        /// File involved
        path: PathBuf,
        /// Parser error
        source: ron::error::SpannedError,
    },
    /// Serialization failed
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
}

/// External service endpoints and channel timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Render service endpoint: a `ws://` URL, or `tcp://host:port`
    pub render_url: String,
    /// Node registry base URL
    pub catalog_url: String,
    /// Keepalive period in seconds
    pub ping_interval_secs: u64,
    /// Reconnect delay in milliseconds
    pub reconnect_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let channel = ChannelConfig::default();
        Self {
            render_url: "ws://127.0.0.1:8000/ws/preview".to_string(),
            catalog_url: "http://127.0.0.1:8000".to_string(),
            ping_interval_secs: channel.ping_interval.as_secs(),
            reconnect_delay_ms: channel.reconnect_delay.as_millis() as u64,
        }
    }
}

impl ServiceConfig {
    /// Channel timing
    pub fn channel(&self) -> ChannelConfig {
        ChannelConfig {
            ping_interval: Duration::from_secs(self.ping_interval_secs.max(1)),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
        }
    }
}

/// Canvas behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Frame sizing and snapping
    pub containment: ContainmentConfig,
    /// Offset applied to duplicates
    pub duplicate_offset: Point,
    /// Node size estimates used for hit testing and containment
    pub node_estimate: EstimatedBounds,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            containment: ContainmentConfig::default(),
            duplicate_offset: DUPLICATE_OFFSET,
            node_estimate: EstimatedBounds::default(),
        }
    }
}

impl CanvasConfig {
    /// A canvas controller using these settings
    pub fn controller(&self) -> CanvasController {
        CanvasController::new(self.containment).with_duplicate_offset(self.duplicate_offset)
    }
}

/// Top-level editor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Service endpoints
    pub service: ServiceConfig,
    /// Canvas behavior
    pub canvas: CanvasConfig,
}

impl EditorConfig {
    /// Load from `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, else `animaflow.ron` in the working directory.
    ///
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = Path::new(CONFIG_FILE_NAME);
        if default_path.exists() {
            Self::load(default_path)
        } else {
            tracing::debug!("No {CONFIG_FILE_NAME}, using defaults");
            Ok(Self::default())
        }
    }

    /// Serialize as pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Write to `path`
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_ron()?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.service.channel(), ChannelConfig::default());
        assert_eq!(config.service.render_url, "ws://127.0.0.1:8000/ws/preview");
        assert_eq!(config.canvas.containment.grid, 15.0);
        assert_eq!(config.canvas.duplicate_offset, Point::new(40.0, 40.0));
    }

    #[test]
    fn test_serialization() {
        let mut config = EditorConfig::default();
        config.service.render_url = "ws://render.local:9000/ws/preview".to_string();
        config.canvas.containment.grid = 10.0;

        let ron_str = config.to_ron().unwrap();
        let loaded: EditorConfig = ron::from_str(&ron_str).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file() {
        let loaded: EditorConfig = ron::from_str("(service: (ping_interval_secs: 5))").unwrap();
        assert_eq!(loaded.service.channel().ping_interval, Duration::from_secs(5));
        assert_eq!(loaded.service.render_url, ServiceConfig::default().render_url);
        assert_eq!(loaded.canvas, CanvasConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let path =
            std::env::temp_dir().join(format!("animaflow_config_{}.ron", std::process::id()));
        let mut config = EditorConfig::default();
        config.service.catalog_url = "http://registry.local".to_string();
        config.save(&path).unwrap();

        let loaded = EditorConfig::resolve(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_explicit_file() {
        let err =
            EditorConfig::resolve(Some(Path::new("/nonexistent/animaflow.ron"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
