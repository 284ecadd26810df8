//! Engine configuration
//!
//! All tunables live in one serializable struct so applications can load a
//! TOML file or build the config in code. Every field has a default; a
//! missing file is not an error for callers that want `EngineConfig::default()`.

use crate::core::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window creation parameters
    pub window: WindowConfig,
    /// Renderer parameters
    pub render: RenderConfig,
    /// Synchronization timeouts
    pub sync: SyncConfig,
}

/// Window creation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Ember Engine".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Renderer parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Root of the asset tree; shaders live under `<asset_root>/shaders/`
    pub asset_root: PathBuf,
    /// Vertex shader file name (must end in `.vert.spv`)
    pub vertex_shader: String,
    /// Fragment shader file name (must end in `.frag.spv`)
    pub fragment_shader: String,
    /// Clear color applied at the start of every frame (RGBA)
    pub clear_color: [f32; 4],
    /// Request the Khronos validation layer when available
    pub enable_validation: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            vertex_shader: "mesh.vert.spv".to_string(),
            fragment_shader: "mesh.frag.spv".to_string(),
            clear_color: [0.05, 0.05, 0.08, 1.0],
            enable_validation: cfg!(debug_assertions),
        }
    }
}

/// Synchronization timeouts, in nanoseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Bound on waiting for the previous frame's fence; exceeding it is
    /// treated as a GPU hang and is fatal
    pub fence_timeout_ns: u64,
    /// Bound on acquiring the next swapchain image
    pub acquire_timeout_ns: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fence_timeout_ns: 1_000_000_000,
            acquire_timeout_ns: 1_000_000_000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            EngineError::invalid_path("config", format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&text).map_err(|e| {
            EngineError::type_mismatch("config", format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Serialize the configuration back to TOML
    pub fn to_toml(&self) -> EngineResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::type_mismatch("config", format!("serialize failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = EngineConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.window.width, config.window.width);
        assert_eq!(parsed.sync.fence_timeout_ns, config.sync.fence_timeout_ns);
    }

    #[test]
    fn missing_file_reports_invalid_path() {
        let err = EngineConfig::load_from_file("/definitely/not/here.toml").unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::InvalidPath);
    }
}
