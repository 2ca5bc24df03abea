//! Service-wide and per-index configuration.
//!
//! Mirrors the teacher's `Config`/`DatabaseConfig` pattern: a plain struct
//! with a `Default`, optionally overlaid from a file, then from environment
//! variables. The upstream Python service carried its process config as a
//! bare dict (`{"directory": "./"}`); we keep that shape but make it typed.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Process-wide configuration. Loaded from an optional `lsi.toml` file whose
/// *contents* are plain JSON (the teacher's config loader never actually
/// parsed TOML either; it read a dict literal) with environment overrides
/// applied on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:4000".parse().unwrap(),
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load `lsi.toml` from `dir` if present, then apply `LSI_DATA_DIR` /
    /// `LSI_BIND_ADDR` environment overrides. A missing or unparsable file
    /// silently falls back to defaults (matching the upstream's bare
    /// `config = {"directory": "./"}`).
    pub fn load(dir: &Path) -> Self {
        let path = dir.join("lsi.toml");
        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
            Err(_) => Self::default(),
        };

        if let Ok(data_dir) = std::env::var("LSI_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(bind_addr) = std::env::var("LSI_BIND_ADDR") {
            if let Ok(addr) = bind_addr.parse() {
                config.bind_addr = addr;
            }
        }
        config
    }
}

/// Per-index persisted configuration, `<name>.cfg` alongside the R-tree
/// files. `rebuild` is always cleared to `false` once read back, mirroring
/// the upstream's `idx_cfg["rebuild"] = False` round trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub rebuild: bool,
    pub tail: bool,
    pub properties: IndexProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexProperties {
    pub max_entries: Option<usize>,
}

impl IndexConfig {
    /// Read `<data_dir>/<name>.cfg`, defaulting to an empty config if the
    /// file is absent. Returns the config with `rebuild` as read (the
    /// caller is responsible for clearing and rewriting it).
    pub fn read(data_dir: &Path, name: &str) -> Self {
        let path = data_dir.join(format!("{name}.cfg"));
        match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Persist this config back to `<data_dir>/<name>.cfg`.
    pub fn write(&self, data_dir: &Path, name: &str) -> std::io::Result<()> {
        let path = data_dir.join(format!("{name}.cfg"));
        let text = serde_json::to_string(self).unwrap_or_default();
        std::fs::write(path, text)
    }
}
