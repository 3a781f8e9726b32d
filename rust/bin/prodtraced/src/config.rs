//! Server configuration, read from a TOML file.
//!
//! ```toml
//! [storage]
//! data_dir = "/var/lib/prodtrace"
//!
//! [code]
//! base_url = "https://trace.example.com/p/"
//! dir = "qrcodes"
//!
//! [ingest]
//! max_id_attempts = 5
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Directory searched for bare context names.
const CONFIG_DIR: &str = "/etc/prodtrace";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageConfig,
    pub code: CodeConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for the database and blobs.
    pub data_dir: String,

    /// Overrides `<data_dir>/data.sqlite`.
    #[serde(default)]
    pub sqlite_path: Option<String>,

    /// Overrides `<data_dir>/blobs`.
    #[serde(default)]
    pub blob_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeConfig {
    /// Public URL prefix encoded into each code image.
    pub base_url: String,

    /// Blob directory for code images, relative to the blob root.
    #[serde(default = "default_code_dir")]
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_max_id_attempts")]
    pub max_id_attempts: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_id_attempts: default_max_id_attempts(),
        }
    }
}

fn default_code_dir() -> String {
    "qrcodes".to_string()
}

fn default_max_id_attempts() -> u32 {
    trace::service::DEFAULT_MAX_ID_ATTEMPTS
}

impl ServerConfig {
    /// Map a `-c` argument to a file. A bare name resolves to
    /// `/etc/prodtrace/<name>.toml`; anything containing `/` or `.` is a path.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(CONFIG_DIR).join(format!("{name_or_path}.toml"))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
