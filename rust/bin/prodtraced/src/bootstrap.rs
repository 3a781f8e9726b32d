//! Startup checks run before any store is opened.

use std::path::{Component, Path};

use crate::config::ServerConfig;

/// Verify server configuration is usable. Refuses to start otherwise.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.storage.data_dir.trim().is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }

    let base_url = config.code.base_url.trim();
    if base_url.is_empty() {
        anyhow::bail!("code.base_url is empty in configuration.");
    }
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        anyhow::bail!("code.base_url must be an http(s) URL, got '{}'.", base_url);
    }

    let dir = config.code.dir.trim();
    if dir.is_empty() {
        anyhow::bail!("code.dir is empty in configuration.");
    }
    let dir_path = Path::new(dir);
    if dir_path.is_absolute()
        || dir_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        anyhow::bail!(
            "code.dir must be a relative path inside the blob directory, got '{}'.",
            dir
        );
    }

    if config.ingest.max_id_attempts == 0 {
        anyhow::bail!("ingest.max_id_attempts must be at least 1.");
    }
    Ok(())
}
