pub mod check;
pub mod config;
pub mod info;
pub mod init;
pub mod list;
pub mod status;
pub mod upload;
pub mod watch;

use anyhow::{Context, Result};
use std::path::Path;

use smartdocs_core::config::SmartdocsConfig;
use smartdocs_sync::Engine;

/// Load `<base_dir>/smartdocs.toml`, pointing at `smartdocs init` when it is missing.
pub fn load_config(base_dir: &Path) -> Result<SmartdocsConfig> {
    let config_path = SmartdocsConfig::default_path(base_dir);
    if !config_path.exists() {
        anyhow::bail!(
            "No config at {}. Run `smartdocs init` first.",
            config_path.display()
        );
    }
    SmartdocsConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))
}

/// Engine over the configured container. Nothing is listed yet.
pub async fn connect(config: &SmartdocsConfig) -> Result<Engine> {
    Engine::connect(config)
        .await
        .context("Storage configuration rejected")
}
