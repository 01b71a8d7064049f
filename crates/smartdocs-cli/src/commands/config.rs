use anyhow::Result;
use std::path::Path;

use smartdocs_core::config::SmartdocsConfig;

use super::load_config;
use crate::format::format_bytes;

pub fn run(base_dir: &Path) -> Result<()> {
    let config = load_config(base_dir)?;
    let storage = &config.storage;

    println!("Config: {}", SmartdocsConfig::default_path(base_dir).display());
    println!();
    println!("  Provider:       {}", storage.provider_type);
    println!("  Container:      {}", storage.container);
    if let Some(ref account) = storage.account {
        println!("  Account:        {account}");
    }
    if let Some(ref region) = storage.region {
        println!("  Region:         {region}");
    }
    if let Some(ref endpoint) = storage.endpoint_url {
        println!("  Endpoint:       {endpoint}");
    }
    if storage.emulator {
        println!("  Emulator:       yes");
    }
    if let Some(ref path) = storage.path {
        println!("  Path:           {path}");
    }
    if let Some(ref url) = storage.public_base_url {
        println!("  Public URL:     {url}");
    }
    println!("  Access key:     {}", mask(storage.access_key.as_deref()));
    if storage.secret_key.is_some() {
        println!("  Secret key:     {}", mask(storage.secret_key.as_deref()));
    }
    println!();
    println!("  Poll interval:  {}s", config.sync.poll_interval().as_secs());
    println!("  Call timeout:   {}s", config.sync.call_timeout().as_secs());
    println!("  Max file size:  {}", format_bytes(config.upload.max_file_size));
    println!("  Accepted types: {}", config.upload.accepted_types.join(", "));

    Ok(())
}

/// Show only enough of a secret to tell two apart.
fn mask(secret: Option<&str>) -> String {
    match secret {
        None => "(not set)".to_string(),
        Some(s) if s.chars().count() <= 8 => "********".to_string(),
        Some(s) => {
            let skip = s.chars().count() - 4;
            format!("********{}", s.chars().skip(skip).collect::<String>())
        }
    }
}
