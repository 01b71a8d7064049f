use anyhow::{Context, Result};
use std::path::Path;

use smartdocs_storage::factory::create_gateway;

use super::load_config;

pub async fn run(base_dir: &Path) -> Result<()> {
    let config = load_config(base_dir)?;
    let gateway = create_gateway(&config.storage)
        .await
        .context("Storage configuration rejected")?;

    println!("Checking {} ...", gateway.name());
    let timeout = config.sync.call_timeout();
    match tokio::time::timeout(timeout, gateway.test_connection()).await {
        Ok(Ok(())) => {
            println!("OK: container '{}' is reachable", gateway.container());
            Ok(())
        }
        Ok(Err(e)) => {
            if e.is_unauthorized() {
                println!("Credentials were rejected. Check [storage] in your config.");
            }
            Err(e).context(format!("Connection check failed for {}", gateway.name()))
        }
        Err(_) => anyhow::bail!(
            "Connection check timed out after {}s for {}",
            timeout.as_secs(),
            gateway.name()
        ),
    }
}
