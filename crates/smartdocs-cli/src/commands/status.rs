use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use super::{connect, load_config};
use crate::format::{format_age, format_bytes};

pub async fn run(base_dir: &Path) -> Result<()> {
    let config = load_config(base_dir)?;
    let engine = connect(&config).await?;

    // a failed listing is part of what this command reports
    if let Err(e) = engine.refresh().await {
        tracing::debug!(error = %e, "status refresh failed");
    }

    let snapshot = engine.snapshot();
    let now = Utc::now();
    println!("Container '{}' via {}:", engine.container(), engine.gateway_name());
    println!("  State:          {}", snapshot.state());
    println!("  Pending:        {}", snapshot.records.len());
    println!("  Total size:     {}", format_bytes(snapshot.total_bytes()));
    match snapshot.refreshed_at {
        Some(at) => println!("  Last listing:   {}", format_age(at, now)),
        None => println!("  Last listing:   never"),
    }
    if let Some(latest) = snapshot.records.first() {
        println!("  Newest upload:  {} ({})", latest.key, format_age(latest.last_modified, now));
    }
    if let Some(ref error) = snapshot.last_error {
        println!("  Last error:     {} failed: {}", error.operation, error.error);
        if error.error.is_retryable() {
            println!("                  (transient, the next refresh may succeed)");
        }
    }

    Ok(())
}
