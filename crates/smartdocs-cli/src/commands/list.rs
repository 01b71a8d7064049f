use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use smartdocs_core::keys::display_name;

use super::{connect, load_config};
use crate::format::{format_age, format_bytes};

pub async fn run(base_dir: &Path, json: bool) -> Result<()> {
    let config = load_config(base_dir)?;
    let engine = connect(&config).await?;
    engine.refresh().await?;

    let snapshot = engine.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.records)?);
        return Ok(());
    }

    if snapshot.records.is_empty() {
        println!("No pending documents in '{}'.", engine.container());
        return Ok(());
    }

    let now = Utc::now();
    println!("{:<40} {:>10} {:<14} {}", "NAME", "SIZE", "UPLOADED", "KEY");
    println!("{}", "-".repeat(100));
    for record in &snapshot.records {
        println!(
            "{:<40} {:>10} {:<14} {}",
            display_name(&record.key),
            format_bytes(record.size_bytes),
            format_age(record.last_modified, now),
            record.key,
        );
    }
    println!(
        "\n{} document(s), {} pending in '{}'",
        snapshot.records.len(),
        format_bytes(snapshot.total_bytes()),
        engine.container()
    );

    Ok(())
}
