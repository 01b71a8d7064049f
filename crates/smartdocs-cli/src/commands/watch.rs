use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use smartdocs_core::keys::display_name;
use smartdocs_core::types::ViewSnapshot;
use smartdocs_sync::SnapshotDiff;

use super::{connect, load_config};
use crate::format::format_bytes;

pub async fn run(base_dir: &Path, interval: Option<u64>) -> Result<()> {
    let mut config = load_config(base_dir)?;
    if let Some(secs) = interval {
        config.sync.poll_interval_secs = secs;
    }
    let engine = connect(&config).await?;
    let mut rx = engine.subscribe();

    println!(
        "Watching '{}' every {}s (Ctrl-C to stop)",
        engine.container(),
        config.sync.poll_interval().as_secs()
    );
    engine.start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut previous = ViewSnapshot::default();
    let mut listed_once = false;
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = rx.borrow_and_update().clone();
                report(&previous, &current, &mut listed_once);
                previous = current;
            }
            _ = &mut ctrl_c => {
                println!();
                break;
            }
        }
    }

    engine.stop();
    Ok(())
}

fn report(previous: &ViewSnapshot, current: &ViewSnapshot, listed_once: &mut bool) {
    let stamp = Utc::now().format("%H:%M:%S");

    if current.last_error != previous.last_error {
        if let Some(ref error) = current.last_error {
            println!("{stamp} ! {} failed: {}", error.operation, error.error);
        }
    }

    if current.refreshed_at == previous.refreshed_at {
        return;
    }
    if !*listed_once {
        *listed_once = true;
        println!(
            "{stamp}   {} document(s) pending, {}",
            current.records.len(),
            format_bytes(current.total_bytes())
        );
        return;
    }

    let diff = SnapshotDiff::between(previous, current);
    for record in &diff.added {
        println!(
            "{stamp} + {} ({})",
            display_name(&record.key),
            format_bytes(record.size_bytes)
        );
    }
    for record in &diff.changed {
        println!("{stamp} ~ {}", display_name(&record.key));
    }
    for record in &diff.removed {
        println!("{stamp} - {}", display_name(&record.key));
    }
}
