use anyhow::Result;
use std::path::Path;

use smartdocs_core::keys::display_name;

use super::{connect, load_config};
use crate::format::format_bytes;

pub async fn run(base_dir: &Path, key: &str) -> Result<()> {
    let config = load_config(base_dir)?;
    let engine = connect(&config).await?;
    let record = engine.inspect(key).await?;

    println!("Object {}:", record.key);
    println!("  Name:           {}", display_name(&record.key));
    println!("  Size:           {} ({} bytes)", format_bytes(record.size_bytes), record.size_bytes);
    println!("  Last modified:  {}", record.last_modified.to_rfc3339());
    println!("  URL:            {}", record.access_url);

    Ok(())
}
