use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use smartdocs_core::upload::{UploadFile, UploadPolicy};
use smartdocs_sync::{EngineError, UploadReceipt};

use super::{connect, load_config};
use crate::format::format_bytes;

pub async fn run(base_dir: &Path, paths: &[PathBuf]) -> Result<()> {
    let config = load_config(base_dir)?;
    let engine = connect(&config).await?;
    let policy = config.upload.policy();

    let mut files = Vec::with_capacity(paths.len());
    let mut failed = 0usize;
    for path in paths {
        match read_within(path, &policy) {
            Ok(file) => files.push(file),
            Err(e) => {
                failed += 1;
                eprintln!("  skipped {}: {e}", path.display());
            }
        }
    }

    println!("Uploading {} file(s) to '{}'", files.len(), engine.container());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let uploads = files.into_iter().map(|file| {
        let name = file.name.clone();
        let engine = &engine;
        let pb = &pb;
        async move {
            let result = engine.upload(file).await;
            pb.set_message(name.clone());
            pb.inc(1);
            (name, result)
        }
    });
    let results = futures::future::join_all(uploads).await;
    pb.finish_with_message("done");

    let mut stored: Vec<UploadReceipt> = Vec::new();
    for (name, result) in results {
        match result {
            Ok(receipt) => {
                println!(
                    "  OK   {name} -> {} ({})",
                    receipt.key,
                    format_bytes(receipt.size_bytes)
                );
                stored.push(receipt);
            }
            Err(EngineError::Validation(e)) => {
                failed += 1;
                println!("  SKIP {name}: {e}");
            }
            Err(e) => {
                failed += 1;
                println!("  FAIL {name}: {e}");
            }
        }
    }

    if !stored.is_empty() {
        let mut rx = engine.subscribe();
        let settled = tokio::time::timeout(
            config.sync.call_timeout(),
            rx.wait_for(|s| stored.iter().all(|r| s.record(&r.key).is_some())),
        )
        .await;
        match settled {
            Ok(Ok(snapshot)) => println!(
                "\n{} document(s) pending in '{}'",
                snapshot.records.len(),
                engine.container()
            ),
            _ => println!("\nUploaded objects are not listed yet; run `smartdocs list` shortly."),
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} file(s) were not uploaded", paths.len());
    }
    Ok(())
}

/// Load a file unless its on-disk size already exceeds the policy limit.
fn read_within(path: &Path, policy: &UploadPolicy) -> Result<UploadFile> {
    let size = std::fs::metadata(path)?.len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    policy.check_size(&name, size)?;
    Ok(UploadFile::from_path(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn oversize_file_rejected_from_metadata() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.pdf");
        std::fs::write(&path, vec![0x25u8; 2048]).unwrap();
        let policy = UploadPolicy::new(1024, ["application/pdf".to_string()]);

        let err = read_within(&path, &policy).unwrap_err();
        assert!(err.to_string().contains("larger than the 1024 byte limit"));

        let small = tmp.path().join("small.pdf");
        std::fs::write(&small, vec![0x25u8; 512]).unwrap();
        let file = read_within(&small, &policy).unwrap();
        assert_eq!(file.size_bytes(), 512);
        assert_eq!(file.content_type, "application/pdf");
    }

    #[test]
    fn missing_file_reported() {
        let tmp = TempDir::new().unwrap();
        let policy = UploadPolicy::default();
        assert!(read_within(&tmp.path().join("nope.pdf"), &policy).is_err());
    }
}
