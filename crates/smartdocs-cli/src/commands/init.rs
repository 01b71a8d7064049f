use anyhow::Result;
use std::path::Path;

use smartdocs_core::config::SmartdocsConfig;

pub fn run(base_dir: &Path, force: bool) -> Result<()> {
    println!("Initializing smartdocs in {}", base_dir.display());

    std::fs::create_dir_all(base_dir)?;

    let config_path = SmartdocsConfig::default_path(base_dir);
    if config_path.exists() && !force {
        println!("Config already exists at {}", config_path.display());
        println!("Use --force to overwrite it with the defaults.");
        return Ok(());
    }

    let config = SmartdocsConfig::default_config(base_dir);
    config.save(&config_path)?;
    println!("Created config: {}", config_path.display());

    if let Some(ref path) = config.storage.path {
        let container_dir = Path::new(path).join(&config.storage.container);
        std::fs::create_dir_all(&container_dir)?;
        println!("Local container: {}", container_dir.display());
    }

    println!("\nsmartdocs initialized. Next steps:");
    println!("  1. Point [storage] in {} at your container", config_path.display());
    println!("  2. Run `smartdocs check` to verify credentials");
    println!("  3. Run `smartdocs upload <file>...` to send invoices");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_config_and_container() {
        let tmp = TempDir::new().unwrap();
        run(tmp.path(), false).unwrap();

        let config = SmartdocsConfig::load(&SmartdocsConfig::default_path(tmp.path())).unwrap();
        assert_eq!(config.storage.container, "rawinvoices");
        assert!(tmp.path().join("storage/rawinvoices").is_dir());
    }

    #[test]
    fn keeps_existing_config_without_force() {
        let tmp = TempDir::new().unwrap();
        let config_path = SmartdocsConfig::default_path(tmp.path());
        let mut config = SmartdocsConfig::default_config(tmp.path());
        config.storage.container = "scans".to_string();
        config.save(&config_path).unwrap();

        run(tmp.path(), false).unwrap();
        assert_eq!(SmartdocsConfig::load(&config_path).unwrap().storage.container, "scans");

        run(tmp.path(), true).unwrap();
        assert_eq!(
            SmartdocsConfig::load(&config_path).unwrap().storage.container,
            "rawinvoices"
        );
    }
}
