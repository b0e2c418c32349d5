//! `ctxpack init-config`: print or write the default configuration.

use ctxpack_config::AppConfig;
use std::path::Path;

pub async fn run(write: bool) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = AppConfig::default_toml();
    if !write {
        print!("{toml_str}");
        return Ok(());
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if write_if_missing(&config_path, &toml_str)? {
        println!("✅ Created {}", config_path.display());
    } else {
        println!("  Config already exists: {}", config_path.display());
    }
    Ok(())
}

/// Write `content` to `path` unless the file exists. Returns whether it wrote.
fn write_if_missing(path: &Path, content: &str) -> Result<bool, Box<dyn std::error::Error>> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(true)
}
