//! Session file I/O shared by the commands.
//!
//! A session file is either a JSON array of entries or JSON lines with one
//! entry per line (blank lines ignored).

use ctxpack_config::AppConfig;
use ctxpack_core::{Error, SessionEntry};
use std::path::Path;

pub fn parse_entries(content: &str) -> ctxpack_core::Result<Vec<SessionEntry>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    let mut entries = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(line).map_err(|e| Error::InvalidEntry {
            line: line_no + 1,
            reason: e.to_string(),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

pub fn read_entries(path: &Path) -> ctxpack_core::Result<Vec<SessionEntry>> {
    let content = std::fs::read_to_string(path)?;
    let entries = parse_entries(&content)?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "Loaded session");
    Ok(entries)
}

pub fn write_entries(path: &Path, entries: &[SessionEntry]) -> ctxpack_core::Result<()> {
    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json + "\n")?;
    Ok(())
}

/// Load `path` (or the default config), with environment overrides applied.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(AppConfig::load()?);
    };
    let mut config = AppConfig::load_from(path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}
