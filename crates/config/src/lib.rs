//! Configuration loading, validation, and management for ctxpack.
//!
//! Loads configuration from `~/.ctxpack/config.toml` with environment
//! variable overrides. Validates all settings up front so that a bad budget
//! is rejected when the engine is built, never halfway through a compaction.

use ctxpack_core::Strategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ctxpack/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Budget and trigger settings
    #[serde(default)]
    pub compaction: CompactionConfig,

    /// Settings for the summarizer call and prompt
    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

/// Token budget and cut policy consumed by the compaction orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Budget ceiling in estimated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Headroom kept free for the next model response
    #[serde(default = "default_reserve_tokens")]
    pub reserve_tokens: usize,

    /// Compaction triggers once usage reaches this fraction of `max_tokens`
    #[serde(default = "default_threshold_ratio")]
    pub threshold_ratio: f64,

    /// Default strategy when the caller does not pass one
    #[serde(default)]
    pub strategy: Strategy,

    /// Overrides the strategy's trailing-entry floor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_keep_count: Option<usize>,

    /// How many entries either side of the raw cut point are searched for a
    /// clean boundary
    #[serde(default = "default_boundary_window")]
    pub boundary_window: usize,
}

fn default_max_tokens() -> usize {
    128_000
}
fn default_reserve_tokens() -> usize {
    16_384
}
fn default_threshold_ratio() -> f64 {
    0.8
}
fn default_boundary_window() -> usize {
    3
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            reserve_tokens: default_reserve_tokens(),
            threshold_ratio: default_threshold_ratio(),
            strategy: Strategy::default(),
            min_keep_count: None,
            boundary_window: default_boundary_window(),
        }
    }
}

impl CompactionConfig {
    /// Build a config with the given budget and defaults elsewhere.
    pub fn with_budget(max_tokens: usize, reserve_tokens: usize) -> Self {
        Self {
            max_tokens,
            reserve_tokens,
            ..Self::default()
        }
    }

    /// Tokens the compacted sequence may occupy.
    pub fn effective_budget(&self) -> usize {
        self.max_tokens.saturating_sub(self.reserve_tokens)
    }

    /// Trailing-entry floor for a strategy, honoring the explicit override.
    pub fn min_keep_count_for(&self, strategy: Strategy) -> usize {
        self.min_keep_count
            .unwrap_or_else(|| strategy.min_keep_count())
    }

    /// Usage at or above which compaction should run.
    pub fn trigger_tokens(&self) -> f64 {
        self.threshold_ratio * self.max_tokens as f64
    }

    /// Validate the budget settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "compaction.max_tokens must be > 0".into(),
            ));
        }

        if self.reserve_tokens >= self.max_tokens {
            return Err(ConfigError::ValidationError(format!(
                "compaction.reserve_tokens ({}) must be less than max_tokens ({})",
                self.reserve_tokens, self.max_tokens
            )));
        }

        if !(self.threshold_ratio > 0.0 && self.threshold_ratio <= 1.0) {
            return Err(ConfigError::ValidationError(
                "compaction.threshold_ratio must be in (0.0, 1.0]".into(),
            ));
        }

        if self.min_keep_count == Some(0) {
            return Err(ConfigError::ValidationError(
                "compaction.min_keep_count must be >= 1".into(),
            ));
        }

        Ok(())
    }
}

/// Summarizer call and prompt settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Deadline for one summarizer call; expiry means heuristic fallback
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Per-entry character cap when rendering the prompt
    #[serde(default = "default_max_chars_per_entry")]
    pub max_chars_per_entry: usize,

    /// Longest summary text kept from the model
    #[serde(default = "default_max_summary_chars")]
    pub max_summary_chars: usize,
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_max_chars_per_entry() -> usize {
    400
}
fn default_max_summary_chars() -> usize {
    8_000
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_chars_per_entry: default_max_chars_per_entry(),
            max_summary_chars: default_max_summary_chars(),
        }
    }
}

impl SummarizerConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    /// Validate the summarizer settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "summarizer.timeout_secs must be > 0".into(),
            ));
        }
        if self.max_chars_per_entry == 0 {
            return Err(ConfigError::ValidationError(
                "summarizer.max_chars_per_entry must be > 0".into(),
            ));
        }
        if self.max_summary_chars == 0 {
            return Err(ConfigError::ValidationError(
                "summarizer.max_summary_chars must be > 0".into(),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.ctxpack/config.toml).
    ///
    /// Environment variables override file values:
    /// - `CTXPACK_MAX_TOKENS`
    /// - `CTXPACK_RESERVE_TOKENS`
    /// - `CTXPACK_STRATEGY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CTXPACK_MAX_TOKENS") {
            self.compaction.max_tokens = parse_override("CTXPACK_MAX_TOKENS", &raw)?;
        }

        if let Some(raw) = lookup("CTXPACK_RESERVE_TOKENS") {
            self.compaction.reserve_tokens = parse_override("CTXPACK_RESERVE_TOKENS", &raw)?;
        }

        if let Some(raw) = lookup("CTXPACK_STRATEGY") {
            self.compaction.strategy = raw.parse().map_err(|e: String| {
                ConfigError::ValidationError(format!("CTXPACK_STRATEGY: {e}"))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ctxpack")
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compaction.validate()?;
        self.summarizer.validate()
    }

    /// Generate a default config TOML string (for `init-config`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_override(key: &str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|_| {
        ConfigError::ValidationError(format!("{key} must be a non-negative integer, got '{raw}'"))
    })
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.compaction.threshold_ratio, 0.8);
        assert_eq!(config.compaction.strategy, Strategy::Balanced);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.compaction, config.compaction);
        assert_eq!(parsed.summarizer, config.summarizer);
    }

    #[test]
    fn reserve_must_be_below_max() {
        let config = CompactionConfig::with_budget(1000, 1000);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reserve_tokens"));
    }

    #[test]
    fn threshold_ratio_bounds() {
        let zero = CompactionConfig {
            threshold_ratio: 0.0,
            ..CompactionConfig::default()
        };
        assert!(zero.validate().is_err());

        let one = CompactionConfig {
            threshold_ratio: 1.0,
            ..CompactionConfig::default()
        };
        assert!(one.validate().is_ok());

        let over = CompactionConfig {
            threshold_ratio: 1.5,
            ..CompactionConfig::default()
        };
        assert!(over.validate().is_err());
    }

    #[test]
    fn zero_keep_floor_rejected() {
        let config = CompactionConfig {
            min_keep_count: Some(0),
            ..CompactionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn keep_floor_override_wins_over_strategy() {
        let config = CompactionConfig {
            min_keep_count: Some(9),
            ..CompactionConfig::default()
        };
        assert_eq!(config.min_keep_count_for(Strategy::Aggressive), 9);
        assert_eq!(
            CompactionConfig::default().min_keep_count_for(Strategy::Aggressive),
            2
        );
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.compaction.max_tokens, 128_000);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[compaction]\nmax_tokens = 8000\nreserve_tokens = 1000\nstrategy = \"aggressive\""
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.compaction.max_tokens, 8000);
        assert_eq!(config.compaction.strategy, Strategy::Aggressive);
        assert_eq!(config.compaction.boundary_window, 3);
        assert_eq!(config.summarizer.timeout_secs, 60);
    }

    #[test]
    fn invalid_file_values_rejected_on_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[compaction]\nmax_tokens = 100\nreserve_tokens = 200").unwrap();
        assert!(matches!(
            AppConfig::load_from(file.path()),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[compaction\nmax_tokens = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(file.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("CTXPACK_MAX_TOKENS", "50000"),
            ("CTXPACK_STRATEGY", "conservative"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.compaction.max_tokens, 50_000);
        assert_eq!(config.compaction.strategy, Strategy::Conservative);
    }

    #[test]
    fn malformed_env_override_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env_overrides(|key| {
            (key == "CTXPACK_RESERVE_TOKENS").then(|| "lots".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("max_tokens"));
        assert!(toml_str.contains("balanced"));
    }
}
