//! `ctxpack compact`: run the engine over a session file.
//!
//! No model is wired into the CLI, so summaries come from the heuristic
//! fallback.

use super::session;
use ctxpack_compaction::{CompactionResult, Compactor, OfflineSummarizer};
use ctxpack_core::Strategy;
use std::path::PathBuf;
use std::sync::Arc;

pub struct CompactOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub branch: String,
    pub strategy: Option<Strategy>,
    pub max_tokens: Option<usize>,
    pub reserve_tokens: Option<usize>,
    pub config: Option<PathBuf>,
}

pub async fn run(options: CompactOptions) -> Result<(), Box<dyn std::error::Error>> {
    let result = compact_file(&options).await?;

    match &options.output {
        Some(path) => {
            session::write_entries(path, &result.entries)?;
            println!("{}", result.report.to_log_string());
            println!("   Wrote {} entries to {}", result.entries.len(), path.display());
        }
        None => {
            println!("{}", serde_json::to_string_pretty(&result.entries)?);
            eprintln!("{}", result.report.to_log_string());
        }
    }

    Ok(())
}

async fn compact_file(options: &CompactOptions) -> Result<CompactionResult, Box<dyn std::error::Error>> {
    let mut config = session::load_config(options.config.as_deref())?;
    if let Some(max_tokens) = options.max_tokens {
        config.compaction.max_tokens = max_tokens;
    }
    if let Some(reserve_tokens) = options.reserve_tokens {
        config.compaction.reserve_tokens = reserve_tokens;
    }
    let strategy = options.strategy.unwrap_or(config.compaction.strategy);

    let compactor = Compactor::from_app_config(&config, Arc::new(OfflineSummarizer))?;
    let entries = session::read_entries(&options.input)
        .map_err(|e| format!("{}: {e}", options.input.display()))?;

    Ok(compactor.compact(&entries, &options.branch, strategy).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxpack_core::SessionEntry;

    fn options(dir: &std::path::Path, max_tokens: usize) -> CompactOptions {
        CompactOptions {
            input: dir.join("session.json"),
            output: Some(dir.join("out.json")),
            branch: "main".into(),
            strategy: Some(Strategy::Aggressive),
            max_tokens: Some(max_tokens),
            reserve_tokens: Some(0),
            config: Some(dir.join("missing.toml")),
        }
    }

    fn session(pairs: usize) -> Vec<SessionEntry> {
        (0..pairs)
            .flat_map(|i| {
                [
                    SessionEntry::user(format!("please refactor module {i} of the parser")),
                    SessionEntry::assistant(format!("refactored module {i} and ran the tests")),
                ]
            })
            .collect()
    }

    #[tokio::test]
    async fn compacts_file_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let entries = session(20);
        session::write_entries(&dir.path().join("session.json"), &entries).unwrap();

        let opts = options(dir.path(), 200);
        run(opts).await.unwrap();

        let out = session::read_entries(&dir.path().join("out.json")).unwrap();
        assert!(out.len() < entries.len());
        assert!(out[0].as_compaction().is_some());
        assert_eq!(out.last(), entries.last());
    }

    #[tokio::test]
    async fn small_session_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let entries = session(2);
        session::write_entries(&dir.path().join("session.json"), &entries).unwrap();

        let result = compact_file(&options(dir.path(), 100_000)).await.unwrap();
        assert!(!result.report.was_compacted);
        assert_eq!(result.entries, entries);
    }

    #[tokio::test]
    async fn invalid_budget_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        session::write_entries(&dir.path().join("session.json"), &session(1)).unwrap();

        let mut opts = options(dir.path(), 100);
        opts.reserve_tokens = Some(100);
        assert!(compact_file(&opts).await.is_err());
    }
}
