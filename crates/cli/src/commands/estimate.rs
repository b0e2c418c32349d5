//! `ctxpack estimate`: per-entry token estimates for a session file.

use super::session;
use ctxpack_compaction::{classify, estimate_entry, CutPointSelector};
use ctxpack_core::SessionEntry;
use std::path::Path;

pub async fn run(input: &Path, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = session::load_config(config)?;
    let entries =
        session::read_entries(input).map_err(|e| format!("{}: {e}", input.display()))?;
    let budget = &config.compaction;

    println!("{:>5}  {:<22} {:<10} {:<9} {:>7}", "#", "Kind", "Role", "Priority", "Tokens");
    println!("{}", "─".repeat(58));

    let mut total = 0;
    for (i, entry) in entries.iter().enumerate() {
        let tokens = estimate_entry(entry);
        total += tokens;
        println!(
            "{:>5}  {:<22} {:<10} {:<9} {:>7}",
            i,
            entry.kind().to_string(),
            role_label(entry),
            classify(entry).to_string(),
            tokens
        );
    }

    let usage = if budget.max_tokens > 0 {
        total as f64 / budget.max_tokens as f64 * 100.0
    } else {
        0.0
    };

    println!();
    println!("  Entries:   {}", entries.len());
    println!("  Tokens:    {total} / {} ({usage:.1}%)", budget.max_tokens);
    println!("  Reserve:   {}", budget.reserve_tokens);
    println!("  Budget:    {} tokens", budget.effective_budget());
    println!("  Trigger:   {:.0} tokens", budget.trigger_tokens());

    if (total as f64) >= budget.trigger_tokens() {
        let cut = CutPointSelector::new().with_window(budget.boundary_window).select_within(
            &entries,
            budget.effective_budget(),
            budget.min_keep_count_for(budget.strategy),
            0,
        );
        println!(
            "  Cut point: {} ({}, {} strategy) -> {} tokens kept",
            cut.index, cut.reason, budget.strategy, cut.tokens_after
        );
    } else {
        println!("  Cut point: none (below threshold)");
    }

    Ok(())
}

fn role_label(entry: &SessionEntry) -> String {
    entry
        .role()
        .map(|role| role.label().to_lowercase())
        .unwrap_or_else(|| "-".into())
}
