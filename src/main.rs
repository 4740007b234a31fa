//! lhdiff - demo binary for the line-matching engine.
//!
//! Reads two files, runs the full candidate -> match -> resolve ->
//! reorder -> split pipeline via the library's public free functions,
//! and prints a summary. This binary exists so the crate is runnable
//! and demonstrable; it performs no pattern scoring, history crawling,
//! ground-truth loading, or evaluation of its own.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use std::collections::HashSet;
use std::path::PathBuf;

use lhdiff_core::{build_simhash_candidates, detect_reorders, detect_splits, resolve_conflicts};
use lhdiff_core::{Mapping, Matches, NormalizeOptions};

#[derive(Parser)]
#[command(name = "lhdiff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match lines between two file revisions
    Diff {
        /// Earlier revision
        old: PathBuf,

        /// Later revision
        new: PathBuf,

        /// Candidates per old line from the SimHash index
        #[arg(long, default_value = "15")]
        topk: usize,

        /// Acceptance threshold for the matcher's global pass
        #[arg(long, default_value = "0.45")]
        threshold: f64,

        /// Acceptance threshold for reorder detection
        #[arg(long, default_value = "0.4")]
        reorder_threshold: f64,

        /// Minimum score improvement required to extend a split group
        #[arg(long, default_value = "0.01")]
        split_threshold_increase: f64,

        /// Print a per-line breakdown
        #[arg(long)]
        detail: bool,

        /// Print a unified-style preview of deletions/insertions
        #[arg(long)]
        preview: bool,

        /// Print the final mapping as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Diff {
            old,
            new,
            topk,
            threshold,
            reorder_threshold,
            split_threshold_increase,
            detail,
            preview,
            json,
        } => run_diff(
            &old,
            &new,
            topk,
            threshold,
            reorder_threshold,
            split_threshold_increase,
            detail,
            preview,
            json,
        ),
    }
}

fn read_lines(path: &PathBuf) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(text.lines().map(|l| l.to_string()).collect())
}

#[allow(clippy::too_many_arguments)]
fn run_diff(
    old_path: &PathBuf,
    new_path: &PathBuf,
    topk: usize,
    threshold: f64,
    reorder_threshold: f64,
    split_threshold_increase: f64,
    detail: bool,
    preview: bool,
    json: bool,
) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if !json {
        println!("{}", style("lhdiff").cyan().bold());
        println!("{}", style("─".repeat(60)).dim());
    }

    let old_lines = read_lines(old_path)?;
    let new_lines = read_lines(new_path)?;

    let candidates = build_simhash_candidates(&old_lines, &new_lines, topk);
    let matched = lhdiff_core::match_lines(&old_lines, &new_lines, &candidates, threshold);
    let resolved = resolve_conflicts(&matched, &new_lines);
    let reordered = detect_reorders(&old_lines, &new_lines, &resolved, reorder_threshold);
    let mapping = detect_splits(&old_lines, &new_lines, &reordered, split_threshold_increase);

    if json {
        println!("{}", serde_json::to_string_pretty(&mapping)?);
        return Ok(());
    }

    display_summary(&old_lines, &new_lines, &reordered, &mapping);

    if detail {
        display_detail(&old_lines, &new_lines, &reordered, &mapping);
    }

    if preview {
        display_preview(&old_lines, &new_lines, &mapping);
    }

    Ok(())
}

fn display_summary(old_lines: &[String], new_lines: &[String], scored: &Matches, mapping: &Mapping) {
    let matched_new: HashSet<usize> = mapping.values().flatten().copied().collect();

    let survivors = mapping.len();
    let deletions = old_lines.len().saturating_sub(survivors);
    let insertions = new_lines.len().saturating_sub(matched_new.len());
    let splits = mapping.values().filter(|group| group.len() > 1).count();

    let avg_score = if scored.is_empty() {
        0.0
    } else {
        scored.values().map(|m| m.score).sum::<f64>() / scored.len() as f64
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Lines compared"), Cell::new(old_lines.len())]);
    table.add_row(vec![Cell::new("Survivors"), Cell::new(survivors).fg(Color::Green)]);
    table.add_row(vec![Cell::new("Deletions"), Cell::new(deletions).fg(Color::Red)]);
    table.add_row(vec![Cell::new("Insertions"), Cell::new(insertions).fg(Color::Yellow)]);
    table.add_row(vec![Cell::new("Splits"), Cell::new(splits)]);
    table.add_row(vec![Cell::new("Avg match score"), Cell::new(format!("{:.3}", avg_score))]);

    println!("{table}");
}

fn display_detail(old_lines: &[String], new_lines: &[String], scored: &Matches, mapping: &Mapping) {
    println!("\n{}", style("Per-line breakdown").cyan().bold());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(vec!["Old #", "Old line", "New #", "New line", "Score"]);

    for (&old_idx, new_indices) in mapping {
        let score = scored.get(&old_idx).map(|m| format!("{:.2}", m.score)).unwrap_or_default();
        let new_text = new_indices
            .iter()
            .map(|&i| new_lines.get(i).map(String::as_str).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(" / ");
        let new_ids = new_indices.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",");

        table.add_row(vec![
            Cell::new(old_idx),
            Cell::new(truncate(old_lines.get(old_idx).map(String::as_str).unwrap_or(""), 40)),
            Cell::new(new_ids),
            Cell::new(truncate(&new_text, 40)),
            Cell::new(score),
        ]);
    }

    println!("{table}");
}

/// A preview of what changed, built purely for human-readable display —
/// the alignment decision itself is always the matcher's, never
/// `similar`'s own Myers diff.
fn display_preview(old_lines: &[String], new_lines: &[String], mapping: &Mapping) {
    use similar::{ChangeTag, TextDiff};

    println!("\n{}", style("Preview").cyan().bold());

    let matched_new: HashSet<usize> = mapping.values().flatten().copied().collect();

    let old_text = old_lines.join("\n");
    let new_text = new_lines.join("\n");
    let diff = TextDiff::from_lines(&old_text, &new_text);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => style("-").red(),
            ChangeTag::Insert => style("+").green(),
            ChangeTag::Equal => style(" ").dim(),
        };
        print!("{sign}{}", change);
    }

    let orphaned_new: Vec<usize> = (0..new_lines.len()).filter(|i| !matched_new.contains(i)).collect();
    if !orphaned_new.is_empty() {
        println!("{}", style(format!("  ({} new lines with no old-side origin)", orphaned_new.len())).dim());
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}
