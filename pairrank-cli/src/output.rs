/// Output formatting: terminal table and JSON.
use pairrank_core::{Design, RankOutcome, SolverUsed};
use serde::Serialize;

use crate::bail;

#[derive(Debug, Serialize, PartialEq)]
pub struct RankedItem {
    pub rank: usize,
    pub item: String,
    pub score: f64,
    pub comparisons: f64,
}

#[derive(Serialize)]
struct JsonRankOutput<'a> {
    items: &'a [RankedItem],
    total_comparisons: f64,
    components: usize,
    converged: bool,
}

#[derive(Serialize)]
struct JsonDesignOutput<'a> {
    designs: Vec<&'a [Vec<String>]>,
    new_pairs: usize,
}

/// Order items by descending score. Ties keep index order.
///
/// `comparisons` holds per-item totals, see [`pairrank_core::WinMatrix::comparisons_per_item`].
pub fn ranked_items(ids: &[String], outcome: &RankOutcome, comparisons: &[f64]) -> Vec<RankedItem> {
    let mut order: Vec<usize> = (0..ids.len()).collect();
    order.sort_by(|&a, &b| outcome.scores[b].total_cmp(&outcome.scores[a]));
    order
        .into_iter()
        .enumerate()
        .map(|(i, idx)| RankedItem {
            rank: i + 1,
            item: ids[idx].clone(),
            score: outcome.scores[idx],
            comparisons: comparisons[idx],
        })
        .collect()
}

/// Print a ranking as a formatted terminal table.
pub fn print_rank_table(items: &[RankedItem], outcome: &RankOutcome, total_comparisons: f64) {
    let name_width = items.iter().map(|r| r.item.len()).max().unwrap_or(4).max(4);

    println!(" # | {:<name_width$} |    Score | Comparisons", "Item");
    println!("---|-{}-|----------|------------", "-".repeat(name_width));
    for r in items {
        println!(
            "{:>2} | {:<name_width$} | {:>8.4} | {:>11}",
            r.rank, r.item, r.score, r.comparisons,
        );
    }

    let fallbacks = outcome
        .components
        .iter()
        .filter(|c| matches!(c.solver_used, SolverUsed::DirectFallback | SolverUsed::GmresFallback))
        .count();
    println!(
        "\n{} items ranked from {} comparisons ({} components)",
        items.len(),
        total_comparisons,
        outcome.components.len(),
    );
    if fallbacks > 0 {
        println!("{fallbacks} components needed the fallback solver");
    }
    if !outcome.converged {
        println!("Warning: some components did not converge; their scores are approximate");
    }
}

pub fn print_rank_json(items: &[RankedItem], outcome: &RankOutcome, total_comparisons: f64) {
    let output = JsonRankOutput {
        items,
        total_comparisons,
        components: outcome.components.len(),
        converged: outcome.converged,
    };
    print_json(&output);
}

/// Print designs block by block.
pub fn print_design_table(designs: &[Design<String>], new_pairs: usize) {
    for (d, design) in designs.iter().enumerate() {
        if designs.len() > 1 {
            println!("Design {}", d + 1);
        }
        for (b, block) in design.blocks.iter().enumerate() {
            println!("{:>3} | {}", b + 1, block.join(" | "));
        }
        if d + 1 < designs.len() {
            println!();
        }
    }
    let blocks: usize = designs.iter().map(Design::len).sum();
    println!("\n{} blocks in {} designs ({new_pairs} new pairs)", blocks, designs.len());
}

pub fn print_design_json(designs: &[Design<String>], new_pairs: usize) {
    let output = JsonDesignOutput {
        designs: designs.iter().map(|d| d.blocks.as_slice()).collect(),
        new_pairs,
    };
    print_json(&output);
}

fn print_json<S: Serialize>(value: &S) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => bail(format!("Failed to serialize output: {e}")),
    }
}
