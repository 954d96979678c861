//! Console tables for the comparison and compression commands.

use spimi_core::{CompressionReport, QueryResult, SpimiReport};
use std::fmt::Write;
use std::time::Duration;

pub struct StrategyTiming {
    pub name: &'static str,
    pub elapsed: Duration,
    pub terms: usize,
    pub postings: usize,
}

pub fn render_comparison(timings: &[StrategyTiming], identical: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<14} | {:>12} | {:>10} | {:>12}", "Strategy", "Time (s)", "Terms", "Postings");
    let _ = writeln!(out, "{}", "-".repeat(58));
    for t in timings {
        let _ = writeln!(out, "{:<14} | {:>12.3} | {:>10} | {:>12}", t.name, t.elapsed.as_secs_f64(), t.terms, t.postings);
    }
    if let [a, b] = timings {
        let (fast, slow) = (a.elapsed.min(b.elapsed).as_secs_f64(), a.elapsed.max(b.elapsed).as_secs_f64());
        let _ = writeln!(out, "Difference: {:.3} s", slow - fast);
        if fast > 0.0 {
            let _ = writeln!(out, "Ratio:      {:.2}x", slow / fast);
        }
    }
    let _ = writeln!(out, "Indexes identical: {}", if identical { "yes" } else { "NO" });
    out
}

pub fn render_blocks(report: &SpimiReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>6} | {:>8} | {:>17} | {:>10} | {:>10} | {:>10} | {:>14}", "Block", "Docs", "Doc ids", "Terms", "Postings", "ms", "Postings/s");
    let _ = writeln!(out, "{}", "-".repeat(92));
    for b in &report.blocks {
        let _ = writeln!(
            out,
            "{:>6} | {:>8} | {:>17} | {:>10} | {:>10} | {:>10.2} | {:>14.0}",
            b.block_id,
            b.docs,
            format!("{}..={}", b.first_doc, b.last_doc),
            b.terms,
            b.postings,
            b.elapsed.as_secs_f64() * 1e3,
            b.throughput()
        );
    }
    let _ = writeln!(out, "Accumulate: {:.3} s, merge: {:.3} s", report.accumulate_elapsed.as_secs_f64(), report.merge_elapsed.as_secs_f64());
    match report.slowdown() {
        Some(ratio) => { let _ = writeln!(out, "First/last block throughput: {ratio:.2}x"); }
        None => { let _ = writeln!(out, "First/last block throughput: n/a"); }
    }
    out
}

pub fn render_compression(report: &CompressionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<18} | {:>10} | {:>9} | {:>9} | {:>12} | {:>9} | {:>9}",
        "Stage", "Terms", "Δ%", "Σ%", "Postings", "Δ%", "Σ%"
    );
    let _ = writeln!(out, "{}", "-".repeat(92));
    for r in &report.rows {
        let _ = writeln!(
            out,
            "{:<18} | {:>10} | {:>9.2} | {:>9.2} | {:>12} | {:>9.2} | {:>9.2}",
            r.stage, r.terms, r.terms_delta_pct, r.terms_cumulative_pct, r.postings, r.postings_delta_pct, r.postings_cumulative_pct
        );
    }
    out
}

pub fn render_query(label: &str, query: &[String], result: &QueryResult, external: impl Fn(u32) -> Option<String>) -> String {
    let ids: Vec<String> = result.doc_ids.iter().map(|&id| external(id).unwrap_or_else(|| id.to_string())).collect();
    let mut line = format!("{label}: {} -> {} docs [{}]", query.join(" AND "), result.count(), ids.join(", "));
    if !result.absent_terms.is_empty() {
        let _ = write!(line, " (absent: {})", result.absent_terms.join(", "));
    }
    line
}
