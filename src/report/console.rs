//! Console output: fixed-width boxed summary + capacity guidance.
//!
//! CPU lines (with 100% = 1 logical core conversion) appear only when CPU data exists.

use crate::analysis::summary::AggregateStats;
use crate::report::chart::format_clock;

const INNER_WIDTH: usize = 58;
const LABEL_WIDTH: usize = 24;

fn border(left: char, right: char) -> String {
    format!("{}{}{}", left, "─".repeat(INNER_WIDTH), right)
}

fn row(text: &str) -> String {
    format!("│ {:<width$} │", text, width = INNER_WIDTH - 2)
}

fn stat_row(label: &str, value: String) -> String {
    row(&format!("{:<lw$}{}", label, value, lw = LABEL_WIDTH))
}

fn cores(percent: f64) -> f64 {
    percent / 100.0
}

fn to_block(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Boxed statistics block, ready to print.
pub fn render_summary(summary: &AggregateStats) -> String {
    let mut lines = vec![
        border('┌', '┐'),
        row("LOAD TEST SUMMARY"),
        border('├', '┤'),
        stat_row("Max concurrency", format!("{:.0} VUs", summary.max_concurrency)),
        stat_row("P95 latency (min)", format!("{:.2} ms", summary.latency.min)),
        stat_row("P95 latency (avg)", format!("{:.2} ms", summary.latency.mean)),
        stat_row("P95 latency (max)", format!("{:.2} ms", summary.latency.max)),
    ];

    if summary.has_cpu() {
        let cpu = &summary.cpu;
        for (label, value) in [("CPU (min)", cpu.min), ("CPU (avg)", cpu.mean), ("CPU (max)", cpu.max)] {
            lines.push(stat_row(
                label,
                format!("{:.2} % ({:.2} cores)", value, cores(value)),
            ));
        }
    }

    if let Some(inf) = &summary.inflection {
        lines.push(border('├', '┤'));
        lines.push(row("Latency inflection (P95 > 2x baseline)"));
        lines.push(stat_row("  at", format_clock(inf.start_ms)));
        lines.push(stat_row(
            "  P95 / baseline",
            format!("{:.2} ms / {:.2} ms", inf.p95, inf.baseline_p95),
        ));
        if let Some(c) = inf.concurrency {
            lines.push(stat_row("  concurrency", format!("{:.0} VUs", c)));
        }
    }

    lines.push(border('└', '┘'));
    to_block(lines)
}

/// Linear scaling estimate: `prod_cores / local_cores * concurrency`.
pub fn estimate_production_concurrency(prod_cores: f64, local_cores: f64, concurrency: f64) -> Option<f64> {
    (local_cores > 0.0 && prod_cores > 0.0).then(|| prod_cores / local_cores * concurrency)
}

/// Freeform guidance for translating the local result to production capacity.
pub fn render_guidance(summary: &AggregateStats, prod_cores: Option<f64>, local_cores: f64) -> String {
    let mut lines: Vec<String> = [
        "Correlating with production (approximation only):",
        "  Find the concurrency where P95 latency starts to climb (the inflection point).",
        "  estimated prod concurrency ≈ (prod cores / local cores) × local concurrency at inflection",
        "  Linear scaling ignores I/O, locks and downstream limits; validate against production.",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    let inflection_vus = summary.inflection.and_then(|i| i.concurrency);
    match (prod_cores, inflection_vus) {
        (Some(prod), Some(vus)) => {
            if let Some(est) = estimate_production_concurrency(prod, local_cores, vus) {
                lines.push(format!(
                    "  ({:.0} / {:.0}) × {:.0} VUs ≈ {:.0} VUs in production",
                    prod, local_cores, vus, est
                ));
            }
        }
        (Some(_), None) => lines.push(format!(
            "  No inflection detected; max observed concurrency was {:.0} VUs.",
            summary.max_concurrency
        )),
        (None, _) => {}
    }
    to_block(lines)
}
