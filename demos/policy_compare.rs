#![allow(clippy::uninlined_format_args)]

use comfy_table::{
    Cell, CellAlignment, ContentArrangement, Table,
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};
use eos_bloom_rs::{
    HarnessSettings, HarnessSettingsBuilder, TrialReport, compare_policies,
};
use std::time::Duration;

// Trial configuration
const ROWS: u64 = 30_000;
const DISCONNECT_INTERVALS: [u64; 3] = [10_000, 5_000, 1_000];
const TARGET_FPRS: [f64; 2] = [0.01, 0.05];

fn add_row(table: &mut Table, every: u64, fpr: f64, report: &TrialReport) {
    table.add_row(vec![
        Cell::new(report.policy.to_string()),
        Cell::new(format!("{}", every)),
        Cell::new(format!("{:.2}%", fpr * 100.0)),
        Cell::new(format!("{}", report.totals.duplicates))
            .set_alignment(CellAlignment::Right),
        Cell::new(format!("{}", report.totals.false_positives))
            .set_alignment(CellAlignment::Right),
        Cell::new(format!("{}", report.totals.false_negatives))
            .set_alignment(CellAlignment::Right),
        Cell::new(format!("{:.3}%", report.observed_false_positive_rate() * 100.0))
            .set_alignment(CellAlignment::Right),
        Cell::new(format!("{} ms", report.elapsed_ms))
            .set_alignment(CellAlignment::Right),
    ]);
}

fn settings(every: u64, fpr: f64) -> Result<HarnessSettings, Box<dyn std::error::Error>> {
    Ok(HarnessSettingsBuilder::default()
        .row_count(ROWS)
        .disconnect_every(every)
        .bloom_capacity(ROWS as usize)
        .bloom_false_positive_rate(fpr)
        .flush_interval(Duration::from_secs(10))
        .build()?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║     Offset Commit Policies - Redelivery Comparison        ║");
    println!("╚═══════════════════════════════════════════════════════════╝\n");

    println!("Configuration:");
    println!("  • Rows per trial: {}", ROWS);
    println!("  • Disconnect intervals: {:?}", DISCONNECT_INTERVALS);
    println!("  • Target FPRs: {:?}\n", TARGET_FPRS);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Policy").set_alignment(CellAlignment::Center),
            Cell::new("Disconnect Every").set_alignment(CellAlignment::Center),
            Cell::new("Target FPR").set_alignment(CellAlignment::Center),
            Cell::new("Duplicates").set_alignment(CellAlignment::Center),
            Cell::new("False Positives").set_alignment(CellAlignment::Center),
            Cell::new("False Negatives").set_alignment(CellAlignment::Center),
            Cell::new("Observed FPR").set_alignment(CellAlignment::Center),
            Cell::new("Elapsed").set_alignment(CellAlignment::Center),
        ]);

    let mut violations = Vec::new();
    for &every in &DISCONNECT_INTERVALS {
        for &fpr in &TARGET_FPRS {
            print!("Running every={}, fpr={:.2}%... ", every, fpr * 100.0);
            let comparison = compare_policies(&settings(every, fpr)?).await?;
            println!("Done!");

            add_row(&mut table, every, fpr, &comparison.periodic);
            add_row(&mut table, every, fpr, &comparison.immediate);
            violations.extend(comparison.check_expectations());
        }
    }

    println!("\n{}", table);

    if violations.is_empty() {
        println!("\nAll expectations met.");
    } else {
        println!("\nViolated expectations:");
        for violation in &violations {
            println!("  • {}", violation);
        }
    }
    Ok(())
}
