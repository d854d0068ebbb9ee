//! Terminal output helpers shared by the CLI subcommands. Kept separate
//! from the pipeline/diff/pull logic so those stay pure and testable
//! without a terminal attached.

use colored::Colorize;

use crate::diff::DiffReport;
use crate::pipeline::ExportReport;

pub fn print_export_report(report: &ExportReport) {
    let verb = if report.dry_run { "would write" } else { "wrote" };
    println!(
        "{} {} resource(s) to {} ({} file(s) {})",
        "export".green().bold(),
        report.exported_keys.len(),
        report.client_id,
        report.files.len(),
        verb
    );
    for file in &report.files {
        println!("  {} {}", "·".dimmed(), file.relative_path);
    }
}

pub fn print_diff_report(client_id: &str, report: &DiffReport) {
    if report.is_clean() {
        println!("{} {} is clean", "diff".green().bold(), client_id);
        return;
    }

    println!("{} {}", "diff".yellow().bold(), client_id);
    for key in &report.source_drift {
        println!("  {} {key}", "SOURCE DRIFT:".yellow());
    }
    for entry in &report.output_drift {
        println!("  {} {}", "OUTPUT DRIFT:".red(), entry.relative_path);
        for line in entry.unified_diff.lines() {
            println!("    {line}");
        }
    }
    for key in &report.new_resources {
        println!("  {} {key}", "NEW:".cyan());
    }
    for key in &report.orphans {
        println!("  {} {key}", "ORPHAN:".magenta());
    }
}

pub fn print_pull_report(client_id: &str, patch_path: &std::path::Path, summary_path: &std::path::Path) {
    println!(
        "{} {}: patch {}, summary {}",
        "pull".green().bold(),
        client_id,
        patch_path.display(),
        summary_path.display()
    );
}
