//! Summary tables printed to stderr after each action.

use refract_core::{IndexReport, PrefixReport, StageReport};

const RULE: &str = "  ==============================================================";
const THIN: &str = "  --------------------------------------------------------------";

/// Print processed/skipped/failed counts for one or more stage runs.
pub fn print_stages(reports: &[StageReport]) {
    eprintln!();
    eprintln!("{RULE}");
    eprintln!(
        "    {:<22} {:>9} {:>9} {:>9} {:>8}",
        "Stage", "Processed", "Skipped", "Failed", "Time"
    );
    eprintln!("{THIN}");
    for report in reports {
        eprintln!("{}", stage_row(report));
    }
    eprintln!("{RULE}");

    for report in reports {
        if let Some(index) = &report.index {
            print_index(index);
        }
        if report.failed() > 0 {
            eprintln!("  {} task(s) failed during {}:", report.failed(), report.stage.label());
            for failure in &report.run.failures {
                eprintln!(
                    "   - {}: {}",
                    failure.identifier,
                    failure.message.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }
}

fn stage_row(report: &StageReport) -> String {
    let label = report.stage.label();
    if report.root_missing {
        return format!("    {:<22} missing: {}", label, report.root.display());
    }
    format!(
        "    {:<22} {:>9} {:>9} {:>9} {:>7.1}s",
        label,
        report.processed(),
        report.skipped,
        report.failed(),
        report.run.elapsed.as_secs_f64()
    )
}

/// Print the outcome of a prefixing pass.
pub fn print_prefix(report: &PrefixReport) {
    eprintln!();
    if report.root_missing {
        eprintln!("  Output directory does not exist; nothing to prefix.");
        return;
    }
    eprintln!(
        "  Prefixing completed. Renamed: {}, already prefixed: {}, collisions/errors: {}",
        report.renamed, report.already_prefixed, report.collisions
    );
}

/// Print where the index was written.
pub fn print_index(report: &IndexReport) {
    eprintln!(
        "  Metadata index written to {} ({} items, {} skipped).",
        report.path.display(),
        report.entries,
        report.skipped
    );
}
