use super::RunReport;
use crate::transaction::{FatalError, Resolution};
use colored::Colorize;
use miette::Result;

/// Terminal reporter with colored output
pub struct TerminalReporter {
    /// Dynamic import sites listed before collapsing to a count
    max_dynamic_sites: usize,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self {
            max_dynamic_sites: 20,
        }
    }

    pub fn report(&self, report: &RunReport) -> Result<()> {
        println!();
        println!(
            "{}",
            format!(
                "Scanned {} files, {} declared dependencies",
                report.files_scanned, report.declared
            )
            .bold()
        );
        println!();

        self.print_usage(report);
        self.print_transactions(report);
        self.print_errors(report);
        self.print_dynamic_imports(report);

        println!("{} {}", "Note:".dimmed(), report.caveat().dimmed());
        println!();

        self.print_summary(report);
        Ok(())
    }

    fn print_usage(&self, report: &RunReport) {
        if report.unused.is_empty() {
            println!("{}", "No unused dependencies found!".green().bold());
            println!();
            return;
        }

        println!(
            "{}",
            format!("Found {} unused dependencies:", report.unused.len())
                .yellow()
                .bold()
        );
        for record in &report.unused {
            let retained = if report.retained.contains(&record.name) {
                " [RETAINED]".cyan().to_string()
            } else {
                String::new()
            };
            println!(
                "  {} {} {}{}",
                "●".yellow(),
                record.name.white(),
                format!("{} ({})", record.declared_range, record.section).dimmed(),
                retained
            );
        }
        println!();

        if !report.used.is_empty() {
            println!("{}", "Used dependencies:".dimmed());
            for used in &report.used {
                println!(
                    "  {} {}",
                    used.name,
                    format!("{} references in {} files", used.references, used.files).dimmed()
                );
            }
            println!();
        }
    }

    fn print_transactions(&self, report: &RunReport) {
        if report.dry_run {
            println!("{}", "Dry run - no dependencies were removed.".yellow());
            println!();
            return;
        }
        if report.outcomes.is_empty() && report.fatal.is_none() {
            return;
        }

        println!("{}", "Removal transactions:".cyan().bold());
        for outcome in &report.outcomes {
            let tx = &outcome.transaction;
            match &outcome.resolution {
                Resolution::Committed => println!(
                    "  {} {} {}",
                    "✓".green(),
                    tx.dependency_name,
                    format!("removed on {}", tx.branch_name).dimmed()
                ),
                Resolution::Reverted { reason } => println!(
                    "  {} {} {} {}",
                    "↺".yellow(),
                    tx.dependency_name,
                    "reverted:".yellow(),
                    reason
                ),
                Resolution::Failed { reason } => println!(
                    "  {} {} {} {}",
                    "✗".red(),
                    tx.dependency_name,
                    "not attempted:".red(),
                    reason
                ),
            }
        }
        if !report.skipped.is_empty() {
            println!(
                "  {} {}",
                "Skipped:".dimmed(),
                report.skipped.join(", ").dimmed()
            );
        }
        println!();
    }

    fn print_errors(&self, report: &RunReport) {
        if report.errors.is_empty() {
            return;
        }

        println!("{}", format!("{} problems queued:", report.errors.len()).red().bold());
        for item in &report.errors {
            let id = item
                .transaction_id
                .map(|id| format!(" #{}", id))
                .unwrap_or_default();
            println!(
                "  [{}{}] {}: {}",
                item.kind.code().dimmed(),
                id.dimmed(),
                item.subject,
                item.message
            );
        }
        println!();
    }

    fn print_dynamic_imports(&self, report: &RunReport) {
        if report.dynamic_imports.is_empty() {
            return;
        }

        println!(
            "{}",
            format!(
                "{} dynamic imports could not be resolved; unused results may include false positives",
                report.dynamic_imports.len()
            )
            .yellow()
        );
        for site in report.dynamic_imports.iter().take(self.max_dynamic_sites) {
            println!(
                "  {} {}",
                format!("{}:{}", site.source_file.display(), site.line_number).dimmed(),
                site.expression
            );
        }
        let hidden = report.dynamic_imports.len().saturating_sub(self.max_dynamic_sites);
        if hidden > 0 {
            println!("  {}", format!("... and {} more", hidden).dimmed());
        }
        println!();
    }

    fn print_summary(&self, report: &RunReport) {
        println!("{}", "─".repeat(60).dimmed());

        let committed = report
            .outcomes
            .iter()
            .filter(|o| o.resolution == Resolution::Committed)
            .count();
        let reverted = report
            .outcomes
            .iter()
            .filter(|o| matches!(o.resolution, Resolution::Reverted { .. }))
            .count();

        let mut parts = vec![format!("{} unused", report.unused.len()).yellow().to_string()];
        if !report.retained.is_empty() {
            parts.push(format!("{} retained", report.retained.len()).cyan().to_string());
        }
        if !report.dry_run {
            parts.push(format!("{} removed", committed).green().to_string());
            if reverted > 0 {
                parts.push(format!("{} reverted", reverted).yellow().to_string());
            }
        }
        println!("Summary: {}", parts.join(", "));

        if report.cancelled {
            println!("{}", "Run was cancelled before finishing.".yellow().bold());
        }
        if let Some(fatal) = &report.fatal {
            println!("{} {}", "FATAL".red().bold(), fatal);
            if let FatalError::RevertFailure { .. } = fatal {
                println!(
                    "{}",
                    "The working tree may be inconsistent; inspect it before running again.".red()
                );
            }
        }
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}
