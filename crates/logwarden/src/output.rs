//! Interactive terminal rendering.
//!
//! Everything here is presentation: the pipeline never prints. Unattended
//! runs skip this module entirely and rely on tracing output.

use crate::pipeline::{SourceOutcome, TriagedFinding};
use crate::sources::Source;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use logwarden_common::{ConfigAuditReport, HealthReport, Severity};
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// Section rule with a title.
pub fn rule(title: &str) {
    println!("\n{} {}", style("──").dim(), style(title).cyan().bold());
}

/// Spinner shown while a blocking stage (collection, classification) runs.
pub fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::Critical | Severity::Error => severity.to_string().red().bold().to_string(),
        Severity::Warning => severity.to_string().yellow().to_string(),
        Severity::Info => severity.to_string().cyan().to_string(),
    }
}

/// Render the outcome of one source in an interactive run.
pub fn print_outcome(source: &Source, outcome: &SourceOutcome) {
    match outcome {
        SourceOutcome::Unavailable(reason) => {
            println!("{}", style(format!("Skipped: {reason}")).red());
        }
        SourceOutcome::Empty => {
            println!("{}", style(format!("No logs found in {}.", source.name)).yellow());
        }
        SourceOutcome::AllFiltered { collected } => {
            println!(
                "{}",
                style(format!(
                    "All {collected} lines in {} matched ignore patterns. No issues.",
                    source.name
                ))
                .green()
            );
        }
        SourceOutcome::NoTriggers { collected, filtered_out } => {
            if *filtered_out > 0 {
                println!("{}", style(format!("Filtered {filtered_out} ignored lines.")).dim());
            }
            println!(
                "{}",
                style(format!(
                    "No relevant error keywords in {collected} lines from {}. Skipping analysis.",
                    source.name
                ))
                .green()
            );
        }
        SourceOutcome::Clean { summary } => {
            println!(
                "{}",
                style(format!("No significant issues found in {}.", source.name)).green()
            );
            if !summary.is_empty() {
                println!("{}", style(summary).dim());
            }
        }
        SourceOutcome::Findings { summary, filtered_out, items } => {
            if *filtered_out > 0 {
                println!("{}", style(format!("Filtered {filtered_out} ignored lines.")).dim());
            }
            println!("{}", style(format!("Issues detected in {}", source.name)).yellow().bold());
            if !summary.is_empty() {
                println!("{summary}");
            }
            for (i, item) in items.iter().enumerate() {
                print_finding(i + 1, item);
            }
        }
    }
}

fn print_finding(number: usize, item: &TriagedFinding) {
    let finding = &item.finding;
    println!(
        "\n{} {} ({})",
        style(format!("{number}.")).bold(),
        style("Issue").bold(),
        severity_label(finding.severity)
    );
    println!("  {} {}", style("Log:").dim(), finding.log_entry);
    println!("  {} {}", style("Explanation:").bold(), finding.explanation);
    if item.duplicate {
        println!("  {}", style("Already reported recently; notifications skipped.").dim());
    } else if !item.delivery.is_empty() {
        let delivered: Vec<String> = item
            .delivery
            .iter()
            .map(|(channel, ok)| format!("{channel}={}", if *ok { "sent" } else { "failed" }))
            .collect();
        println!("  {} {}", style("Notified:").dim(), delivered.join(", "));
    }
}

/// Render a configuration audit.
pub fn print_audit(report: &ConfigAuditReport) {
    if !report.summary.is_empty() {
        println!("{}", report.summary);
    }
    if report.findings.is_empty() {
        println!("{}", style("No issues found. Configuration looks good.").green());
        return;
    }
    for (i, finding) in report.findings.iter().enumerate() {
        println!(
            "\n{} {} ({})",
            style(format!("{}.", i + 1)).bold(),
            style(&finding.issue).bold(),
            severity_label(finding.severity)
        );
        if let Some(line) = finding.line_number {
            println!("   {} {line}", style("Line:").dim());
        }
        if let Some(parameter) = &finding.parameter {
            println!("   {} {parameter}", style("Parameter:").dim());
        }
        println!("   {} {}", style("Suggestion:").bold(), finding.suggestion);
        if let Some(value) = &finding.suggested_value {
            println!("   {} {value}", style("Recommended value:").blue());
        }
    }
}

/// Render a health diagnosis.
pub fn print_health(report: &HealthReport) {
    let status = if report.overall_status == "Healthy" {
        style(&report.overall_status).green().bold()
    } else {
        style(&report.overall_status).red().bold()
    };
    println!("\n{status}");
    if !report.summary.is_empty() {
        println!("{}", report.summary);
    }
    for finding in &report.findings {
        println!(
            "\n{} {} ({})",
            style("●").bold(),
            style(&finding.issue).bold(),
            severity_label(finding.severity)
        );
        println!("  {} {}", style("Evidence:").dim(), finding.evidence);
        println!("  {} {}", style("Recommendation:").bold(), finding.recommendation);
    }
}

/// Yes/no prompt. Returns `default` on empty input or a closed stdin.
pub fn confirm(question: &str, default: bool) -> bool {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print!("{} {hint} ", style(question).bold());
    let _ = io::stdout().flush();

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return default;
    }
    match line.trim().to_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}

/// Free-text prompt with a default.
pub fn prompt_line(question: &str, default: &str) -> String {
    if default.is_empty() {
        print!("{}: ", style(question).bold());
    } else {
        print!("{} [{}]: ", style(question).bold(), style(default).dim());
    }
    let _ = io::stdout().flush();

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return default.to_string();
    }
    let trimmed = line.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}
