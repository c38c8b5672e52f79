//! Logwarden - LLM-assisted system log monitor and triage.
//!
//! Pulls recent lines from the journal or a log file, strips ignored
//! lines, asks the classifier to interpret anything suspicious, suppresses
//! findings already surfaced recently, and notifies configured channels.

use anyhow::{bail, Result};
use clap::Parser;
use console::style;
use logwarden::analyzer::LlmAnalyzer;
use logwarden::filter::PatternStore;
use logwarden::history::FindingHistory;
use logwarden::notifier::Notifier;
use logwarden::pipeline::{self, RunOptions, SourceOutcome, TriagedFinding};
use logwarden::sources::{self, Source};
use logwarden::{collector, filter, fixer, history, monitor, output};
use logwarden_common::config::{config_dir, state_dir};
use logwarden_common::Config;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "logwarden")]
#[command(about = "AI-assisted system log analysis and repair", long_about = None)]
#[command(version)]
struct Cli {
    /// Log source: 'journal', a file path, 'menu', or 'all'
    #[arg(long, default_value = "journal")]
    source: String,

    /// Number of recent log lines to analyze per source
    #[arg(long, default_value_t = 50)]
    lines: usize,

    /// Classifier model (defaults to the configured model)
    #[arg(long)]
    model: Option<String>,

    /// Unattended mode: no prompts or styling, notify and record only
    #[arg(long)]
    cron: bool,

    /// List ignore patterns and exit
    #[arg(long)]
    show_ignored: bool,

    /// Audit a configuration file instead of analyzing logs
    #[arg(long, value_name = "PATH")]
    audit: Option<PathBuf>,

    /// Generate a configuration file from --prompt and save it here
    #[arg(long, value_name = "PATH")]
    generate: Option<PathBuf>,

    /// Extra instruction for audit or generation
    #[arg(long)]
    prompt: Option<String>,

    /// Monitor system health instead of analyzing logs
    #[arg(long)]
    monitor: bool,

    /// Monitoring duration (e.g. 60, 90s, 5m, 1h)
    #[arg(long, default_value = "60")]
    duration: String,

    /// Monitoring snapshot interval in seconds
    #[arg(long, default_value_t = 5)]
    interval: u64,
}

fn init_tracing(cron: bool) {
    let default = if cron { "logwarden=info" } else { "logwarden=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.cron);

    let state = state_dir();
    let mut patterns = PatternStore::load(filter::default_pattern_path(&state));

    // Pattern listing needs no credential; handle it before validation.
    if cli.show_ignored {
        if patterns.patterns().is_empty() {
            println!("No ignored patterns found.");
        } else {
            for pattern in patterns.patterns() {
                println!("{pattern}");
            }
        }
        return Ok(());
    }

    let config = Config::load();
    if let Err(e) = config.validate() {
        eprintln!("{} {e}", style("Configuration error:").red().bold());
        std::process::exit(1);
    }

    let model = cli
        .model
        .clone()
        .unwrap_or_else(|| config.classifier.default_model.clone());
    let analyzer = LlmAnalyzer::new(&config)?;

    if cli.monitor {
        return monitor_mode(&cli, &analyzer, &patterns, &model).await;
    }
    if let Some(path) = &cli.generate {
        return generate_mode(path, cli.prompt.as_deref(), &analyzer, &model).await;
    }
    if let Some(path) = &cli.audit {
        return audit_mode(path, cli.prompt.as_deref(), &analyzer, &model).await;
    }

    let selected = select_sources(&cli)?;
    let mut history = FindingHistory::load(history::default_history_path(&state));

    // Unattended runs own the pruning cadence.
    if cli.cron {
        let spare = config
            .history
            .prune_spares_dedup_window
            .then_some(config.history.dedup_window_hours);
        if let Err(e) = history.prune(config.history.retention_days, spare) {
            warn!("History pruning failed: {e:#}");
        }
    }

    let notifier = Notifier::new(&config.notify);
    let opts = RunOptions {
        lines: cli.lines,
        model,
        dedup_window_hours: config.history.dedup_window_hours,
    };

    for (idx, source) in selected.iter().enumerate() {
        if !cli.cron {
            output::rule(&format!("Checking source: {}", source.name));
            println!("{}", style(source.spec.location()).dim());
        }

        let bar = (!cli.cron).then(|| output::spinner(&format!("Analyzing {}...", source.name)));
        let outcome = pipeline::process_source(
            source,
            &opts,
            &analyzer,
            &patterns,
            &mut history,
            &notifier,
        )
        .await;
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }

        if !cli.cron {
            output::print_outcome(source, &outcome);
            if let SourceOutcome::Findings { items, .. } = &outcome {
                interactive_triage(items, &mut patterns);
            }
            if selected.len() > 1 && idx + 1 < selected.len() {
                output::prompt_line("Press Enter to continue to the next source", "");
            }
        }
    }

    if !cli.cron {
        println!("\n{}", style("All checks complete.").green().bold());
    }
    Ok(())
}

/// Turn `--source` into the list of sources for this run.
fn select_sources(cli: &Cli) -> Result<Vec<Source>> {
    let user_file = config_dir().join("sources.json");
    match cli.source.as_str() {
        "all" => Ok(sources::known_sources(&user_file)),
        "menu" => {
            if cli.cron {
                bail!("--source menu cannot be combined with --cron");
            }
            let known = sources::known_sources(&user_file);
            println!("{}", style("Available log sources:").cyan().bold());
            for (i, source) in known.iter().enumerate() {
                println!(
                    "{}. {} {}",
                    i + 1,
                    source.name,
                    style(format!("({})", source.spec.location())).dim()
                );
            }
            let choice = output::prompt_line("Select a log source", "1");
            let index: usize = match choice.parse() {
                Ok(n) if (1..=known.len()).contains(&n) => n,
                _ => bail!("invalid selection: {choice}"),
            };
            Ok(vec![known[index - 1].clone()])
        }
        arg => Ok(vec![sources::resolve(arg)]),
    }
}

/// Offer fixes and ignore patterns for the findings of one source.
fn interactive_triage(items: &[TriagedFinding], patterns: &mut PatternStore) {
    for item in items {
        let finding = &item.finding;
        let mut fix_applied = false;

        if let Some(fix) = &finding.suggested_fix {
            if fix.command.is_some() {
                fix_applied = fixer::apply_fix(fix);
            } else if !fix.description.is_empty() {
                println!("{} {}", style("Suggestion:").blue().bold(), fix.description);
                println!("{}", style("No automated command available for this issue.").dim());
            }
        }

        if !fix_applied && output::confirm("Ignore this error in the future?", false) {
            let default = finding.log_entry.trim();
            let pattern = output::prompt_line("Enter pattern to ignore", default);
            match patterns.add(&pattern) {
                Ok(true) => println!("{}", style("Added to ignore list.").green()),
                Ok(false) => println!("{}", style("Pattern already present.").dim()),
                Err(e) => println!("{} {e:#}", style("Could not save pattern:").red()),
            }
        }
    }
}

/// `--monitor`: specs, sampled metrics, recent journal context, diagnosis.
async fn monitor_mode(
    cli: &Cli,
    analyzer: &LlmAnalyzer,
    patterns: &PatternStore,
    model: &str,
) -> Result<()> {
    let duration_secs = monitor::parse_duration(&cli.duration)?;

    let specs = monitor::system_specs();
    output::rule("System specifications");
    println!(
        "OS: {} {}\nCPU: {} cores @ {} MHz\nRAM: {} GB\nDisk: {} GB free / {} GB total",
        specs.os,
        specs.os_release,
        specs.cpu_count,
        specs.cpu_freq_mhz,
        specs.memory_total_gb,
        specs.disk_free_gb,
        specs.disk_total_gb
    );

    println!(
        "{}",
        style(format!(
            "Monitoring system for {duration_secs} seconds... (Ctrl-C stops early, data is kept)"
        ))
        .bold()
    );
    let metrics = monitor::sample_metrics(duration_secs, cli.interval).await;
    if metrics.interrupted {
        println!("{}", style("Interrupted; analyzing collected data...").yellow());
    }
    println!("{}", style(format!("Collected {} data points.", metrics.samples.len())).dim());

    // Recent journal lines give the diagnosis context; a missing journal
    // just means less context.
    let logs = collector::journal_logs(50).unwrap_or_default();
    let logs = patterns.filter(&logs);

    let bar = output::spinner("Diagnosing system health...");
    let payload = monitor::health_payload(&specs, &metrics, &logs);
    let report = analyzer.analyze_health(&payload, model).await;
    bar.finish_and_clear();

    output::print_health(&report);
    Ok(())
}

/// `--audit PATH`: full-file read plus audit prompt.
async fn audit_mode(
    path: &PathBuf,
    prompt: Option<&str>,
    analyzer: &LlmAnalyzer,
    model: &str,
) -> Result<()> {
    output::rule("Analyzing configuration");
    println!("{}", style(path.display().to_string()).dim());

    let content = match collector::read_file(path) {
        Ok(content) => content,
        Err(e) => bail!("{e}"),
    };

    let bar = output::spinner("Auditing configuration...");
    let report = analyzer
        .analyze_config(&content, &path.display().to_string(), model, prompt)
        .await;
    bar.finish_and_clear();

    output::print_audit(&report);
    Ok(())
}

/// `--generate PATH --prompt "..."`: preview and save generated content.
async fn generate_mode(
    path: &PathBuf,
    prompt: Option<&str>,
    analyzer: &LlmAnalyzer,
    model: &str,
) -> Result<()> {
    let Some(prompt) = prompt else {
        bail!("--generate requires --prompt");
    };

    output::rule("Generating configuration");
    println!("{}", style(prompt).dim());

    let bar = output::spinner(&format!("Generating content for {}...", path.display()));
    let generated = analyzer.generate_file(prompt, model).await;
    bar.finish_and_clear();
    let generated = generated?;

    println!("\n{}\n", generated.content);

    if !output::confirm(&format!("Save this content to {}?", path.display()), false) {
        println!("{}", style("Save cancelled.").yellow());
        return Ok(());
    }
    if path.exists()
        && !output::confirm(
            &format!("File {} already exists. Overwrite?", path.display()),
            false,
        )
    {
        println!("{}", style("Save cancelled.").yellow());
        return Ok(());
    }

    std::fs::write(path, &generated.content)?;
    println!("{}", style(format!("File saved to {}", path.display())).green().bold());
    Ok(())
}
