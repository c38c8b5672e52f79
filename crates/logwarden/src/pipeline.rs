//! The per-source pipeline.
//!
//! For each named source: read, strip ignored lines, gate on trigger
//! vocabulary, classify, dedup against the history, dispatch
//! notifications. Sources run strictly sequentially and share one pattern
//! store and one history; a failure in one source never aborts the next.

use crate::analyzer::Classifier;
use crate::filter::{contains_trigger, PatternStore};
use crate::history::FindingHistory;
use crate::notifier::Notifier;
use crate::sources::Source;
use logwarden_common::Finding;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Per-run knobs shared by every source.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// How many recent lines to pull from each source.
    pub lines: usize,
    /// Classifier model identifier.
    pub model: String,
    /// Findings recorded within this many hours are suppressed.
    pub dedup_window_hours: i64,
}

/// One finding after dedup and dispatch.
#[derive(Debug)]
pub struct TriagedFinding {
    pub finding: Finding,
    /// Seen within the dedup window; dispatch was skipped.
    pub duplicate: bool,
    /// Per-channel delivery outcome; empty for duplicates and for runs
    /// with no configured channels.
    pub delivery: BTreeMap<String, bool>,
}

/// What happened to one source this run.
#[derive(Debug)]
pub enum SourceOutcome {
    /// The source could not be read; reason attached, source skipped.
    Unavailable(String),
    /// The source had no content at all.
    Empty,
    /// Every line matched an ignore pattern.
    AllFiltered { collected: usize },
    /// No trigger vocabulary present; the classifier was not consulted.
    NoTriggers { collected: usize, filtered_out: usize },
    /// The classifier saw nothing wrong.
    Clean { summary: String },
    /// Issues were found and triaged.
    Findings {
        summary: String,
        filtered_out: usize,
        items: Vec<TriagedFinding>,
    },
}

impl SourceOutcome {
    /// Count of findings that were new this run.
    pub fn new_findings(&self) -> usize {
        match self {
            SourceOutcome::Findings { items, .. } => {
                items.iter().filter(|i| !i.duplicate).count()
            }
            _ => 0,
        }
    }
}

/// Run the full pipeline for one source.
pub async fn process_source<C: Classifier>(
    source: &Source,
    opts: &RunOptions,
    classifier: &C,
    patterns: &PatternStore,
    history: &mut FindingHistory,
    notifier: &Notifier,
) -> SourceOutcome {
    // 1. Collect.
    let raw = match source.spec.read(opts.lines) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Skipping {}: {e}", source.name);
            return SourceOutcome::Unavailable(e.to_string());
        }
    };
    if raw.trim().is_empty() {
        return SourceOutcome::Empty;
    }
    let collected = raw.lines().count();

    // 2. Strip ignored lines.
    let filtered = patterns.filter(&raw);
    if filtered.trim().is_empty() {
        return SourceOutcome::AllFiltered { collected };
    }
    let filtered_out = collected - filtered.lines().count();

    // 3. Keyword gate: don't spend a classifier call on quiet logs.
    if !contains_trigger(&filtered) {
        return SourceOutcome::NoTriggers {
            collected,
            filtered_out,
        };
    }

    // 4. Classify.
    let report = classifier.analyze_logs(&filtered, &opts.model).await;

    // 5. Clean host.
    if !report.has_issues {
        return SourceOutcome::Clean {
            summary: report.summary,
        };
    }

    // 6. Dedup and dispatch.
    let mut items = Vec::with_capacity(report.findings.len());
    for finding in report.findings {
        let duplicate = history.is_duplicate(&finding.log_entry, opts.dedup_window_hours);
        let delivery = if duplicate {
            info!(
                "Duplicate finding skipped: {}",
                finding.log_entry.chars().take(50).collect::<String>()
            );
            BTreeMap::new()
        } else {
            info!("New {} finding in {}", finding.severity, source.name);
            let delivery = notifier.dispatch(&finding).await;
            if let Err(e) =
                history.add_entry(&finding.log_entry, finding.severity, finding.summary())
            {
                warn!("Could not persist history entry: {e:#}");
            }
            delivery
        };
        items.push(TriagedFinding {
            finding,
            duplicate,
            delivery,
        });
    }

    SourceOutcome::Findings {
        summary: report.summary,
        filtered_out,
        items,
    }
}

/// Run every source in order, collecting outcomes. One bad source never
/// stops the rest.
pub async fn run_sources<C: Classifier>(
    sources: &[Source],
    opts: &RunOptions,
    classifier: &C,
    patterns: &PatternStore,
    history: &mut FindingHistory,
    notifier: &Notifier,
) -> Vec<(Source, SourceOutcome)> {
    let mut outcomes = Vec::with_capacity(sources.len());
    for source in sources {
        let outcome =
            process_source(source, opts, classifier, patterns, history, notifier).await;
        outcomes.push((source.clone(), outcome));
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceSpec;
    use logwarden_common::config::NotifyConfig;
    use logwarden_common::{AnalysisReport, Severity};
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted classifier: returns a canned report and counts calls.
    struct FakeClassifier {
        report: AnalysisReport,
        calls: AtomicUsize,
    }

    impl FakeClassifier {
        fn new(report: AnalysisReport) -> Self {
            Self {
                report,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Classifier for FakeClassifier {
        async fn analyze_logs(&self, _logs: &str, _model: &str) -> AnalysisReport {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.report.clone()
        }
    }

    fn disk_full_report() -> AnalysisReport {
        AnalysisReport {
            has_issues: true,
            summary: "Disk trouble".to_string(),
            findings: vec![Finding {
                log_entry: "2024-01-01 ERROR disk full".to_string(),
                severity: Severity::Critical,
                explanation: "The disk is full".to_string(),
                suggested_fix: None,
            }],
        }
    }

    fn temp_source(dir: &tempfile::TempDir, content: &str) -> Source {
        let path = dir.path().join("app.log");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{content}").unwrap();
        Source {
            name: "Test Log".to_string(),
            spec: SourceSpec::File(path),
        }
    }

    fn opts() -> RunOptions {
        RunOptions {
            lines: 50,
            model: "test/model".to_string(),
            dedup_window_hours: 24,
        }
    }

    fn fixtures(dir: &tempfile::TempDir) -> (PatternStore, FindingHistory, Notifier) {
        (
            PatternStore::load(dir.path().join("ignore_patterns.json")),
            FindingHistory::load(dir.path().join("history.json")),
            Notifier::new(&NotifyConfig::default()),
        )
    }

    #[tokio::test]
    async fn first_run_records_second_run_skips() {
        let dir = tempfile::tempdir().unwrap();
        let source = temp_source(&dir, "2024-01-01 ERROR disk full\n2024-01-01 INFO ok\n");
        let (patterns, mut history, notifier) = fixtures(&dir);
        let classifier = FakeClassifier::new(disk_full_report());

        let outcome =
            process_source(&source, &opts(), &classifier, &patterns, &mut history, &notifier)
                .await;
        match &outcome {
            SourceOutcome::Findings { items, .. } => {
                assert_eq!(items.len(), 1);
                assert!(!items[0].duplicate);
            }
            other => panic!("expected findings, got {other:?}"),
        }
        assert_eq!(outcome.new_findings(), 1);
        assert_eq!(history.entries().len(), 1);

        // Identical second run inside the window: duplicate, nothing recorded.
        let outcome =
            process_source(&source, &opts(), &classifier, &patterns, &mut history, &notifier)
                .await;
        match &outcome {
            SourceOutcome::Findings { items, .. } => {
                assert!(items[0].duplicate);
                assert!(items[0].delivery.is_empty());
            }
            other => panic!("expected findings, got {other:?}"),
        }
        assert_eq!(outcome.new_findings(), 0);
        assert_eq!(history.entries().len(), 1);
    }

    #[tokio::test]
    async fn quiet_logs_never_reach_the_classifier() {
        let dir = tempfile::tempdir().unwrap();
        let source = temp_source(&dir, "all services nominal\nheartbeat ok\n");
        let (patterns, mut history, notifier) = fixtures(&dir);
        let classifier = FakeClassifier::new(disk_full_report());

        let outcome =
            process_source(&source, &opts(), &classifier, &patterns, &mut history, &notifier)
                .await;
        assert!(matches!(outcome, SourceOutcome::NoTriggers { .. }));
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn fully_ignored_batch_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let source = temp_source(&dir, "ERROR known noisy line\n");
        let (mut patterns, mut history, notifier) = fixtures(&dir);
        patterns.add("known noisy line").unwrap();
        let classifier = FakeClassifier::new(disk_full_report());

        let outcome =
            process_source(&source, &opts(), &classifier, &patterns, &mut history, &notifier)
                .await;
        assert!(matches!(outcome, SourceOutcome::AllFiltered { collected: 1 }));
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn missing_source_is_unavailable_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = Source {
            name: "Ghost".to_string(),
            spec: SourceSpec::File(dir.path().join("missing.log")),
        };
        let (patterns, mut history, notifier) = fixtures(&dir);
        let classifier = FakeClassifier::new(disk_full_report());

        let outcome =
            process_source(&source, &opts(), &classifier, &patterns, &mut history, &notifier)
                .await;
        assert!(matches!(outcome, SourceOutcome::Unavailable(_)));
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn clean_report_stops_before_history() {
        let dir = tempfile::tempdir().unwrap();
        let source = temp_source(&dir, "WARN transient blip recovered\n");
        let (patterns, mut history, notifier) = fixtures(&dir);
        let classifier = FakeClassifier::new(AnalysisReport {
            has_issues: false,
            summary: "Nothing to see".to_string(),
            findings: vec![],
        });

        let outcome =
            process_source(&source, &opts(), &classifier, &patterns, &mut history, &notifier)
                .await;
        assert!(matches!(outcome, SourceOutcome::Clean { .. }));
        assert!(history.entries().is_empty());
    }

    #[tokio::test]
    async fn one_bad_source_does_not_stop_the_next() {
        let dir = tempfile::tempdir().unwrap();
        let good = temp_source(&dir, "ERROR disk full\n");
        let bad = Source {
            name: "Ghost".to_string(),
            spec: SourceSpec::File(dir.path().join("missing.log")),
        };
        let (patterns, mut history, notifier) = fixtures(&dir);
        let classifier = FakeClassifier::new(disk_full_report());

        let outcomes = run_sources(
            &[bad, good],
            &opts(),
            &classifier,
            &patterns,
            &mut history,
            &notifier,
        )
        .await;
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0].1, SourceOutcome::Unavailable(_)));
        assert!(matches!(outcomes[1].1, SourceOutcome::Findings { .. }));
    }
}
