//! End-to-end pipeline harness.
//!
//! Drives the real pipeline against temp-file sources and stores, with a
//! scripted classifier and a live local webhook endpoint, covering the
//! first-run-dispatches / second-run-suppresses contract and channel
//! isolation in the dispatcher.

use axum::extract::Json;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use logwarden::analyzer::Classifier;
use logwarden::filter::PatternStore;
use logwarden::history::FindingHistory;
use logwarden::notifier::Notifier;
use logwarden::pipeline::{process_source, RunOptions, SourceOutcome};
use logwarden::sources::{Source, SourceSpec};
use logwarden_common::config::NotifyConfig;
use logwarden_common::{AnalysisReport, Finding, Severity, SmtpConfig};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Classifier scripted to always report one disk-full finding.
struct ScriptedClassifier {
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl Classifier for ScriptedClassifier {
    async fn analyze_logs(&self, logs: &str, _model: &str) -> AnalysisReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(logs.contains("ERROR disk full"), "filtered logs reach the classifier");
        AnalysisReport {
            has_issues: true,
            summary: "Disk is filling up".to_string(),
            findings: vec![Finding {
                log_entry: "2024-01-01 ERROR disk full".to_string(),
                severity: Severity::Critical,
                explanation: "The root filesystem is out of space".to_string(),
                suggested_fix: None,
            }],
        }
    }
}

/// Bind a webhook endpoint on an ephemeral port; every POST counts one hit.
async fn spawn_webhook(hits: Arc<AtomicUsize>) -> String {
    let app = Router::new().route(
        "/hook",
        post(move |Json(body): Json<serde_json::Value>| {
            let hits = hits.clone();
            async move {
                assert!(body["embeds"][0]["title"].is_string());
                hits.fetch_add(1, Ordering::SeqCst);
                StatusCode::NO_CONTENT
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/hook")
}

fn source_with(dir: &tempfile::TempDir, content: &str) -> Source {
    let path = dir.path().join("test.log");
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

#[tokio::test]
async fn first_run_notifies_and_records_second_run_suppresses() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_with(&dir, "2024-01-01 ERROR disk full\n2024-01-01 INFO ok\n");
    let patterns = PatternStore::load(dir.path().join("ignore_patterns.json"));
    let mut history = FindingHistory::load(dir.path().join("history.json"));
    let classifier = ScriptedClassifier::new();

    let hits = Arc::new(AtomicUsize::new(0));
    let webhook_url = spawn_webhook(hits.clone()).await;
    let notifier = Notifier::new(&NotifyConfig {
        webhook_url: Some(webhook_url),
        smtp: None,
    });

    // First run: new finding, delivered and recorded.
    let outcome =
        process_source(&source, &opts(), &classifier, &patterns, &mut history, &notifier).await;
    match &outcome {
        SourceOutcome::Findings { items, .. } => {
            assert_eq!(items.len(), 1);
            assert!(!items[0].duplicate);
            assert_eq!(items[0].delivery.get("webhook"), Some(&true));
        }
        other => panic!("expected findings, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(history.entries().len(), 1);

    // Identical run within the window: suppressed, no second delivery.
    let outcome =
        process_source(&source, &opts(), &classifier, &patterns, &mut history, &notifier).await;
    match &outcome {
        SourceOutcome::Findings { items, .. } => {
            assert!(items[0].duplicate);
            assert!(items[0].delivery.is_empty());
        }
        other => panic!("expected findings, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(history.entries().len(), 1);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failing_email_does_not_block_webhook() {
    let finding = Finding {
        log_entry: "kernel: oom-killer invoked".to_string(),
        severity: Severity::Error,
        explanation: "A process was killed for memory pressure".to_string(),
        suggested_fix: None,
    };

    let hits = Arc::new(AtomicUsize::new(0));
    let webhook_url = spawn_webhook(hits.clone()).await;
    let notifier = Notifier::new(&NotifyConfig {
        webhook_url: Some(webhook_url),
        // Nothing listens here; the SMTP connection is refused.
        smtp: Some(SmtpConfig {
            server: "127.0.0.1".to_string(),
            port: 9,
            user: "alerts@example.com".to_string(),
            password: "irrelevant".to_string(),
            from: None,
            to: "admin@example.com".to_string(),
        }),
    });

    let results = notifier.dispatch(&finding).await;
    assert_eq!(results.get("email"), Some(&false));
    assert_eq!(results.get("webhook"), Some(&true));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

/// Classifier that asserts ignored lines were stripped before the call.
struct FilterCheckingClassifier {
    calls: AtomicUsize,
}

impl Classifier for FilterCheckingClassifier {
    async fn analyze_logs(&self, logs: &str, _model: &str) -> AnalysisReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(logs.contains("ERROR disk full"));
        assert!(!logs.contains("bluetooth"));
        AnalysisReport {
            has_issues: false,
            summary: "clean after filtering".to_string(),
            findings: vec![],
        }
    }
}

#[tokio::test]
async fn ignored_lines_never_reach_the_classifier() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_with(
        &dir,
        "2024-01-01 ERROR disk full\nnoisy ERROR bluetooth timeout\n",
    );
    let mut patterns = PatternStore::load(dir.path().join("ignore_patterns.json"));
    patterns.add("bluetooth").unwrap();
    let mut history = FindingHistory::load(dir.path().join("history.json"));
    let classifier = FilterCheckingClassifier {
        calls: AtomicUsize::new(0),
    };
    let notifier = Notifier::new(&NotifyConfig::default());

    let outcome =
        process_source(&source, &opts(), &classifier, &patterns, &mut history, &notifier).await;

    assert!(matches!(outcome, SourceOutcome::Clean { .. }));
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
}
