//! Ignore patterns and the trigger-keyword gate.
//!
//! [`PatternStore`] persists user-defined substring patterns; any log line
//! containing one is dropped before analysis. The store is advisory, so a
//! missing or corrupt file loads as empty rather than failing the run.
//!
//! [`contains_trigger`] is the cheap pre-filter that decides whether a log
//! batch is worth a classifier call at all. It is deliberately
//! over-inclusive: a false positive wastes one request, a false negative
//! hides an incident.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Substrings that mark a batch as worth classifying. Case-insensitive,
/// additive; broad matches are intentional.
const TRIGGER_KEYWORDS: &[&str] = &[
    "error",
    "fail",
    "warn",
    "critical",
    "exception",
    "fatal",
    "panic",
    "denied",
    "segfault",
    "oom",
    "timeout",
    "unreachable",
];

/// True if the text contains any trigger keyword in any casing.
pub fn contains_trigger(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    TRIGGER_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// User-defined ignore patterns, persisted as a JSON array of strings.
///
/// Set semantics with insertion order preserved for display. Every
/// mutation rewrites the whole file; last writer wins across processes,
/// which is acceptable for a single foreground/cron tool.
pub struct PatternStore {
    path: PathBuf,
    patterns: Vec<String>,
}

impl PatternStore {
    /// Load patterns from `path`. Absent or malformed content yields an
    /// empty store; ignore rules are advisory, not safety-critical.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let patterns = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(list) => dedup_preserving_order(list),
                Err(e) => {
                    warn!("Ignoring corrupt pattern file {}: {e}", path.display());
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Add a pattern and persist. Empty or already-present patterns are a
    /// no-op. Returns whether the set changed.
    pub fn add(&mut self, pattern: &str) -> Result<bool> {
        if pattern.is_empty() || self.patterns.iter().any(|p| p == pattern) {
            return Ok(false);
        }
        self.patterns.push(pattern.to_string());
        self.save()?;
        Ok(true)
    }

    /// Remove a pattern and persist. Absent patterns are a no-op.
    pub fn remove(&mut self, pattern: &str) -> Result<bool> {
        let before = self.patterns.len();
        self.patterns.retain(|p| p != pattern);
        if self.patterns.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// True iff any stored pattern is a literal substring of `line`.
    /// Case-sensitive.
    pub fn matches(&self, line: &str) -> bool {
        self.patterns.iter().any(|p| line.contains(p.as_str()))
    }

    /// Drop every line that matches an ignore pattern. Surviving lines keep
    /// their content and relative order.
    pub fn filter(&self, text: &str) -> String {
        if self.patterns.is_empty() {
            return text.to_string();
        }
        text.lines()
            .filter(|line| !self.matches(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.patterns)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

fn dedup_preserving_order(list: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    list.into_iter()
        .filter(|p| !p.is_empty() && seen.insert(p.clone()))
        .collect()
}

/// Default pattern file location helper for `Path`-typed callers.
pub fn default_pattern_path(state_dir: &Path) -> PathBuf {
    state_dir.join("ignore_patterns.json")
}
