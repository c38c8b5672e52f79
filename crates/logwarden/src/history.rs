//! Finding history: the deduplication ledger.
//!
//! Each surfaced finding is recorded under a content hash of its log-entry
//! text, so the same recurring line collapses to one identity no matter
//! when it reappears. An identity inside the recency window is a
//! duplicate; outside the window it alerts again, pruned or not.
//!
//! The file is `{"history": [...]}` with ISO-8601 timestamps, rewritten
//! wholesale on every append. Absent or corrupt content loads as empty.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use logwarden_common::Severity;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One recorded finding identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Hex SHA-256 of the finding's log-entry text.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub summary: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

/// Deterministic identity for a log-entry text.
pub fn finding_id(log_entry: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(log_entry.as_bytes());
    hex::encode(hasher.finalize())
}

/// File-backed, time-ordered history of surfaced findings.
pub struct FindingHistory {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl FindingHistory {
    /// Load the history from `path`; absent or malformed files yield an
    /// empty history.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HistoryFile>(&raw) {
                Ok(file) => file.history,
                Err(e) => {
                    warn!("Ignoring corrupt history file {}: {e}", path.display());
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, entries }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// True iff this log-entry text was recorded within the last
    /// `window_hours`. Older entries with the same identity do not count;
    /// the same issue re-alerts once the window elapses.
    pub fn is_duplicate(&self, log_entry: &str, window_hours: i64) -> bool {
        self.is_duplicate_at(log_entry, window_hours, Utc::now())
    }

    pub fn is_duplicate_at(
        &self,
        log_entry: &str,
        window_hours: i64,
        now: DateTime<Utc>,
    ) -> bool {
        let id = finding_id(log_entry);
        let cutoff = now - Duration::hours(window_hours);
        self.entries
            .iter()
            .any(|e| e.id == id && e.timestamp > cutoff)
    }

    /// Append a new entry and persist the whole history. No write-time
    /// dedup: callers check [`FindingHistory::is_duplicate`] first.
    pub fn add_entry(&mut self, log_entry: &str, severity: Severity, summary: &str) -> Result<()> {
        self.add_entry_at(log_entry, severity, summary, Utc::now())
    }

    pub fn add_entry_at(
        &mut self,
        log_entry: &str,
        severity: Severity,
        summary: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.entries.push(HistoryEntry {
            id: finding_id(log_entry),
            timestamp: now,
            severity,
            summary: summary.to_string(),
        });
        self.save()
    }

    /// Drop entries older than `retention_days` and persist. With
    /// `spare_window_hours` set, entries still inside that dedup window
    /// survive even when retention is shorter than the window. Returns the
    /// number of pruned entries.
    pub fn prune(&mut self, retention_days: i64, spare_window_hours: Option<i64>) -> Result<usize> {
        self.prune_at(retention_days, spare_window_hours, Utc::now())
    }

    pub fn prune_at(
        &mut self,
        retention_days: i64,
        spare_window_hours: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let mut cutoff = now - Duration::days(retention_days);
        if let Some(hours) = spare_window_hours {
            let window_cutoff = now - Duration::hours(hours);
            if window_cutoff < cutoff {
                cutoff = window_cutoff;
            }
        }

        let before = self.entries.len();
        self.entries.retain(|e| e.timestamp > cutoff);
        let pruned = before - self.entries.len();
        if pruned > 0 {
            self.save()?;
        }
        Ok(pruned)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = HistoryFile {
            history: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

/// Default history file location helper.
pub fn default_history_path(state_dir: &Path) -> PathBuf {
    state_dir.join("history.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn history_in(dir: &tempfile::TempDir) -> FindingHistory {
        FindingHistory::load(dir.path().join("history.json"))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn hash_is_stable_and_distinct() {
        let a = finding_id("ERROR disk full");
        let b = finding_id("ERROR disk full");
        let c = finding_id("ERROR disk full!");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn first_check_misses_then_hits_within_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = history_in(&dir);
        let now = t0();

        assert!(!history.is_duplicate_at("ERROR disk full", 24, now));
        history
            .add_entry_at("ERROR disk full", Severity::Critical, "disk full", now)
            .unwrap();
        assert!(history.is_duplicate_at("ERROR disk full", 24, now + Duration::hours(1)));
    }

    #[test]
    fn window_elapse_clears_duplicate_without_pruning() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = history_in(&dir);
        let now = t0();

        history
            .add_entry_at("ERROR disk full", Severity::Error, "disk full", now)
            .unwrap();

        assert!(history.is_duplicate_at("ERROR disk full", 24, now + Duration::hours(23)));
        assert!(!history.is_duplicate_at("ERROR disk full", 24, now + Duration::hours(25)));
        // The entry is still there; only the window moved.
        assert_eq!(history.entries().len(), 1);
    }

    #[test]
    fn identity_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let now = t0();

        let mut history = FindingHistory::load(&path);
        history
            .add_entry_at("oom killed process 4242", Severity::Warning, "oom", now)
            .unwrap();
        drop(history);

        let reloaded = FindingHistory::load(&path);
        assert!(reloaded.is_duplicate_at("oom killed process 4242", 24, now));
        assert_eq!(reloaded.entries()[0].id, finding_id("oom killed process 4242"));
    }

    #[test]
    fn prune_drops_only_entries_past_retention() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = history_in(&dir);
        let now = t0();

        // Insert out of time order on purpose.
        history
            .add_entry_at("recent", Severity::Info, "recent", now - Duration::days(2))
            .unwrap();
        history
            .add_entry_at("ancient", Severity::Info, "ancient", now - Duration::days(40))
            .unwrap();
        history
            .add_entry_at("fresh", Severity::Info, "fresh", now)
            .unwrap();

        let pruned = history.prune_at(30, None, now).unwrap();
        assert_eq!(pruned, 1);
        let summaries: Vec<&str> = history.entries().iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(summaries, ["recent", "fresh"]);
    }

    #[test]
    fn prune_spares_live_dedup_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = history_in(&dir);
        let now = t0();

        // Retention of 0 days would normally delete a 12-hour-old entry.
        history
            .add_entry_at("inside window", Severity::Info, "w", now - Duration::hours(12))
            .unwrap();

        let pruned = history.prune_at(0, Some(24), now).unwrap();
        assert_eq!(pruned, 0);
        assert_eq!(history.entries().len(), 1);

        // Without the sparing policy it goes away.
        let pruned = history.prune_at(0, None, now).unwrap();
        assert_eq!(pruned, 1);
        assert!(history.entries().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "][").unwrap();

        let history = FindingHistory::load(&path);
        assert!(history.entries().is_empty());
    }

    #[test]
    fn persisted_shape_matches_contract() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut history = FindingHistory::load(&path);
        history
            .add_entry_at("line", Severity::Error, "s", t0())
            .unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &value["history"][0];
        assert_eq!(entry["id"], serde_json::json!(finding_id("line")));
        assert_eq!(entry["severity"], serde_json::json!("error"));
        assert!(entry["timestamp"].as_str().unwrap().starts_with("2024-06-01T12:00:00"));
    }
}
