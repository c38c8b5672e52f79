//! Classifier report model.
//!
//! These structs mirror the JSON documents the classifier is instructed to
//! produce. Deserialization is deliberately forgiving: every field that a
//! model might omit or mangle carries a serde default, because a partially
//! usable report beats a parse failure.

use serde::{Deserialize, Serialize};

/// Severity of a single finding.
///
/// Audit-style responses sometimes say `"high"` instead of `"error"`; the
/// alias collapses both onto the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    #[serde(alias = "high")]
    Error,
    Critical,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Info
    }
}

impl Severity {
    /// `true` for the severities that warrant red rendering and urgent mail.
    pub fn is_urgent(&self) -> bool {
        matches!(self, Severity::Critical | Severity::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remedy suggested by the classifier for one finding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedFix {
    /// Human description of the fix.
    #[serde(default)]
    pub description: String,
    /// Exact shell command, if the fix is a command at all.
    #[serde(default)]
    pub command: Option<String>,
    /// Whether the command needs elevated privileges.
    #[serde(default)]
    pub requires_sudo: bool,
}

/// One issue the classifier extracted from a log batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// The log line or block that evidences the issue. This text is the
    /// input to the finding's history identity.
    #[serde(default)]
    pub log_entry: String,
    #[serde(default)]
    pub severity: Severity,
    /// What the log entry means.
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub suggested_fix: Option<SuggestedFix>,
}

impl Finding {
    /// Short text recorded in the history alongside the identity hash.
    pub fn summary(&self) -> &str {
        if self.explanation.is_empty() {
            "Issue detected"
        } else {
            &self.explanation
        }
    }
}

/// Top-level classifier response for a log batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default)]
    pub has_issues: bool,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub findings: Vec<Finding>,
}

impl AnalysisReport {
    /// Report substituted when the classifier is unreachable or returns
    /// something unparseable. Flagged as an issue so unattended runs still
    /// surface the failure instead of silently reporting a clean host.
    pub fn technical_failure(err: impl std::fmt::Display) -> Self {
        AnalysisReport {
            has_issues: true,
            summary: format!("Failed to analyze logs due to technical error: {err}"),
            findings: Vec::new(),
        }
    }
}

/// One issue from a configuration audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFinding {
    #[serde(default)]
    pub line_number: Option<u32>,
    /// The config key or section the issue is about.
    #[serde(default)]
    pub parameter: Option<String>,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default)]
    pub suggested_value: Option<String>,
}

/// Classifier response for a configuration audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigAuditReport {
    #[serde(default)]
    pub has_issues: bool,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub findings: Vec<ConfigFinding>,
}

impl ConfigAuditReport {
    pub fn technical_failure(err: impl std::fmt::Display) -> Self {
        ConfigAuditReport {
            has_issues: true,
            summary: format!("Failed to audit configuration due to technical error: {err}"),
            findings: Vec::new(),
        }
    }
}

/// One issue from a health diagnosis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthFinding {
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub severity: Severity,
    /// The data point proving the issue.
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub recommendation: String,
}

/// Classifier response for a health diagnosis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub has_issues: bool,
    /// "Healthy", "Degraded", or "Critical" as judged by the classifier.
    #[serde(default)]
    pub overall_status: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub findings: Vec<HealthFinding>,
}

impl HealthReport {
    pub fn technical_failure(err: impl std::fmt::Display) -> Self {
        HealthReport {
            has_issues: true,
            overall_status: "Unknown".to_string(),
            summary: format!("Failed to analyze health data: {err}"),
            findings: Vec::new(),
        }
    }
}

/// Classifier response for file generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFile {
    #[serde(default)]
    pub content: String,
}
