//! Shared types and configuration for logwarden.
//!
//! Everything that both the pipeline and the CLI surface need lives here:
//! the classifier report model, severity levels, and the runtime config.

pub mod config;
pub mod types;

pub use config::{Config, SmtpConfig};
pub use types::{
    AnalysisReport, ConfigAuditReport, ConfigFinding, Finding, GeneratedFile, HealthFinding,
    HealthReport, Severity, SuggestedFix,
};
