//! Named log sources.
//!
//! A source is either the system journal or a file path. The built-in
//! table covers the usual Linux suspects; users extend it with a
//! `sources.json` object (name → path) in the config directory. Order is
//! stable so menus and `--source all` runs are deterministic.

use crate::collector::{self, CollectError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// How a source is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Journal,
    File(PathBuf),
}

impl SourceSpec {
    /// Fetch the most recent `lines` from this source.
    pub fn read(&self, lines: usize) -> Result<String, CollectError> {
        match self {
            SourceSpec::Journal => collector::journal_logs(lines),
            SourceSpec::File(path) => collector::file_logs(path, lines),
        }
    }

    /// Path or command shown next to the name in menus.
    pub fn location(&self) -> String {
        match self {
            SourceSpec::Journal => "journalctl".to_string(),
            SourceSpec::File(path) => path.display().to_string(),
        }
    }
}

/// A named log source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub spec: SourceSpec,
}

impl Source {
    fn new(name: &str, spec: SourceSpec) -> Self {
        Self {
            name: name.to_string(),
            spec,
        }
    }
}

/// The built-in source table.
pub fn builtin_sources() -> Vec<Source> {
    vec![
        Source::new("System Journal", SourceSpec::Journal),
        Source::new("Syslog", SourceSpec::File(PathBuf::from("/var/log/syslog"))),
        Source::new("Auth Log", SourceSpec::File(PathBuf::from("/var/log/auth.log"))),
        Source::new("Kernel Log", SourceSpec::File(PathBuf::from("/var/log/kern.log"))),
        Source::new("Dmesg", SourceSpec::File(PathBuf::from("/var/log/dmesg"))),
        Source::new(
            "Package Manager (dpkg)",
            SourceSpec::File(PathBuf::from("/var/log/dpkg.log")),
        ),
        Source::new("Xorg Log", SourceSpec::File(PathBuf::from("/var/log/Xorg.0.log"))),
    ]
}

/// Built-ins plus user-defined sources from `sources.json`. A user entry
/// with a built-in's name replaces it in place.
pub fn known_sources(user_file: &Path) -> Vec<Source> {
    let mut sources = builtin_sources();

    for (name, path) in load_user_sources(user_file) {
        let user = Source::new(&name, SourceSpec::File(PathBuf::from(&path)));
        match sources.iter_mut().find(|s| s.name == name) {
            Some(existing) => *existing = user,
            None => sources.push(user),
        }
    }

    sources
}

/// User source table: a JSON object of name → path. Malformed content is
/// ignored with a warning; the built-ins always remain usable.
fn load_user_sources(path: &Path) -> Vec<(String, String)> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };

    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&raw) {
        Ok(map) => map
            .into_iter()
            .filter_map(|(name, value)| Some((name, value.as_str()?.to_string())))
            .collect(),
        Err(e) => {
            warn!("Ignoring malformed user sources {}: {e}", path.display());
            Vec::new()
        }
    }
}

/// Turn a `--source` argument into a source. The well-known journal
/// aliases map to the journal; anything else is treated as a file path.
pub fn resolve(arg: &str) -> Source {
    match arg {
        "journal" | "journalctl" => Source::new("System Journal", SourceSpec::Journal),
        path => Source::new("Custom File", SourceSpec::File(PathBuf::from(path))),
    }
}
