//! Log collection from the journal and plain files.
//!
//! Every reader returns `Result<String, CollectError>` so callers branch on
//! a real error value instead of sniffing sentinel prefixes in the text.
//! A failed source is never fatal; the pipeline maps the error to a skipped
//! source and moves on.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Block size for the backwards tail scan.
const TAIL_BLOCK: u64 = 8192;

/// Why a source could not be read.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("{} is not a file", .0.display())]
    NotAFile(PathBuf),

    #[error("permission denied reading {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("journalctl not found; is this a systemd host?")]
    JournalMissing,

    #[error("journalctl failed: {stderr}")]
    Journal { stderr: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Both the seek-from-end tail and the whole-file fallback failed.
    #[error(
        "failed to tail {}: {tail_error}; fallback read also failed: {fallback_error}",
        .path.display()
    )]
    TailFailed {
        path: PathBuf,
        tail_error: String,
        fallback_error: String,
    },
}

fn map_io(path: &Path, err: std::io::Error) -> CollectError {
    match err.kind() {
        std::io::ErrorKind::NotFound => CollectError::NotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => CollectError::PermissionDenied(path.to_path_buf()),
        _ => CollectError::Io {
            path: path.to_path_buf(),
            source: err,
        },
    }
}

/// Last `lines` entries from the system journal, oldest first.
///
/// Runs `journalctl -n N --no-pager`, the same non-interactive invocation a
/// human would use; output ordering (newest appended last) is preserved.
pub fn journal_logs(lines: usize) -> Result<String, CollectError> {
    let output = Command::new("journalctl")
        .args(["-n", &lines.to_string(), "--no-pager"])
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CollectError::JournalMissing,
            _ => CollectError::Io {
                path: PathBuf::from("journalctl"),
                source: e,
            },
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(CollectError::Journal { stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Last `lines` lines of a log file.
///
/// Prefers a block-wise seek-from-end scan so huge logs never load fully
/// into memory. If that fails for any reason, falls back to reading the
/// whole file and slicing; if both fail the combined diagnostic is surfaced.
pub fn file_logs(path: impl AsRef<Path>, lines: usize) -> Result<String, CollectError> {
    let path = path.as_ref();

    let meta = fs::metadata(path).map_err(|e| map_io(path, e))?;
    if !meta.is_file() {
        return Err(CollectError::NotAFile(path.to_path_buf()));
    }

    match tail_lines(path, lines) {
        Ok(text) => Ok(text),
        Err(tail_err) => {
            debug!("tail of {} failed ({tail_err}), falling back to full read", path.display());
            match fs::read(path) {
                Ok(bytes) => {
                    let content = String::from_utf8_lossy(&bytes);
                    Ok(last_lines(&content, lines))
                }
                Err(fallback_err) => Err(CollectError::TailFailed {
                    path: path.to_path_buf(),
                    tail_error: tail_err.to_string(),
                    fallback_error: fallback_err.to_string(),
                }),
            }
        }
    }
}

/// Full content of a file, for configuration auditing.
pub fn read_file(path: impl AsRef<Path>) -> Result<String, CollectError> {
    let path = path.as_ref();

    let meta = fs::metadata(path).map_err(|e| map_io(path, e))?;
    if !meta.is_file() {
        return Err(CollectError::NotAFile(path.to_path_buf()));
    }

    fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| map_io(path, e))
}

/// Seek-from-end tail: read fixed-size blocks backwards until enough
/// newlines have been seen, then slice off the last `lines` lines.
fn tail_lines(path: &Path, lines: usize) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
    let len = file.seek(SeekFrom::End(0))?;

    let mut buf: Vec<u8> = Vec::new();
    let mut pos = len;

    while pos > 0 {
        let read_len = pos.min(TAIL_BLOCK);
        pos -= read_len;
        file.seek(SeekFrom::Start(pos))?;

        let mut block = vec![0u8; read_len as usize];
        file.read_exact(&mut block)?;
        block.extend_from_slice(&buf);
        buf = block;

        // +1: the final line may not be newline-terminated.
        if buf.iter().filter(|&&b| b == b'\n').count() > lines {
            break;
        }
    }

    let content = String::from_utf8_lossy(&buf);
    Ok(last_lines(&content, lines))
}

/// Last `count` lines of `text`, newline-terminated.
fn last_lines(text: &str, count: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(count);
    let mut out = all[start..].join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
