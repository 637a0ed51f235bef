//! Flat-file audit log channel.
//!
//! Appends one `<subject>;<UTC timestamp>` line per mapping call. The file
//! is opened in append mode and closed again on every call, so each mapping
//! call's write is self-contained.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::SideChannelError;

/// Timestamp layout used in log lines, e.g. `2026-08-06 12:34:56.789012`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Append-only flat-file audit channel.
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Create a log channel for the given file path. The file is created on
    /// the first append.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one line for a subject.
    pub fn append(
        &self,
        subject: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), SideChannelError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format_line(subject, timestamp).as_bytes())?;

        debug!(subject, path = %self.path.display(), "audit log line appended");
        Ok(())
    }
}

/// Format one `<subject>;<timestamp>` line, newline included.
fn format_line(subject: &str, timestamp: DateTime<Utc>) -> String {
    format!("{};{}\n", subject, timestamp.format(TIMESTAMP_FORMAT))
}
