//! JSONL audit logging for the request gatekeeper
//!
//! Records all dispositions to a JSONL file for later analysis.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::input::Request;
use crate::output::{Disposition, Outcome};

/// Log level for audit entries
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Allowed,
    Blocked,
    Challenged,
    Disabled,
}

/// An audit log entry
#[derive(Debug, Serialize)]
pub struct AuditEntry {
    /// Timestamp of the disposition
    pub timestamp: DateTime<Utc>,

    /// Log level (ALLOWED, BLOCKED, CHALLENGED, DISABLED)
    pub level: LogLevel,

    /// Request method
    pub method: String,

    /// Request path
    pub path: String,

    /// Rule that decided the outcome (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,

    /// Signal labels visible during evaluation
    pub labels: Vec<String>,

    /// Summary of the request
    pub request_summary: String,
}

impl AuditEntry {
    /// Create a new audit entry from a request and its disposition
    pub fn new(request: &Request, disposition: &Disposition, disabled: bool) -> Self {
        let level = if disabled {
            LogLevel::Disabled
        } else {
            match disposition.outcome {
                Outcome::Allow => LogLevel::Allowed,
                Outcome::Block => LogLevel::Blocked,
                Outcome::Challenge => LogLevel::Challenged,
            }
        };

        Self {
            timestamp: Utc::now(),
            level,
            method: request.method.clone(),
            path: request.path.clone(),
            matched_rule: disposition.matched_rule.clone(),
            labels: disposition.labels.iter().cloned().collect(),
            request_summary: request.summary(),
        }
    }
}

/// Audit logger
pub struct AuditLogger {
    writer: Option<BufWriter<File>>,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(path: Option<&Path>) -> Self {
        let writer = path.and_then(|p| {
            // Ensure parent directory exists
            if let Some(parent) = p.parent() {
                let _ = std::fs::create_dir_all(parent);
            }

            OpenOptions::new()
                .create(true)
                .append(true)
                .open(p)
                .ok()
                .map(BufWriter::new)
        });

        Self { writer }
    }

    /// Log an audit entry
    pub fn log(&mut self, entry: &AuditEntry) -> Result<(), std::io::Error> {
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(entry)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Log a disposition
    pub fn log_disposition(
        &mut self,
        request: &Request,
        disposition: &Disposition,
        disabled: bool,
    ) -> Result<(), std::io::Error> {
        let entry = AuditEntry::new(request, disposition, disabled);
        self.log(&entry)
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }
}

/// Create a disabled logger (for when audit logging is off)
impl Default for AuditLogger {
    fn default() -> Self {
        Self { writer: None }
    }
}
