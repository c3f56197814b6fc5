//! Telemetry ingest errors
//!
//! None of these ever reach the HTTP side: the ingest loop logs them and
//! either drops the offending line or stops producing.

use std::fmt;
use std::fmt::Display;

/// Telemetry source and line parsing errors
#[derive(Debug)]
pub enum IngestError {
    /// The serial device could not be opened at startup
    ///
    /// The ingest loop falls back to synthetic readings.
    SourceUnavailable {
        port: String,
        source: crate::Error,
    },

    /// A single line could not be turned into a reading
    ///
    /// Occurs when:
    /// - the line has fewer than 8 comma-separated fields
    /// - a numeric field (temperature, humidity, moisture, pH) does not parse
    ///
    /// The line is dropped; the cache is left untouched.
    MalformedRecord {
        line: String,
        reason: String,
    },

    /// The reader lost the device after it was opened
    Disconnected,
}

impl IngestError {
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        IngestError::MalformedRecord {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::SourceUnavailable { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl Display for IngestError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IngestError::SourceUnavailable { port, source } => {
                write!(fmt, "could not open serial port {}: {}", port, source)
            }
            IngestError::MalformedRecord { line, reason } => {
                write!(fmt, "malformed record ({}): {:?}", reason, line)
            }
            IngestError::Disconnected => "serial source disconnected".fmt(fmt),
        }
    }
}
