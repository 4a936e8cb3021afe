//! Lifecycle events emitted around each extractor operation.
//!
//! Front ends subscribe through [`ExtractionObserver`] to drive progress
//! indicators or elapsed-time displays.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// The operations a [`crate::DdlExtractor`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Login and database existence check
    TestConnection,
    /// Table catalog listing
    ListTables,
    /// Resolution, scripting and cleanup of a selection
    ScriptTables,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TestConnection => "connection test",
            Self::ListTables => "table listing",
            Self::ScriptTables => "table scripting",
        })
    }
}

/// One lifecycle transition of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExtractionEvent {
    /// The operation began
    Started {
        /// Operation that began
        operation: Operation,
    },
    /// The operation completed successfully
    Finished {
        /// Operation that completed
        operation: Operation,
        /// Wall time from start to completion
        duration: Duration,
    },
    /// The operation returned an error
    Failed {
        /// Operation that failed
        operation: Operation,
        /// Sanitized error message
        error: String,
    },
}

impl ExtractionEvent {
    /// The operation this event belongs to.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Started { operation }
            | Self::Finished { operation, .. }
            | Self::Failed { operation, .. } => *operation,
        }
    }
}

/// Receives lifecycle events. Called inline on the operation's task, so
/// implementations should return quickly.
pub trait ExtractionObserver: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &ExtractionEvent);
}

/// Formats a duration as `m:ss.mmm`.
///
/// # Example
/// ```rust
/// use ddlextract_core::events::format_elapsed;
/// use std::time::Duration;
///
/// assert_eq!(format_elapsed(Duration::from_millis(83_042)), "1:23.042");
/// ```
pub fn format_elapsed(duration: Duration) -> String {
    let total_millis = duration.as_millis();
    let minutes = total_millis / 60_000;
    let seconds = (total_millis % 60_000) / 1_000;
    let millis = total_millis % 1_000;
    format!("{}:{:02}.{:03}", minutes, seconds, millis)
}
