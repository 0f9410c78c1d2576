//! Event records relayed to the backend.
//!
//! One record per observed or requested action. The backend owns the
//! history; the client only builds records and hands them to delivery.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// What kind of action a record describes.
///
/// Wire names are kebab-case (`suggestion-request`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    Edit,
    Cursor,
    SuggestionRequest,
    ApplyPatch,
    WorkspaceAnalysis,
    ValidationRun,
    TuningToggle,
    TuningReset,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Edit => "edit",
            EventType::Cursor => "cursor",
            EventType::SuggestionRequest => "suggestion-request",
            EventType::ApplyPatch => "apply-patch",
            EventType::WorkspaceAnalysis => "workspace-analysis",
            EventType::ValidationRun => "validation-run",
            EventType::TuningToggle => "tuning-toggle",
            EventType::TuningReset => "tuning-reset",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A zero-based line/character position in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// A selection range as reported by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start: Position,
    pub end: Position,
}

/// Type-specific body of a record.
///
/// Flattened into the record on the wire, so the backend sees `text` or
/// `selections` next to `type` and `uri`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// Full document text after an edit.
    Text { text: String },
    /// Every selection after a cursor move.
    Selections { selections: Vec<Selection> },
}

/// One observed or requested client action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub uri: String,
    #[serde(flatten)]
    pub payload: EventPayload,
    /// ISO-8601, non-decreasing within a session.
    pub timestamp: String,
    pub domain: String,
    pub compliance_targets: Vec<String>,
    /// Assigned by the backend; display-only on this side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_hash: Option<String>,
    /// Pre-change snapshot reference. Required for revert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_ref: Option<String>,
}

/// Canonical wire form of a timestamp: RFC 3339, millisecond precision, `Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
