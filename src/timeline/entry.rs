//! Backend view of past events.
//!
//! Entries are read-only here. Flagging and reverting go back to the backend
//! as new requests; nothing is edited locally.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Length of the displayed chain-hash prefix.
pub const SHORT_HASH_LEN: usize = 8;

/// Architecture-compliance cue derived from an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceCue {
    Ok,
    Violation,
}

impl std::fmt::Display for ComplianceCue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceCue::Ok => f.write_str("arch: ok"),
            ComplianceCue::Violation => f.write_str("arch: violation"),
        }
    }
}

/// One row of the backend timeline. Every field is optional; the backend
/// records whatever the originating request carried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Resource the entry refers to.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub cues: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub chain_hash: Option<String>,
    /// Pre-change snapshot reference.
    #[serde(rename = "backup", default)]
    pub backup_ref: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

impl TimelineEntry {
    /// `Violation` only when the backend explicitly marked the arch cue as
    /// not ok.
    pub fn compliance_cue(&self) -> ComplianceCue {
        let ok = self
            .cues
            .as_ref()
            .and_then(|c| c.pointer("/arch/ok"))
            .and_then(Value::as_bool);
        match ok {
            Some(false) => ComplianceCue::Violation,
            _ => ComplianceCue::Ok,
        }
    }

    /// Benchmark metric, if the entry carries one.
    pub fn metric(&self) -> Option<String> {
        match self.result.as_ref()?.pointer("/benchmark/result/value")? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// First [`SHORT_HASH_LEN`] characters of the chain hash, or `""`.
    pub fn short_hash(&self) -> &str {
        let Some(hash) = self.chain_hash.as_deref() else {
            return "";
        };
        match hash.char_indices().nth(SHORT_HASH_LEN) {
            Some((end, _)) => &hash[..end],
            None => hash,
        }
    }

    /// `(file, backup)` when both are present and non-empty. Revert is only
    /// offered for entries that have one.
    pub fn revert_target(&self) -> Option<(&str, &str)> {
        let file = self.file.as_deref().filter(|f| !f.is_empty())?;
        let backup = self.backup_ref.as_deref().filter(|b| !b.is_empty())?;
        Some((file, backup))
    }

    pub fn can_revert(&self) -> bool {
        self.revert_target().is_some()
    }
}

/// Raw `/timeline` response body.
#[derive(Debug, Default, Deserialize)]
struct TimelineBody {
    #[serde(default)]
    events: Vec<Value>,
}

/// Decode a `/timeline` body, keeping the backend's order.
///
/// Events that are not objects, or whose fields have unexpected types, are
/// kept as empty entries so row numbers stay aligned with the backend.
pub fn parse_timeline(body: &Value) -> Vec<TimelineEntry> {
    let parsed: TimelineBody = match serde_json::from_value(body.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "timeline body has no events list");
            TimelineBody::default()
        }
    };
    parsed
        .events
        .into_iter()
        .map(|event| {
            serde_json::from_value(event).unwrap_or_else(|e| {
                debug!(error = %e, "unreadable timeline entry");
                TimelineEntry::default()
            })
        })
        .collect()
}
