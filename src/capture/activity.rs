//! Turns editor activity into event records and relays them.
//!
//! Every callback produces one record; there is no debouncing or batching.
//! A keystroke-level edit stream therefore sends the full document text per
//! change, and the backend has to absorb that rate.

use crate::config::Config;
use crate::delivery::{DeliveryClient, paths};
use crate::event::{EventPayload, EventRecord, EventType, Selection, format_timestamp};
use crate::telemetry::metrics;
use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::trace;

use super::state::CaptureState;

/// An activity notification from the editor host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    /// Document content changed.
    Edit { uri: String, text: String },
    /// Cursor or selection moved.
    Cursor {
        uri: String,
        selections: Vec<Selection>,
    },
}

impl Activity {
    pub fn event_type(&self) -> EventType {
        match self {
            Activity::Edit { .. } => EventType::Edit,
            Activity::Cursor { .. } => EventType::Cursor,
        }
    }
}

/// Gated relay from editor activity to the `/event` endpoint.
pub struct ActivityCapture {
    state: Arc<CaptureState>,
    client: DeliveryClient,
    domain: String,
    compliance_targets: Vec<String>,
    last_timestamp: Mutex<Option<DateTime<Utc>>>,
}

impl ActivityCapture {
    pub fn new(state: Arc<CaptureState>, client: DeliveryClient, config: &Config) -> Self {
        Self {
            state,
            client,
            domain: config.domain.clone(),
            compliance_targets: config.compliance_targets.clone(),
            last_timestamp: Mutex::new(None),
        }
    }

    /// Handle one activity callback.
    ///
    /// No-op while capture is stopped. Otherwise builds a record and sends
    /// it fire-and-forget; the returned handle can be awaited or dropped.
    /// Never fails.
    pub fn on_activity(&self, activity: Activity) -> Option<JoinHandle<()>> {
        if !self.state.is_started() {
            return None;
        }

        let record = self.record_for(activity);
        trace!(event_type = %record.event_type, uri = %record.uri, "activity captured");
        metrics::capture_events().add(1, &[KeyValue::new("type", record.event_type.as_str())]);

        Some(self.client.send_detached(paths::EVENT, &record))
    }

    /// Build the record for an activity, stamping it with the session clock.
    pub fn record_for(&self, activity: Activity) -> EventRecord {
        let event_type = activity.event_type();
        let (uri, payload) = match activity {
            Activity::Edit { uri, text } => (uri, EventPayload::Text { text }),
            Activity::Cursor { uri, selections } => (uri, EventPayload::Selections { selections }),
        };

        EventRecord {
            event_type,
            uri,
            payload,
            timestamp: format_timestamp(self.next_timestamp(Utc::now())),
            domain: self.domain.clone(),
            compliance_targets: self.compliance_targets.clone(),
            chain_hash: None,
            backup_ref: None,
        }
    }

    /// Clamp `now` so timestamps never go backwards within the session,
    /// even if the wall clock does.
    fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut last = self
            .last_timestamp
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let stamped = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(stamped);
        stamped
    }
}
