//! Timeline controller: fetch, render, and act on rows.
//!
//! Each action is its own request/response round trip. Nothing serializes
//! actions on different rows, so when two race the last refresh to finish is
//! what the view shows.

use crate::delivery::{DeliveryClient, paths};
use crate::error::{Error, Result};
use crate::host::{Notifier, Prompter};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use super::entry::{TimelineEntry, parse_timeline};
use super::view::{TimelineRender, TimelineView, ViewMessage};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FlagRequest<'a> {
    project_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    reason: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RevertRequest<'a> {
    project_path: &'a str,
    file: &'a str,
    backup_path: &'a str,
}

/// Drives one timeline view for one project.
pub struct TimelineController<V> {
    client: DeliveryClient,
    project_path: String,
    /// Last successfully fetched log. Row indices refer to this snapshot.
    entries: Mutex<Vec<TimelineEntry>>,
    view: Mutex<V>,
}

impl<V: TimelineView> TimelineController<V> {
    pub fn new(client: DeliveryClient, project_path: impl Into<String>, view: V) -> Self {
        Self {
            client,
            project_path: project_path.into(),
            entries: Mutex::new(Vec::new()),
            view: Mutex::new(view),
        }
    }

    pub fn project_path(&self) -> &str {
        &self.project_path
    }

    /// Copy of the entries currently on display.
    pub fn entries(&self) -> Vec<TimelineEntry> {
        lock(&self.entries).clone()
    }

    /// Run `f` against the view.
    pub fn with_view<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(&lock(&self.view))
    }

    /// Fetch the ordered log from the backend. Order is kept as returned.
    pub async fn fetch_log(&self) -> Result<Vec<TimelineEntry>> {
        let response = self
            .client
            .get(paths::TIMELINE, &[("project_path", self.project_path.as_str())])
            .await?;
        let body: serde_json::Value = response.json()?;
        Ok(parse_timeline(&body))
    }

    /// Replace the displayed snapshot and redraw.
    pub fn render(&self, entries: Vec<TimelineEntry>) {
        let render = TimelineRender::build(&self.project_path, &entries);
        *lock(&self.entries) = entries;
        lock(&self.view).show(&render);
    }

    /// Fetch and render. On failure the previous render stays in place.
    pub async fn refresh<N: Notifier + ?Sized>(&self, notifier: &N) -> Result<()> {
        match self.fetch_log().await {
            Ok(entries) => {
                info!(project = %self.project_path, events = entries.len(), "timeline refreshed");
                self.render(entries);
                Ok(())
            }
            Err(e) => {
                warn!(project = %self.project_path, error = %e, "timeline fetch failed");
                notifier.error(&format!("Timeline failed: {e}"));
                Err(e)
            }
        }
    }

    /// Dispatch a message from the rendered view.
    pub async fn handle_message<N: Notifier + ?Sized>(
        &self,
        message: ViewMessage,
        notifier: &N,
    ) -> Result<()> {
        match message {
            ViewMessage::Refresh => {
                let result = self.refresh(notifier).await;
                record_action("refresh", &result);
                result
            }
        }
    }

    /// Flag row `index`. Asks for a reason first; an empty or cancelled
    /// reason aborts without touching the network.
    pub async fn on_flag<U>(&self, index: usize, ui: &U) -> Result<()>
    where
        U: Prompter + Notifier + ?Sized,
    {
        let result = self.flag(index, ui).await;
        record_action("flag", &result);
        result
    }

    /// Revert row `index` to its backup. Requires confirmation.
    pub async fn on_revert<U>(&self, index: usize, ui: &U) -> Result<()>
    where
        U: Prompter + Notifier + ?Sized,
    {
        let result = self.revert(index, ui).await;
        record_action("revert", &result);
        result
    }

    async fn flag<U>(&self, index: usize, ui: &U) -> Result<()>
    where
        U: Prompter + Notifier + ?Sized,
    {
        let entry = self.entry_at(index, ui)?;

        let reason = ui
            .ask_text("Flag reason?", None)
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or(Error::InputAborted)?;

        let request = FlagRequest {
            project_path: &self.project_path,
            file: entry.file.as_deref(),
            reason: &reason,
        };
        if let Err(e) = self.client.send(paths::FLAG_STEP, &request).await {
            ui.error(&format!("Flag failed: {e}"));
            return Err(e);
        }

        info!(row = row_number(index), "timeline step flagged");
        self.refresh(ui).await
    }

    async fn revert<U>(&self, index: usize, ui: &U) -> Result<()>
    where
        U: Prompter + Notifier + ?Sized,
    {
        let entry = self.entry_at(index, ui)?;
        let Some((file, backup)) = entry.revert_target() else {
            let e = Error::Other(format!(
                "row {} has no backup to revert to",
                row_number(index)
            ));
            ui.error(&format!("Revert failed: {e}"));
            return Err(e);
        };

        if !ui.confirm("Revert this step?") {
            return Err(Error::InputAborted);
        }

        let request = RevertRequest {
            project_path: &self.project_path,
            file,
            backup_path: backup,
        };
        if let Err(e) = self.client.send(paths::REVERT_STEP, &request).await {
            ui.error(&format!("Revert failed: {e}"));
            return Err(e);
        }

        info!(row = row_number(index), file, "timeline step reverted");
        self.refresh(ui).await
    }

    fn entry_at<N: Notifier + ?Sized>(&self, index: usize, notifier: &N) -> Result<TimelineEntry> {
        let entry = lock(&self.entries).get(index).cloned();
        entry.ok_or_else(|| {
            let e = Error::Other(format!("no timeline row {}", row_number(index)));
            notifier.error(&e.to_string());
            e
        })
    }
}

/// 1-based row number for messages. Saturates for indices no view produces.
fn row_number(index: usize) -> usize {
    index.saturating_add(1)
}

fn record_action(action: &'static str, result: &Result<()>) {
    let outcome = match result {
        Ok(()) => "ok",
        Err(e) if e.is_aborted() => "aborted",
        Err(_) => "error",
    };
    metrics::timeline_actions().add(
        1,
        &[
            KeyValue::new("action", action),
            KeyValue::new("result", outcome),
        ],
    );
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
