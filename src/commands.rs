//! User-issued commands.
//!
//! All of these are awaited sends: failures come back to the caller and are
//! shown to the user with the backend's status or the transport error. A
//! withheld prompt cancels the command before any request is made.

use crate::capture::{ActivityCapture, CaptureState};
use crate::config::Config;
use crate::delivery::{DeliveryClient, paths};
use crate::error::{Error, Result};
use crate::host::{Host, Notifier};
use crate::timeline::{TimelineController, TimelineView, ValidationReport};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Domains offered when running a validation pack.
pub const VALIDATION_DOMAINS: &[&str] = &[
    "gaming",
    "robotics",
    "hpc",
    "medical",
    "satellite",
    "sustainability",
    "speech_therapy",
];

/// Patch description recorded with user-applied text.
pub const USER_PATCH_NOTE: &str = "User-applied via extension";

/// A suggestion returned by `/suggest`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Suggestion {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub patch: String,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestResponse {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

/// What the user did with a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    Accepted,
    Rejected,
    Edited,
}

/// Body of a `/feedback` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub feedback: String,
    pub file: String,
    pub suggestion: String,
    pub action: FeedbackAction,
    pub user: String,
}

/// Command handlers sharing one config, one delivery client, and the
/// process's capture flag.
pub struct Commands {
    config: Config,
    client: DeliveryClient,
    capture: Arc<CaptureState>,
}

impl Commands {
    pub fn new(config: Config) -> Self {
        let client = DeliveryClient::from_config(&config);
        Self::with_client(config, client)
    }

    pub fn with_client(config: Config, client: DeliveryClient) -> Self {
        Self {
            config,
            client,
            capture: Arc::new(CaptureState::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &DeliveryClient {
        &self.client
    }

    pub fn capture_state(&self) -> Arc<CaptureState> {
        Arc::clone(&self.capture)
    }

    /// Activity capture wired to this session's flag and client.
    pub fn activity_capture(&self) -> ActivityCapture {
        ActivityCapture::new(self.capture_state(), self.client.clone(), &self.config)
    }

    /// Start relaying activity. Returns `true` if capture was not already
    /// running.
    pub fn start<N: Notifier + ?Sized>(&self, notifier: &N) -> bool {
        let transitioned = self.capture.start();
        if transitioned {
            info!("capture started, events will be sent");
        }
        notifier.info("Refactor relay started (sending events).");
        transitioned
    }

    /// Ask the backend for suggestions on the active document.
    pub async fn suggest<H: Host + ?Sized>(&self, host: &H) -> Result<Vec<Suggestion>> {
        let suggestions = report(host, "Fetching suggestions", self.request_suggestions(host).await)?;
        if suggestions.is_empty() {
            host.info("No issues found.");
        }
        for s in &suggestions {
            host.info(&format!("{}\n-> {}", s.reason, s.patch));
        }
        Ok(suggestions)
    }

    async fn request_suggestions<H: Host + ?Sized>(&self, host: &H) -> Result<Vec<Suggestion>> {
        let doc = host.require_document()?;
        let body = json!({
            "file": doc.path,
            "text": doc.text,
            "domain": self.config.domain,
            "complianceTargets": self.config.compliance_targets,
        });
        let response: SuggestResponse = self.client.send(paths::SUGGEST, &body).await?.json()?;
        Ok(response.suggestions)
    }

    /// Trigger workspace-wide analysis. Returns the backend's report.
    pub async fn workspace_analysis<H: Host + ?Sized>(&self, host: &H) -> Result<serde_json::Value> {
        let data = report(host, "Workspace analysis", self.request_analysis(host).await)?;
        let keys: Vec<&str> = data
            .get("report")
            .and_then(|r| r.as_object())
            .map(|r| r.keys().map(String::as_str).collect())
            .unwrap_or_default();
        info!(?keys, "workspace report received");
        host.info("Workspace analysis complete. Report written on backend.");
        Ok(data)
    }

    async fn request_analysis<H: Host + ?Sized>(&self, host: &H) -> Result<serde_json::Value> {
        let path = host.root().ok_or(Error::NoActiveContext("workspace"))?;
        let body = json!({
            "path": path.to_string_lossy(),
            "domain": self.config.domain,
            "benchmarkDomain": self.config.domain,
        });
        self.client.send(paths::WORKSPACE_ANALYSIS, &body).await?.json()
    }

    /// Apply user-supplied text to the active document's file and record it.
    pub async fn apply_patch<H: Host + ?Sized>(&self, host: &H) -> Result<serde_json::Value> {
        let data = report(host, "Apply", self.request_apply(host).await)?;
        debug!(result = %data, "apply result");
        host.info("Patch applied and timeline event recorded.");
        Ok(data)
    }

    async fn request_apply<H: Host + ?Sized>(&self, host: &H) -> Result<serde_json::Value> {
        let doc = host.require_document()?;
        let new_text = host
            .ask_text("Paste new file text to apply", None)
            .ok_or(Error::InputAborted)?;
        let body = json!({
            "file": doc.path,
            "newText": new_text,
            "patch": USER_PATCH_NOTE,
            "domain": self.config.domain,
            "projectPath": host.project_path(),
            "complianceTargets": self.config.compliance_targets,
        });
        self.client.send(paths::APPLY_PATCH, &body).await?.json()
    }

    /// Run a validation series for a chosen domain.
    pub async fn run_validation_pack<H: Host + ?Sized>(&self, host: &H) -> Result<ValidationReport> {
        report(host, "Validation pack", self.request_validation(host).await)
    }

    async fn request_validation<H: Host + ?Sized>(&self, host: &H) -> Result<ValidationReport> {
        let domain = host
            .pick("Select domain", VALIDATION_DOMAINS)
            .ok_or(Error::InputAborted)?;
        let default_series = format!("series-{}", Utc::now().timestamp_millis());
        let series_id = host
            .ask_text("Series ID (letters, numbers, dashes)", Some(&default_series))
            .filter(|s| !s.trim().is_empty())
            .ok_or(Error::InputAborted)?;
        let body = json!({
            "domain": domain,
            "path": host.project_path(),
            "seriesId": series_id,
        });
        let data: serde_json::Value = self.client.send(paths::VALIDATE_PACK, &body).await?.json()?;
        Ok(ValidationReport::from_response(&domain, &series_id, &data))
    }

    /// Enable or disable adaptive tuning. Returns the chosen state.
    pub async fn toggle_tuning<H: Host + ?Sized>(&self, host: &H) -> Result<bool> {
        let enabled = report(host, "Toggle", self.request_toggle(host).await)?;
        host.info("Tuning state updated.");
        Ok(enabled)
    }

    async fn request_toggle<H: Host + ?Sized>(&self, host: &H) -> Result<bool> {
        let choice = host
            .pick("AI Tuning", &["enable", "disable"])
            .ok_or(Error::InputAborted)?;
        let enabled = choice == "enable";
        let body = json!({
            "projectPath": host.project_path(),
            "enabled": enabled,
        });
        self.client.send(paths::TUNING_TOGGLE, &body).await?;
        Ok(enabled)
    }

    /// Reset adaptive tuning for the project.
    pub async fn reset_tuning<H: Host + ?Sized>(&self, host: &H) -> Result<()> {
        let body = json!({ "projectPath": host.project_path() });
        let result = self.client.send(paths::TUNING_RESET, &body).await.map(|_| ());

        report(host, "Reset", result)?;
        host.info("Tuning reset.");
        Ok(())
    }

    /// Record what the user did with a suggestion.
    pub async fn send_feedback<N: Notifier + ?Sized>(
        &self,
        notifier: &N,
        feedback: &Feedback,
    ) -> Result<()> {
        let result = self.client.send(paths::FEEDBACK, feedback).await.map(|_| ());

        report(notifier, "Feedback", result)?;
        notifier.info("Feedback recorded.");
        Ok(())
    }

    /// Open a timeline for the current project and draw it once.
    ///
    /// The controller is returned even if the first fetch fails; the error
    /// has already been shown and the view stays empty until a refresh.
    pub async fn show_timeline<H, V>(&self, host: &H, view: V) -> TimelineController<V>
    where
        H: Host + ?Sized,
        V: TimelineView,
    {
        let controller = TimelineController::new(self.client.clone(), host.project_path(), view);
        let _ = controller.refresh(host).await;
        controller
    }
}

/// Show a failure to the user unless they cancelled, and pass the result on.
fn report<T, N: Notifier + ?Sized>(notifier: &N, action: &str, result: Result<T>) -> Result<T> {
    match &result {
        Err(e) if e.is_aborted() => debug!(action, "cancelled by user"),
        Err(e) => notifier.error(&format!("{action} failed: {e}")),
        Ok(_) => {}
    }
    result
}
