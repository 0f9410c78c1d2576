//! View layer: structured rows in, markup or text out.
//!
//! Renderers only ever see [`TimelineRender`] / [`ValidationReport`] data.
//! All interpolated text is escaped, and the only message the rendered view
//! sends back to its controller is `{"type":"refresh"}`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::entry::{ComplianceCue, TimelineEntry};

/// Actions a row exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    Flag,
    Revert,
}

impl RowAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RowAction::Flag => "flag",
            RowAction::Revert => "revert",
        }
    }

    fn label(self) -> &'static str {
        match self {
            RowAction::Flag => "Flag",
            RowAction::Revert => "Revert",
        }
    }
}

/// One display row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRow {
    /// 1-based position in the backend's order.
    pub number: usize,
    pub kind: String,
    pub file: String,
    pub domain: String,
    pub message: String,
    pub cue: ComplianceCue,
    pub metric: Option<String>,
    pub short_hash: String,
    pub actions: Vec<RowAction>,
}

impl TimelineRow {
    pub fn from_entry(index: usize, entry: &TimelineEntry) -> Self {
        let mut actions = vec![RowAction::Flag];
        if entry.can_revert() {
            actions.push(RowAction::Revert);
        }
        Self {
            number: index + 1,
            kind: entry.kind.clone().unwrap_or_default(),
            file: entry.file.clone().unwrap_or_default(),
            domain: entry.domain.clone().unwrap_or_default(),
            message: entry.message.clone().unwrap_or_default(),
            cue: entry.compliance_cue(),
            metric: entry.metric(),
            short_hash: entry.short_hash().to_string(),
            actions,
        }
    }

    pub fn has_action(&self, action: RowAction) -> bool {
        self.actions.contains(&action)
    }
}

/// Everything a view needs to draw the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRender {
    pub project_path: String,
    pub rows: Vec<TimelineRow>,
}

impl TimelineRender {
    pub fn build(project_path: &str, entries: &[TimelineEntry]) -> Self {
        Self {
            project_path: project_path.to_string(),
            rows: entries
                .iter()
                .enumerate()
                .map(|(i, e)| TimelineRow::from_entry(i, e))
                .collect(),
        }
    }
}

/// Something that can display a rendered timeline.
pub trait TimelineView {
    fn show(&mut self, render: &TimelineRender);
}

/// Message from a rendered view back to its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewMessage {
    /// Re-fetch the log and re-render.
    Refresh,
}

impl ViewMessage {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Decode(format!("view message: {e}")))
    }
}

/// Escape text for HTML element and attribute contexts.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "body{font-family:sans-serif}table{width:100%;border-collapse:collapse}\
th,td{border:1px solid #ccc;padding:6px;font-size:12px}th{background:#f6f6f6}button{font-size:12px}";

// Row buttons carry data attributes for the host to bind; the script only
// knows how to ask for a refresh.
const SCRIPT: &str = "const vscode = acquireVsCodeApi();\n\
document.getElementById('refresh').addEventListener('click', () => vscode.postMessage({type:'refresh'}));\n";

/// Timeline as a standalone HTML document.
pub fn render_html(render: &TimelineRender) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!doctype html><html><head><meta charset=\"utf-8\" /><style>{STYLE}</style></head><body>\
         <h3>AI Timeline: {}</h3><button id=\"refresh\">Refresh</button>\
         <table><thead><tr><th>#</th><th>Type</th><th>File</th><th>Domain</th><th>Message</th>\
         <th>Cues</th><th>Metric</th><th>Hash</th><th>Actions</th></tr></thead><tbody>",
        escape_html(&render.project_path)
    );

    for row in &render.rows {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><code>{}</code></td>\
             <td>{}</td><td>{}</td><td>",
            row.number,
            escape_html(&row.kind),
            escape_html(&row.file),
            escape_html(&row.domain),
            escape_html(&row.message),
            row.cue,
            escape_html(row.metric.as_deref().unwrap_or("")),
            escape_html(&row.short_hash),
        );
        for action in &row.actions {
            let _ = write!(
                html,
                "<button data-action=\"{}\" data-index=\"{}\">{}</button>",
                action.as_str(),
                row.number - 1,
                action.label()
            );
        }
        html.push_str("</td></tr>");
    }

    let _ = write!(html, "</tbody></table><script>\n{SCRIPT}</script></body></html>");
    html
}

/// Timeline as a fixed-width text table.
pub fn render_text(render: &TimelineRender) -> String {
    if render.rows.is_empty() {
        return format!("No timeline events for {}.\n", display_project(&render.project_path));
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<4}  {:<18}  {:<30}  {:<10}  {:<16}  {:<10}  {:<8}  ACTIONS",
        "#", "TYPE", "FILE", "DOMAIN", "CUES", "METRIC", "HASH"
    );
    let _ = writeln!(out, "{}", "-".repeat(120));

    for row in &render.rows {
        let actions: Vec<_> = row.actions.iter().map(|a| a.as_str()).collect();
        let _ = writeln!(
            out,
            "{:<4}  {:<18}  {:<30}  {:<10}  {:<16}  {:<10}  {:<8}  {}",
            row.number,
            clip(&row.kind, 18),
            clip(&row.file, 30),
            clip(&row.domain, 10),
            row.cue.to_string(),
            clip(row.metric.as_deref().unwrap_or("-"), 10),
            row.short_hash,
            actions.join(",")
        );
        if !row.message.is_empty() {
            let _ = writeln!(out, "      {}", row.message);
        }
    }

    let _ = writeln!(out, "\n{} event(s)", render.rows.len());
    out
}

/// Result of a validation series, as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub domain: String,
    pub series_id: String,
    pub summary: serde_json::Value,
    pub artifacts: Vec<String>,
}

impl ValidationReport {
    /// Build from a `/validate_pack` response; missing parts become empty.
    pub fn from_response(domain: &str, series_id: &str, body: &serde_json::Value) -> Self {
        let summary = body
            .pointer("/index/summary")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        let artifacts = body
            .pointer("/index/artifacts")
            .and_then(|a| a.as_array())
            .map(|items| {
                items
                    .iter()
                    .map(|a| match a.as_str() {
                        Some(s) => s.to_string(),
                        None => a.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            domain: domain.to_string(),
            series_id: series_id.to_string(),
            summary,
            artifacts,
        }
    }

    fn summary_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.summary).unwrap_or_else(|_| self.summary.to_string())
    }
}

/// Validation report as a static HTML document (no scripts).
pub fn render_validation_html(report: &ValidationReport) -> String {
    let mut html = String::from(
        "<!doctype html><html><head><meta charset=\"utf-8\"><style>body{font-family: sans-serif;padding:16px} \
         pre{background:#f5f5f5;padding:8px;border-radius:4px}</style></head><body><h2>Validation Pack</h2>",
    );
    let _ = write!(
        html,
        "<p><b>Domain:</b> {}</p><p><b>Series:</b> {}</p><h3>Summary</h3><pre>{}</pre><h3>Artifacts</h3><ul>",
        escape_html(&report.domain),
        escape_html(&report.series_id),
        escape_html(&report.summary_pretty()),
    );
    for artifact in &report.artifacts {
        let _ = write!(html, "<li>{}</li>", escape_html(artifact));
    }
    html.push_str("</ul><p>Artifacts are saved on disk at the listed paths.</p></body></html>");
    html
}

/// Validation report as plain text.
pub fn render_validation_text(report: &ValidationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Domain:     {}", report.domain);
    let _ = writeln!(out, "Series:     {}", report.series_id);
    let _ = writeln!(out, "Summary:\n{}", report.summary_pretty());
    let _ = writeln!(out, "Artifacts:");
    if report.artifacts.is_empty() {
        let _ = writeln!(out, "  -");
    }
    for artifact in &report.artifacts {
        let _ = writeln!(out, "  {artifact}");
    }
    out
}

fn display_project(path: &str) -> &str {
    if path.is_empty() { "(no workspace)" } else { path }
}

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let kept: String = s.chars().take(width.saturating_sub(1)).collect();
        format!("{kept}~")
    }
}
