//! Boundary to the editor host.
//!
//! Prompts, notifications, workspace discovery, and view display are owned
//! by the host. The core only talks to them through these traits, so a
//! terminal, an editor bridge, or a scripted test double can stand in.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Interactive input. `None` / `false` means the user withheld the input.
pub trait Prompter {
    fn ask_text(&self, prompt: &str, default: Option<&str>) -> Option<String>;
    fn confirm(&self, prompt: &str) -> bool;
    fn pick(&self, placeholder: &str, options: &[&str]) -> Option<String>;
}

/// User-visible messages.
pub trait Notifier {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// The document currently focused in the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Resource identifier, e.g. `file:///src/main.rs`.
    pub uri: String,
    /// Filesystem path, sent to the backend as `file`.
    pub path: String,
    pub text: String,
}

/// Workspace and editor state.
pub trait Workspace {
    fn active_document(&self) -> Option<Document>;
    /// First workspace folder, if one is open.
    fn root(&self) -> Option<PathBuf>;

    /// Project path sent with requests; empty when no folder is open.
    fn project_path(&self) -> String {
        self.root()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn require_document(&self) -> Result<Document> {
        self.active_document()
            .ok_or(Error::NoActiveContext("editor"))
    }
}

/// Everything a command needs from the host.
pub trait Host: Prompter + Notifier + Workspace {}

impl<T: Prompter + Notifier + Workspace + ?Sized> Host for T {}
