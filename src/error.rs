//! Error types for refactor-relay.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Nobody answered on the target: connection refused, DNS failure, timeout.
    #[error("backend unreachable at {target}: {message}")]
    Transport { target: String, message: String },

    /// The peer answered with a non-success status.
    #[error("server returned {status} from {target}{}", fmt_body(.body))]
    Protocol {
        target: String,
        status: u16,
        body: String,
    },

    /// The user withheld required input (reason, confirmation, selection).
    #[error("input withheld, action cancelled")]
    InputAborted,

    #[error("no active {0}")]
    NoActiveContext(&'static str),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this failure means the target was not listening, so another
    /// candidate is worth trying.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Whether the user cancelled. These are not reported as failures.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::InputAborted)
    }
}

fn fmt_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
