//! Capture on/off flag.
//!
//! Constructed once per process and shared by handle between the start
//! command and activity capture. Starts stopped; the only transition is to
//! started, and there is no way back within a session.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Phase of the capture flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePhase {
    /// Initial. Activity is ignored.
    Stopped,
    /// Activity is relayed. Terminal for the session.
    Started,
}

impl CapturePhase {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: CapturePhase) -> bool {
        matches!((self, to), (CapturePhase::Stopped, CapturePhase::Started))
    }
}

impl std::fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapturePhase::Stopped => f.write_str("stopped"),
            CapturePhase::Started => f.write_str("started"),
        }
    }
}

/// Process-lifetime capture flag. Single writer (the start action), read on
/// every activity callback.
#[derive(Debug, Default)]
pub struct CaptureState {
    started: AtomicBool,
}

impl CaptureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `Started`. Returns `true` if this call made the transition,
    /// `false` if capture was already running.
    pub fn start(&self) -> bool {
        if !self.phase().can_transition_to(CapturePhase::Started) {
            return false;
        }
        !self.started.swap(true, Ordering::AcqRel)
    }

    pub fn phase(&self) -> CapturePhase {
        if self.started.load(Ordering::Acquire) {
            CapturePhase::Started
        } else {
            CapturePhase::Stopped
        }
    }

    pub fn is_started(&self) -> bool {
        self.phase() == CapturePhase::Started
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_stopped_and_stays_started() {
        let state = CaptureState::new();
        assert_eq!(state.phase(), CapturePhase::Stopped);

        assert!(state.start());
        assert_eq!(state.phase(), CapturePhase::Started);

        // A second start is a no-op.
        assert!(!state.start());
        assert!(state.is_started());
    }

    #[test]
    fn no_transition_back_to_stopped() {
        assert!(CapturePhase::Stopped.can_transition_to(CapturePhase::Started));
        assert!(!CapturePhase::Started.can_transition_to(CapturePhase::Stopped));
        assert!(!CapturePhase::Started.can_transition_to(CapturePhase::Started));
    }
}
