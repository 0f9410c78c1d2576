//! Activity capture: editor activity in, event records out.

pub mod activity;
pub mod state;

pub use activity::{Activity, ActivityCapture};
pub use state::{CapturePhase, CaptureState};
