//! Resilient delivery of payloads to the analysis backend.
//!
//! Every request goes to an ordered list of candidate targets. Transport
//! failures fall through to the next candidate; a peer that answers with an
//! error status ends the send.

pub mod client;
pub mod endpoint;

pub use client::{AttemptOutcome, DeliveryAttempt, DeliveryClient, DeliveryMode, Response};
pub use endpoint::{Endpoint, Endpoints, RetryPolicy, TargetRole};

/// Backend paths consumed by this crate.
pub mod paths {
    pub const EVENT: &str = "/event";
    pub const SUGGEST: &str = "/suggest";
    pub const WORKSPACE_ANALYSIS: &str = "/workspace_analysis";
    pub const APPLY_PATCH: &str = "/apply_patch";
    pub const VALIDATE_PACK: &str = "/validate_pack";
    pub const TIMELINE: &str = "/timeline";
    pub const FLAG_STEP: &str = "/flag_step";
    pub const REVERT_STEP: &str = "/revert_step";
    pub const TUNING_TOGGLE: &str = "/tuning_toggle";
    pub const TUNING_RESET: &str = "/tuning_reset";
    pub const FEEDBACK: &str = "/feedback";
}
