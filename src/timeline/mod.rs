//! Audit timeline: fetch the backend's event log, render it, and route
//! flag/revert actions back to the backend.

pub mod controller;
pub mod entry;
pub mod view;

pub use controller::TimelineController;
pub use entry::{ComplianceCue, TimelineEntry, parse_timeline};
pub use view::{
    RowAction, TimelineRender, TimelineRow, TimelineView, ValidationReport, ViewMessage,
};
