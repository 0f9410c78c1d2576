//! # refactor-relay
//!
//! Client-side capture and audit for the refactor analysis backend.
//!
//! Relays editor activity to the backend as fire-and-forget events, sends
//! explicit user requests (suggestions, patches, validation runs, tuning),
//! and drives an interactive audit timeline with flag and revert actions.
//! Every request tries the primary backend port first and falls back to the
//! secondary one when nothing is listening.

pub mod capture;
pub mod commands;
pub mod config;
pub mod delivery;
pub mod error;
pub mod event;
pub mod host;
pub mod telemetry;
pub mod timeline;
