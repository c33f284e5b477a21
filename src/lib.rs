//! Taskrail: multi-tenant task tracking core.
//!
//! This crate provides the coordination layer of a task tracking backend:
//! cascading status transitions across task hierarchies, deadline-driven
//! priority escalation, role- and time-aware access evaluation, and
//! abusive-traffic mitigation (rate limiting, IP blocking, CAPTCHA
//! challenges).
//!
//! # Architecture
//!
//! Taskrail follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory stores,
//!   notification buses)
//!
//! # Modules
//!
//! - [`principal`]: Authenticated identities and roles
//! - [`task`]: Task lifecycle, cascades, history, and escalation
//! - [`access`]: Per-request authorization rules
//! - [`security`]: Rate limiting and IP threat mitigation

pub mod access;
pub mod principal;
pub mod security;
pub mod task;

#[cfg(test)]
pub(crate) mod testutil;
