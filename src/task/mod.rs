//! Task lifecycle management for Taskrail.
//!
//! Tasks form a two-level hierarchy (a task may reference one parent).
//! Status transitions carry cascade rules between parents and children,
//! every mutation appends to an immutable history log, and a background
//! sweep promotes the priority of tasks approaching their deadlines. The
//! module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
