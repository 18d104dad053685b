//! Async runtime for the focus-mode coordinator.
//!
//! Wires the domain layer in [`focus_core`] to the host through capability
//! traits, persists state through a key-value store, runs the timers, and
//! serialises every inbound event through a single coordinator task.

pub mod coordinator;
pub mod dispatcher;
mod focus;
pub mod host;
pub mod lifecycle;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod suppressor;

pub use coordinator::{Coordinator, CoordinatorOptions, StatusReport};
pub use dispatcher::{Command, Response};
pub use lifecycle::ResourceEvent;
pub use service::{CoordinatorHandle, CoordinatorService, ServiceTask};

pub use focus_core as core;
