//! Domain layer for the focus-mode coordinator.
//!
//! Holds the persisted data model, user settings, URL classification and
//! sanitising, action-item extraction, and process configuration. Nothing
//! in this crate performs I/O against the host.

pub mod classifier;
pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod sanitizer;
pub mod settings;
pub mod time_utils;

pub use error::{FocusError, Result};
