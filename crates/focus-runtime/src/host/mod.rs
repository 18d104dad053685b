//! Capability interfaces onto the host environment.
//!
//! The coordinator never talks to a browser, desktop shell or OS directly;
//! it goes through these traits. [`memory::MemoryHost`] implements all of
//! them in-process and is used by the headless binary and by tests.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use focus_core::models::{Notification, Resource, ResourceId};
use focus_core::Result;

/// Enumerates, hides, shows and talks to open resources.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// Every currently open resource.
    async fn list(&self) -> Result<Vec<Resource>>;

    /// The resource the user is looking at, if any.
    async fn focused(&self) -> Result<Option<Resource>>;

    async fn get(&self, id: ResourceId) -> Result<Option<Resource>>;

    /// Bulk hide. Fails as a whole if any id is rejected.
    async fn hide(&self, ids: &[ResourceId]) -> Result<()>;

    /// Bulk show. Fails as a whole if any id is rejected.
    async fn show(&self, ids: &[ResourceId]) -> Result<()>;

    async fn navigate(&self, id: ResourceId, url: &str) -> Result<()>;

    /// Visible text of the resource, for action extraction.
    async fn read_text(&self, id: ResourceId) -> Result<String>;

    /// Deliver a focus-state change to the resource's listener.
    async fn send_state(&self, id: ResourceId, active: bool) -> Result<()>;
}

/// Displays user-facing alerts.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create(&self, notification: Notification) -> Result<()>;
}

/// Installs and removes the per-resource hook that swallows
/// resource-originated notifications.
#[async_trait]
pub trait NotificationOverride: Send + Sync {
    async fn install(&self, id: ResourceId) -> Result<()>;

    /// Restore the original behaviour if an override is present.
    async fn remove(&self, id: ResourceId) -> Result<()>;
}

/// Indicator, UI broadcast and clipboard.
#[async_trait]
pub trait StatusSurface: Send + Sync {
    async fn set_indicator(&self, on: bool) -> Result<()>;

    /// Tell any listening UI about a focus-state change.
    async fn broadcast(&self, active: bool) -> Result<()>;

    async fn write_clipboard(&self, text: &str) -> Result<()>;
}

/// The full set of host capabilities handed to the coordinator.
#[derive(Clone)]
pub struct Host {
    pub resources: Arc<dyn ResourceManager>,
    pub notifications: Arc<dyn NotificationSink>,
    pub overrides: Arc<dyn NotificationOverride>,
    pub surface: Arc<dyn StatusSurface>,
}

impl Host {
    /// Use one object for every capability.
    pub fn from_shared<T>(host: Arc<T>) -> Self
    where
        T: ResourceManager + NotificationSink + NotificationOverride + StatusSurface + 'static,
    {
        Self {
            resources: host.clone(),
            notifications: host.clone(),
            overrides: host.clone(),
            surface: host,
        }
    }
}
