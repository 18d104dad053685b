//! In-process host that keeps its resources in memory.
//!
//! Every outbound call is recorded so callers can inspect what the
//! coordinator asked for. The headless binary drives it from stdin.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use focus_core::models::{Notification, Resource, ResourceId};
use focus_core::{FocusError, Result};

use super::{NotificationOverride, NotificationSink, ResourceManager, StatusSurface};

// ── Internal state ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Entry {
    resource: Resource,
    hidden: bool,
    text: String,
    /// Resources that refuse scripting reject override installation.
    scriptable: bool,
    override_installed: bool,
    blocked_notifications: usize,
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<ResourceId, Entry>,
    focused: Option<ResourceId>,
    notifications: Vec<Notification>,
    hide_calls: Vec<Vec<ResourceId>>,
    show_calls: Vec<Vec<ResourceId>>,
    navigations: Vec<(ResourceId, String)>,
    state_messages: Vec<(ResourceId, bool)>,
    ui_broadcasts: Vec<bool>,
    indicator: bool,
    clipboard: Option<String>,
}

// ── MemoryHost ────────────────────────────────────────────────────────────────

/// Host double implementing every capability trait.
#[derive(Debug, Default)]
pub struct MemoryHost {
    inner: Mutex<Inner>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // ── Driving the host ──────────────────────────────────────────────────

    /// Open a resource (visible, scriptable, no text).
    pub fn open(&self, resource: Resource) {
        let mut inner = self.lock();
        inner.entries.insert(
            resource.id,
            Entry {
                resource,
                hidden: false,
                text: String::new(),
                scriptable: true,
                override_installed: false,
                blocked_notifications: 0,
            },
        );
    }

    pub fn close(&self, id: ResourceId) {
        let mut inner = self.lock();
        inner.entries.remove(&id);
        if inner.focused == Some(id) {
            inner.focused = None;
        }
    }

    /// Navigate a resource from the user's side. Navigation drops any
    /// installed override, as a page load would.
    pub fn set_url(&self, id: ResourceId, url: &str) {
        if let Some(entry) = self.lock().entries.get_mut(&id) {
            entry.resource.url = url.to_string();
            entry.override_installed = false;
        }
    }

    pub fn set_text(&self, id: ResourceId, text: &str) {
        if let Some(entry) = self.lock().entries.get_mut(&id) {
            entry.text = text.to_string();
        }
    }

    pub fn set_scriptable(&self, id: ResourceId, scriptable: bool) {
        if let Some(entry) = self.lock().entries.get_mut(&id) {
            entry.scriptable = scriptable;
        }
    }

    pub fn set_focused(&self, id: Option<ResourceId>) {
        self.lock().focused = id;
    }

    /// A resource tries to raise its own notification. Returns `true` when it
    /// would be shown, `false` when the override swallowed it.
    pub fn page_notification(&self, id: ResourceId, title: &str) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.entries.get_mut(&id) else {
            return false;
        };
        if entry.override_installed {
            entry.blocked_notifications += 1;
            tracing::debug!(resource = %id, title, "blocked resource notification");
            false
        } else {
            true
        }
    }

    // ── Inspection ────────────────────────────────────────────────────────

    pub fn is_hidden(&self, id: ResourceId) -> bool {
        self.lock().entries.get(&id).is_some_and(|e| e.hidden)
    }

    pub fn has_override(&self, id: ResourceId) -> bool {
        self.lock()
            .entries
            .get(&id)
            .is_some_and(|e| e.override_installed)
    }

    pub fn blocked_count(&self, id: ResourceId) -> usize {
        self.lock()
            .entries
            .get(&id)
            .map_or(0, |e| e.blocked_notifications)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    /// Notifications whose title or message contains `needle`.
    pub fn notifications_matching(&self, needle: &str) -> Vec<Notification> {
        self.lock()
            .notifications
            .iter()
            .filter(|n| n.title.contains(needle) || n.message.contains(needle))
            .cloned()
            .collect()
    }

    pub fn hide_calls(&self) -> Vec<Vec<ResourceId>> {
        self.lock().hide_calls.clone()
    }

    pub fn show_calls(&self) -> Vec<Vec<ResourceId>> {
        self.lock().show_calls.clone()
    }

    pub fn navigations(&self) -> Vec<(ResourceId, String)> {
        self.lock().navigations.clone()
    }

    pub fn state_messages(&self) -> Vec<(ResourceId, bool)> {
        self.lock().state_messages.clone()
    }

    pub fn ui_broadcasts(&self) -> Vec<bool> {
        self.lock().ui_broadcasts.clone()
    }

    pub fn indicator(&self) -> bool {
        self.lock().indicator
    }

    pub fn clipboard(&self) -> Option<String> {
        self.lock().clipboard.clone()
    }
}

fn missing(id: ResourceId) -> FocusError {
    FocusError::resource(id, "no such resource")
}

// ── Capability impls ──────────────────────────────────────────────────────────

#[async_trait]
impl ResourceManager for MemoryHost {
    async fn list(&self) -> Result<Vec<Resource>> {
        Ok(self
            .lock()
            .entries
            .values()
            .map(|e| e.resource.clone())
            .collect())
    }

    async fn focused(&self) -> Result<Option<Resource>> {
        let inner = self.lock();
        Ok(inner
            .focused
            .and_then(|id| inner.entries.get(&id))
            .map(|e| e.resource.clone()))
    }

    async fn get(&self, id: ResourceId) -> Result<Option<Resource>> {
        Ok(self.lock().entries.get(&id).map(|e| e.resource.clone()))
    }

    async fn hide(&self, ids: &[ResourceId]) -> Result<()> {
        let mut inner = self.lock();
        inner.hide_calls.push(ids.to_vec());
        if let Some(id) = ids.iter().find(|id| !inner.entries.contains_key(*id)) {
            return Err(missing(*id));
        }
        for id in ids {
            if let Some(entry) = inner.entries.get_mut(id) {
                entry.hidden = true;
            }
        }
        Ok(())
    }

    async fn show(&self, ids: &[ResourceId]) -> Result<()> {
        let mut inner = self.lock();
        inner.show_calls.push(ids.to_vec());
        if let Some(id) = ids.iter().find(|id| !inner.entries.contains_key(*id)) {
            return Err(missing(*id));
        }
        for id in ids {
            if let Some(entry) = inner.entries.get_mut(id) {
                entry.hidden = false;
            }
        }
        Ok(())
    }

    async fn navigate(&self, id: ResourceId, url: &str) -> Result<()> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(&id).ok_or_else(|| missing(id))?;
        entry.resource.url = url.to_string();
        entry.override_installed = false;
        inner.navigations.push((id, url.to_string()));
        Ok(())
    }

    async fn read_text(&self, id: ResourceId) -> Result<String> {
        self.lock()
            .entries
            .get(&id)
            .map(|e| e.text.clone())
            .ok_or_else(|| missing(id))
    }

    async fn send_state(&self, id: ResourceId, active: bool) -> Result<()> {
        let mut inner = self.lock();
        if !inner.entries.contains_key(&id) {
            return Err(missing(id));
        }
        inner.state_messages.push((id, active));
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for MemoryHost {
    async fn create(&self, notification: Notification) -> Result<()> {
        tracing::info!(
            title = %notification.title,
            severity = ?notification.severity,
            "{}",
            notification.message
        );
        self.lock().notifications.push(notification);
        Ok(())
    }
}

#[async_trait]
impl NotificationOverride for MemoryHost {
    async fn install(&self, id: ResourceId) -> Result<()> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(&id).ok_or_else(|| missing(id))?;
        if !entry.scriptable {
            return Err(FocusError::resource(id, "scripting not allowed"));
        }
        entry.override_installed = true;
        Ok(())
    }

    async fn remove(&self, id: ResourceId) -> Result<()> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(&id).ok_or_else(|| missing(id))?;
        entry.override_installed = false;
        Ok(())
    }
}

#[async_trait]
impl StatusSurface for MemoryHost {
    async fn set_indicator(&self, on: bool) -> Result<()> {
        self.lock().indicator = on;
        Ok(())
    }

    async fn broadcast(&self, active: bool) -> Result<()> {
        self.lock().ui_broadcasts.push(active);
        Ok(())
    }

    async fn write_clipboard(&self, text: &str) -> Result<()> {
        self.lock().clipboard = Some(text.to_string());
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
