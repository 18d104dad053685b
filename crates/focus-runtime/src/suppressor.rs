//! Notification suppressor.
//!
//! Installs or removes the host's per-resource notification override across
//! a set of open resources. A resource that rejects the call (closed, or not
//! scriptable) is logged and skipped; the loop always runs to the end.

use std::collections::BTreeSet;
use std::sync::Arc;

use focus_core::models::{Resource, ResourceId};

use crate::host::NotificationOverride;

/// Tracks which resources currently carry the override.
pub struct NotificationSuppressor {
    overrides: Arc<dyn NotificationOverride>,
    installed: BTreeSet<ResourceId>,
}

impl NotificationSuppressor {
    pub fn new(overrides: Arc<dyn NotificationOverride>) -> Self {
        Self {
            overrides,
            installed: BTreeSet::new(),
        }
    }

    /// Install on every resource in `resources`. Returns how many accepted.
    pub async fn install_all(&mut self, resources: &[Resource]) -> usize {
        let mut count = 0;
        for resource in resources {
            if self.install(resource.id).await {
                count += 1;
            }
        }
        tracing::debug!(installed = count, total = resources.len(), "notification override installed");
        count
    }

    /// Install on a single resource. Returns `false` if the resource refused.
    pub async fn install(&mut self, id: ResourceId) -> bool {
        match self.overrides.install(id).await {
            Ok(()) => {
                self.installed.insert(id);
                true
            }
            Err(e) => {
                tracing::warn!(resource = %id, error = %e, "skipping notification override");
                false
            }
        }
    }

    /// Remove from every resource in `resources`, whether or not this process
    /// installed it, then forget all installations.
    pub async fn remove_all(&mut self, resources: &[Resource]) -> usize {
        let mut count = 0;
        for resource in resources {
            match self.overrides.remove(resource.id).await {
                Ok(()) => count += 1,
                Err(e) => {
                    tracing::warn!(resource = %resource.id, error = %e, "failed to remove notification override")
                }
            }
        }
        self.installed.clear();
        tracing::debug!(removed = count, total = resources.len(), "notification override removed");
        count
    }

    /// Drop bookkeeping for a resource that no longer exists.
    pub fn forget(&mut self, id: ResourceId) {
        self.installed.remove(&id);
    }

    pub fn is_installed(&self, id: ResourceId) -> bool {
        self.installed.contains(&id)
    }

    pub fn installed_count(&self) -> usize {
        self.installed.len()
    }
}
