//! Resource lifecycle monitor.
//!
//! Keeps `hiddenResources` in step with resources that open, navigate and
//! close while the coordinator is running.

use focus_core::classifier;
use focus_core::models::{Resource, ResourceId};
use focus_core::Result;
use serde::{Deserialize, Serialize};

use crate::coordinator::Coordinator;

/// Event reported by the resource manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ResourceEvent {
    Created {
        resource: Resource,
    },
    #[serde(rename_all = "camelCase")]
    UrlChanged {
        resource_id: ResourceId,
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    Removed {
        resource_id: ResourceId,
    },
}

impl Coordinator {
    /// Apply a lifecycle event. State is persisted only when the hidden set
    /// changed.
    pub async fn on_resource_event(&mut self, event: ResourceEvent) -> Result<()> {
        match event {
            ResourceEvent::Created { resource } => self.resource_created(resource).await,
            ResourceEvent::UrlChanged { resource_id, url } => {
                self.resource_navigated(resource_id, &url).await
            }
            ResourceEvent::Removed { resource_id } => self.resource_removed(resource_id).await,
        }
    }

    async fn resource_created(&mut self, resource: Resource) -> Result<()> {
        if !self.state.active {
            return Ok(());
        }

        if self.state.settings.hide_notifications {
            self.suppressor.install(resource.id).await;
        }

        if classifier::is_personal(&resource.url, &self.state.settings) {
            tracing::debug!(resource = %resource.id, url = %resource.url, "new personal resource");
            if self.hide_resources(&[resource.id]).await > 0 {
                return self.persist().await;
            }
        }
        Ok(())
    }

    async fn resource_navigated(&mut self, id: ResourceId, url: &str) -> Result<()> {
        if !self.state.active {
            return Ok(());
        }

        // Navigation drops any override that was installed on the old page.
        if self.state.settings.hide_notifications {
            self.suppressor.install(id).await;
        }

        let personal = classifier::is_personal(url, &self.state.settings);
        let hidden = self.state.is_hidden(id);
        let changed = match (personal, hidden) {
            (true, false) => {
                tracing::debug!(resource = %id, url, "resource navigated to personal domain");
                self.hide_resources(&[id]).await > 0
            }
            (false, true) => {
                tracing::debug!(resource = %id, url, "resource navigated away from personal domain");
                self.show_resources(&[id]).await > 0
            }
            _ => false,
        };

        if changed {
            self.persist().await?;
        }
        Ok(())
    }

    async fn resource_removed(&mut self, id: ResourceId) -> Result<()> {
        self.suppressor.forget(id);
        if self.state.hidden_resources.remove(&id) {
            tracing::debug!(resource = %id, "closed resource dropped from hidden set");
            self.persist().await?;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::coordinator::CoordinatorOptions;
    use crate::host::memory::MemoryHost;
    use crate::host::Host;
    use crate::scheduler::Scheduler;
    use crate::store::{MemoryStore, StateStore};

    async fn setup() -> (Coordinator, Arc<MemoryHost>, Arc<MemoryStore>) {
        let host = Arc::new(MemoryHost::new());
        let kv = Arc::new(MemoryStore::new());
        let (scheduler, _rx) = Scheduler::channel();
        let coordinator = Coordinator::load(
            Host::from_shared(host.clone()),
            StateStore::new(kv.clone()),
            scheduler,
            CoordinatorOptions::default(),
        )
        .await
        .unwrap();
        (coordinator, host, kv)
    }

    /// Open a resource on the host and report it to the coordinator.
    async fn create(c: &mut Coordinator, host: &MemoryHost, id: u64, url: &str) {
        let resource = Resource::new(id, url);
        host.open(resource.clone());
        c.on_resource_event(ResourceEvent::Created { resource })
            .await
            .unwrap();
    }

    async fn navigate(c: &mut Coordinator, host: &MemoryHost, id: u64, url: &str) {
        host.set_url(ResourceId(id), url);
        c.on_resource_event(ResourceEvent::UrlChanged {
            resource_id: ResourceId(id),
            url: url.to_string(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_created_ignored_while_inactive() {
        let (mut c, host, _) = setup().await;
        create(&mut c, &host, 1, "https://facebook.com").await;

        assert!(c.state().hidden_resources.is_empty());
        assert!(!host.is_hidden(ResourceId(1)));
        assert!(host.hide_calls().is_empty());
    }

    #[tokio::test]
    async fn test_created_personal_hidden_while_active() {
        let (mut c, host, _) = setup().await;
        c.activate().await.unwrap();

        create(&mut c, &host, 1, "https://www.reddit.com/r/all").await;
        create(&mut c, &host, 2, "https://gitlab.com/group").await;

        assert!(c.state().is_hidden(ResourceId(1)));
        assert!(!c.state().is_hidden(ResourceId(2)));
        assert!(host.is_hidden(ResourceId(1)));
        assert!(host.has_override(ResourceId(2)));
    }

    #[tokio::test]
    async fn test_url_change_is_symmetric() {
        let (mut c, host, _) = setup().await;
        c.activate().await.unwrap();
        create(&mut c, &host, 1, "https://facebook.com/a").await;

        navigate(&mut c, &host, 1, "https://github.com/b").await;
        assert!(!c.state().is_hidden(ResourceId(1)));
        assert!(!host.is_hidden(ResourceId(1)));

        navigate(&mut c, &host, 1, "https://facebook.com/c").await;
        assert_eq!(
            c.state().hidden_resources.iter().copied().collect::<Vec<_>>(),
            vec![ResourceId(1)]
        );
        assert!(host.is_hidden(ResourceId(1)));
    }

    #[tokio::test]
    async fn test_url_change_within_personal_does_not_rehide() {
        let (mut c, host, _) = setup().await;
        c.activate().await.unwrap();
        create(&mut c, &host, 1, "https://facebook.com/a").await;
        let hides = host.hide_calls().len();

        navigate(&mut c, &host, 1, "https://twitter.com/b").await;

        assert_eq!(host.hide_calls().len(), hides);
        assert!(c.state().is_hidden(ResourceId(1)));
    }

    #[tokio::test]
    async fn test_navigation_reinstalls_override() {
        let (mut c, host, _) = setup().await;
        c.activate().await.unwrap();
        create(&mut c, &host, 1, "https://github.com").await;

        navigate(&mut c, &host, 1, "https://gitlab.com").await;

        assert!(host.has_override(ResourceId(1)));
    }

    #[tokio::test]
    async fn test_removed_discards_id_even_when_inactive() {
        let (mut c, host, kv) = setup().await;
        c.activate().await.unwrap();
        create(&mut c, &host, 1, "https://facebook.com").await;

        // Simulate state left behind by a crash while active.
        c.state.active = false;
        host.close(ResourceId(1));
        c.on_resource_event(ResourceEvent::Removed {
            resource_id: ResourceId(1),
        })
        .await
        .unwrap();

        assert!(c.state().hidden_resources.is_empty());
        assert_eq!(kv.raw("hiddenResources"), Some(serde_json::json!([])));
    }

    #[tokio::test]
    async fn test_removed_unknown_id_does_not_persist() {
        let (mut c, _, kv) = setup().await;
        c.on_resource_event(ResourceEvent::Removed {
            resource_id: ResourceId(42),
        })
        .await
        .unwrap();
        assert!(kv.raw("hiddenResources").is_none());
    }

    #[test]
    fn test_event_wire_format() {
        let event: ResourceEvent = serde_json::from_str(
            r#"{"event":"url-changed","resourceId":3,"url":"https://x.com"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ResourceEvent::UrlChanged {
                resource_id: ResourceId(3),
                url: "https://x.com".into()
            }
        );

        let event: ResourceEvent = serde_json::from_str(
            r#"{"event":"created","resource":{"id":5,"url":"https://a.io"}}"#,
        )
        .unwrap();
        assert!(matches!(event, ResourceEvent::Created { resource } if resource.id == ResourceId(5)));
    }
}
