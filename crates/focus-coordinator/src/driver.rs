//! Newline-delimited JSON driver for the headless coordinator.
//!
//! Each stdin line is either a command (`{"action": ...}`), answered with one
//! JSON line on stdout, or a host event (`{"event": ...}`) that updates the
//! in-memory host and, for lifecycle events, is forwarded to the coordinator.

use focus_core::models::{Resource, ResourceId};
use focus_runtime::host::memory::MemoryHost;
use focus_runtime::{CoordinatorHandle, ResourceEvent, Response};
use serde::Deserialize;
use serde_json::Value;

/// Events that simulate the resource manager.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum HostEvent {
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
    #[serde(rename_all = "camelCase")]
    Focused {
        resource_id: Option<ResourceId>,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        resource_id: ResourceId,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Scriptable {
        resource_id: ResourceId,
        scriptable: bool,
    },
}

/// Process one input line. Returns the JSON to print, if any.
pub async fn handle_line(
    line: &str,
    host: &MemoryHost,
    coordinator: &CoordinatorHandle,
) -> anyhow::Result<Option<Value>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed input line");
            let response = Response::error(format!("Invalid request: {e}"));
            return Ok(Some(serde_json::to_value(response)?));
        }
    };

    if value.get("event").is_some() {
        match serde_json::from_value::<HostEvent>(value) {
            Ok(event) => apply_event(event, host, coordinator).await?,
            Err(e) => tracing::warn!(error = %e, "ignoring malformed host event"),
        }
        return Ok(None);
    }

    let response = coordinator.request_value(value).await?;
    Ok(Some(serde_json::to_value(response)?))
}

async fn apply_event(
    event: HostEvent,
    host: &MemoryHost,
    coordinator: &CoordinatorHandle,
) -> anyhow::Result<()> {
    let forwarded = match event {
        HostEvent::Created { resource } => {
            host.open(resource.clone());
            Some(ResourceEvent::Created { resource })
        }
        HostEvent::UrlChanged { resource_id, url } => {
            host.set_url(resource_id, &url);
            Some(ResourceEvent::UrlChanged { resource_id, url })
        }
        HostEvent::Removed { resource_id } => {
            host.close(resource_id);
            Some(ResourceEvent::Removed { resource_id })
        }
        HostEvent::Focused { resource_id } => {
            host.set_focused(resource_id);
            None
        }
        HostEvent::Text { resource_id, text } => {
            host.set_text(resource_id, &text);
            None
        }
        HostEvent::Scriptable {
            resource_id,
            scriptable,
        } => {
            host.set_scriptable(resource_id, scriptable);
            None
        }
    };

    if let Some(event) = forwarded {
        coordinator.resource_event(event).await?;
    }
    Ok(())
}
