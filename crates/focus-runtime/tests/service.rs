//! End-to-end tests of the coordinator service against the in-memory host.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use focus_core::models::{Resource, ResourceId};
use focus_core::time_utils::Clock;
use focus_runtime::host::memory::MemoryHost;
use focus_runtime::host::Host;
use focus_runtime::store::{MemoryStore, StateStore};
use focus_runtime::{
    CoordinatorHandle, CoordinatorOptions, CoordinatorService, ResourceEvent, Response,
    ServiceTask,
};
use serde_json::{json, Value};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()
}

/// Wall clock that starts at `t0()` and moves with tokio time, so paused
/// tests see timers and timestamps advance together.
struct RuntimeClock {
    origin: tokio::time::Instant,
}

impl Clock for RuntimeClock {
    fn now(&self) -> DateTime<Utc> {
        t0() + Duration::from_std(self.origin.elapsed()).unwrap_or_else(|_| Duration::zero())
    }
}

struct Harness {
    handle: CoordinatorHandle,
    task: ServiceTask,
    host: Arc<MemoryHost>,
    kv: Arc<MemoryStore>,
}

impl Harness {
    async fn start() -> Self {
        Self::start_with(Arc::new(MemoryHost::new()), Arc::new(MemoryStore::new())).await
    }

    async fn start_with(host: Arc<MemoryHost>, kv: Arc<MemoryStore>) -> Self {
        let (handle, task) = CoordinatorService::start(
            Host::from_shared(host.clone()),
            StateStore::new(kv.clone()),
            CoordinatorOptions {
                clock: Arc::new(RuntimeClock {
                    origin: tokio::time::Instant::now(),
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        Self {
            handle,
            task,
            host,
            kv,
        }
    }

    async fn send(&self, request: Value) -> Value {
        let response = self.handle.request_value(request).await.unwrap();
        serde_json::to_value(response).unwrap()
    }

    async fn status(&self) -> Value {
        self.send(json!({"action": "get-status"})).await
    }

    /// Open a resource on the host and report it.
    async fn open(&self, id: u64, url: &str) {
        let resource = Resource::new(id, url);
        self.host.open(resource.clone());
        self.handle
            .resource_event(ResourceEvent::Created { resource })
            .await
            .unwrap();
    }

    async fn navigate(&self, id: u64, url: &str) {
        self.host.set_url(ResourceId(id), url);
        self.handle
            .resource_event(ResourceEvent::UrlChanged {
                resource_id: ResourceId(id),
                url: url.to_string(),
            })
            .await
            .unwrap();
    }

    async fn close(&self, id: u64) {
        self.host.close(ResourceId(id));
        self.handle
            .resource_event(ResourceEvent::Removed {
                resource_id: ResourceId(id),
            })
            .await
            .unwrap();
    }

    /// Ids recorded in the persisted hidden set.
    fn stored_hidden(&self) -> BTreeSet<u64> {
        self.kv
            .raw("hiddenResources")
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    async fn stop(self) {
        self.handle.shutdown().await.unwrap();
        self.task.join().await;
    }
}

// ── Focus mode ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn activation_hides_personal_and_leaves_work_untouched() {
    let h = Harness::start().await;
    h.host.open(Resource::new(1, "https://facebook.com/x"));
    h.host.open(Resource::new(2, "https://github.com/y"));

    let response = h
        .send(json!({"action": "toggle-focus-mode", "enable": true}))
        .await;

    assert_eq!(response, json!({"success": true}));
    assert_eq!(h.stored_hidden(), BTreeSet::from([1]));
    assert!(h.host.is_hidden(ResourceId(1)));
    assert!(!h.host.is_hidden(ResourceId(2)));
    assert!(h.host.navigations().is_empty());
    h.stop().await;
}

#[tokio::test]
async fn toggling_twice_matches_toggling_once() {
    let h = Harness::start().await;
    h.host.open(Resource::new(1, "https://netflix.com/browse"));

    h.send(json!({"action": "toggle-focus-mode", "enable": true})).await;
    let once = h.status().await;
    h.send(json!({"action": "toggle-focus-mode", "enable": true})).await;
    assert_eq!(h.status().await, once);

    h.send(json!({"action": "toggle-focus-mode", "enable": false})).await;
    let off = h.status().await;
    h.send(json!({"action": "toggle-focus-mode", "enable": false})).await;
    assert_eq!(h.status().await, off);
    assert_eq!(off["hiddenCount"], json!(0));
    assert_eq!(h.host.ui_broadcasts(), vec![true, false]);
    h.stop().await;
}

#[tokio::test]
async fn settings_change_removes_suppressor_without_leaving_focus() {
    let h = Harness::start().await;
    h.host.open(Resource::new(1, "https://github.com"));
    h.host.open(Resource::new(2, "https://linear.app"));
    h.send(json!({"action": "toggle-focus-mode", "enable": true})).await;
    assert!(!h.host.page_notification(ResourceId(1), "ping"));

    h.send(json!({"action": "update-settings", "settings": {"hideNotifications": false}}))
        .await;

    assert!(h.host.page_notification(ResourceId(1), "ping"));
    assert!(h.host.page_notification(ResourceId(2), "ping"));
    assert_eq!(h.status().await["active"], json!(true));
    h.stop().await;
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn url_changes_move_resource_in_and_out_of_hidden_set() {
    let h = Harness::start().await;
    h.send(json!({"action": "toggle-focus-mode", "enable": true})).await;
    h.open(1, "https://facebook.com/feed").await;

    h.navigate(1, "https://github.com/org").await;
    assert_eq!(h.status().await["hiddenCount"], json!(0));
    assert!(!h.host.is_hidden(ResourceId(1)));

    h.navigate(1, "https://facebook.com/feed").await;
    assert_eq!(h.status().await["hiddenCount"], json!(1));
    assert_eq!(h.stored_hidden(), BTreeSet::from([1]));
    assert!(h.host.is_hidden(ResourceId(1)));
    h.stop().await;
}

#[tokio::test]
async fn removed_resources_never_linger() {
    let h = Harness::start().await;
    h.send(json!({"action": "toggle-focus-mode", "enable": true})).await;
    h.open(1, "https://youtube.com/watch").await;
    h.open(2, "https://twitch.tv/live").await;

    h.close(1).await;
    assert_eq!(h.status().await["hiddenCount"], json!(1));

    h.send(json!({"action": "toggle-focus-mode", "enable": false})).await;
    h.close(2).await;
    assert_eq!(h.stored_hidden(), BTreeSet::new());
    h.stop().await;
}

#[tokio::test]
async fn hidden_set_tracks_open_personal_resources() {
    let h = Harness::start().await;
    h.open(1, "https://reddit.com/r/a").await;
    h.send(json!({"action": "toggle-focus-mode", "enable": true})).await;
    h.open(2, "https://github.com").await;
    h.open(3, "https://instagram.com").await;
    h.navigate(2, "https://9gag.com").await;
    h.navigate(3, "https://notion.so/page").await;
    h.open(4, "not a url").await;
    h.close(1).await;
    h.open(5, "https://x.com/home").await;

    h.status().await;
    let open_personal: BTreeSet<u64> = [2, 5].into();
    assert_eq!(h.stored_hidden(), open_personal);
    for id in [2, 5] {
        assert!(h.host.is_hidden(ResourceId(id)));
    }
    for id in [3, 4] {
        assert!(!h.host.is_hidden(ResourceId(id)));
    }
    h.stop().await;
}

// ── Commands ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_request_gets_an_answer() {
    let h = Harness::start().await;

    assert_eq!(
        h.send(json!({"action": "self-destruct"})).await,
        json!({"error": "Unknown action"})
    );
    assert_eq!(h.send(json!({})).await, json!({"error": "Unknown action"}));
    assert!(h
        .send(json!({"action": "clean-link"}))
        .await
        .get("error")
        .is_some());
    h.stop().await;
}

#[tokio::test]
async fn persistence_failure_surfaces_to_caller() {
    let h = Harness::start().await;
    h.kv.fail_writes(true);

    let response = h
        .send(json!({"action": "toggle-focus-mode", "enable": true}))
        .await;

    assert!(response["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to write store"));
    h.stop().await;
}

#[tokio::test]
async fn state_survives_restart() {
    let host = Arc::new(MemoryHost::new());
    let kv = Arc::new(MemoryStore::new());
    host.open(Resource::new(1, "https://tiktok.com/@a"));

    let first = Harness::start_with(host.clone(), kv.clone()).await;
    first
        .send(json!({"action": "toggle-focus-mode", "enable": true}))
        .await;
    first
        .send(json!({"action": "update-settings", "settings": {"privacyLevel": "strict"}}))
        .await;
    first.stop().await;

    let second = Harness::start_with(host, kv).await;
    let status = second.status().await;
    assert_eq!(status["active"], json!(true));
    assert_eq!(status["hiddenCount"], json!(1));
    assert_eq!(status["privacyLevel"], json!("strict"));

    second
        .send(json!({"action": "toggle-focus-mode", "enable": false}))
        .await;
    assert!(!second.host.is_hidden(ResourceId(1)));
    second.stop().await;
}

// ── Timers ────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn calendar_sync_reminds_once_per_tick() {
    let h = Harness::start().await;
    h.send(json!({
        "action": "update-settings",
        "settings": {"calendarIntegration": true, "meetingReminders": false}
    }))
    .await;
    h.send(json!({
        "action": "schedule-meeting",
        "title": "Standup",
        "startTime": (t0() + Duration::minutes(14)).to_rfc3339()
    }))
    .await;

    tokio::time::sleep(StdDuration::from_secs(5 * 60 + 1)).await;
    h.status().await;
    assert_eq!(h.host.notifications_matching("Standup starts in").len(), 1);
    assert_eq!(
        h.host.notifications_matching("Standup starts in 9 minutes").len(),
        1
    );

    tokio::time::sleep(StdDuration::from_secs(5 * 60)).await;
    h.status().await;
    assert_eq!(
        h.host.notifications_matching("Standup starts in 4 minutes").len(),
        1
    );

    // The meeting has started by the third tick.
    tokio::time::sleep(StdDuration::from_secs(5 * 60)).await;
    h.status().await;
    assert_eq!(h.host.notifications_matching("Standup starts in").len(), 2);
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn meeting_end_timer_ends_strict_focus() {
    let h = Harness::start().await;
    h.host.open(Resource::new(1, "https://facebook.com"));
    h.send(json!({"action": "update-settings", "settings": {"privacyLevel": "strict"}}))
        .await;
    h.send(json!({"action": "toggle-focus-mode", "enable": true})).await;

    tokio::time::sleep(StdDuration::from_secs(59 * 60)).await;
    assert_eq!(h.status().await["active"], json!(true));

    tokio::time::sleep(StdDuration::from_secs(2 * 60)).await;
    let status = h.status().await;
    assert_eq!(status["active"], json!(false));
    assert_eq!(status["hiddenCount"], json!(0));
    assert!(!h.host.is_hidden(ResourceId(1)));
    assert_eq!(
        h.host.notifications_matching("Meeting time complete").len(),
        1
    );
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn deactivation_cancels_meeting_end() {
    let h = Harness::start().await;
    h.send(json!({"action": "toggle-focus-mode", "enable": true})).await;
    h.send(json!({"action": "toggle-focus-mode", "enable": false})).await;

    tokio::time::sleep(StdDuration::from_secs(2 * 60 * 60)).await;
    h.status().await;
    assert!(h
        .host
        .notifications_matching("Meeting time complete")
        .is_empty());
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn reminder_fires_and_activates_focus() {
    let h = Harness::start().await;
    let response = h
        .send(json!({
            "action": "schedule-meeting",
            "title": "Customer call",
            "startTime": (t0() + Duration::minutes(20)).timestamp_millis()
        }))
        .await;
    assert_eq!(response["success"], json!(true));

    tokio::time::sleep(StdDuration::from_secs(14 * 60)).await;
    assert_eq!(h.status().await["active"], json!(false));

    tokio::time::sleep(StdDuration::from_secs(2 * 60)).await;
    assert_eq!(h.status().await["active"], json!(true));
    let reminders = h.host.notifications_matching("Meeting reminder");
    assert_eq!(reminders.len(), 1);
    assert_eq!(
        reminders[0].message,
        "Customer call starts in 5 minutes (at 09:20)"
    );
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn context_check_suggests_focus_on_meeting_platform() {
    let h = Harness::start().await;
    h.host.open(Resource::new(1, "https://meet.google.com/abc-defg-hij"));
    h.host.set_focused(Some(ResourceId(1)));

    tokio::time::sleep(StdDuration::from_secs(61)).await;
    h.status().await;

    assert_eq!(h.host.notifications_matching("Meeting detected").len(), 1);
    assert!(matches!(
        h.handle.request(focus_runtime::Command::GetStatus).await.unwrap(),
        Response::Status(ref s) if !s.active
    ));
    h.stop().await;
}
