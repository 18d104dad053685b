//! The focus-mode coordinator.
//!
//! [`Coordinator`] exclusively owns the [`CoordinatorState`] and every
//! collaborator that acts on it. It is driven one event at a time by the
//! service loop in [`crate::service`]; the focus state machine lives in
//! [`crate::focus`], resource lifecycle handling in [`crate::lifecycle`] and
//! command routing in [`crate::dispatcher`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use focus_core::config::Timings;
use focus_core::extractor::{ActionExtractor, KeywordExtractor};
use focus_core::models::{
    CoordinatorState, ExtractedActions, Meeting, Notification, Resource, ResourceId,
};
use focus_core::sanitizer::clean_url;
use focus_core::settings::{PrivacyLevel, SettingsPatch};
use focus_core::time_utils::{format_clock_time, Clock, SystemClock};
use focus_core::{classifier, FocusError, Result};
use serde::Serialize;

use crate::host::Host;
use crate::scheduler::{Scheduler, TimerKind};
use crate::store::StateStore;
use crate::suppressor::NotificationSuppressor;

// ── Public types ──────────────────────────────────────────────────────────────

/// Answer to `get-status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub active: bool,
    pub hidden_count: usize,
    pub next_meeting: Option<Meeting>,
    pub privacy_level: PrivacyLevel,
}

/// Tunables and strategies that are not host capabilities.
pub struct CoordinatorOptions {
    pub timings: Timings,
    /// Timezone used when showing meeting times to the user.
    pub timezone: Tz,
    pub clock: Arc<dyn Clock>,
    pub extractor: Box<dyn ActionExtractor>,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            timings: Timings::default(),
            timezone: Tz::UTC,
            clock: Arc::new(SystemClock),
            extractor: Box::new(KeywordExtractor),
        }
    }
}

// ── Coordinator ───────────────────────────────────────────────────────────────

pub struct Coordinator {
    pub(crate) state: CoordinatorState,
    pub(crate) store: StateStore,
    pub(crate) host: Host,
    pub(crate) scheduler: Scheduler,
    pub(crate) suppressor: NotificationSuppressor,
    pub(crate) extractor: Box<dyn ActionExtractor>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) timings: Timings,
    pub(crate) timezone: Tz,
}

impl Coordinator {
    /// Reload persisted state and build a coordinator around it. A session
    /// that was active is reconciled with the resources open right now.
    ///
    /// Timers are not armed here; call [`Coordinator::start_timers`] once the
    /// receiving side of the scheduler channel is being polled.
    pub async fn load(
        host: Host,
        store: StateStore,
        scheduler: Scheduler,
        options: CoordinatorOptions,
    ) -> Result<Self> {
        let state = store.load().await?;
        tracing::info!(
            active = state.active,
            hidden = state.hidden_count(),
            meetings = state.scheduled_meetings.len(),
            "coordinator state restored"
        );

        let mut coordinator = Self {
            state,
            suppressor: NotificationSuppressor::new(host.overrides.clone()),
            store,
            host,
            scheduler,
            extractor: options.extractor,
            clock: options.clock,
            timings: options.timings,
            timezone: options.timezone,
        };
        coordinator.resume().await?;
        Ok(coordinator)
    }

    /// Re-arm the periodic timers, discarding any stale ones.
    pub fn start_timers(&mut self) {
        self.scheduler.start_periodic(&self.timings);
    }

    /// Stop every timer.
    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
    }

    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            active: self.state.active,
            hidden_count: self.state.hidden_count(),
            next_meeting: self.state.next_meeting(self.clock.now()).cloned(),
            privacy_level: self.state.settings.privacy_level,
        }
    }

    // ── Timers ────────────────────────────────────────────────────────────

    /// Handle a timer fire.
    pub async fn on_timer(&mut self, kind: TimerKind) -> Result<()> {
        tracing::debug!(timer = ?kind, "timer fired");
        self.scheduler.complete(&kind);
        match kind {
            TimerKind::ContextCheck => {
                self.check_context().await;
                Ok(())
            }
            TimerKind::CalendarSync => {
                self.sync_calendar().await;
                Ok(())
            }
            TimerKind::Cleanup => self.cleanup().await,
            TimerKind::MeetingEnd => self.meeting_time_complete().await,
            TimerKind::MeetingReminder(id) => self.meeting_reminder(&id).await,
        }
    }

    /// Suggest focus mode when the user is on a meeting platform.
    async fn check_context(&self) {
        if self.state.active || !self.state.settings.auto_detect_meetings {
            return;
        }
        let focused = match self.host.resources.focused().await {
            Ok(Some(resource)) => resource,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(error = %e, "context check could not read focused resource");
                return;
            }
        };
        if classifier::is_meeting_platform(&focused.url) {
            tracing::info!(resource = %focused.id, "meeting platform detected");
            self.notify(Notification::info(
                "Meeting detected",
                "Looks like you are joining a meeting. Turn on focus mode to hide personal tabs.",
            ))
            .await;
        }
    }

    /// Remind about the nearest scheduled meeting starting soon.
    async fn sync_calendar(&self) {
        if !self.state.settings.calendar_integration || self.state.active {
            return;
        }
        let now = self.clock.now();
        let upcoming = self
            .state
            .meetings_within(now, self.timings.upcoming_window);
        if let Some(nearest) = upcoming.first() {
            let minutes = nearest.minutes_until(now);
            self.notify(Notification::info(
                "Upcoming meeting",
                format!(
                    "{} starts in {} minute{}",
                    nearest.title,
                    minutes,
                    if minutes == 1 { "" } else { "s" }
                ),
            ))
            .await;
        }
    }

    /// Purge expired action items and long-past meetings.
    async fn cleanup(&mut self) -> Result<()> {
        let now = self.clock.now();

        if let Err(e) = self.purge_expired_actions(now).await {
            tracing::warn!(error = %e, "could not purge action items; pruning meetings anyway");
        }

        let before: Vec<String> = self
            .state
            .scheduled_meetings
            .iter()
            .map(|m| m.id.clone())
            .collect();
        let removed = self
            .state
            .prune_meetings(now, self.timings.meeting_retention);
        if removed > 0 {
            for id in before {
                if !self.state.scheduled_meetings.iter().any(|m| m.id == id) {
                    self.scheduler.cancel(&TimerKind::MeetingReminder(id));
                }
            }
            tracing::info!(removed, "stale meetings pruned");
            self.persist().await?;
        }
        Ok(())
    }

    async fn purge_expired_actions(&self, now: DateTime<Utc>) -> Result<()> {
        if let Some(actions) = self.store.load_actions().await? {
            if actions.is_expired(now, self.timings.actions_retention) {
                self.store.clear_actions().await?;
                tracing::info!(source = %actions.source_url, "expired action items purged");
            }
        }
        Ok(())
    }

    async fn meeting_time_complete(&mut self) -> Result<()> {
        self.notify(Notification::warning(
            "Meeting time complete",
            "Your scheduled focus time has ended.",
        ))
        .await;
        if self.state.settings.privacy_level == PrivacyLevel::Strict {
            tracing::info!("strict privacy: ending focus mode automatically");
            self.deactivate().await?;
        }
        Ok(())
    }

    async fn meeting_reminder(&mut self, meeting_id: &str) -> Result<()> {
        let Some(meeting) = self
            .state
            .scheduled_meetings
            .iter()
            .find(|m| m.id == meeting_id)
            .cloned()
        else {
            tracing::debug!(meeting_id, "reminder for a meeting that no longer exists");
            return Ok(());
        };

        let now = self.clock.now();
        let minutes = meeting.minutes_until(now);
        self.notify(Notification::urgent(
            "Meeting reminder",
            format!(
                "{} starts in {} minute{} (at {})",
                meeting.title,
                minutes,
                if minutes == 1 { "" } else { "s" },
                format_clock_time(meeting.start_time, self.timezone)
            ),
        ))
        .await;

        if self.state.settings.auto_detect_meetings {
            self.activate().await?;
        }
        Ok(())
    }

    // ── Meetings ──────────────────────────────────────────────────────────

    /// Record a meeting and arm its reminder.
    pub async fn schedule_meeting(
        &mut self,
        title: String,
        start_time: DateTime<Utc>,
    ) -> Result<Meeting> {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(FocusError::InvalidRequest("meeting title is empty".into()));
        }

        let now = self.clock.now();
        let meeting = Meeting::new(title, start_time, now);
        self.state.scheduled_meetings.push(meeting.clone());

        if self.state.settings.meeting_reminders && meeting.is_upcoming(now) {
            self.scheduler.arm_at(
                TimerKind::MeetingReminder(meeting.id.clone()),
                meeting.start_time - self.timings.reminder_lead,
                now,
            );
        }

        tracing::info!(meeting = %meeting.id, title = %meeting.title, start = %meeting.start_time, "meeting scheduled");
        self.persist().await?;
        Ok(meeting)
    }

    // ── Settings ──────────────────────────────────────────────────────────

    /// Merge a partial settings object, bring the suppressor and hidden set
    /// in line with it while focus mode is on, then persist.
    pub async fn update_settings(&mut self, patch: SettingsPatch) -> Result<()> {
        let change = self.state.settings.apply(patch);
        tracing::info!(
            hide_notifications = change.hide_notifications,
            domain_lists = change.domain_lists,
            "settings updated"
        );

        if self.state.active {
            self.reconcile_with_settings().await;
        }
        self.persist().await
    }

    // ── Action items ──────────────────────────────────────────────────────

    /// Extract action items from a resource (the focused one by default),
    /// cache them, and report the count.
    pub async fn extract_actions(&mut self, id: Option<ResourceId>) -> Result<ExtractedActions> {
        if !self.state.settings.action_extraction {
            return Err(FocusError::Disabled("Action extraction"));
        }

        let resource = self.target_resource(id).await?;
        let text = self.host.resources.read_text(resource.id).await?;
        let items = self.extractor.extract(&text);
        let actions = ExtractedActions::new(resource.url, items, self.clock.now());

        self.store.save_actions(&actions).await?;

        let count = actions.items.len();
        tracing::info!(count, source = %actions.source_url, "action items extracted");
        if count > 0 {
            self.notify(Notification::info(
                "Action items found",
                format!(
                    "Found {} action item{}",
                    count,
                    if count == 1 { "" } else { "s" }
                ),
            ))
            .await;
        }
        Ok(actions)
    }

    pub async fn last_actions(&self) -> Result<Option<ExtractedActions>> {
        self.store.load_actions().await
    }

    // ── URL cleaning ──────────────────────────────────────────────────────

    /// Clean a resource's URL and navigate to the result if it changed.
    /// Returns the cleaned URL and whether navigation happened.
    pub async fn clean_resource_url(&mut self, id: Option<ResourceId>) -> Result<(String, bool)> {
        if !self.state.settings.clean_urls {
            return Err(FocusError::Disabled("URL cleaning"));
        }

        let resource = self.target_resource(id).await?;
        let cleaned = clean_url(&resource.url);
        if cleaned == resource.url {
            return Ok((cleaned, false));
        }

        self.host.resources.navigate(resource.id, &cleaned).await?;
        tracing::info!(resource = %resource.id, "navigated to cleaned URL");
        Ok((cleaned, true))
    }

    /// Clean an arbitrary link and put the result on the clipboard.
    pub async fn clean_link(&self, url: &str) -> Result<String> {
        if !self.state.settings.clean_urls {
            return Err(FocusError::Disabled("URL cleaning"));
        }
        let cleaned = clean_url(url);
        self.host.surface.write_clipboard(&cleaned).await?;
        Ok(cleaned)
    }

    // ── Shared helpers ────────────────────────────────────────────────────

    pub(crate) async fn persist(&self) -> Result<()> {
        self.store.save(&self.state).await
    }

    /// Hand a notification to the sink. Failures are logged, never raised.
    pub(crate) async fn notify(&self, notification: Notification) {
        if let Err(e) = self.host.notifications.create(notification).await {
            tracing::warn!(error = %e, "notification sink rejected notification");
        }
    }

    /// Currently open resources; an enumeration failure yields an empty list.
    pub(crate) async fn open_resources(&self) -> Vec<Resource> {
        match self.host.resources.list().await {
            Ok(resources) => resources,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate resources");
                Vec::new()
            }
        }
    }

    async fn target_resource(&self, id: Option<ResourceId>) -> Result<Resource> {
        let found = match id {
            Some(id) => self.host.resources.get(id).await?,
            None => self.host.resources.focused().await?,
        };
        found.ok_or(FocusError::ResourceNotFound)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
