//! Focus-mode state machine.
//!
//! `activate` and `deactivate` run a fixed sequence of side effects. Every
//! host call in the sequence is best-effort: a failure is logged and the
//! next step still runs. Only persistence failures reach the caller.

use focus_core::classifier;
use focus_core::models::{Notification, Resource, ResourceId};
use focus_core::time_utils::to_std_duration;
use focus_core::{FocusError, Result};

use crate::coordinator::Coordinator;
use crate::scheduler::TimerKind;

impl Coordinator {
    /// Enter focus mode. No-op when already active.
    pub async fn activate(&mut self) -> Result<()> {
        if self.state.active {
            tracing::debug!("focus mode already active");
            return Ok(());
        }
        self.state.active = true;
        tracing::info!("activating focus mode");

        let open = self.open_resources().await;

        // 1. Hide personal resources.
        let personal: Vec<ResourceId> = open
            .iter()
            .filter(|r| classifier::is_personal(&r.url, &self.state.settings))
            .map(|r| r.id)
            .collect();
        let hidden = self.hide_resources(&personal).await;

        // 2. Suppress resource notifications.
        if self.state.settings.hide_notifications {
            self.suppressor.install_all(&open).await;
        }

        // 3. Meeting-end timer.
        self.scheduler
            .arm_after(TimerKind::MeetingEnd, to_std_duration(self.timings.meeting_duration));

        // 4. Indicator.
        if let Err(e) = self.host.surface.set_indicator(true).await {
            tracing::warn!(error = %e, "could not set focus indicator");
        }

        // 5. Notification.
        self.notify(Notification::info(
            "Focus mode on",
            if hidden == 0 {
                "Focus mode is active.".to_string()
            } else {
                format!(
                    "Focus mode is active. {} personal tab{} hidden.",
                    hidden,
                    if hidden == 1 { "" } else { "s" }
                )
            },
        ))
        .await;

        // 6. Persist, 7. broadcast. The broadcast reflects the in-memory
        // state even when the write failed.
        let saved = self.persist().await;
        self.broadcast(&open, true).await;
        saved
    }

    /// Leave focus mode. No-op when already inactive.
    pub async fn deactivate(&mut self) -> Result<()> {
        if !self.state.active {
            tracing::debug!("focus mode already inactive");
            return Ok(());
        }
        self.state.active = false;
        tracing::info!("deactivating focus mode");

        // 1. Restore everything we hid. Resources that were closed meanwhile
        // cannot be shown and are dropped from the set anyway.
        let hidden: Vec<ResourceId> = self.state.hidden_resources.iter().copied().collect();
        self.show_resources(&hidden).await;
        self.state.hidden_resources.clear();

        // 2. Remove the override from every open resource.
        let open = self.open_resources().await;
        self.suppressor.remove_all(&open).await;

        // 3. Cancel the meeting-end timer.
        self.scheduler.cancel(&TimerKind::MeetingEnd);

        // 4. Indicator.
        if let Err(e) = self.host.surface.set_indicator(false).await {
            tracing::warn!(error = %e, "could not clear focus indicator");
        }

        // 5. Notification.
        self.notify(Notification::info(
            "Focus mode off",
            "Hidden tabs have been restored.",
        ))
        .await;

        // 6. Persist, 7. broadcast.
        let saved = self.persist().await;
        self.broadcast(&open, false).await;
        saved
    }

    /// Pick up a focus session that was active when the state was saved.
    /// Hidden ids whose resource closed in the meantime are dropped and the
    /// notification override is installed again.
    pub(crate) async fn resume(&mut self) -> Result<()> {
        if !self.state.active {
            return Ok(());
        }
        let open = match self.host.resources.list().await {
            Ok(open) => open,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate resources; keeping hidden set as saved");
                return Ok(());
            }
        };

        if self.state.settings.hide_notifications {
            self.suppressor.install_all(&open).await;
        }

        let before = self.state.hidden_count();
        self.state
            .hidden_resources
            .retain(|id| open.iter().any(|r| r.id == *id));
        let dropped = before - self.state.hidden_count();
        if dropped == 0 {
            return Ok(());
        }
        tracing::info!(dropped, "forgot hidden resources closed while stopped");
        self.persist().await
    }

    /// Hide every open personal resource that is not hidden yet. Only valid
    /// while focus mode is on. Returns how many were newly hidden.
    pub async fn hide_personal_resources(&mut self) -> Result<usize> {
        if !self.state.active {
            return Err(FocusError::NotActive);
        }

        let open = self.open_resources().await;
        let pending: Vec<ResourceId> = open
            .iter()
            .filter(|r| !self.state.is_hidden(r.id))
            .filter(|r| classifier::is_personal(&r.url, &self.state.settings))
            .map(|r| r.id)
            .collect();
        let hidden = self.hide_resources(&pending).await;

        self.persist().await?;
        Ok(hidden)
    }

    /// Bring the host in line with the current settings while focus mode is
    /// on. Overrides and hidden resources are compared with what is actually
    /// in place rather than with the previous settings, so repeating an
    /// update after a failed write still converges.
    pub(crate) async fn reconcile_with_settings(&mut self) {
        let open = self.open_resources().await;

        if self.state.settings.hide_notifications {
            let missing: Vec<Resource> = open
                .iter()
                .filter(|r| !self.suppressor.is_installed(r.id))
                .cloned()
                .collect();
            self.suppressor.install_all(&missing).await;
        } else if self.suppressor.installed_count() > 0 {
            self.suppressor.remove_all(&open).await;
        }

        let settings = &self.state.settings;
        let (to_hide, to_show): (Vec<&Resource>, Vec<&Resource>) = open
            .iter()
            .filter(|r| classifier::is_personal(&r.url, settings) != self.state.is_hidden(r.id))
            .partition(|r| !self.state.is_hidden(r.id));
        let to_hide: Vec<ResourceId> = to_hide.into_iter().map(|r| r.id).collect();
        let to_show: Vec<ResourceId> = to_show.into_iter().map(|r| r.id).collect();

        let hidden = self.hide_resources(&to_hide).await;
        let shown = self.show_resources(&to_show).await;
        if hidden + shown > 0 {
            tracing::info!(hidden, shown, "resources reclassified after settings change");
        }
    }

    // ── Host helpers ──────────────────────────────────────────────────────

    /// Hide `ids` and record each one that the host accepted. A rejected
    /// bulk call is retried one id at a time so a single closed resource
    /// does not keep the others visible.
    pub(crate) async fn hide_resources(&mut self, ids: &[ResourceId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        match self.host.resources.hide(ids).await {
            Ok(()) => {
                self.state.hidden_resources.extend(ids.iter().copied());
                tracing::debug!(count = ids.len(), "resources hidden");
                ids.len()
            }
            Err(e) => {
                tracing::debug!(error = %e, "bulk hide rejected, hiding one at a time");
                let mut count = 0;
                for id in ids {
                    match self.host.resources.hide(std::slice::from_ref(id)).await {
                        Ok(()) => {
                            self.state.hidden_resources.insert(*id);
                            count += 1;
                        }
                        Err(e) => tracing::warn!(resource = %id, error = %e, "could not hide resource"),
                    }
                }
                count
            }
        }
    }

    /// Show `ids` and un-record each one the host accepted. Returns how many
    /// were shown.
    pub(crate) async fn show_resources(&mut self, ids: &[ResourceId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        match self.host.resources.show(ids).await {
            Ok(()) => {
                for id in ids {
                    self.state.hidden_resources.remove(id);
                }
                tracing::debug!(count = ids.len(), "resources restored");
                ids.len()
            }
            Err(e) => {
                tracing::debug!(error = %e, "bulk show rejected, showing one at a time");
                let mut count = 0;
                for id in ids {
                    match self.host.resources.show(std::slice::from_ref(id)).await {
                        Ok(()) => {
                            self.state.hidden_resources.remove(id);
                            count += 1;
                        }
                        Err(e) => tracing::warn!(resource = %id, error = %e, "could not restore resource"),
                    }
                }
                count
            }
        }
    }

    /// Tell every open resource and the UI about a state change. Resources
    /// without a listener are ignored.
    async fn broadcast(&self, open: &[Resource], active: bool) {
        for resource in open {
            if let Err(e) = self.host.resources.send_state(resource.id, active).await {
                tracing::debug!(resource = %resource.id, error = %e, "state message not delivered");
            }
        }
        if let Err(e) = self.host.surface.broadcast(active).await {
            tracing::debug!(error = %e, "UI broadcast not delivered");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
