//! Command dispatcher.
//!
//! Inbound requests are JSON objects carrying an `action` field. They are
//! decoded into [`Command`] and answered with a [`Response`]; every request
//! gets an answer, including ones with an unrecognised action.

use chrono::{DateTime, Utc};
use focus_core::models::{ExtractedActions, Meeting, ResourceId};
use focus_core::settings::{Settings, SettingsPatch};
use focus_core::time_utils::from_epoch_millis;
use focus_core::{FocusError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::coordinator::{Coordinator, StatusReport};

// ── Command ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Command {
    ToggleFocusMode {
        enable: bool,
    },
    HidePersonalResources,
    #[serde(rename_all = "camelCase")]
    CleanUrl {
        #[serde(default)]
        resource_id: Option<ResourceId>,
    },
    CleanLink {
        url: String,
    },
    GetStatus,
    #[serde(rename_all = "camelCase")]
    ScheduleMeeting {
        title: String,
        /// RFC 3339 text or epoch milliseconds.
        #[serde(deserialize_with = "deserialize_start_time")]
        start_time: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    ExtractActions {
        #[serde(default)]
        resource_id: Option<ResourceId>,
    },
    UpdateSettings {
        #[serde(alias = "partial")]
        settings: SettingsPatch,
    },
    GetSettings,
    GetActions,
    #[serde(other)]
    Unknown,
}

impl Command {
    /// Decode a raw request. A missing or unrecognised `action` yields
    /// [`Command::Unknown`]; a recognised action with a malformed payload is
    /// an [`FocusError::InvalidRequest`].
    pub fn from_value(value: Value) -> Result<Self> {
        match value.get("action") {
            Some(Value::String(_)) => {}
            _ => return Ok(Self::Unknown),
        }
        serde_json::from_value(value).map_err(|e| FocusError::InvalidRequest(e.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ToggleFocusMode { .. } => "toggle-focus-mode",
            Self::HidePersonalResources => "hide-personal-resources",
            Self::CleanUrl { .. } => "clean-url",
            Self::CleanLink { .. } => "clean-link",
            Self::GetStatus => "get-status",
            Self::ScheduleMeeting { .. } => "schedule-meeting",
            Self::ExtractActions { .. } => "extract-actions",
            Self::UpdateSettings { .. } => "update-settings",
            Self::GetSettings => "get-settings",
            Self::GetActions => "get-actions",
            Self::Unknown => "unknown",
        }
    }
}

fn deserialize_start_time<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StartTime {
        Millis(i64),
        Text(DateTime<Utc>),
    }

    match StartTime::deserialize(deserializer)? {
        StartTime::Text(dt) => Ok(dt),
        StartTime::Millis(ms) => from_epoch_millis(ms)
            .ok_or_else(|| serde::de::Error::custom(format!("start time out of range: {ms}"))),
    }
}

// ── Response ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Success {
        success: bool,
    },
    Url {
        success: bool,
        url: String,
    },
    Hidden {
        success: bool,
        hidden: usize,
    },
    Meeting {
        success: bool,
        meeting: Meeting,
    },
    Extracted {
        success: bool,
        items: Vec<String>,
    },
    Status(StatusReport),
    Settings(Settings),
    Actions(Option<ExtractedActions>),
    Error {
        error: String,
    },
}

impl Response {
    pub fn ok() -> Self {
        Self::Success { success: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn unknown_action() -> Self {
        Self::error("Unknown action")
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

impl Coordinator {
    /// Run a command to completion and answer it. Failures become
    /// [`Response::Error`].
    pub async fn handle(&mut self, command: Command) -> Response {
        let name = command.name();
        tracing::debug!(command = name, "handling command");
        match self.execute(command).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_persistence() {
                    tracing::error!(command = name, error = %e, "state could not be persisted");
                } else {
                    tracing::warn!(command = name, error = %e, "command failed");
                }
                Response::error(e.to_string())
            }
        }
    }

    async fn execute(&mut self, command: Command) -> Result<Response> {
        let response = match command {
            Command::ToggleFocusMode { enable: true } => {
                self.activate().await?;
                Response::ok()
            }
            Command::ToggleFocusMode { enable: false } => {
                self.deactivate().await?;
                Response::ok()
            }
            Command::HidePersonalResources => Response::Hidden {
                success: true,
                hidden: self.hide_personal_resources().await?,
            },
            Command::CleanUrl { resource_id } => {
                let (url, _) = self.clean_resource_url(resource_id).await?;
                Response::Url { success: true, url }
            }
            Command::CleanLink { url } => Response::Url {
                success: true,
                url: self.clean_link(&url).await?,
            },
            Command::GetStatus => Response::Status(self.status()),
            Command::ScheduleMeeting { title, start_time } => Response::Meeting {
                success: true,
                meeting: self.schedule_meeting(title, start_time).await?,
            },
            Command::ExtractActions { resource_id } => Response::Extracted {
                success: true,
                items: self.extract_actions(resource_id).await?.items,
            },
            Command::UpdateSettings { settings } => {
                self.update_settings(settings).await?;
                Response::ok()
            }
            Command::GetSettings => Response::Settings(self.state.settings.clone()),
            Command::GetActions => Response::Actions(self.last_actions().await?),
            Command::Unknown => Response::unknown_action(),
        };
        Ok(response)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
