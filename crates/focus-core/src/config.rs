use chrono::Duration;
use clap::Parser;
use std::path::PathBuf;

use crate::error::{FocusError, Result};

// ── Config (CLI) ──────────────────────────────────────────────────────────────

/// Background coordinator for focus mode
#[derive(Parser, Debug, Clone)]
#[command(
    name = "focus-coordinator",
    about = "Background coordinator for focus mode",
    version
)]
pub struct Config {
    /// Path of the JSON state store
    #[arg(long, env = "FOCUS_STORE_PATH")]
    pub store_path: Option<PathBuf>,

    /// Default focus-mode duration in minutes (1-480)
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u32).range(1..=480))]
    pub meeting_minutes: u32,

    /// Timezone used in reminder messages (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path (stderr when absent)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear the persisted state before starting
    #[arg(long)]
    pub reset: bool,
}

impl Config {
    /// Parse the process arguments and resolve derived values.
    pub fn load() -> Result<Self> {
        Self::resolve(Config::parse())
    }

    /// Same as [`Config::load`] with an explicit argument list.
    pub fn load_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let parsed =
            Config::try_parse_from(args).map_err(|e| FocusError::Config(e.to_string()))?;
        Self::resolve(parsed)
    }

    fn resolve(mut config: Config) -> Result<Self> {
        if !crate::time_utils::validate_timezone(&config.timezone) {
            return Err(FocusError::Config(format!(
                "unknown timezone: {}",
                config.timezone
            )));
        }
        if config.debug {
            config.log_level = "DEBUG".to_string();
        }
        Ok(config)
    }

    /// Store path, defaulting to `~/.focus-coordinator/state.json`.
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| Self::default_store_path_in(&Self::home_dir()))
    }

    /// Default store path rooted at `base_dir` (used for testing).
    pub fn default_store_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".focus-coordinator").join("state.json")
    }

    pub fn timings(&self) -> Timings {
        Timings {
            meeting_duration: Duration::minutes(i64::from(self.meeting_minutes)),
            ..Timings::default()
        }
    }

    fn home_dir() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    }
}

// ── Timings ───────────────────────────────────────────────────────────────────

/// Periods and horizons used by the scheduler and its handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub context_check_every: Duration,
    pub calendar_sync_every: Duration,
    pub cleanup_every: Duration,
    /// How long focus mode lasts before the meeting-end timer fires.
    pub meeting_duration: Duration,
    /// Reminder lead time before a meeting's start.
    pub reminder_lead: Duration,
    /// Calendar sync looks this far ahead.
    pub upcoming_window: Duration,
    /// Meetings older than this are pruned.
    pub meeting_retention: Duration,
    /// Extracted actions older than this are purged.
    pub actions_retention: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            context_check_every: Duration::minutes(1),
            calendar_sync_every: Duration::minutes(5),
            cleanup_every: Duration::minutes(30),
            meeting_duration: Duration::minutes(60),
            reminder_lead: Duration::minutes(5),
            upcoming_window: Duration::minutes(30),
            meeting_retention: Duration::hours(24),
            actions_retention: Duration::days(7),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
