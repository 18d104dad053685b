use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Mutex;
use tracing::warn;

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Source of wall-clock time for everything that compares against "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

// ── Timezones ─────────────────────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system, falling back to `"UTC"`.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a configured timezone name. `"auto"` means the system timezone;
/// unknown names fall back to UTC with a warning.
pub fn resolve_timezone(name: &str) -> Tz {
    let name = if name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        name.to_string()
    };
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!(timezone = %name, "unrecognised timezone, falling back to UTC");
        Tz::UTC
    })
}

/// `true` when `tz_name` is `"auto"` or a recognised IANA identifier.
pub fn validate_timezone(tz_name: &str) -> bool {
    tz_name.eq_ignore_ascii_case("auto") || tz_name.parse::<Tz>().is_ok()
}

/// Format the local wall-clock time of `dt` in `tz` as `HH:MM`.
pub fn format_clock_time(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format("%H:%M").to_string()
}

/// Convert JavaScript-style epoch milliseconds into a UTC timestamp.
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Convert a non-negative chrono duration into a std duration (negative → zero).
pub fn to_std_duration(d: Duration) -> std::time::Duration {
    d.to_std().unwrap_or(std::time::Duration::ZERO)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
