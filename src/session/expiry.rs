use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

pub const REMEMBER_ME_DAYS: i64 = 30;
pub const DEFAULT_SESSION_DAYS: i64 = 1;

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

pub(crate) fn session_window(remember_me: bool) -> Duration {
    if remember_me {
        Duration::days(REMEMBER_ME_DAYS)
    } else {
        Duration::days(DEFAULT_SESSION_DAYS)
    }
}

pub(crate) fn compute_expiry(now: OffsetDateTime, remember_me: bool) -> OffsetDateTime {
    now + session_window(remember_me)
}

pub(crate) fn format_expiry(at: OffsetDateTime) -> String {
    at.format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub(crate) fn parse_expiry(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).ok()
}

fn plural(value: i64, unit: &str) -> String {
    if value == 1 {
        format!("{value} {unit}")
    } else {
        format!("{value} {unit}s")
    }
}

/// "29 days", "23 hours" or "5 minutes"; `None` once `expires_at` has passed.
pub(crate) fn format_remaining(now: OffsetDateTime, expires_at: OffsetDateTime) -> Option<String> {
    if now >= expires_at {
        return None;
    }

    let remaining = expires_at - now;
    let days = remaining.whole_days();
    let hours = remaining.whole_hours();
    let minutes = remaining.whole_minutes();

    Some(if days > 0 {
        plural(days, "day")
    } else if hours > 0 {
        plural(hours, "hour")
    } else {
        plural(minutes, "minute")
    })
}
