//! Expiry countdown and urgency classification for promo codes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Hours-left thresholds for each urgency level.
const CRITICAL_HOURS: i64 = 6;
const URGENT_HOURS: i64 = 24;
const SOON_HOURS: i64 = 7 * 24;

/// Days-left window considered "expiring soon".
const EXPIRING_SOON_DAYS: i64 = 7;

/// How pressing an expiry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Normal,
    Soon,
    Urgent,
    Critical,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Soon => "soon",
            Self::Urgent => "urgent",
            Self::Critical => "critical",
        }
    }
}

/// Remaining time until expiry, bucketed for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum Countdown {
    Expired,
    UnderAnHour,
    Hours(i64),
    Days(i64),
    Weeks(i64),
    Months(i64),
}

impl std::fmt::Display for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expired => write!(f, "expired"),
            Self::UnderAnHour => write!(f, "< 1h"),
            Self::Hours(h) => write!(f, "{}h", h),
            Self::Days(d) => write!(f, "{}d", d),
            Self::Weeks(w) => write!(f, "{}w", w),
            Self::Months(m) => write!(f, "{}mo", m),
        }
    }
}

/// Parses an expiry as served by the promo API.
///
/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|at| at < now)
}

/// True when between zero and seven whole days remain.
pub fn is_expiring_soon(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|at| (0..=EXPIRING_SOON_DAYS).contains(&(at - now).num_days()))
}

/// Classifies an expiry. Missing or past expiries are `Normal`.
pub fn urgency_level(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> UrgencyLevel {
    let Some(at) = expires_at else {
        return UrgencyLevel::Normal;
    };
    if at < now {
        return UrgencyLevel::Normal;
    }

    match (at - now).num_hours() {
        h if h <= CRITICAL_HOURS => UrgencyLevel::Critical,
        h if h <= URGENT_HOURS => UrgencyLevel::Urgent,
        h if h <= SOON_HOURS => UrgencyLevel::Soon,
        _ => UrgencyLevel::Normal,
    }
}

/// Remaining time until expiry, or `None` without an expiry.
pub fn time_until_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Countdown> {
    let at = expires_at?;
    if at < now {
        return Some(Countdown::Expired);
    }

    let left = at - now;
    let hours = left.num_hours();
    let days = left.num_days();

    Some(if hours < 1 {
        Countdown::UnderAnHour
    } else if hours < 24 {
        Countdown::Hours(hours)
    } else if days < 7 {
        Countdown::Days(days)
    } else if days < 30 {
        Countdown::Weeks(days / 7)
    } else {
        Countdown::Months(days / 30)
    })
}
