//! News gate: blocks trading around high-impact scheduled events and after breaking news.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Trading is blocked from this long before a high-impact event starts...
pub const PRE_EVENT_BUFFER_MINS: i64 = 5;
/// ...until this long after it ends.
pub const POST_EVENT_BUFFER_MINS: i64 = 5;
/// Trading is blocked for this long after a breaking-news flag.
pub const BREAKING_NEWS_COOLDOWN_MINS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventImpact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub impact: EventImpact,
    pub description: String,
}

impl NewsEvent {
    /// Window during which this event blocks trading, if it blocks at all.
    pub fn blackout(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        (self.impact == EventImpact::High).then(|| {
            (
                self.start - Duration::minutes(PRE_EVENT_BUFFER_MINS),
                self.end + Duration::minutes(POST_EVENT_BUFFER_MINS),
            )
        })
    }
}

/// Why the gate is closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Blocker<'a> {
    BreakingNews { flagged_at: DateTime<Utc> },
    Scheduled(&'a NewsEvent),
}

#[derive(Debug, Clone, Default)]
pub struct NewsGate {
    schedule: Vec<NewsEvent>,
    last_breaking: Option<DateTime<Utc>>,
}

impl NewsGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scheduled(&mut self, event: NewsEvent) {
        self.schedule.push(event);
    }

    /// Record a breaking-news flag at `at`, starting the cooldown.
    pub fn on_breaking_news(&mut self, at: DateTime<Utc>) {
        self.last_breaking = Some(at);
    }

    pub fn schedule(&self) -> &[NewsEvent] {
        &self.schedule
    }

    pub fn can_trade_now(&self, now: DateTime<Utc>) -> bool {
        self.blocker(now).is_none()
    }

    /// The first reason trading is blocked at `now`, if any.
    ///
    /// A flag timestamped after `now` also blocks: the elapsed time is negative,
    /// which is still inside the cooldown.
    pub fn blocker(&self, now: DateTime<Utc>) -> Option<Blocker<'_>> {
        if let Some(flagged_at) = self.last_breaking {
            if now - flagged_at < Duration::minutes(BREAKING_NEWS_COOLDOWN_MINS) {
                return Some(Blocker::BreakingNews { flagged_at });
            }
        }

        self.schedule.iter().find_map(|ev| match ev.blackout() {
            Some((from, until)) if now >= from && now <= until => Some(Blocker::Scheduled(ev)),
            _ => None,
        })
    }
}
