use chrono::{Duration as ChronoDuration, NaiveDateTime, NaiveTime};
use std::time::Duration;

use crate::duration::HumanDuration;

/// When `harvest run` triggers after its first, immediate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Once,
    Every(Duration),
    /// Every day at this local wall-clock time.
    DailyAt(NaiveTime),
}

pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|e| format!("expected HH:MM, got {:?}: {}", value, e))
}

impl Schedule {
    /// Flag precedence: `--once`, then `--every`, then `--at`, then the configured daily time.
    pub fn from_flags(
        once: bool,
        every: Option<HumanDuration>,
        at: Option<NaiveTime>,
        configured: &str,
    ) -> Result<Self, String> {
        if once {
            return Ok(Schedule::Once);
        }
        if let Some(every) = every {
            return Ok(Schedule::Every(every.0));
        }
        match at {
            Some(at) => Ok(Schedule::DailyAt(at)),
            None => parse_time_of_day(configured).map(Schedule::DailyAt),
        }
    }

    /// Time to wait from `now` (local) until the next run, `None` when done.
    pub fn next_delay(&self, now: NaiveDateTime) -> Option<Duration> {
        match self {
            Schedule::Once => None,
            Schedule::Every(interval) => Some(*interval),
            Schedule::DailyAt(at) => {
                let today = now.date().and_time(*at);
                let next = if today > now {
                    today
                } else {
                    today + ChronoDuration::days(1)
                };
                Some((next - now).to_std().unwrap_or_default())
            }
        }
    }
}
