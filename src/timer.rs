//! Work timer driven by a stored start timestamp.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::duration::{format_clock, format_duration};

/// Snapshot of the timer for rendering; `elapsed` is recomputed from the start
/// timestamp on every read rather than accumulated.
#[derive(Clone, Serialize, Debug, PartialEq, Eq)]
pub struct TimerState {
    pub active: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub elapsed: u64,
}

/// Result of stopping a running timer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoppedTimer {
    pub started_at: DateTime<Utc>,
    pub elapsed: u64,
}

#[derive(Clone, Debug, Default)]
pub struct Timer {
    start: Option<DateTime<Utc>>,
    last_elapsed: Option<u64>,
}

impl Timer {
    /// A stopped timer with nothing logged yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a start timestamp is held.
    pub fn is_running(&self) -> bool {
        self.start.is_some()
    }

    /// When the running timer was started.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// Starts counting from `now`.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.start = Some(now);
    }

    /// Stops the timer; `None` when it was not running.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<StoppedTimer> {
        let started_at = self.start.take()?;
        let elapsed = elapsed_between(started_at, now);
        self.last_elapsed = Some(elapsed);
        Some(StoppedTimer {
            started_at,
            elapsed,
        })
    }

    /// State at `now`, for rendering.
    pub fn snapshot(&self, now: DateTime<Utc>) -> TimerState {
        TimerState {
            active: self.start.is_some(),
            start_time: self.start,
            elapsed: self.start.map(|start| elapsed_between(start, now)).unwrap_or(0),
        }
    }

    /// Text for the timer label: the live clock while running, the last
    /// logged duration afterwards.
    pub fn display(&self, now: DateTime<Utc>) -> String {
        match (self.start, self.last_elapsed) {
            (Some(start), _) => format!("Time: {}", format_clock(elapsed_between(start, now))),
            (None, Some(last)) => format!("Last: {} ({}s)", format_duration(last as i64), last),
            (None, None) => format!("Time: {}", format_clock(0)),
        }
    }
}

fn elapsed_between(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    now.signed_duration_since(start).num_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn start_sets_active_state() {
        let mut timer = Timer::new();
        let now = Utc::now();
        timer.start(now);

        let snapshot = timer.snapshot(now + Duration::seconds(5));
        assert!(snapshot.active);
        assert_eq!(snapshot.start_time, Some(now));
        assert_eq!(snapshot.elapsed, 5);
    }

    #[test]
    fn stop_returns_elapsed_and_resets_timer() {
        let mut timer = Timer::new();
        let start = Utc::now();
        timer.start(start);

        let stopped = timer.stop(start + Duration::seconds(125)).unwrap();
        assert_eq!(stopped.elapsed, 125);
        assert_eq!(stopped.started_at, start);

        let snapshot = timer.snapshot(start + Duration::seconds(200));
        assert!(!snapshot.active);
        assert!(snapshot.start_time.is_none());
        assert_eq!(snapshot.elapsed, 0);
    }

    #[test]
    fn stop_when_inactive_returns_none() {
        let mut timer = Timer::new();
        assert!(timer.stop(Utc::now()).is_none());
    }

    #[test]
    fn clock_never_goes_negative() {
        let mut timer = Timer::new();
        let now = Utc::now();
        timer.start(now);
        assert_eq!(timer.snapshot(now - Duration::seconds(3)).elapsed, 0);
    }

    #[test]
    fn display_switches_from_clock_to_last_duration() {
        let mut timer = Timer::new();
        let start = Utc::now();
        assert_eq!(timer.display(start), "Time: 00:00:00");

        timer.start(start);
        assert_eq!(timer.display(start + Duration::seconds(61)), "Time: 00:01:01");

        timer.stop(start + Duration::seconds(61));
        assert_eq!(timer.display(start + Duration::seconds(90)), "Last: 2m (61s)");
    }
}
