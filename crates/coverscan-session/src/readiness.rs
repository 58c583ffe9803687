// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Auto-capture debounce.

use std::time::{Duration, Instant};

/// Tracks how long detections have been continuously ready.
///
/// `observe` resets and checks the timer in one `&mut` call, so a single
/// good frame between bad ones can never trigger a capture.
#[derive(Debug, Clone)]
pub struct ReadinessTracker {
    window: Duration,
    ready_since: Option<Instant>,
    fired: bool,
}

impl ReadinessTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            ready_since: None,
            fired: false,
        }
    }

    /// Record one frame's readiness. Returns `true` exactly once per ready
    /// streak, on the first frame at least `window` after the streak began.
    pub fn observe(&mut self, ready: bool, now: Instant) -> bool {
        if !ready {
            self.reset();
            return false;
        }

        let since = *self.ready_since.get_or_insert(now);
        if !self.fired && now.saturating_duration_since(since) >= self.window {
            self.fired = true;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.ready_since = None;
        self.fired = false;
    }

    /// How long the current streak has lasted, if there is one.
    pub fn streak(&self, now: Instant) -> Option<Duration> {
        self.ready_since.map(|since| now.saturating_duration_since(since))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_millis(1000);

    #[test]
    fn fires_after_sustained_readiness() {
        let t0 = Instant::now();
        let mut tracker = ReadinessTracker::new(SECOND);
        assert!(!tracker.observe(true, t0));
        assert!(!tracker.observe(true, t0 + Duration::from_millis(500)));
        assert!(tracker.observe(true, t0 + SECOND));
        // Only once per streak.
        assert!(!tracker.observe(true, t0 + Duration::from_millis(1500)));
    }

    #[test]
    fn single_bad_frame_restarts_the_window() {
        let t0 = Instant::now();
        let mut tracker = ReadinessTracker::new(SECOND);
        assert!(!tracker.observe(true, t0));
        assert!(!tracker.observe(false, t0 + Duration::from_millis(600)));
        assert!(!tracker.observe(true, t0 + Duration::from_millis(1100)));
        assert!(!tracker.observe(true, t0 + Duration::from_millis(2000)));
        assert!(tracker.observe(true, t0 + Duration::from_millis(2100)));
    }

    #[test]
    fn zero_window_fires_on_first_ready_frame() {
        let mut tracker = ReadinessTracker::new(Duration::ZERO);
        assert!(tracker.observe(true, Instant::now()));
    }

    #[test]
    fn streak_reports_elapsed_time() {
        let t0 = Instant::now();
        let mut tracker = ReadinessTracker::new(SECOND);
        assert_eq!(tracker.streak(t0), None);
        tracker.observe(true, t0);
        assert_eq!(tracker.streak(t0 + SECOND), Some(SECOND));
    }
}
