// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Breakpoint: viewport size classes and a debounced resize tracker.
//!
//! A [`Breakpoint`] is a discrete size class derived from the viewport width
//! by three fixed thresholds (768, 1024, 1440 logical pixels). Exactly one
//! class holds at any time, and the mapping is monotonic: a wider viewport
//! never yields a smaller class.
//!
//! [`ResizeTracker`] turns a burst of raw resize observations into at most
//! one class-change report. The host feeds every resize signal into
//! [`ResizeTracker::on_resize`] with its timestamp and polls the tracker on
//! its own cadence; [`ResizeTracker::poll`] yields a change only once the
//! debounce window (measured from the *last* signal in the burst) has
//! elapsed and the settled width classifies differently from the last
//! reported class. Transitions are only observable through these reports,
//! never by polling the raw width.
//!
//! ```rust
//! use canopy_breakpoint::{Breakpoint, ResizeTracker};
//!
//! let mut tracker = ResizeTracker::new(250, 1280.0);
//! assert_eq!(tracker.current(), Breakpoint::Desktop);
//!
//! // A burst of resize signals down to phone width…
//! tracker.on_resize(900.0, 1_000);
//! tracker.on_resize(500.0, 1_100);
//!
//! // …coalesces into a single report once the window elapses.
//! assert_eq!(tracker.poll(1_200), None);
//! assert_eq!(tracker.poll(1_350), Some(Breakpoint::Mobile));
//! assert_eq!(tracker.poll(1_400), None);
//! ```

#![no_std]

/// Discrete viewport size class.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Breakpoint {
    /// Width below 768.
    Mobile,
    /// Width in `768..1024`.
    Tablet,
    /// Width in `1024..1440`.
    Desktop,
    /// Width 1440 and above.
    Wide,
}

impl Breakpoint {
    /// Classify a viewport width.
    #[must_use]
    pub fn classify(width: f64) -> Self {
        if width < 768.0 {
            Self::Mobile
        } else if width < 1024.0 {
            Self::Tablet
        } else if width < 1440.0 {
            Self::Desktop
        } else {
            Self::Wide
        }
    }

    /// The class name as used in settings maps and data attributes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
            Self::Wide => "wide",
        }
    }
}

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

#[derive(Copy, Clone, Debug)]
struct PendingResize {
    width: f64,
    at: u64,
}

/// Debounced resize observation tracker.
///
/// Host-driven: no timers of its own. Timestamps are milliseconds from any
/// monotonic host clock.
#[derive(Clone, Debug)]
pub struct ResizeTracker {
    debounce_ms: u64,
    current: Breakpoint,
    pending: Option<PendingResize>,
}

impl ResizeTracker {
    /// Create a tracker with the given debounce window, seeded from the
    /// initial viewport width.
    #[must_use]
    pub fn new(debounce_ms: u64, initial_width: f64) -> Self {
        Self {
            debounce_ms,
            current: Breakpoint::classify(initial_width),
            pending: None,
        }
    }

    /// Create a tracker with the default 250ms window.
    #[must_use]
    pub fn with_default_debounce(initial_width: f64) -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS, initial_width)
    }

    /// The last reported (or initial) size class.
    #[must_use]
    pub const fn current(&self) -> Breakpoint {
        self.current
    }

    /// Record one resize signal. The debounce window restarts from `now`.
    pub fn on_resize(&mut self, width: f64, now: u64) {
        self.pending = Some(PendingResize { width, at: now });
    }

    /// Report a settled class change, if any.
    ///
    /// Returns `Some` at most once per burst: when the debounce window has
    /// elapsed since the last signal and the settled width classifies
    /// differently from the last reported class.
    pub fn poll(&mut self, now: u64) -> Option<Breakpoint> {
        let pending = self.pending?;
        if now.saturating_sub(pending.at) < self.debounce_ms {
            return None;
        }
        self.pending = None;
        let class = Breakpoint::classify(pending.width);
        if class == self.current {
            return None;
        }
        self.current = class;
        Some(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn thresholds_are_exact() {
        assert_eq!(Breakpoint::classify(0.0), Breakpoint::Mobile);
        assert_eq!(Breakpoint::classify(767.9), Breakpoint::Mobile);
        assert_eq!(Breakpoint::classify(768.0), Breakpoint::Tablet);
        assert_eq!(Breakpoint::classify(1023.9), Breakpoint::Tablet);
        assert_eq!(Breakpoint::classify(1024.0), Breakpoint::Desktop);
        assert_eq!(Breakpoint::classify(1439.9), Breakpoint::Desktop);
        assert_eq!(Breakpoint::classify(1440.0), Breakpoint::Wide);
        assert_eq!(Breakpoint::classify(5000.0), Breakpoint::Wide);
    }

    #[test]
    fn burst_coalesces_into_one_report() {
        let mut tracker = ResizeTracker::new(250, 1280.0);
        tracker.on_resize(1100.0, 0);
        tracker.on_resize(900.0, 100);
        tracker.on_resize(600.0, 200);

        // Window measured from the last signal at t=200.
        assert_eq!(tracker.poll(300), None);
        assert_eq!(tracker.poll(450), Some(Breakpoint::Mobile));
        assert_eq!(tracker.current(), Breakpoint::Mobile);
        // Nothing further until a new signal arrives.
        assert_eq!(tracker.poll(10_000), None);
    }

    #[test]
    fn settling_on_the_same_class_reports_nothing() {
        let mut tracker = ResizeTracker::new(250, 1280.0);
        tracker.on_resize(500.0, 0);
        tracker.on_resize(1200.0, 100);
        assert_eq!(tracker.poll(400), None);
        assert_eq!(tracker.current(), Breakpoint::Desktop);
    }

    #[test]
    fn each_burst_restarts_the_window() {
        let mut tracker = ResizeTracker::new(250, 500.0);
        tracker.on_resize(800.0, 0);
        assert_eq!(tracker.poll(200), None);
        // A fresh signal before the window elapses pushes the report out.
        tracker.on_resize(800.0, 240);
        assert_eq!(tracker.poll(300), None);
        assert_eq!(tracker.poll(490), Some(Breakpoint::Tablet));
    }

    proptest! {
        #[test]
        fn classify_is_total_and_monotonic(a in 0.0_f64..4000.0, b in 0.0_f64..4000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            assert!(Breakpoint::classify(lo) <= Breakpoint::classify(hi));
        }

        #[test]
        fn classify_matches_thresholds(w in 0.0_f64..4000.0) {
            let expected = if w < 768.0 {
                Breakpoint::Mobile
            } else if w < 1024.0 {
                Breakpoint::Tablet
            } else if w < 1440.0 {
                Breakpoint::Desktop
            } else {
                Breakpoint::Wide
            };
            assert_eq!(Breakpoint::classify(w), expected);
        }
    }
}
