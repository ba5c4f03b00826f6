// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fault reporting collaborator.
//!
//! Most failures in the theme core are degradations, not aborts: a malformed
//! settings blob falls back to defaults, an event handler that errors does
//! not stop dispatch to its siblings, a missing container leaves a component
//! inert. All of these are surfaced to a [`FaultSink`] so the host can log,
//! count, or display them, while the calling code carries on.

use core::fmt::Display;

/// External observer for non-fatal failures.
///
/// Implementations must not panic; reporting a fault is itself expected to
/// be infallible.
pub trait FaultSink {
    /// Report a fault raised by `origin` (a short component name such as
    /// `"bus"` or `"settings"`).
    fn report(&mut self, origin: &str, error: &dyn Display);
}

/// Sink that routes faults to `tracing` at warn level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingFaults;

impl FaultSink for TracingFaults {
    fn report(&mut self, origin: &str, error: &dyn Display) {
        tracing::warn!(origin, %error, "fault reported");
    }
}

/// Sink that discards every fault.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullFaults;

impl FaultSink for NullFaults {
    fn report(&mut self, _origin: &str, _error: &dyn Display) {}
}

/// Sink that records faults as `(origin, message)` pairs.
///
/// Primarily for tests asserting that a degradation was surfaced.
#[derive(Clone, Debug, Default)]
pub struct RecordingFaults {
    /// Recorded faults in report order.
    pub reports: Vec<(String, String)>,
}

impl RecordingFaults {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any fault from `origin` has been recorded.
    #[must_use]
    pub fn has_from(&self, origin: &str) -> bool {
        self.reports.iter().any(|(o, _)| o == origin)
    }
}

impl FaultSink for RecordingFaults {
    fn report(&mut self, origin: &str, error: &dyn Display) {
        self.reports.push((origin.to_owned(), error.to_string()));
    }
}
