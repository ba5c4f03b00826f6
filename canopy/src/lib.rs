// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy: the coordination core of a content-site theme.
//!
//! The component crates are headless state machines over copyable handles;
//! this crate binds them into one [`Theme`] context. The host (the layer
//! that owns actual presentation nodes, the network, and the clock) feeds
//! browser-level happenings into the theme's entry points and applies the
//! [`Effect`] values it gets back; network completions are injected with
//! the request ids the theme handed out, so responses of superseded
//! requests are recognized and discarded.
//!
//! Cross-component coordination runs over a typed [`Bus`] carrying the
//! closed [`ThemeEvent`] union. Handlers receive the mutable [`Widgets`]
//! context rather than reaching for ambient globals, and hosts can
//! subscribe to any [`Topic`] to observe the theme from outside.
//!
//! ```
//! use canopy::{Theme, ThemeOptions};
//! use canopy_host::{MemoryStore, TracingFaults};
//!
//! let options = ThemeOptions {
//!     viewport_width: 500.0,
//!     ..ThemeOptions::default()
//! };
//! let theme = Theme::new(options, MemoryStore::new(), TracingFaults);
//! assert_eq!(theme.breakpoint().as_str(), "mobile");
//! ```

mod effect;
mod event;
mod ids;
mod theme;

pub use effect::Effect;
pub use event::{ThemeEvent, Topic};
pub use ids::{FocusId, ItemId, ModalId, TabId};
pub use theme::{Theme, ThemeOptions, Widgets};

pub use canopy_bus::Bus;

/// Compact display form for a count: `512`, `1.5K`, `2.0M`.
#[must_use]
pub fn format_count(count: u64) -> String {
    if count < 1000 {
        count.to_string()
    } else if count < 1_000_000 {
        format!("{:.1}K", count as f64 / 1000.0)
    } else {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    }
}
