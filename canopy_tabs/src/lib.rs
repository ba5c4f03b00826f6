// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Tabs: single-selection state over a strip of tab handles.
//!
//! [`TabStrip`] maintains exactly one active tab (falling back to index 0
//! when none is marked at construction). Activation can come from a click,
//! a keyboard intent ([`NavKey`]), a horizontal swipe recognized from raw
//! touch deltas, or a programmatic [`TabStrip::set_active`]. Activating the
//! already-active tab is a no-op: no [`TabChange`] is produced, so no event
//! fires and nothing re-renders.
//!
//! A genuine change yields a [`TabChange`] carrying old/new index, the
//! tab's derived name and path, its address-rewrite opt-out, and its query
//! parameters. The embedding context uses these to update ARIA/visual state
//! on both tabs, optionally rewrite the browser address without navigating,
//! and ask the pagination controller to reload with tab-derived parameters.
//!
//! Removing the active tab silently re-activates a neighbor (previous
//! index, or the next one when removing index 0) while other tabs remain;
//! silently meaning no change is reported and no event fires.

use core::fmt::Debug;

use thiserror::Error;

/// One tab in the strip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tab<K> {
    /// Host handle for the tab's presentation node.
    pub key: K,
    /// Display name, as derived from the node's text or data attributes.
    pub name: String,
    /// Navigation path associated with the tab (may be empty).
    pub path: String,
    /// Whether activating this tab may rewrite the browser address.
    pub update_url: bool,
    /// Query parameters the tab contributes to content reloads.
    pub params: Vec<(String, String)>,
}

impl<K> Tab<K> {
    /// Create a tab that rewrites the address and carries no parameters.
    #[must_use]
    pub fn new(key: K, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            path: path.into(),
            update_url: true,
            params: Vec::new(),
        }
    }

    /// Opt this tab out of address rewriting.
    #[must_use]
    pub fn without_url_update(mut self) -> Self {
        self.update_url = false;
        self
    }

    /// Attach reload query parameters.
    #[must_use]
    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }
}

/// How a caller names a tab.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TabSelector<K> {
    /// By position in the strip.
    Index(usize),
    /// By host handle.
    Key(K),
}

/// Keyboard navigation intent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NavKey {
    /// Previous tab.
    Left,
    /// Next tab.
    Right,
    /// Previous tab.
    Up,
    /// Next tab.
    Down,
    /// First tab.
    Home,
    /// Last tab.
    End,
}

/// Report of a genuine activation change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabChange<K> {
    /// Index that was active before.
    pub previous_index: usize,
    /// Newly active index.
    pub index: usize,
    /// Handle of the newly active tab.
    pub key: K,
    /// Name of the newly active tab.
    pub name: String,
    /// Path of the newly active tab.
    pub path: String,
    /// Whether the context may rewrite the browser address.
    pub update_url: bool,
    /// Reload parameters contributed by the tab.
    pub params: Vec<(String, String)>,
}

/// Tab strip errors.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum TabError {
    /// The strip has no tabs.
    #[error("tab strip is empty")]
    Empty,
    /// The selector names no tab in the strip.
    #[error("invalid tab selector")]
    InvalidSelector,
}

/// Swipe recognition thresholds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SwipeConfig {
    /// Horizontal travel required to switch tabs.
    pub threshold: f64,
    /// Travel at which a gesture is claimed as horizontal intent.
    pub intent_threshold: f64,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            threshold: 50.0,
            intent_threshold: 10.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct SwipeState {
    start: Option<(f64, f64)>,
    captured: bool,
}

/// Single-selection tab strip.
#[derive(Clone, Debug)]
pub struct TabStrip<K> {
    tabs: Vec<Tab<K>>,
    active: usize,
    swipe_config: SwipeConfig,
    swipe: SwipeState,
}

impl<K: Copy + Eq + Debug> TabStrip<K> {
    /// Build a strip from `tabs`, honoring a pre-marked active index.
    ///
    /// Falls back to index 0 when no valid mark is given. An empty strip is
    /// rejected so the component stays inert, mirroring the empty-container
    /// policy of the layout engine.
    pub fn new(tabs: Vec<Tab<K>>, marked_active: Option<usize>) -> Result<Self, TabError> {
        if tabs.is_empty() {
            return Err(TabError::Empty);
        }
        let active = marked_active.filter(|&i| i < tabs.len()).unwrap_or(0);
        Ok(Self {
            tabs,
            active,
            swipe_config: SwipeConfig::default(),
            swipe: SwipeState::default(),
        })
    }

    /// Override the swipe thresholds.
    #[must_use]
    pub fn with_swipe_config(mut self, config: SwipeConfig) -> Self {
        self.swipe_config = config;
        self
    }

    /// Number of tabs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Whether the strip has no tabs (possible after removals).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Currently active index.
    #[must_use]
    pub const fn active_index(&self) -> usize {
        self.active
    }

    /// Currently active tab, unless the strip is empty.
    #[must_use]
    pub fn active_tab(&self) -> Option<&Tab<K>> {
        self.tabs.get(self.active)
    }

    /// Tabs in strip order.
    #[must_use]
    pub fn tabs(&self) -> &[Tab<K>] {
        &self.tabs
    }

    fn resolve(&self, selector: TabSelector<K>) -> Result<usize, TabError> {
        if self.tabs.is_empty() {
            return Err(TabError::Empty);
        }
        match selector {
            TabSelector::Index(index) if index < self.tabs.len() => Ok(index),
            TabSelector::Index(_) => Err(TabError::InvalidSelector),
            TabSelector::Key(key) => self
                .tabs
                .iter()
                .position(|tab| tab.key == key)
                .ok_or(TabError::InvalidSelector),
        }
    }

    fn change_to(&mut self, index: usize) -> Option<TabChange<K>> {
        if index == self.active {
            return None;
        }
        let previous_index = self.active;
        self.active = index;
        let tab = &self.tabs[index];
        tracing::debug!(from = previous_index, to = index, name = %tab.name, "active tab changed");
        Some(TabChange {
            previous_index,
            index,
            key: tab.key,
            name: tab.name.clone(),
            path: tab.path.clone(),
            update_url: tab.update_url,
            params: tab.params.clone(),
        })
    }

    /// Activate a tab. `Ok(None)` means the tab was already active.
    pub fn set_active(&mut self, selector: TabSelector<K>) -> Result<Option<TabChange<K>>, TabError> {
        let index = self.resolve(selector)?;
        Ok(self.change_to(index))
    }

    /// Activate the next tab, wrapping.
    pub fn next(&mut self) -> Option<TabChange<K>> {
        if self.tabs.is_empty() {
            return None;
        }
        let index = (self.active + 1) % self.tabs.len();
        self.change_to(index)
    }

    /// Activate the previous tab, wrapping.
    pub fn prev(&mut self) -> Option<TabChange<K>> {
        if self.tabs.is_empty() {
            return None;
        }
        let index = if self.active == 0 {
            self.tabs.len() - 1
        } else {
            self.active - 1
        };
        self.change_to(index)
    }

    /// Apply a keyboard intent.
    pub fn handle_key(&mut self, key: NavKey) -> Option<TabChange<K>> {
        if self.tabs.is_empty() {
            return None;
        }
        match key {
            NavKey::Left | NavKey::Up => self.prev(),
            NavKey::Right | NavKey::Down => self.next(),
            NavKey::Home => self.change_to(0),
            NavKey::End => self.change_to(self.tabs.len() - 1),
        }
    }

    /// Activate the first tab whose name matches, ignoring ASCII case.
    pub fn activate_by_name(&mut self, name: &str) -> Result<Option<TabChange<K>>, TabError> {
        let index = self
            .tabs
            .iter()
            .position(|tab| tab.name.eq_ignore_ascii_case(name))
            .ok_or(TabError::InvalidSelector)?;
        Ok(self.change_to(index))
    }

    /// Activate the first tab with exactly this path.
    pub fn activate_by_path(&mut self, path: &str) -> Result<Option<TabChange<K>>, TabError> {
        let index = self
            .tabs
            .iter()
            .position(|tab| tab.path == path)
            .ok_or(TabError::InvalidSelector)?;
        Ok(self.change_to(index))
    }

    /// Record a touch press.
    pub fn touch_start(&mut self, x: f64, y: f64) {
        self.swipe = SwipeState {
            start: Some((x, y)),
            captured: false,
        };
    }

    /// Track a touch move. Returns `true` once the gesture is claimed as a
    /// horizontal swipe (the host should then suppress scrolling): the
    /// horizontal delta dominates the vertical one and exceeds the intent
    /// threshold.
    pub fn touch_move(&mut self, x: f64, y: f64) -> bool {
        let Some((sx, sy)) = self.swipe.start else {
            return false;
        };
        if !self.swipe.captured {
            let dx = x - sx;
            let dy = y - sy;
            if dx.abs() > dy.abs() && dx.abs() > self.swipe_config.intent_threshold {
                self.swipe.captured = true;
            }
        }
        self.swipe.captured
    }

    /// Complete a touch gesture. A captured swipe whose horizontal travel
    /// exceeds the threshold switches tabs: rightward to the previous tab,
    /// leftward to the next.
    pub fn touch_end(&mut self, x: f64, _y: f64) -> Option<TabChange<K>> {
        let state = core::mem::take(&mut self.swipe);
        let (sx, _) = state.start?;
        if !state.captured {
            return None;
        }
        let dx = x - sx;
        if dx.abs() <= self.swipe_config.threshold {
            return None;
        }
        if dx > 0.0 { self.prev() } else { self.next() }
    }

    /// Append a tab, returning its index.
    pub fn add_tab(&mut self, tab: Tab<K>) -> usize {
        self.tabs.push(tab);
        self.tabs.len() - 1
    }

    /// Remove a tab.
    ///
    /// Removing the active tab re-activates a neighbor silently while other
    /// tabs remain: the previous index, or the next one when removing
    /// index 0. Returns the removed tab.
    pub fn remove_tab(&mut self, selector: TabSelector<K>) -> Result<Tab<K>, TabError> {
        let index = self.resolve(selector)?;
        let removed = self.tabs.remove(index);

        if self.tabs.is_empty() {
            self.active = 0;
        } else if index == self.active {
            // Neighbor re-activation, expressed in post-removal indices.
            self.active = index.saturating_sub(1);
        } else if index < self.active {
            self.active -= 1;
        }
        Ok(removed)
    }
}
