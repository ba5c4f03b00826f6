// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Layout: the masonry layout state machine.
//!
//! [`Masonry`] arranges an ordered sequence of item handles into N columns,
//! where N is a function of the current [`Breakpoint`] and the settings'
//! column map. It owns no presentation nodes: `K` is whatever copyable
//! handle the host uses for them, and every operation returns a
//! [`LayoutUpdate`] describing what the host should apply (column count,
//! gap, entrance marks with staggered delays).
//!
//! The item list is refreshed as a whole on every relayout rather than
//! incrementally diffed; insertion order is presentation order.
//!
//! Removal is a two-phase lifecycle: [`Masonry::remove_items`] marks handles
//! as leaving so the host can play an exit animation, and the host confirms
//! with [`Masonry::exit_complete`] once the node is gone (or schedules the
//! confirmation itself after the advertised
//! [`MasonryConfig::removal_delay_ms`]).
//!
//! A container with no matching items at initialization time abandons
//! initialization ([`LayoutError::EmptyContainer`]); the component stays
//! inert and every subsequent operation is a no-op.

use core::hash::Hash;

use hashbrown::HashSet;
use smallvec::SmallVec;
use thiserror::Error;

use canopy_breakpoint::Breakpoint;
use canopy_settings::ColumnMap;

/// Spacing preset for the masonry container.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Density {
    /// 16-unit column gap.
    Tight,
    /// 24-unit column gap.
    #[default]
    Normal,
    /// 32-unit column gap.
    Loose,
}

impl Density {
    /// The column gap for this density, in layout units.
    #[must_use]
    pub const fn gap(self) -> u16 {
        match self {
            Self::Tight => 16,
            Self::Normal => 24,
            Self::Loose => 32,
        }
    }
}

/// Masonry configuration, validated at construction.
#[derive(Clone, Debug)]
pub struct MasonryConfig {
    /// Column count per size class.
    pub columns: ColumnMap,
    /// Per-item entrance animation stagger, in milliseconds.
    pub stagger_ms: u64,
    /// Advertised exit-animation duration. Hosts without an animation
    /// completion callback schedule [`Masonry::exit_complete`] after this.
    pub removal_delay_ms: u64,
}

impl Default for MasonryConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMap::default(),
            stagger_ms: 50,
            removal_delay_ms: 300,
        }
    }
}

/// Entrance animation mark for a newly added item.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Entrance<K> {
    /// The item to animate in.
    pub item: K,
    /// Animation delay from the start of the batch.
    pub delay_ms: u64,
}

/// What the host should apply after a layout pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutUpdate<K> {
    /// Column count to apply to the container.
    pub columns: u8,
    /// Column gap to apply, in layout units.
    pub gap: u16,
    /// Items in presentation order.
    pub item_count: usize,
    /// Entrance marks for items added since the last pass.
    pub entrances: SmallVec<[Entrance<K>; 8]>,
    /// Whether this pass changed anything (columns or item set). Repeating a
    /// relayout with no intervening change yields `changed == false`, so
    /// callers can suppress redundant writes and events.
    pub changed: bool,
}

/// Why a masonry operation was not performed.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The container had no matching items at initialization time.
    #[error("no masonry items found in container")]
    EmptyContainer,
}

/// Masonry layout engine over host-owned item handles.
#[derive(Clone, Debug)]
pub struct Masonry<K> {
    config: MasonryConfig,
    items: Vec<K>,
    leaving: HashSet<K>,
    entering: Vec<K>,
    breakpoint: Breakpoint,
    columns: u8,
    density: Density,
    initialized: bool,
}

impl<K: Copy + Eq + Hash> Masonry<K> {
    /// Create an uninitialized engine.
    #[must_use]
    pub fn new(config: MasonryConfig) -> Self {
        Self {
            config,
            items: Vec::new(),
            leaving: HashSet::new(),
            entering: Vec::new(),
            breakpoint: Breakpoint::Mobile,
            columns: 0,
            density: Density::Normal,
            initialized: false,
        }
    }

    /// Whether initialization has completed.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Items in presentation order.
    #[must_use]
    pub fn items(&self) -> &[K] {
        &self.items
    }

    /// Current column count (0 while uninitialized).
    #[must_use]
    pub const fn columns(&self) -> u8 {
        self.columns
    }

    /// Advertised exit-animation duration.
    #[must_use]
    pub const fn removal_delay_ms(&self) -> u64 {
        self.config.removal_delay_ms
    }

    /// Capture the initial item list and apply the first layout.
    ///
    /// An empty `items` slice abandons initialization: the engine stays
    /// inert and the caller is expected to report the error, not propagate
    /// it as fatal.
    pub fn initialize(
        &mut self,
        items: &[K],
        breakpoint: Breakpoint,
    ) -> Result<LayoutUpdate<K>, LayoutError> {
        if items.is_empty() {
            return Err(LayoutError::EmptyContainer);
        }
        self.items = items.to_vec();
        self.breakpoint = breakpoint;
        self.columns = self.config.columns.for_breakpoint(breakpoint);
        self.initialized = true;
        tracing::debug!(
            items = self.items.len(),
            columns = self.columns,
            "masonry initialized"
        );
        Ok(LayoutUpdate {
            columns: self.columns,
            gap: self.density.gap(),
            item_count: self.items.len(),
            entrances: SmallVec::new(),
            changed: true,
        })
    }

    /// Recompute the layout over a fresh item snapshot from the host.
    ///
    /// Safe to call when uninitialized (returns `None`). Items currently in
    /// their exit lifecycle stay part of the layout until confirmed gone.
    pub fn relayout_with(&mut self, items: &[K]) -> Option<LayoutUpdate<K>> {
        if !self.initialized {
            return None;
        }
        let items_changed = self.items != items;
        if items_changed {
            self.items = items.to_vec();
        }
        Some(self.apply_layout(items_changed))
    }

    /// Recompute the layout over the retained item list.
    ///
    /// Idempotent: with no intervening change, a repeated call yields the
    /// same column count and `changed == false`.
    pub fn relayout(&mut self) -> Option<LayoutUpdate<K>> {
        if !self.initialized {
            return None;
        }
        Some(self.apply_layout(false))
    }

    fn apply_layout(&mut self, items_changed: bool) -> LayoutUpdate<K> {
        let columns = self.config.columns.for_breakpoint(self.breakpoint);
        let columns_changed = columns != self.columns;
        self.columns = columns;

        let mut entrances = SmallVec::new();
        for node in self.entering.drain(..) {
            if let Some(index) = self.items.iter().position(|item| *item == node) {
                entrances.push(Entrance {
                    item: node,
                    delay_ms: index as u64 * self.config.stagger_ms,
                });
            }
        }

        let changed = items_changed || columns_changed || !entrances.is_empty();
        LayoutUpdate {
            columns,
            gap: self.density.gap(),
            item_count: self.items.len(),
            entrances,
            changed,
        }
    }

    /// Append new items, mark them for entrance animation, and relayout.
    ///
    /// Returns `None` when uninitialized. Handles already present are not
    /// duplicated.
    pub fn add_items(&mut self, nodes: &[K]) -> Option<LayoutUpdate<K>> {
        if !self.initialized {
            return None;
        }
        for node in nodes {
            if !self.items.contains(node) {
                self.items.push(*node);
                self.entering.push(*node);
            }
        }
        tracing::debug!(added = nodes.len(), total = self.items.len(), "masonry items added");
        Some(self.apply_layout(!nodes.is_empty()))
    }

    /// Begin the exit lifecycle for `nodes`.
    ///
    /// Unknown handles are ignored. Returns the handles now leaving; the
    /// host plays their exit animation and confirms each with
    /// [`Masonry::exit_complete`], or schedules the confirmations after
    /// [`MasonryConfig::removal_delay_ms`].
    pub fn remove_items(&mut self, nodes: &[K]) -> Vec<K> {
        if !self.initialized {
            return Vec::new();
        }
        let mut exiting = Vec::new();
        for node in nodes {
            if self.items.contains(node) && self.leaving.insert(*node) {
                exiting.push(*node);
            }
        }
        exiting
    }

    /// Confirm that a leaving item's node is gone, dropping it from the
    /// layout. Returns a relayout update when the item was in fact leaving.
    pub fn exit_complete(&mut self, node: &K) -> Option<LayoutUpdate<K>> {
        if !self.leaving.remove(node) {
            return None;
        }
        self.items.retain(|item| item != node);
        Some(self.apply_layout(true))
    }

    /// React to a size-class change.
    ///
    /// Runs a layout pass only when the column count actually changed,
    /// avoiding redundant container writes.
    pub fn on_breakpoint_change(&mut self, breakpoint: Breakpoint) -> Option<LayoutUpdate<K>> {
        self.breakpoint = breakpoint;
        if !self.initialized {
            return None;
        }
        if self.config.columns.for_breakpoint(breakpoint) == self.columns {
            return None;
        }
        let update = self.apply_layout(false);
        tracing::debug!(
            columns = update.columns,
            breakpoint = breakpoint.as_str(),
            "masonry columns updated"
        );
        Some(update)
    }

    /// Apply a density preset, returning the gap the host should write.
    /// Takes effect immediately, without a relayout pass.
    pub fn update_density(&mut self, density: Density) -> u16 {
        self.density = density;
        density.gap()
    }

    /// Index of a visible item, for visibility observations forwarded by
    /// the host.
    #[must_use]
    pub fn item_index(&self, node: &K) -> Option<usize> {
        self.items.iter().position(|item| item == node)
    }

    /// Clear all state and detach. Idempotent.
    pub fn destroy(&mut self) {
        if !self.initialized {
            return;
        }
        self.items.clear();
        self.leaving.clear();
        self.entering.clear();
        self.columns = 0;
        self.density = Density::Normal;
        self.initialized = false;
        tracing::debug!("masonry destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Masonry<u32> {
        Masonry::new(MasonryConfig::default())
    }

    #[test]
    fn empty_container_abandons_initialization() {
        let mut masonry = engine();
        assert_eq!(
            masonry.initialize(&[], Breakpoint::Desktop),
            Err(LayoutError::EmptyContainer)
        );
        assert!(!masonry.is_initialized());
        // Everything stays inert afterwards.
        assert_eq!(masonry.relayout(), None);
        assert_eq!(masonry.add_items(&[1]), None);
        assert_eq!(masonry.on_breakpoint_change(Breakpoint::Wide), None);
    }

    #[test]
    fn initialize_applies_breakpoint_columns() {
        let mut masonry = engine();
        let update = masonry
            .initialize(&[1, 2, 3], Breakpoint::Desktop)
            .expect("non-empty container");
        assert_eq!(update.columns, 3);
        assert_eq!(update.gap, 24);
        assert_eq!(update.item_count, 3);
        assert!(update.changed);

        let mobile = engine()
            .initialize(&[9], Breakpoint::Mobile)
            .expect("non-empty container");
        assert_eq!(mobile.columns, 1);
    }

    #[test]
    fn relayout_is_idempotent() {
        let mut masonry = engine();
        masonry.initialize(&[1, 2], Breakpoint::Tablet).expect("init");

        let first = masonry.relayout().expect("initialized");
        let second = masonry.relayout().expect("initialized");
        assert_eq!(first.columns, second.columns);
        assert!(!first.changed);
        assert!(!second.changed);
    }

    #[test]
    fn relayout_with_picks_up_host_changes() {
        let mut masonry = engine();
        masonry.initialize(&[1, 2], Breakpoint::Tablet).expect("init");

        let update = masonry.relayout_with(&[1, 2, 3]).expect("initialized");
        assert!(update.changed);
        assert_eq!(update.item_count, 3);
        assert_eq!(masonry.items(), &[1, 2, 3]);

        let repeat = masonry.relayout_with(&[1, 2, 3]).expect("initialized");
        assert!(!repeat.changed);
    }

    #[test]
    fn added_items_get_staggered_entrances() {
        let mut masonry = engine();
        masonry.initialize(&[1, 2], Breakpoint::Tablet).expect("init");

        let update = masonry.add_items(&[3, 4]).expect("initialized");
        assert_eq!(update.item_count, 4);
        assert!(update.changed);
        let delays: Vec<_> = update.entrances.iter().map(|e| (e.item, e.delay_ms)).collect();
        assert_eq!(delays, vec![(3, 100), (4, 150)]);

        // Entrance marks are consumed by the pass that reports them.
        let repeat = masonry.relayout().expect("initialized");
        assert!(repeat.entrances.is_empty());
    }

    #[test]
    fn duplicate_adds_are_ignored() {
        let mut masonry = engine();
        masonry.initialize(&[1], Breakpoint::Mobile).expect("init");
        let update = masonry.add_items(&[1, 2]).expect("initialized");
        assert_eq!(update.item_count, 2);
        assert_eq!(masonry.items(), &[1, 2]);
    }

    #[test]
    fn removal_is_two_phase() {
        let mut masonry = engine();
        masonry.initialize(&[1, 2, 3], Breakpoint::Desktop).expect("init");

        let exiting = masonry.remove_items(&[2, 99]);
        assert_eq!(exiting, vec![2]);
        // Still part of the layout until the exit completes.
        assert_eq!(masonry.items(), &[1, 2, 3]);

        let update = masonry.exit_complete(&2).expect("was leaving");
        assert_eq!(update.item_count, 2);
        assert!(update.changed);
        assert_eq!(masonry.items(), &[1, 3]);

        // Confirming twice is a no-op.
        assert_eq!(masonry.exit_complete(&2), None);
    }

    #[test]
    fn breakpoint_change_reports_only_real_column_changes() {
        let mut masonry = engine();
        masonry.initialize(&[1, 2], Breakpoint::Tablet).expect("init");
        assert_eq!(masonry.columns(), 2);

        let update = masonry
            .on_breakpoint_change(Breakpoint::Desktop)
            .expect("column count changed");
        assert_eq!(update.columns, 3);
        assert!(update.changed);
        assert_eq!(masonry.on_breakpoint_change(Breakpoint::Desktop), None);

        // A different class mapping to the same column count stays quiet.
        let config = MasonryConfig {
            columns: ColumnMap {
                mobile: 2,
                tablet: 2,
                desktop: 3,
                wide: 4,
            },
            ..MasonryConfig::default()
        };
        let mut same = Masonry::new(config);
        same.initialize(&[1], Breakpoint::Mobile).expect("init");
        assert_eq!(same.on_breakpoint_change(Breakpoint::Tablet), None);
    }

    #[test]
    fn density_applies_without_relayout() {
        let mut masonry = engine();
        masonry.initialize(&[1], Breakpoint::Mobile).expect("init");
        assert_eq!(masonry.update_density(Density::Tight), 16);
        assert_eq!(masonry.update_density(Density::Loose), 32);

        // The next pass carries the new gap.
        let update = masonry.relayout().expect("initialized");
        assert_eq!(update.gap, 32);
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut masonry = engine();
        masonry.initialize(&[1, 2], Breakpoint::Tablet).expect("init");
        masonry.destroy();
        assert!(!masonry.is_initialized());
        assert_eq!(masonry.columns(), 0);
        masonry.destroy();
        assert_eq!(masonry.relayout(), None);
    }

    #[test]
    fn item_index_supports_visibility_observations() {
        let mut masonry = engine();
        masonry.initialize(&[10, 20, 30], Breakpoint::Desktop).expect("init");
        assert_eq!(masonry.item_index(&20), Some(1));
        assert_eq!(masonry.item_index(&99), None);
    }
}
