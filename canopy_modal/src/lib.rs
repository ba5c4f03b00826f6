// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Modal: a LIFO stack of overlay panels.
//!
//! [`ModalStack`] manages open modals bottom-to-top. Each pushed modal gets
//! a stacking order above all current ones, and the topmost open modal is
//! the sole receiver of Escape handling and focus containment. Body scroll
//! is locked iff the stack is non-empty: the lock engages on the 0→1 depth
//! transition (capturing the scroll position) and releases on 1→0,
//! restoring it.
//!
//! Closing is a two-phase lifecycle mirroring the layout engine's removals:
//! [`ModalStack::close`] marks a modal as closing and reports the
//! advertised animation duration; the host plays the animation and confirms
//! with [`ModalStack::close_complete`], which pops the modal and says which
//! element should regain focus (the one recorded when that modal opened)
//! and whether scroll should now be restored.
//!
//! `K` is the host's handle for a modal overlay; `F` its handle for
//! focusable descendants. The focus trap ([`ModalStack::on_tab`]) cycles
//! Tab/Shift+Tab between the first and last focusable of the top modal.

use core::fmt::Debug;

use smallvec::SmallVec;
use thiserror::Error;

/// Stack-wide configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ModalConfig {
    /// Stacking order of the bottom-most modal.
    pub base_z: i32,
    /// Advertised close-animation duration, for hosts that schedule
    /// [`ModalStack::close_complete`] by timer.
    pub animation_ms: u64,
    /// Whether clicking a modal's backdrop closes it.
    pub backdrop_close: bool,
    /// Whether Escape closes the top modal.
    pub escape_close: bool,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            base_z: 1000,
            animation_ms: 300,
            backdrop_close: true,
            escape_close: true,
        }
    }
}

/// Modal stack errors.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum ModalError {
    /// A modal with this key is already in the stack.
    #[error("modal key already in stack")]
    DuplicateKey,
}

/// What the host applies after a successful [`ModalStack::show`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShowOutcome<F> {
    /// Stacking order for the new modal's overlay.
    pub z: i32,
    /// Whether body scroll must be locked now (0→1 transition).
    pub lock_scroll: bool,
    /// Element that should receive focus inside the modal.
    pub initial_focus: Option<F>,
}

/// A modal entering its close animation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Closing<K> {
    /// The closing modal.
    pub key: K,
    /// Advertised animation duration before
    /// [`ModalStack::close_complete`] is due.
    pub duration_ms: u64,
}

/// Result of confirming a close.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Closed<K, F> {
    /// The modal that was removed.
    pub key: K,
    /// Element recorded as focused before this modal opened.
    pub restore_focus: Option<F>,
    /// Scroll position to restore; set only when the stack became empty.
    pub restore_scroll: Option<f64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Open,
    Leaving,
}

#[derive(Clone, Debug)]
struct Entry<K, F> {
    key: K,
    focusables: SmallVec<[F; 4]>,
    prior_focus: Option<F>,
    phase: Phase,
}

/// LIFO stack of overlay panels.
#[derive(Clone, Debug)]
pub struct ModalStack<K, F> {
    config: ModalConfig,
    stack: Vec<Entry<K, F>>,
    saved_scroll: Option<f64>,
}

impl<K: Copy + Eq + Debug, F: Copy + Eq> ModalStack<K, F> {
    /// Create an empty stack.
    #[must_use]
    pub fn new(config: ModalConfig) -> Self {
        Self {
            config,
            stack: Vec::new(),
            saved_scroll: None,
        }
    }

    /// Current stack depth, closing modals included.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Body scroll is locked exactly while the stack is non-empty.
    #[must_use]
    pub fn is_scroll_locked(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Key of the topmost modal not yet closing.
    #[must_use]
    pub fn top(&self) -> Option<K> {
        self.stack
            .iter()
            .rev()
            .find(|entry| entry.phase == Phase::Open)
            .map(|entry| entry.key)
    }

    /// Push a new modal.
    ///
    /// `focusables` are the modal's focusable descendants in document
    /// order; `prior_focus` is the element focused before opening, for
    /// restoration on close; `scroll_position` is captured only when this
    /// is the first modal.
    pub fn show(
        &mut self,
        key: K,
        focusables: impl IntoIterator<Item = F>,
        prior_focus: Option<F>,
        scroll_position: f64,
    ) -> Result<ShowOutcome<F>, ModalError> {
        if self.stack.iter().any(|entry| entry.key == key) {
            return Err(ModalError::DuplicateKey);
        }
        let lock_scroll = self.stack.is_empty();
        if lock_scroll {
            self.saved_scroll = Some(scroll_position);
        }
        let z = self.config.base_z + self.stack.len() as i32;
        let focusables: SmallVec<[F; 4]> = focusables.into_iter().collect();
        let initial_focus = focusables.first().copied();
        self.stack.push(Entry {
            key,
            focusables,
            prior_focus,
            phase: Phase::Open,
        });
        tracing::debug!(?key, depth = self.stack.len(), "modal shown");
        Ok(ShowOutcome {
            z,
            lock_scroll,
            initial_focus,
        })
    }

    fn begin_close(&mut self, key: K) -> Option<Closing<K>> {
        let entry = self
            .stack
            .iter_mut()
            .find(|entry| entry.key == key && entry.phase == Phase::Open)?;
        entry.phase = Phase::Leaving;
        tracing::debug!(?key, "modal closing");
        Some(Closing {
            key,
            duration_ms: self.config.animation_ms,
        })
    }

    /// Begin closing a modal; defaults to the top of the stack.
    ///
    /// Returns `None` when there is nothing to close (unknown key, already
    /// closing, or empty stack).
    pub fn close(&mut self, key: Option<K>) -> Option<Closing<K>> {
        let key = match key {
            Some(key) => key,
            None => self.top()?,
        };
        self.begin_close(key)
    }

    /// Escape closes only the top modal, when enabled.
    pub fn escape_pressed(&mut self) -> Option<Closing<K>> {
        if !self.config.escape_close {
            return None;
        }
        self.close(None)
    }

    /// A click whose target is the modal's own overlay root closes that
    /// modal, when enabled. The host is responsible for the target check.
    pub fn backdrop_clicked(&mut self, key: K) -> Option<Closing<K>> {
        if !self.config.backdrop_close {
            return None;
        }
        self.begin_close(key)
    }

    /// Begin closing every open modal, top-down.
    pub fn close_all(&mut self) -> Vec<Closing<K>> {
        let keys: Vec<K> = self
            .stack
            .iter()
            .rev()
            .filter(|entry| entry.phase == Phase::Open)
            .map(|entry| entry.key)
            .collect();
        keys.into_iter()
            .filter_map(|key| self.begin_close(key))
            .collect()
    }

    /// Confirm that a closing modal's animation finished, popping it.
    ///
    /// Reports the focus to restore and, when the stack just became empty,
    /// the scroll position to restore.
    pub fn close_complete(&mut self, key: K) -> Option<Closed<K, F>> {
        let index = self
            .stack
            .iter()
            .position(|entry| entry.key == key && entry.phase == Phase::Leaving)?;
        let entry = self.stack.remove(index);
        let restore_scroll = if self.stack.is_empty() {
            self.saved_scroll.take()
        } else {
            None
        };
        Some(Closed {
            key: entry.key,
            restore_focus: entry.prior_focus,
            restore_scroll,
        })
    }

    /// Focus containment for the top modal.
    ///
    /// Given the currently focused element and the Tab direction, returns
    /// the element focus should jump to in order to stay inside the modal:
    /// Tab on the last focusable wraps to the first, Shift+Tab on the first
    /// wraps to the last. `None` means the host should let focus move
    /// normally.
    #[must_use]
    pub fn on_tab(&self, shift: bool, current: F) -> Option<F> {
        let top = self
            .stack
            .iter()
            .rev()
            .find(|entry| entry.phase == Phase::Open)?;
        let first = *top.focusables.first()?;
        let last = *top.focusables.last()?;
        if shift && current == first {
            Some(last)
        } else if !shift && current == last {
            Some(first)
        } else {
            None
        }
    }
}
