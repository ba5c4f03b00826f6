// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Commands the theme asks its host to carry out.
//!
//! Entry points on [`crate::Theme`] queue these; the host drains them with
//! [`crate::Theme::take_effects`] after every call and applies each in
//! order. Fetch-flavored effects carry a request id the host must echo
//! back with the completion.

use canopy_host::HttpRequest;
use canopy_layout::Entrance;

use crate::ids::{FocusId, ItemId, ModalId};

/// One host-side action.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Write `columns` and `gap` to the layout container and play the
    /// entrance animations.
    ApplyLayout {
        /// Column count for the container.
        columns: u8,
        /// Column gap, in layout units.
        gap: u16,
        /// Newly added items with their staggered delays.
        entrances: Vec<Entrance<ItemId>>,
    },
    /// Play the exit animation for `items` and confirm each through
    /// [`crate::Theme::exit_complete`], no later than `after_ms` from now.
    ScheduleExit {
        /// Items leaving the layout.
        items: Vec<ItemId>,
        /// The advertised exit-animation duration.
        after_ms: u64,
    },
    /// Perform the fetch of one collection page and report through
    /// [`crate::Theme::complete_page_fetch`] with `id`.
    FetchPage {
        /// Completion correlation id.
        id: u64,
        /// The wire request.
        request: HttpRequest,
    },
    /// Perform a like toggle request, after waiting `delay_ms`, and report
    /// through [`crate::Theme::complete_like_toggle`] with `id`.
    SendToggle {
        /// Completion correlation id.
        id: u64,
        /// The wire request.
        request: HttpRequest,
        /// Backoff before sending; zero for a first attempt.
        delay_ms: u64,
    },
    /// Fetch authoritative liked states and report through
    /// [`crate::Theme::complete_like_status`].
    FetchLikeStatus {
        /// The wire request; the body is a map from post id to flag.
        request: HttpRequest,
    },
    /// Rewrite the browser address without navigating.
    RewriteUrl {
        /// The path to put in the address bar.
        path: String,
    },
    /// Leave the page for `url`. The deep-link fallback when a modal
    /// cannot be shown.
    Navigate {
        /// Destination.
        url: String,
    },
    /// Mount a modal overlay.
    ShowModal {
        /// The modal to mount.
        modal: ModalId,
        /// Stacking order to assign.
        z: i32,
        /// Whether to lock body scroll (first modal only).
        lock_scroll: bool,
        /// Element to focus inside the modal.
        initial_focus: Option<FocusId>,
    },
    /// Play a modal's close animation and confirm through
    /// [`crate::Theme::modal_close_complete`] after `duration_ms`.
    AnimateModalClose {
        /// The closing modal.
        modal: ModalId,
        /// The advertised close-animation duration, per
        /// [`canopy_modal::ModalConfig::animation_ms`].
        duration_ms: u64,
    },
    /// Unmount a closed modal, restoring focus and, when the stack
    /// emptied, scroll.
    RemoveModal {
        /// The modal to unmount.
        modal: ModalId,
        /// Element to restore focus to.
        restore_focus: Option<FocusId>,
        /// Scroll position to restore; present only when the body scroll
        /// lock is released.
        restore_scroll: Option<f64>,
    },
    /// Move keyboard focus to `node` (focus containment).
    FocusNode {
        /// The element to focus.
        node: FocusId,
    },
    /// Empty the layout container ahead of a reload.
    ClearContainer,
    /// Show the skeleton placeholder while a reload is in flight.
    ShowSkeleton,
    /// Show the terminal no-more-content notice.
    ShowNoMore,
    /// Show the manual load-more button.
    ShowManualButton,
    /// Show a dismissible inline load error, auto-dismissing after
    /// `dismiss_after_ms`.
    ShowInlineError {
        /// Text for the notice.
        message: String,
        /// Auto-dismiss delay, in milliseconds.
        dismiss_after_ms: u64,
    },
    /// Write the pagination cursor back to the trigger node's attributes.
    WriteTriggerAttrs {
        /// Attribute name/value pairs.
        attrs: Vec<(&'static str, String)>,
    },
    /// Update every control for `post_id` to the given state and count.
    UpdateLikeControls {
        /// The toggled item.
        post_id: String,
        /// Liked state to render.
        liked: bool,
        /// Raw count, for the controls' data attributes.
        count: u64,
        /// Compact display form of `count`.
        count_display: String,
    },
    /// Roll the controls for `post_id` back to the registry's state and
    /// the count the host recorded before the optimistic flip.
    RollbackLikeControls {
        /// The item whose toggle failed.
        post_id: String,
        /// Liked state to render.
        liked: bool,
    },
    /// Refresh every visible like control from the registry, after a
    /// batch reconciliation.
    RefreshLikeControls,
}
