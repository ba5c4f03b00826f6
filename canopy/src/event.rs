// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The closed event union carried on the theme bus.

use canopy_breakpoint::Breakpoint;
use canopy_bus::Event;

use crate::ids::ItemId;

/// Subscription key for [`ThemeEvent`] variants.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The viewport size class changed.
    BreakpointChanged,
    /// A different tab became active.
    TabsChanged,
    /// A layout pass produced changes the host applied.
    LayoutApplied,
    /// Items were appended to the layout.
    ItemsAdded,
    /// An item finished its exit lifecycle.
    ItemsRemoved,
    /// The host observed an item entering the viewport.
    ItemVisible,
    /// A modal was pushed onto the stack.
    ModalOpened,
    /// A modal finished closing and was popped.
    ModalClosed,
    /// A page of items was fetched and appended.
    PageLoaded,
    /// The remote collection has no further pages.
    PageExhausted,
    /// A page fetch failed.
    PageFailed,
    /// The server confirmed a like toggle.
    LikeConfirmed,
    /// A like toggle exhausted its retries.
    LikeFailed,
}

/// An occurrence published on the theme bus.
#[derive(Clone, Debug, PartialEq)]
pub enum ThemeEvent {
    /// The viewport size class changed.
    BreakpointChanged {
        /// The new size class.
        breakpoint: Breakpoint,
    },
    /// A different tab became active.
    TabsChanged {
        /// Index that was active before.
        previous_index: usize,
        /// Newly active index.
        index: usize,
        /// Newly active tab's display name.
        name: String,
        /// Newly active tab's navigation path.
        path: String,
    },
    /// A layout pass produced changes the host applied.
    LayoutApplied {
        /// Column count now in effect.
        columns: u8,
        /// Items in the layout.
        item_count: usize,
    },
    /// Items were appended to the layout.
    ItemsAdded {
        /// How many were appended.
        count: usize,
        /// Items in the layout afterwards.
        total: usize,
    },
    /// An item finished its exit lifecycle and left the layout.
    ItemsRemoved {
        /// The departed item.
        item: ItemId,
    },
    /// The host observed an item entering the viewport.
    ItemVisible {
        /// The visible item.
        item: ItemId,
        /// Its position in the layout.
        index: usize,
    },
    /// A modal was pushed onto the stack.
    ModalOpened {
        /// Stack depth after the push.
        depth: usize,
    },
    /// A modal finished closing and was popped.
    ModalClosed {
        /// Stack depth after the pop.
        depth: usize,
    },
    /// A page of items was fetched and appended.
    PageLoaded {
        /// How many items the page carried.
        count: usize,
        /// Page the next fetch would request.
        next_page: u32,
    },
    /// The remote collection has no further pages.
    PageExhausted,
    /// A page fetch failed.
    PageFailed {
        /// Failure description for observers.
        message: String,
    },
    /// The server confirmed a like toggle.
    LikeConfirmed {
        /// The toggled item.
        post_id: String,
        /// Confirmed liked state.
        liked: bool,
        /// Server-confirmed count.
        count: u64,
    },
    /// A like toggle exhausted its retries and was rolled back.
    LikeFailed {
        /// The item whose toggle failed.
        post_id: String,
        /// The state that had been requested.
        desired: bool,
    },
}

impl Event for ThemeEvent {
    type Topic = Topic;

    fn topic(&self) -> Topic {
        match self {
            Self::BreakpointChanged { .. } => Topic::BreakpointChanged,
            Self::TabsChanged { .. } => Topic::TabsChanged,
            Self::LayoutApplied { .. } => Topic::LayoutApplied,
            Self::ItemsAdded { .. } => Topic::ItemsAdded,
            Self::ItemsRemoved { .. } => Topic::ItemsRemoved,
            Self::ItemVisible { .. } => Topic::ItemVisible,
            Self::ModalOpened { .. } => Topic::ModalOpened,
            Self::ModalClosed { .. } => Topic::ModalClosed,
            Self::PageLoaded { .. } => Topic::PageLoaded,
            Self::PageExhausted => Topic::PageExhausted,
            Self::PageFailed { .. } => Topic::PageFailed,
            Self::LikeConfirmed { .. } => Topic::LikeConfirmed,
            Self::LikeFailed { .. } => Topic::LikeFailed,
        }
    }
}
