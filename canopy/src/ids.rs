// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handle types naming host-owned presentation nodes.
//!
//! The core never touches a node; each id is an opaque ticket into an
//! arena the host maintains. Distinct types keep an item handle from being
//! handed to, say, the modal stack.

/// Handle for one masonry item node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub u64);

/// Handle for one tab node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TabId(pub u64);

/// Handle for one modal overlay node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModalId(pub u64);

/// Handle for one focusable element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FocusId(pub u64);
