// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Host: interfaces the embedding host provides to the core.
//!
//! The Canopy core crates hold no resources of their own: no DOM nodes, no
//! sockets, no clock, no storage. Everything the original theme obtained from
//! the browser environment is expressed here as a small collaborator
//! interface the host implements:
//!
//! - [`FaultSink`]: the external fault observer. Degradations and isolated
//!   handler failures are reported here instead of propagating.
//! - [`KvStore`]: a synchronous string key-value store (the `localStorage`
//!   stand-in) used to persist the liked-item set.
//! - [`HttpRequest`] / [`HttpError`]: the wire types handed to the network
//!   collaborator. The core never performs I/O; it builds request values and
//!   consumes completions the host injects back.
//! - [`ItemRecord`] / [`Materializer`]: the templating collaborator. Given
//!   one item record, the host produces one renderable node and returns a
//!   lightweight handle to it.
//!
//! Reference implementations suitable for tests ([`NullFaults`],
//! [`RecordingFaults`], [`MemoryStore`]) live here as well so downstream
//! crates can share them.

pub mod fault;
pub mod item;
pub mod net;
pub mod store;

pub use fault::{FaultSink, NullFaults, RecordingFaults, TracingFaults};
pub use item::{ItemRecord, MaterializeError, Materializer};
pub use net::{Credentials, HttpError, HttpRequest, Method};
pub use store::{KvStore, MemoryStore};
