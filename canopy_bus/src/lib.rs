// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Bus: a typed publish/subscribe registry.
//!
//! Every Canopy widget coordinates through this bus. Instead of string event
//! names with untyped payloads, events form a closed tagged union: the host
//! defines one enum implementing [`Event`], whose [`Event::topic`] maps each
//! variant to a copyable discriminant used as the subscription key.
//!
//! ## Contract
//!
//! - [`Bus::subscribe`] registers a handler for one topic and returns a
//!   [`SubscriberId`] handle.
//! - [`Bus::unsubscribe`] removes exactly one matching registration and is a
//!   no-op when the handle is absent.
//! - [`Bus::publish`] invokes a *snapshot* of the subscribers registered for
//!   the event's topic, in registration order, synchronously on the calling
//!   turn. Registrations or removals performed while a dispatch is underway
//!   do not affect that pass.
//! - A handler that returns an error does not stop dispatch to the remaining
//!   handlers; the error is surfaced to the [`FaultSink`] collaborator.
//!
//! No ordering is guaranteed across different topics.
//!
//! Handlers receive a `&mut Ctx` context alongside the event. The context is
//! whatever mutable state the host wants handlers to share (for Canopy, the
//! widget set and the pending-effect queue); threading it through the bus
//! keeps handlers free of shared-ownership plumbing.
//!
//! ```rust
//! use canopy_bus::{Bus, Event};
//! use canopy_host::NullFaults;
//!
//! #[derive(Debug)]
//! enum Ping {
//!     One,
//!     Two(u32),
//! }
//!
//! #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
//! enum PingTopic {
//!     One,
//!     Two,
//! }
//!
//! impl Event for Ping {
//!     type Topic = PingTopic;
//!     fn topic(&self) -> PingTopic {
//!         match self {
//!             Ping::One => PingTopic::One,
//!             Ping::Two(_) => PingTopic::Two,
//!         }
//!     }
//! }
//!
//! let mut bus: Bus<Vec<u32>, Ping> = Bus::new();
//! bus.subscribe(PingTopic::Two, |seen, event| {
//!     if let Ping::Two(n) = event {
//!         seen.push(*n);
//!     }
//!     Ok(())
//! });
//!
//! let mut seen = Vec::new();
//! let ran = bus.publish(&mut seen, &Ping::Two(7), &mut NullFaults);
//! assert_eq!(ran, 1);
//! assert_eq!(seen, vec![7]);
//! ```

use core::fmt;
use core::hash::Hash;

use hashbrown::HashMap;
use thiserror::Error;

use canopy_host::FaultSink;

/// A closed union of event kinds with a copyable topic discriminant.
pub trait Event {
    /// Subscription key distinguishing the variants of the union.
    type Topic: Copy + Eq + Hash + fmt::Debug;

    /// The topic of this event value.
    fn topic(&self) -> Self::Topic;
}

/// Handle identifying one subscription.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Error raised by a subscriber.
///
/// Handler failures are isolated per handler: they are reported to the fault
/// sink and never abort the dispatch pass or the publisher.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerFault {
    /// Human-readable failure description.
    pub message: String,
}

impl HandlerFault {
    /// Build a fault from any displayable value.
    #[must_use]
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl From<&str> for HandlerFault {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

type Handler<Ctx, E> = Box<dyn FnMut(&mut Ctx, &E) -> Result<(), HandlerFault>>;

/// Typed publish/subscribe registry.
///
/// `Ctx` is the mutable context threaded into every handler; `E` is the
/// closed event union. Dispatch is synchronous and single-threaded: the bus
/// itself is plain mutable state, matching the cooperative execution model
/// of the theme core.
pub struct Bus<Ctx, E: Event> {
    topics: HashMap<E::Topic, Vec<(SubscriberId, Handler<Ctx, E>)>>,
    next_id: u64,
}

impl<Ctx, E: Event> fmt::Debug for Bus<Ctx, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("topics", &self.topics.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl<Ctx, E: Event> Default for Bus<Ctx, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx, E: Event> Bus<Ctx, E> {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register `handler` for `topic`.
    ///
    /// Handlers for the same topic run in registration order.
    pub fn subscribe<F>(&mut self, topic: E::Topic, handler: F) -> SubscriberId
    where
        F: FnMut(&mut Ctx, &E) -> Result<(), HandlerFault> + 'static,
    {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.topics
            .entry(topic)
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Remove the registration identified by `id` under `topic`.
    ///
    /// Returns `true` if a registration was removed; removing an unknown
    /// handle is a no-op.
    pub fn unsubscribe(&mut self, topic: E::Topic, id: SubscriberId) -> bool {
        let Some(handlers) = self.topics.get_mut(&topic) else {
            return false;
        };
        let Some(pos) = handlers.iter().position(|(hid, _)| *hid == id) else {
            return false;
        };
        handlers.remove(pos);
        true
    }

    /// Number of live subscriptions for `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: E::Topic) -> usize {
        self.topics.get(&topic).map_or(0, Vec::len)
    }

    /// Dispatch `event` to the subscribers of its topic.
    ///
    /// Iterates a snapshot of the registrations present when the dispatch
    /// started: a handler removed mid-pass still had its slot in the
    /// snapshot but is skipped once gone, and a handler added mid-pass is
    /// not invoked until the next publish. Handler errors go to `faults` and
    /// dispatch continues.
    ///
    /// Returns the number of handlers invoked.
    pub fn publish(&mut self, ctx: &mut Ctx, event: &E, faults: &mut dyn FaultSink) -> usize {
        let topic = event.topic();
        let snapshot: Vec<SubscriberId> = match self.topics.get(&topic) {
            Some(handlers) => handlers.iter().map(|(id, _)| *id).collect(),
            None => return 0,
        };

        let mut invoked = 0;
        for id in snapshot {
            // Re-resolve per step so removals during the pass are honored
            // without disturbing the snapshot order.
            let Some(handlers) = self.topics.get_mut(&topic) else {
                break;
            };
            let Some((_, handler)) = handlers.iter_mut().find(|(hid, _)| *hid == id) else {
                continue;
            };
            invoked += 1;
            if let Err(fault) = handler(ctx, event) {
                faults.report("bus", &fault);
            }
        }
        invoked
    }
}
