// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Like: optimistic per-item like toggling.
//!
//! [`LikeRegistry`] tracks the set of liked item ids, persisted through the
//! host's key-value store, and serializes toggles per id: a second toggle
//! for the same id within the cooldown window is rejected outright, and a
//! toggle while one is already in flight resolves to the in-flight request
//! instead of issuing a duplicate.
//!
//! The flow is optimistic. The host flips its controls immediately, sends
//! the [`ToggleRequest`] the registry built, and reports back through
//! [`LikeRegistry::complete_toggle`]. On success the registry commits the
//! persisted set and hands back the confirmed count; on failure it retries
//! with a linear backoff, and once retries are exhausted it reports
//! [`ToggleOutcome::Failed`] so the host rolls the controls back. The
//! persisted set never reflects an unconfirmed toggle.
//!
//! [`LikeRegistry::maintain`] bounds growth: cooldown entries older than a
//! minute are dropped, and when the liked set tops one thousand ids only
//! the most recent five hundred are kept.

use canopy_host::{FaultSink, HttpError, HttpRequest, KvStore, Method};
use hashbrown::{HashMap, HashSet};
use serde::Deserialize;
use thiserror::Error;

/// Minimum time between two toggles for the same id, in milliseconds.
pub const DEFAULT_COOLDOWN_MS: u64 = 1000;

/// Attempts per toggle before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Linear backoff base: retry delay is this times the failed attempt
/// number, in milliseconds.
pub const DEFAULT_RETRY_BASE_MS: u64 = 1000;

/// Cooldown entries older than this are dropped by maintenance.
pub const COOLDOWN_TRIM_MS: u64 = 60_000;

/// Liked-set size that triggers the maintenance cap.
pub const PERSISTED_CAP: usize = 1000;

/// How many most-recent ids the cap keeps.
pub const PERSISTED_KEEP: usize = 500;

/// Key the liked set is persisted under.
pub const STORAGE_KEY: &str = "canopy-liked-posts";

/// Registry configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LikeConfig {
    /// Per-id toggle cooldown, in milliseconds.
    pub cooldown_ms: u64,
    /// Attempts per toggle before [`ToggleOutcome::Failed`].
    pub max_retries: u32,
    /// Linear backoff base, in milliseconds.
    pub retry_base_ms: u64,
    /// Persistence key for the liked set.
    pub storage_key: String,
}

impl Default for LikeConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_ms: DEFAULT_RETRY_BASE_MS,
            storage_key: STORAGE_KEY.to_owned(),
        }
    }
}

/// Why a toggle was not started.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LikeError {
    /// The id was toggled too recently.
    #[error("toggle rejected, cooldown has {remaining_ms}ms left")]
    Cooldown {
        /// Time until the cooldown clears, in milliseconds.
        remaining_ms: u64,
    },
    /// A toggle for this id is already in flight; await that one.
    #[error("toggle already in flight as request {request_id}")]
    InFlight {
        /// Id of the request whose outcome the caller should share.
        request_id: u64,
    },
}

/// A network operation the host should perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToggleRequest {
    /// Monotonic id; echo it back to [`LikeRegistry::complete_toggle`].
    pub id: u64,
    /// Item being toggled.
    pub post_id: String,
    /// Target liked state.
    pub desired: bool,
    /// Attempt number, starting at 1.
    pub attempt: u32,
    /// The wire request: POST to like, DELETE to unlike.
    pub http: HttpRequest,
}

/// Body of a successful toggle response.
///
/// Servers have shipped the updated count under two different names; both
/// are accepted.
#[derive(Copy, Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LikeResponse {
    /// Updated like count, when the server sent one.
    #[serde(alias = "count")]
    pub like_count: Option<u64>,
}

/// What [`LikeRegistry::complete_toggle`] decided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The server confirmed the toggle; the persisted set is updated and
    /// should be written through [`LikeRegistry::persist`].
    Confirmed {
        /// Item that was toggled.
        post_id: String,
        /// Confirmed liked state.
        liked: bool,
        /// Server-confirmed count for the item's controls.
        count: u64,
    },
    /// The attempt failed but retries remain. Send `request` after
    /// `delay_ms`.
    Retry {
        /// Replacement request carrying a fresh id.
        request: ToggleRequest,
        /// Backoff before sending, in milliseconds.
        delay_ms: u64,
    },
    /// Retries are exhausted. The persisted set is untouched; roll back
    /// the optimistic control state.
    Failed {
        /// Item whose toggle failed.
        post_id: String,
        /// The state that was being requested.
        desired: bool,
        /// The final attempt's error.
        error: HttpError,
    },
    /// The id matches no in-flight request; nothing changed.
    Stale,
}

#[derive(Clone, Debug)]
struct InFlight {
    request_id: u64,
    desired: bool,
    attempt: u32,
}

/// Persisted liked-set with per-id toggle serialization.
#[derive(Clone, Debug)]
pub struct LikeRegistry {
    config: LikeConfig,
    /// Liked ids in insertion order, oldest first.
    order: Vec<String>,
    liked: HashSet<String>,
    in_flight: HashMap<String, InFlight>,
    cooldowns: HashMap<String, u64>,
    next_request_id: u64,
}

impl LikeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(config: LikeConfig) -> Self {
        Self {
            config,
            order: Vec::new(),
            liked: HashSet::new(),
            in_flight: HashMap::new(),
            cooldowns: HashMap::new(),
            next_request_id: 0,
        }
    }

    /// Load the persisted liked set from the store.
    ///
    /// A missing key starts empty; a malformed value is reported and also
    /// starts empty rather than failing initialization.
    pub fn restore(&mut self, store: &dyn KvStore, faults: &mut dyn FaultSink) {
        let Some(raw) = store.get(&self.config.storage_key) else {
            return;
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => {
                self.order.clear();
                self.liked.clear();
                for id in ids {
                    if self.liked.insert(id.clone()) {
                        self.order.push(id);
                    }
                }
                tracing::debug!(count = self.order.len(), "liked set restored");
            }
            Err(error) => faults.report("like.restore", &error),
        }
    }

    /// Write the liked set back to the store.
    pub fn persist(&self, store: &mut dyn KvStore) {
        // Vec<String> to JSON cannot fail.
        if let Ok(raw) = serde_json::to_string(&self.order) {
            store.set(&self.config.storage_key, &raw);
        }
    }

    /// Whether the persisted set holds `post_id`.
    #[must_use]
    pub fn is_liked(&self, post_id: &str) -> bool {
        self.liked.contains(post_id)
    }

    /// Number of liked ids.
    #[must_use]
    pub fn liked_count(&self) -> usize {
        self.order.len()
    }

    fn toggle_http(post_id: &str, desired: bool) -> HttpRequest {
        let method = if desired { Method::Post } else { Method::Delete };
        HttpRequest::new(method, format!("/api/v1alpha1/posts/{post_id}/like"))
    }

    /// Start a toggle toward `desired`.
    ///
    /// Rejects with [`LikeError::Cooldown`] inside the per-id cooldown
    /// window, and with [`LikeError::InFlight`] when a request for the id
    /// is already out. Otherwise marks the cooldown and returns the
    /// request to send.
    pub fn begin_toggle(
        &mut self,
        post_id: &str,
        desired: bool,
        now: u64,
    ) -> Result<ToggleRequest, LikeError> {
        if let Some(&last) = self.cooldowns.get(post_id) {
            let elapsed = now.saturating_sub(last);
            if elapsed < self.config.cooldown_ms {
                return Err(LikeError::Cooldown {
                    remaining_ms: self.config.cooldown_ms - elapsed,
                });
            }
        }
        if let Some(pending) = self.in_flight.get(post_id) {
            return Err(LikeError::InFlight {
                request_id: pending.request_id,
            });
        }

        self.cooldowns.insert(post_id.to_owned(), now);
        self.next_request_id += 1;
        let id = self.next_request_id;
        self.in_flight.insert(
            post_id.to_owned(),
            InFlight {
                request_id: id,
                desired,
                attempt: 1,
            },
        );
        tracing::debug!(post_id, desired, id, "toggle requested");
        Ok(ToggleRequest {
            id,
            post_id: post_id.to_owned(),
            desired,
            attempt: 1,
            http: Self::toggle_http(post_id, desired),
        })
    }

    fn commit(&mut self, post_id: &str, liked: bool) {
        if liked {
            if self.liked.insert(post_id.to_owned()) {
                self.order.push(post_id.to_owned());
            }
        } else if self.liked.remove(post_id) {
            self.order.retain(|id| id != post_id);
        }
    }

    /// Apply a finished toggle request.
    pub fn complete_toggle(
        &mut self,
        request_id: u64,
        result: Result<LikeResponse, HttpError>,
    ) -> ToggleOutcome {
        let Some(post_id) = self
            .in_flight
            .iter()
            .find(|(_, pending)| pending.request_id == request_id)
            .map(|(id, _)| id.clone())
        else {
            tracing::debug!(request_id, "stale toggle response discarded");
            return ToggleOutcome::Stale;
        };
        let Some(mut pending) = self.in_flight.remove(&post_id) else {
            return ToggleOutcome::Stale;
        };

        match result {
            Ok(response) => {
                self.commit(&post_id, pending.desired);
                ToggleOutcome::Confirmed {
                    post_id,
                    liked: pending.desired,
                    count: response.like_count.unwrap_or(0),
                }
            }
            Err(error) if pending.attempt < self.config.max_retries => {
                let delay_ms = self.config.retry_base_ms * u64::from(pending.attempt);
                pending.attempt += 1;
                self.next_request_id += 1;
                pending.request_id = self.next_request_id;
                let request = ToggleRequest {
                    id: pending.request_id,
                    post_id: post_id.clone(),
                    desired: pending.desired,
                    attempt: pending.attempt,
                    http: Self::toggle_http(&post_id, pending.desired),
                };
                self.in_flight.insert(post_id.clone(), pending);
                tracing::debug!(%post_id, attempt = request.attempt, %error, "toggle retrying");
                ToggleOutcome::Retry { request, delay_ms }
            }
            Err(error) => {
                tracing::warn!(%post_id, %error, "toggle failed, rolling back");
                ToggleOutcome::Failed {
                    post_id,
                    desired: pending.desired,
                    error,
                }
            }
        }
    }

    /// Query request for an authoritative batch of liked states.
    ///
    /// Returns `None` for an empty batch. The response body is a map from
    /// post id to liked flag, to be applied via
    /// [`LikeRegistry::reconcile`].
    #[must_use]
    pub fn batch_status_request<I, S>(&self, post_ids: I) -> Option<HttpRequest>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut query = String::new();
        for id in post_ids {
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str("postIds=");
            query.push_str(id.as_ref());
        }
        if query.is_empty() {
            return None;
        }
        Some(HttpRequest::new(
            Method::Get,
            format!("/api/v1alpha1/posts/likes?{query}"),
        ))
    }

    /// Reconcile the persisted set against an authoritative batch
    /// response. Returns whether anything changed, so the caller knows to
    /// persist.
    pub fn reconcile<I, S>(&mut self, statuses: I) -> bool
    where
        I: IntoIterator<Item = (S, bool)>,
        S: AsRef<str>,
    {
        let mut changed = false;
        for (post_id, liked) in statuses {
            let post_id = post_id.as_ref();
            if self.is_liked(post_id) != liked {
                self.commit(post_id, liked);
                changed = true;
            }
        }
        changed
    }

    /// Periodic cleanup: drop cooldown entries older than
    /// [`COOLDOWN_TRIM_MS`] and cap the liked set at [`PERSISTED_CAP`],
    /// keeping the most recent [`PERSISTED_KEEP`]. Returns whether the
    /// liked set changed, so the caller knows to persist.
    pub fn maintain(&mut self, now: u64) -> bool {
        let cutoff = now.saturating_sub(COOLDOWN_TRIM_MS);
        self.cooldowns.retain(|_, &mut stamp| stamp >= cutoff);

        if self.order.len() > PERSISTED_CAP {
            let dropped = self.order.len() - PERSISTED_KEEP;
            for id in self.order.drain(..dropped) {
                self.liked.remove(&id);
            }
            tracing::debug!(dropped, "liked set capped");
            return true;
        }
        false
    }
}
