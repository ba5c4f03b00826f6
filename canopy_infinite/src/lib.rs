// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Infinite: cursor-gated pagination over a remote collection.
//!
//! [`Pager`] is a state machine over idle, loading, exhausted, and error
//! phases. The host reports proximity of a sentinel trigger with
//! [`Pager::trigger_visible`]; when every gate passes (not already loading,
//! more pages exist, the hard page ceiling is not hit, and the minimum
//! spacing since the previous load has elapsed) the pager hands back a
//! [`PageRequest`] carrying a monotonically increasing id. The host
//! performs the fetch and feeds the decoded body (or the failure) to
//! [`Pager::complete_load`] with that id.
//!
//! [`Pager::reload`] restarts from page 1 for a new query, for example
//! after a tab switch. It issues a fresh request id, so the response of a
//! superseded in-flight fetch is recognized as stale and discarded instead
//! of being applied against the repopulated container.
//!
//! Hosts without a proximity-observation primitive construct the pager in
//! manual mode and surface a load-more button instead; a failed load also
//! falls back to the button so the reader is never stranded.

use canopy_host::{HttpError, ItemRecord};
use serde::Deserialize;
use thiserror::Error;

/// Hard ceiling on fetched pages, a runaway-observer stop.
pub const DEFAULT_MAX_PAGES: u32 = 50;

/// Minimum spacing between two loads, in milliseconds.
pub const DEFAULT_MIN_SPACING_MS: u64 = 1000;

/// Auto-dismiss delay for the inline load-error notice, in milliseconds.
pub const DEFAULT_ERROR_DISMISS_MS: u64 = 3000;

/// Proximity margin around the viewport for the trigger observer, in
/// pixels.
pub const DEFAULT_PROXIMITY_MARGIN: u32 = 200;

/// Whether the environment offers a proximity-observation primitive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObserverSupport {
    /// The host can observe the trigger's proximity to the viewport.
    Available,
    /// No observation primitive; the pager starts in manual mode.
    Unavailable,
}

/// How further pages get requested.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// The host observes the sentinel trigger and calls
    /// [`Pager::trigger_visible`].
    Observer,
    /// The host shows a load-more button and calls
    /// [`Pager::load_more_clicked`].
    Manual,
}

/// Pager configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PagerConfig {
    /// Hard ceiling on the page number a fetch may request.
    pub max_pages: u32,
    /// Minimum time between two loads, in milliseconds.
    pub min_spacing_ms: u64,
    /// Auto-dismiss delay for the inline error notice, in milliseconds.
    pub error_dismiss_ms: u64,
    /// Margin passed to the host's proximity observer.
    pub proximity_margin: u32,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            min_spacing_ms: DEFAULT_MIN_SPACING_MS,
            error_dismiss_ms: DEFAULT_ERROR_DISMISS_MS,
            proximity_margin: DEFAULT_PROXIMITY_MARGIN,
        }
    }
}

/// Starting cursor parsed from the trigger node's data attributes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TriggerData {
    /// Page the next fetch should request.
    pub next_page: u32,
    /// Total page count, when the server rendered it.
    pub total_pages: Option<u32>,
    /// Server-rendered has-more flag.
    pub has_next: bool,
}

impl Default for TriggerData {
    fn default() -> Self {
        Self {
            next_page: 2,
            total_pages: None,
            has_next: true,
        }
    }
}

impl TriggerData {
    /// Parse the cursor from `data-*` attribute pairs.
    ///
    /// Recognized names are `data-next-page`, `data-total-pages`, and
    /// `data-has-next`. Unparseable numeric values keep their defaults; a
    /// present `data-has-next` is `true` only for the exact string
    /// `"true"`, matching what [`Pager::trigger_attrs`] writes back.
    #[must_use]
    pub fn from_attrs<'a>(attrs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut data = Self::default();
        for (name, value) in attrs {
            match name {
                "data-next-page" => {
                    if let Ok(page) = value.parse() {
                        data.next_page = page;
                    }
                }
                "data-total-pages" => {
                    if let Ok(total) = value.parse() {
                        data.total_pages = Some(total);
                    }
                }
                "data-has-next" => data.has_next = value == "true",
                _ => {}
            }
        }
        data
    }
}

/// One page of the collection as the server returns it.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PageResponse {
    /// Item records in presentation order; empty means the collection is
    /// exhausted regardless of the cursor block.
    pub items: Vec<ItemRecord>,
    /// Cursor block accompanying the items.
    pub pagination: Pagination,
}

impl Default for PageResponse {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination::default(),
        }
    }
}

/// The response's cursor block.
#[derive(Copy, Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    /// Page number this response covers.
    pub number: Option<u32>,
    /// Total pages in the collection, when the server reports one.
    pub total_pages: Option<u32>,
    /// Whether the server says more pages follow.
    pub has_next: Option<bool>,
}

/// A fetch the host should perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// Monotonic id; echo it back to [`Pager::complete_load`].
    pub id: u64,
    /// Page to request.
    pub page: u32,
    /// Query parameters, the page number and `ajax=true` marker included.
    pub params: Vec<(String, String)>,
}

/// Load failures as surfaced to the page.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error(transparent)]
    Http(#[from] HttpError),
}

/// What [`Pager::complete_load`] decided.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    /// Items to materialize and append; cursor advanced.
    Loaded {
        /// Records for the templating collaborator, in server order.
        items: Vec<ItemRecord>,
    },
    /// The collection is exhausted; show the terminal notice.
    Exhausted,
    /// The load failed. Show a dismissible inline error and fall back to
    /// the manual button.
    Failed {
        /// What went wrong, for the notice text and the log.
        error: LoadError,
        /// How long the notice stays up before auto-dismissing.
        dismiss_after_ms: u64,
    },
    /// The response belongs to a superseded request; nothing changed.
    Stale,
}

/// Pager lifecycle phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Ready to load when the gates pass.
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The collection has no further pages.
    Exhausted,
    /// The last fetch failed; waiting on a manual retry.
    Error,
}

/// Pagination state machine.
#[derive(Clone, Debug)]
pub struct Pager {
    config: PagerConfig,
    mode: Mode,
    phase: Phase,
    next_page: u32,
    total_pages: Option<u32>,
    has_next: bool,
    /// Extra query parameters carried on every fetch, set by
    /// [`Pager::reload`].
    params: Vec<(String, String)>,
    last_load_ms: Option<u64>,
    next_request_id: u64,
    in_flight: Option<u64>,
}

impl Pager {
    /// Create a pager from the server-rendered cursor.
    ///
    /// Without observer support the pager starts in manual mode and
    /// expects [`Pager::load_more_clicked`] instead of proximity reports.
    #[must_use]
    pub fn new(config: PagerConfig, trigger: TriggerData, observer: ObserverSupport) -> Self {
        let mode = match observer {
            ObserverSupport::Available => Mode::Observer,
            ObserverSupport::Unavailable => Mode::Manual,
        };
        let phase = if trigger.has_next {
            Phase::Idle
        } else {
            Phase::Exhausted
        };
        Self {
            config,
            mode,
            phase,
            next_page: trigger.next_page,
            total_pages: trigger.total_pages,
            has_next: trigger.has_next,
            params: Vec::new(),
            last_load_ms: None,
            next_request_id: 0,
            in_flight: None,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether loads come from a proximity observer or a manual button.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The pager's limits and timings.
    #[must_use]
    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    /// Whether another load is permitted right now.
    ///
    /// All gates must pass: not loading or exhausted, more pages exist,
    /// the page ceiling is not hit, and the minimum spacing since the
    /// previous load has elapsed. Overlapping observer callbacks fail the
    /// spacing gate instead of double-fetching.
    #[must_use]
    pub fn should_load(&self, now: u64) -> bool {
        if self.phase != Phase::Idle || !self.has_next {
            return false;
        }
        if let Some(total) = self.total_pages
            && self.next_page > total
        {
            return false;
        }
        if self.next_page > self.config.max_pages {
            return false;
        }
        match self.last_load_ms {
            Some(last) => now.saturating_sub(last) >= self.config.min_spacing_ms,
            None => true,
        }
    }

    fn begin_load(&mut self, now: u64) -> PageRequest {
        self.phase = Phase::Loading;
        self.last_load_ms = Some(now);
        self.next_request_id += 1;
        let id = self.next_request_id;
        self.in_flight = Some(id);
        let mut params = vec![
            ("page".to_owned(), self.next_page.to_string()),
            ("ajax".to_owned(), "true".to_owned()),
        ];
        params.extend(self.params.iter().cloned());
        tracing::debug!(page = self.next_page, id, "page fetch requested");
        PageRequest {
            id,
            page: self.next_page,
            params,
        }
    }

    /// The sentinel trigger entered the proximity margin.
    pub fn trigger_visible(&mut self, now: u64) -> Option<PageRequest> {
        if !self.should_load(now) {
            return None;
        }
        Some(self.begin_load(now))
    }

    /// The manual load-more button was pressed.
    ///
    /// Also the retry path out of the error phase.
    pub fn load_more_clicked(&mut self, now: u64) -> Option<PageRequest> {
        if self.phase == Phase::Error {
            self.phase = Phase::Idle;
        }
        self.trigger_visible(now)
    }

    /// Restart from page 1 with a new query, after an external filter
    /// change. The returned fetch carries a fresh id, so a superseded
    /// in-flight response will be reported as [`LoadOutcome::Stale`].
    pub fn reload(&mut self, params: Vec<(String, String)>, now: u64) -> PageRequest {
        self.next_page = 1;
        self.total_pages = None;
        self.has_next = true;
        self.params = params;
        self.phase = Phase::Idle;
        self.last_load_ms = None;
        self.begin_load(now)
    }

    /// Apply a finished fetch.
    ///
    /// An empty item list is the authoritative exhaustion signal, whatever
    /// the response's has-next field claims.
    pub fn complete_load(
        &mut self,
        id: u64,
        result: Result<PageResponse, LoadError>,
    ) -> LoadOutcome {
        if self.in_flight != Some(id) {
            tracing::debug!(id, "stale page response discarded");
            return LoadOutcome::Stale;
        }
        self.in_flight = None;
        match result {
            Ok(response) => {
                if response.items.is_empty() {
                    self.has_next = false;
                    self.phase = Phase::Exhausted;
                    return LoadOutcome::Exhausted;
                }
                let block = response.pagination;
                if let Some(number) = block.number {
                    self.next_page = number + 1;
                } else {
                    self.next_page += 1;
                }
                if block.total_pages.is_some() {
                    self.total_pages = block.total_pages;
                }
                self.has_next = block.has_next.unwrap_or(true);
                self.phase = if self.has_next {
                    Phase::Idle
                } else {
                    Phase::Exhausted
                };
                if self.phase == Phase::Exhausted {
                    tracing::debug!("collection exhausted");
                }
                LoadOutcome::Loaded {
                    items: response.items,
                }
            }
            Err(error) => {
                self.phase = Phase::Error;
                tracing::warn!(%error, "page fetch failed");
                LoadOutcome::Failed {
                    error,
                    dismiss_after_ms: self.config.error_dismiss_ms,
                }
            }
        }
    }

    /// Page the next fetch would request.
    #[must_use]
    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    /// Whether the collection advertises further pages.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.has_next
    }

    /// Cursor written back to the trigger node's data attributes, keeping
    /// the markup consistent with pager state.
    #[must_use]
    pub fn trigger_attrs(&self) -> Vec<(&'static str, String)> {
        let mut attrs = vec![
            ("data-next-page", self.next_page.to_string()),
            ("data-has-next", self.has_next.to_string()),
        ];
        if let Some(total) = self.total_pages {
            attrs.push(("data-total-pages", total.to_string()));
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> ItemRecord {
        ItemRecord {
            id: id.to_owned(),
            ..ItemRecord::default()
        }
    }

    fn pager(trigger: TriggerData) -> Pager {
        Pager::new(PagerConfig::default(), trigger, ObserverSupport::Available)
    }

    #[test]
    fn trigger_attrs_round_trip_through_the_markup() {
        let data = TriggerData::from_attrs([
            ("data-next-page", "2"),
            ("data-total-pages", "3"),
            ("data-has-next", "true"),
            ("data-unrelated", "x"),
        ]);
        assert_eq!(data.next_page, 2);
        assert_eq!(data.total_pages, Some(3));
        assert!(data.has_next);

        // Garbage numeric values keep their defaults.
        let data = TriggerData::from_attrs([("data-next-page", "soon")]);
        assert_eq!(data, TriggerData::default());

        // A present has-next flag is true only for the exact string "true".
        let data = TriggerData::from_attrs([("data-has-next", "yes")]);
        assert!(!data.has_next);
        let data = TriggerData::from_attrs([("data-has-next", "false")]);
        assert!(!data.has_next);
    }

    #[test]
    fn fetch_advances_cursor_from_the_response() {
        let mut pager = pager(TriggerData {
            next_page: 2,
            total_pages: Some(3),
            has_next: true,
        });
        let request = pager.trigger_visible(0).expect("gates pass");
        assert_eq!(request.page, 2);
        assert!(request.params.contains(&("page".to_owned(), "2".to_owned())));
        assert!(
            request
                .params
                .contains(&("ajax".to_owned(), "true".to_owned()))
        );

        let body: PageResponse = serde_json::from_str(
            r#"{
                "items": [{"id": "x"}, {"id": "y"}],
                "pagination": {"number": 2, "totalPages": 3, "hasNext": true}
            }"#,
        )
        .expect("valid body");
        let outcome = pager.complete_load(request.id, Ok(body));
        match outcome {
            LoadOutcome::Loaded { items } => assert_eq!(items.len(), 2),
            other => panic!("expected Loaded, got {other:?}"),
        }
        assert_eq!(pager.next_page(), 3);
        assert!(pager.has_more());
        assert_eq!(pager.phase(), Phase::Idle);
    }

    #[test]
    fn empty_items_exhaust_despite_has_next() {
        let mut pager = pager(TriggerData::default());
        let request = pager.trigger_visible(0).expect("gates pass");
        let body = PageResponse {
            items: Vec::new(),
            pagination: Pagination {
                number: Some(2),
                total_pages: Some(9),
                has_next: Some(true),
            },
        };
        assert_eq!(pager.complete_load(request.id, Ok(body)), LoadOutcome::Exhausted);
        assert_eq!(pager.phase(), Phase::Exhausted);
        assert!(!pager.has_more());
        assert!(pager.trigger_visible(60_000).is_none());
    }

    #[test]
    fn spacing_gate_throttles_overlapping_observer_fires() {
        let mut pager = pager(TriggerData::default());
        let request = pager.trigger_visible(0).expect("gates pass");
        let body = PageResponse {
            items: vec![item("a")],
            pagination: Pagination::default(),
        };
        pager.complete_load(request.id, Ok(body));

        // Still within the minimum spacing window.
        assert!(!pager.should_load(500));
        assert!(pager.trigger_visible(500).is_none());
        assert!(pager.should_load(1000));
    }

    #[test]
    fn loading_phase_blocks_a_second_fetch() {
        let mut pager = pager(TriggerData::default());
        assert!(pager.trigger_visible(0).is_some());
        assert!(pager.trigger_visible(5000).is_none());
    }

    #[test]
    fn total_pages_and_ceiling_gate_loads() {
        let mut pager = pager(TriggerData {
            next_page: 4,
            total_pages: Some(3),
            has_next: true,
        });
        assert!(pager.trigger_visible(0).is_none());

        let mut pager = pager_with_max(2);
        assert!(pager.trigger_visible(0).is_none());
    }

    fn pager_with_max(max_pages: u32) -> Pager {
        Pager::new(
            PagerConfig {
                max_pages,
                ..PagerConfig::default()
            },
            TriggerData {
                next_page: 3,
                total_pages: None,
                has_next: true,
            },
            ObserverSupport::Available,
        )
    }

    #[test]
    fn failure_enters_error_phase_and_manual_retry_recovers() {
        let mut pager = pager(TriggerData::default());
        let request = pager.trigger_visible(0).expect("gates pass");
        let outcome =
            pager.complete_load(request.id, Err(LoadError::Http(HttpError::Status(502))));
        match outcome {
            LoadOutcome::Failed {
                dismiss_after_ms, ..
            } => assert_eq!(dismiss_after_ms, DEFAULT_ERROR_DISMISS_MS),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(pager.phase(), Phase::Error);

        // Observer fires do nothing while in the error phase.
        assert!(pager.trigger_visible(60_000).is_none());
        let retry = pager.load_more_clicked(60_000).expect("retry allowed");
        assert_eq!(retry.page, 2);
    }

    #[test]
    fn reload_supersedes_the_in_flight_fetch() {
        let mut pager = pager(TriggerData::default());
        let old = pager.trigger_visible(0).expect("gates pass");

        let fresh = pager.reload(vec![("category".to_owned(), "news".to_owned())], 100);
        assert_eq!(fresh.page, 1);
        assert!(
            fresh
                .params
                .contains(&("category".to_owned(), "news".to_owned()))
        );

        // The superseded response must not advance the new cursor.
        let body = PageResponse {
            items: vec![item("old")],
            pagination: Pagination {
                number: Some(2),
                total_pages: None,
                has_next: Some(true),
            },
        };
        assert_eq!(pager.complete_load(old.id, Ok(body)), LoadOutcome::Stale);
        assert_eq!(pager.phase(), Phase::Loading);

        let body = PageResponse {
            items: vec![item("new")],
            pagination: Pagination {
                number: Some(1),
                total_pages: Some(5),
                has_next: Some(true),
            },
        };
        match pager.complete_load(fresh.id, Ok(body)) {
            LoadOutcome::Loaded { items } => assert_eq!(items[0].id, "new"),
            other => panic!("expected Loaded, got {other:?}"),
        }
        assert_eq!(pager.next_page(), 2);
    }

    #[test]
    fn unavailable_observer_falls_back_to_manual_mode() {
        let pager = Pager::new(
            PagerConfig::default(),
            TriggerData::default(),
            ObserverSupport::Unavailable,
        );
        assert_eq!(pager.mode(), Mode::Manual);
    }

    #[test]
    fn trigger_attrs_reflect_the_cursor() {
        let mut pager = pager(TriggerData {
            next_page: 2,
            total_pages: Some(3),
            has_next: true,
        });
        let request = pager.trigger_visible(0).expect("gates pass");
        let body = PageResponse {
            items: vec![item("a")],
            pagination: Pagination {
                number: Some(2),
                total_pages: Some(3),
                has_next: Some(true),
            },
        };
        pager.complete_load(request.id, Ok(body));
        let attrs = pager.trigger_attrs();
        assert!(attrs.contains(&("data-next-page", "3".to_owned())));
        assert!(attrs.contains(&("data-has-next", "true".to_owned())));
        assert!(attrs.contains(&("data-total-pages", "3".to_owned())));
    }
}
