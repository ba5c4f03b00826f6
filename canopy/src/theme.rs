// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The application context binding every widget to the bus and the host.
//!
//! [`Theme`] is constructed once per page from [`ThemeOptions`]. Widgets
//! whose setting is off are simply not constructed; their entry points
//! become no-ops. Host-facing methods queue [`Effect`] values, drained
//! with [`Theme::take_effects`], and publish [`ThemeEvent`] values on the
//! bus, where both internal wiring (breakpoint changes driving the
//! masonry) and host subscribers observe them.

use std::collections::VecDeque;

use canopy_breakpoint::{Breakpoint, ResizeTracker};
use canopy_bus::{Bus, HandlerFault, SubscriberId};
use canopy_host::{FaultSink, HttpError, HttpRequest, KvStore, Materializer, Method};
use canopy_infinite::{
    LoadError, LoadOutcome, ObserverSupport, PageRequest, PageResponse, Pager, PagerConfig,
    TriggerData,
};
use canopy_layout::{Density, LayoutUpdate, Masonry, MasonryConfig};
use canopy_like::{LikeConfig, LikeRegistry, LikeResponse, ToggleOutcome};
use canopy_modal::{ModalConfig, ModalStack};
use canopy_settings::Settings;
use canopy_tabs::{NavKey, Tab, TabChange, TabSelector, TabStrip};

use crate::effect::Effect;
use crate::event::{ThemeEvent, Topic};
use crate::format_count;
use crate::ids::{FocusId, ItemId, ModalId, TabId};

/// Page-provided state the theme is constructed from.
#[derive(Clone, Debug)]
pub struct ThemeOptions {
    /// The settings blob embedded in the page, if any.
    pub settings_blob: Option<String>,
    /// Viewport width at construction time.
    pub viewport_width: f64,
    /// Handles of the server-rendered masonry items, in document order.
    pub items: Vec<ItemId>,
    /// The page's tab strip, empty when the page has none.
    pub tabs: Vec<Tab<TabId>>,
    /// Index of the tab the markup marks active.
    pub marked_active_tab: Option<usize>,
    /// Pagination cursor parsed from the trigger node, when present.
    pub pager_trigger: Option<TriggerData>,
    /// Whether the host offers a proximity-observation primitive.
    pub observer: ObserverSupport,
}

impl Default for ThemeOptions {
    fn default() -> Self {
        Self {
            settings_blob: None,
            viewport_width: 1280.0,
            items: Vec::new(),
            tabs: Vec::new(),
            marked_active_tab: None,
            pager_trigger: None,
            observer: ObserverSupport::Available,
        }
    }
}

/// The mutable widget state threaded into bus handlers.
///
/// Optional fields hold widgets whose setting was on at construction; the
/// masonry is always present but stays inert when the container had no
/// items.
#[derive(Debug)]
pub struct Widgets {
    /// The resolved settings snapshot, read-only for the page's lifetime.
    pub settings: Settings,
    /// The masonry layout engine.
    pub masonry: Masonry<ItemId>,
    /// The tab strip, when the page has tabs.
    pub tabs: Option<TabStrip<TabId>>,
    /// The modal stack, when enabled.
    pub modals: Option<ModalStack<ModalId, FocusId>>,
    /// The infinite-scroll pager, when enabled and a trigger exists.
    pub pager: Option<Pager>,
    /// The like registry, when enabled.
    pub likes: Option<LikeRegistry>,
    effects: Vec<Effect>,
    queued: VecDeque<ThemeEvent>,
}

impl Widgets {
    /// Queue an effect for the host to apply.
    pub fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Queue an event for publication after the current dispatch.
    ///
    /// Handlers cannot publish recursively; queued events go out in order
    /// once the triggering dispatch finishes.
    pub fn queue_event(&mut self, event: ThemeEvent) {
        self.queued.push_back(event);
    }

    fn apply_layout(&mut self, update: LayoutUpdate<ItemId>) {
        if !update.changed {
            return;
        }
        self.queue_event(ThemeEvent::LayoutApplied {
            columns: update.columns,
            item_count: update.item_count,
        });
        self.push_effect(Effect::ApplyLayout {
            columns: update.columns,
            gap: update.gap,
            entrances: update.entrances.into_vec(),
        });
    }
}

/// The theme's application context.
///
/// `S` is the host's persistence collaborator, `F` its fault sink.
pub struct Theme<S, F> {
    bus: Bus<Widgets, ThemeEvent>,
    widgets: Widgets,
    resize: ResizeTracker,
    store: S,
    faults: F,
}

impl<S, F> core::fmt::Debug for Theme<S, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Theme")
            .field("widgets", &self.widgets)
            .field("resize", &self.resize)
            .finish_non_exhaustive()
    }
}

impl<S: KvStore, F: FaultSink> Theme<S, F> {
    /// Construct the context, gating each widget on its setting.
    ///
    /// Construction already queues the initial layout effect; an empty
    /// item list abandons masonry initialization with a reported, non
    /// fatal fault.
    pub fn new(options: ThemeOptions, store: S, mut faults: F) -> Self {
        let settings = Settings::resolve(options.settings_blob.as_deref(), &mut faults);
        let resize = ResizeTracker::with_default_debounce(options.viewport_width);

        let masonry_config = MasonryConfig {
            columns: settings.masonry_columns,
            ..MasonryConfig::default()
        };
        let pager = if settings.enable_infinite_scroll {
            options
                .pager_trigger
                .map(|trigger| Pager::new(PagerConfig::default(), trigger, options.observer))
        } else {
            None
        };
        let likes = settings.enable_like.then(|| {
            let mut registry = LikeRegistry::new(LikeConfig::default());
            registry.restore(&store, &mut faults);
            registry
        });

        let mut widgets = Widgets {
            masonry: Masonry::new(masonry_config),
            // An empty strip means the page has no tab bar.
            tabs: TabStrip::new(options.tabs, options.marked_active_tab).ok(),
            modals: settings
                .enable_modal
                .then(|| ModalStack::new(ModalConfig::default())),
            pager,
            likes,
            settings,
            effects: Vec::new(),
            queued: VecDeque::new(),
        };
        match widgets.masonry.initialize(&options.items, resize.current()) {
            Ok(update) => widgets.apply_layout(update),
            Err(err) => faults.report("layout.initialize", &err),
        }

        let mut bus = Bus::new();
        bus.subscribe(Topic::BreakpointChanged, |widgets: &mut Widgets, event| {
            let ThemeEvent::BreakpointChanged { breakpoint } = event else {
                return Err(HandlerFault::from("unexpected event on topic"));
            };
            if let Some(update) = widgets.masonry.on_breakpoint_change(*breakpoint) {
                widgets.apply_layout(update);
            }
            Ok(())
        });

        let mut theme = Self {
            bus,
            widgets,
            resize,
            store,
            faults,
        };
        theme.drain_queued();
        theme
    }

    /// The resolved settings snapshot.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.widgets.settings
    }

    /// The current viewport size class.
    #[must_use]
    pub fn breakpoint(&self) -> Breakpoint {
        self.resize.current()
    }

    /// The widget state, for inspection.
    #[must_use]
    pub fn widgets(&self) -> &Widgets {
        &self.widgets
    }

    /// The persistence collaborator.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Take the queued effects, leaving the queue empty.
    #[must_use]
    pub fn take_effects(&mut self) -> Vec<Effect> {
        core::mem::take(&mut self.widgets.effects)
    }

    /// Register a bus handler for `topic`.
    pub fn subscribe<H>(&mut self, topic: Topic, handler: H) -> SubscriberId
    where
        H: FnMut(&mut Widgets, &ThemeEvent) -> Result<(), HandlerFault> + 'static,
    {
        self.bus.subscribe(topic, handler)
    }

    /// Remove a bus registration.
    pub fn unsubscribe(&mut self, topic: Topic, id: SubscriberId) -> bool {
        self.bus.unsubscribe(topic, id)
    }

    fn publish(&mut self, event: ThemeEvent) {
        self.bus.publish(&mut self.widgets, &event, &mut self.faults);
        self.drain_queued();
    }

    fn drain_queued(&mut self) {
        while let Some(event) = self.widgets.queued.pop_front() {
            self.bus.publish(&mut self.widgets, &event, &mut self.faults);
        }
    }

    // ---- breakpoint and layout ----

    /// Record one viewport resize signal.
    pub fn on_resize(&mut self, width: f64, now: u64) {
        self.resize.on_resize(width, now);
    }

    /// Settle debounced resizes and run anything that became due.
    pub fn poll(&mut self, now: u64) {
        if let Some(breakpoint) = self.resize.poll(now) {
            self.publish(ThemeEvent::BreakpointChanged { breakpoint });
        }
    }

    /// Recompute the layout; redundant calls produce no effects.
    pub fn relayout(&mut self) {
        if let Some(update) = self.widgets.masonry.relayout() {
            self.widgets.apply_layout(update);
        }
        self.drain_queued();
    }

    /// Apply a density preset to the masonry container.
    pub fn set_density(&mut self, density: Density) {
        let gap = self.widgets.masonry.update_density(density);
        if self.widgets.masonry.is_initialized() {
            self.widgets.push_effect(Effect::ApplyLayout {
                columns: self.widgets.masonry.columns(),
                gap,
                entrances: Vec::new(),
            });
        }
    }

    /// Begin the exit lifecycle for `items`.
    pub fn remove_items(&mut self, items: &[ItemId]) {
        let exiting = self.widgets.masonry.remove_items(items);
        if exiting.is_empty() {
            return;
        }
        let after_ms = self.widgets.masonry.removal_delay_ms();
        self.widgets
            .push_effect(Effect::ScheduleExit { items: exiting, after_ms });
    }

    /// Confirm that a leaving item's exit animation finished.
    pub fn exit_complete(&mut self, item: ItemId) {
        if let Some(update) = self.widgets.masonry.exit_complete(&item) {
            self.widgets.apply_layout(update);
            self.publish(ThemeEvent::ItemsRemoved { item });
        }
    }

    /// Forward a host visibility observation for `item`.
    pub fn item_visible(&mut self, item: ItemId) {
        if let Some(index) = self.widgets.masonry.item_index(&item) {
            self.publish(ThemeEvent::ItemVisible { item, index });
        }
    }

    // ---- tabs ----

    /// Activate a tab; already-active selections are a quiet no-op.
    pub fn select_tab(&mut self, selector: TabSelector<TabId>, now: u64) {
        let Some(strip) = self.widgets.tabs.as_mut() else {
            return;
        };
        match strip.set_active(selector) {
            Ok(Some(change)) => self.tab_changed(change, now),
            Ok(None) => {}
            Err(err) => self.faults.report("tabs.select", &err),
        }
    }

    /// Activate the tab matching a navigation path, on history traversal.
    pub fn select_tab_by_path(&mut self, path: &str, now: u64) {
        let Some(strip) = self.widgets.tabs.as_mut() else {
            return;
        };
        match strip.activate_by_path(path) {
            Ok(Some(change)) => self.tab_changed(change, now),
            Ok(None) => {}
            Err(err) => self.faults.report("tabs.select", &err),
        }
    }

    /// Keyboard navigation over the strip.
    pub fn tab_key(&mut self, key: NavKey, now: u64) {
        let change = self.widgets.tabs.as_mut().and_then(|s| s.handle_key(key));
        if let Some(change) = change {
            self.tab_changed(change, now);
        }
    }

    /// A touch gesture started over the strip.
    pub fn tab_touch_start(&mut self, x: f64, y: f64) {
        if let Some(strip) = self.widgets.tabs.as_mut() {
            strip.touch_start(x, y);
        }
    }

    /// A touch gesture moved. Returns whether the strip claimed it as a
    /// horizontal swipe (the host should suppress scrolling).
    pub fn tab_touch_move(&mut self, x: f64, y: f64) -> bool {
        self.widgets
            .tabs
            .as_mut()
            .is_some_and(|s| s.touch_move(x, y))
    }

    /// A touch gesture ended.
    pub fn tab_touch_end(&mut self, x: f64, y: f64, now: u64) {
        let change = self.widgets.tabs.as_mut().and_then(|s| s.touch_end(x, y));
        if let Some(change) = change {
            self.tab_changed(change, now);
        }
    }

    fn tab_changed(&mut self, change: TabChange<TabId>, now: u64) {
        if change.update_url && !change.path.is_empty() && change.path != "#" {
            self.widgets.push_effect(Effect::RewriteUrl {
                path: change.path.clone(),
            });
        }
        if self.widgets.pager.is_some() {
            self.reload_content(change.params.clone(), now);
        }
        self.publish(ThemeEvent::TabsChanged {
            previous_index: change.previous_index,
            index: change.index,
            name: change.name,
            path: change.path,
        });
    }

    // ---- infinite scrolling ----

    fn page_http(request: &PageRequest) -> HttpRequest {
        let mut query = String::new();
        for (name, value) in &request.params {
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str(name);
            query.push('=');
            query.push_str(value);
        }
        // Resolved by the host against the current location.
        HttpRequest::new(Method::Get, format!("?{query}"))
    }

    fn reload_content(&mut self, params: Vec<(String, String)>, now: u64) {
        let Some(pager) = self.widgets.pager.as_mut() else {
            return;
        };
        let request = pager.reload(params, now);
        if let Some(update) = self.widgets.masonry.relayout_with(&[]) {
            self.widgets.apply_layout(update);
        }
        self.widgets.push_effect(Effect::ClearContainer);
        self.widgets.push_effect(Effect::ShowSkeleton);
        let http = Self::page_http(&request);
        self.widgets.push_effect(Effect::FetchPage {
            id: request.id,
            request: http,
        });
        self.drain_queued();
    }

    /// The pagination trigger entered the proximity margin.
    pub fn trigger_visible(&mut self, now: u64) {
        let request = self
            .widgets
            .pager
            .as_mut()
            .and_then(|pager| pager.trigger_visible(now));
        if let Some(request) = request {
            let http = Self::page_http(&request);
            self.widgets.push_effect(Effect::FetchPage {
                id: request.id,
                request: http,
            });
        }
    }

    /// The manual load-more button was pressed.
    pub fn load_more_clicked(&mut self, now: u64) {
        let request = self
            .widgets
            .pager
            .as_mut()
            .and_then(|pager| pager.load_more_clicked(now));
        if let Some(request) = request {
            let http = Self::page_http(&request);
            self.widgets.push_effect(Effect::FetchPage {
                id: request.id,
                request: http,
            });
        }
    }

    /// Inject a finished page fetch.
    ///
    /// Loaded records go through `materializer`; a record it rejects is
    /// reported and skipped without aborting the batch.
    pub fn complete_page_fetch(
        &mut self,
        id: u64,
        result: Result<PageResponse, LoadError>,
        materializer: &mut dyn Materializer<ItemId>,
    ) {
        let outcome = {
            let Some(pager) = self.widgets.pager.as_mut() else {
                return;
            };
            pager.complete_load(id, result)
        };
        match outcome {
            LoadOutcome::Loaded { items } => {
                let mut handles = Vec::new();
                for record in &items {
                    match materializer.materialize(record) {
                        Ok(handle) => handles.push(handle),
                        Err(err) => self.faults.report("infinite.materialize", &err),
                    }
                }
                let count = handles.len();
                if let Some(update) = self.widgets.masonry.add_items(&handles) {
                    self.widgets.apply_layout(update);
                }
                self.write_trigger_attrs();
                let total = self.widgets.masonry.items().len();
                let next_page = self.widgets.pager.as_ref().map_or(0, Pager::next_page);
                self.publish(ThemeEvent::ItemsAdded { count, total });
                self.publish(ThemeEvent::PageLoaded { count, next_page });
            }
            LoadOutcome::Exhausted => {
                self.widgets.push_effect(Effect::ShowNoMore);
                self.write_trigger_attrs();
                self.publish(ThemeEvent::PageExhausted);
            }
            LoadOutcome::Failed {
                error,
                dismiss_after_ms,
            } => {
                let message = error.to_string();
                self.widgets.push_effect(Effect::ShowInlineError {
                    message: message.clone(),
                    dismiss_after_ms,
                });
                self.widgets.push_effect(Effect::ShowManualButton);
                self.publish(ThemeEvent::PageFailed { message });
            }
            LoadOutcome::Stale => {}
        }
    }

    fn write_trigger_attrs(&mut self) {
        let attrs = self.widgets.pager.as_ref().map(Pager::trigger_attrs);
        if let Some(attrs) = attrs {
            self.widgets.push_effect(Effect::WriteTriggerAttrs { attrs });
        }
    }

    // ---- modals ----

    /// Push a modal. Returns whether it was shown.
    pub fn open_modal(
        &mut self,
        modal: ModalId,
        focusables: Vec<FocusId>,
        prior_focus: Option<FocusId>,
        scroll_position: f64,
    ) -> bool {
        let outcome = self
            .widgets
            .modals
            .as_mut()
            .map(|stack| stack.show(modal, focusables, prior_focus, scroll_position));
        match outcome {
            Some(Ok(show)) => {
                let depth = self.widgets.modals.as_ref().map_or(0, ModalStack::depth);
                self.widgets.push_effect(Effect::ShowModal {
                    modal,
                    z: show.z,
                    lock_scroll: show.lock_scroll,
                    initial_focus: show.initial_focus,
                });
                self.publish(ThemeEvent::ModalOpened { depth });
                true
            }
            Some(Err(err)) => {
                self.faults.report("modal.show", &err);
                false
            }
            None => false,
        }
    }

    /// Open a post detail modal, falling back to plain navigation when the
    /// modal cannot be shown (disabled or duplicated).
    pub fn open_post_modal(
        &mut self,
        modal: ModalId,
        post_id: &str,
        focusables: Vec<FocusId>,
        prior_focus: Option<FocusId>,
        scroll_position: f64,
    ) {
        if !self.open_modal(modal, focusables, prior_focus, scroll_position) {
            self.widgets.push_effect(Effect::Navigate {
                url: format!("/posts/{post_id}"),
            });
        }
    }

    /// Begin closing a modal; `None` targets the top of the stack.
    pub fn close_modal(&mut self, modal: Option<ModalId>) {
        let closing = self
            .widgets
            .modals
            .as_mut()
            .and_then(|stack| stack.close(modal));
        if let Some(closing) = closing {
            self.widgets.push_effect(Effect::AnimateModalClose {
                modal: closing.key,
                duration_ms: closing.duration_ms,
            });
        }
    }

    /// Escape was pressed with the modal layer up.
    pub fn modal_escape(&mut self) {
        let closing = self
            .widgets
            .modals
            .as_mut()
            .and_then(ModalStack::escape_pressed);
        if let Some(closing) = closing {
            self.widgets.push_effect(Effect::AnimateModalClose {
                modal: closing.key,
                duration_ms: closing.duration_ms,
            });
        }
    }

    /// A modal's backdrop was clicked.
    pub fn modal_backdrop_clicked(&mut self, modal: ModalId) {
        let closing = self
            .widgets
            .modals
            .as_mut()
            .and_then(|stack| stack.backdrop_clicked(modal));
        if let Some(closing) = closing {
            self.widgets.push_effect(Effect::AnimateModalClose {
                modal: closing.key,
                duration_ms: closing.duration_ms,
            });
        }
    }

    /// Confirm a modal's close animation finished.
    pub fn modal_close_complete(&mut self, modal: ModalId) {
        let closed = self
            .widgets
            .modals
            .as_mut()
            .and_then(|stack| stack.close_complete(modal));
        if let Some(closed) = closed {
            let depth = self.widgets.modals.as_ref().map_or(0, ModalStack::depth);
            self.widgets.push_effect(Effect::RemoveModal {
                modal: closed.key,
                restore_focus: closed.restore_focus,
                restore_scroll: closed.restore_scroll,
            });
            self.publish(ThemeEvent::ModalClosed { depth });
        }
    }

    /// Tab was pressed with the modal layer up. Returns whether the theme
    /// consumed the key (focus containment redirected it).
    pub fn modal_tab_pressed(&mut self, shift: bool, current: FocusId) -> bool {
        let target = self
            .widgets
            .modals
            .as_ref()
            .and_then(|stack| stack.on_tab(shift, current));
        if let Some(node) = target {
            self.widgets.push_effect(Effect::FocusNode { node });
            true
        } else {
            false
        }
    }

    // ---- likes ----

    /// Whether `post_id` is in the persisted liked set.
    #[must_use]
    pub fn is_liked(&self, post_id: &str) -> bool {
        self.widgets
            .likes
            .as_ref()
            .is_some_and(|likes| likes.is_liked(post_id))
    }

    /// A like control was clicked. Applies the optimistic flip and issues
    /// the toggle; within the cooldown window the click is dropped.
    pub fn like_clicked(&mut self, post_id: &str, current_count: u64, now: u64) {
        let result = {
            let Some(likes) = self.widgets.likes.as_mut() else {
                return;
            };
            let desired = !likes.is_liked(post_id);
            likes.begin_toggle(post_id, desired, now)
        };
        match result {
            Ok(request) => {
                let optimistic = if request.desired {
                    current_count + 1
                } else {
                    current_count.saturating_sub(1)
                };
                self.widgets.push_effect(Effect::UpdateLikeControls {
                    post_id: post_id.to_owned(),
                    liked: request.desired,
                    count: optimistic,
                    count_display: format_count(optimistic),
                });
                self.widgets.push_effect(Effect::SendToggle {
                    id: request.id,
                    request: request.http,
                    delay_ms: 0,
                });
            }
            Err(err) => {
                tracing::debug!(post_id, %err, "like click dropped");
            }
        }
    }

    /// Inject a finished like toggle.
    pub fn complete_like_toggle(&mut self, id: u64, result: Result<LikeResponse, HttpError>) {
        let outcome = {
            let Some(likes) = self.widgets.likes.as_mut() else {
                return;
            };
            likes.complete_toggle(id, result)
        };
        match outcome {
            ToggleOutcome::Confirmed {
                post_id,
                liked,
                count,
            } => {
                if let Some(likes) = self.widgets.likes.as_ref() {
                    likes.persist(&mut self.store);
                }
                self.widgets.push_effect(Effect::UpdateLikeControls {
                    post_id: post_id.clone(),
                    liked,
                    count,
                    count_display: format_count(count),
                });
                self.publish(ThemeEvent::LikeConfirmed {
                    post_id,
                    liked,
                    count,
                });
            }
            ToggleOutcome::Retry { request, delay_ms } => {
                self.widgets.push_effect(Effect::SendToggle {
                    id: request.id,
                    request: request.http,
                    delay_ms,
                });
            }
            ToggleOutcome::Failed {
                post_id,
                desired,
                error,
            } => {
                self.faults.report("like.toggle", &error);
                let liked = self.is_liked(&post_id);
                self.widgets.push_effect(Effect::RollbackLikeControls {
                    post_id: post_id.clone(),
                    liked,
                });
                self.publish(ThemeEvent::LikeFailed { post_id, desired });
            }
            ToggleOutcome::Stale => {}
        }
    }

    /// Request authoritative liked states for a batch of ids.
    pub fn check_like_status<I, Id>(&mut self, post_ids: I)
    where
        I: IntoIterator<Item = Id>,
        Id: AsRef<str>,
    {
        let request = self
            .widgets
            .likes
            .as_ref()
            .and_then(|likes| likes.batch_status_request(post_ids));
        if let Some(request) = request {
            self.widgets.push_effect(Effect::FetchLikeStatus { request });
        }
    }

    /// Inject the batch status response.
    pub fn complete_like_status<I, Id>(&mut self, statuses: I)
    where
        I: IntoIterator<Item = (Id, bool)>,
        Id: AsRef<str>,
    {
        let changed = self
            .widgets
            .likes
            .as_mut()
            .is_some_and(|likes| likes.reconcile(statuses));
        if changed {
            if let Some(likes) = self.widgets.likes.as_ref() {
                likes.persist(&mut self.store);
            }
            self.widgets.push_effect(Effect::RefreshLikeControls);
        }
    }

    /// Periodic cleanup of cooldowns and the persisted liked set.
    pub fn maintain(&mut self, now: u64) {
        let changed = self
            .widgets
            .likes
            .as_mut()
            .is_some_and(|likes| likes.maintain(now));
        if changed && let Some(likes) = self.widgets.likes.as_ref() {
            likes.persist(&mut self.store);
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;
    use std::rc::Rc;

    use canopy_host::{ItemRecord, MaterializeError, MemoryStore, RecordingFaults};
    use canopy_infinite::Pagination;

    use super::*;

    struct Arena {
        next: u64,
        fail_on: Option<String>,
    }

    impl Arena {
        fn new() -> Self {
            Self {
                next: 100,
                fail_on: None,
            }
        }
    }

    impl Materializer<ItemId> for Arena {
        fn materialize(&mut self, record: &ItemRecord) -> Result<ItemId, MaterializeError> {
            if self.fail_on.as_deref() == Some(record.id.as_str()) {
                return Err(MaterializeError {
                    id: record.id.clone(),
                    message: "template rejected record".to_owned(),
                });
            }
            self.next += 1;
            Ok(ItemId(self.next))
        }
    }

    fn theme(options: ThemeOptions) -> Theme<MemoryStore, RecordingFaults> {
        Theme::new(options, MemoryStore::new(), RecordingFaults::new())
    }

    fn item_handles(n: u64) -> Vec<ItemId> {
        (1..=n).map(ItemId).collect()
    }

    fn record(id: &str) -> ItemRecord {
        ItemRecord {
            id: id.to_owned(),
            ..ItemRecord::default()
        }
    }

    fn page(ids: &[&str], number: u32, total: u32, has_next: bool) -> PageResponse {
        PageResponse {
            items: ids.iter().map(|id| record(id)).collect(),
            pagination: Pagination {
                number: Some(number),
                total_pages: Some(total),
                has_next: Some(has_next),
            },
        }
    }

    fn pager_options() -> ThemeOptions {
        ThemeOptions {
            viewport_width: 1200.0,
            items: item_handles(3),
            pager_trigger: Some(TriggerData {
                next_page: 2,
                total_pages: Some(3),
                has_next: true,
            }),
            ..ThemeOptions::default()
        }
    }

    fn fetch_id(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::FetchPage { id, .. } => Some(*id),
                _ => None,
            })
            .expect("a FetchPage effect")
    }

    fn toggle_id(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::SendToggle { id, .. } => Some(*id),
                _ => None,
            })
            .expect("a SendToggle effect")
    }

    #[test]
    fn mobile_viewport_lays_out_one_column() {
        let mut theme = theme(ThemeOptions {
            viewport_width: 500.0,
            items: item_handles(4),
            ..ThemeOptions::default()
        });
        assert_eq!(theme.breakpoint(), Breakpoint::Mobile);

        let effects = theme.take_effects();
        assert!(matches!(
            effects.first(),
            Some(Effect::ApplyLayout { columns: 1, gap: 24, .. })
        ));
    }

    #[test]
    fn settled_resize_drives_the_masonry() {
        let mut theme = theme(ThemeOptions {
            viewport_width: 500.0,
            items: item_handles(2),
            ..ThemeOptions::default()
        });
        let _ = theme.take_effects();

        let seen = Rc::new(RefCell::new(0_u32));
        let sink = Rc::clone(&seen);
        theme.subscribe(Topic::LayoutApplied, move |_, _| {
            *sink.borrow_mut() += 1;
            Ok(())
        });

        theme.on_resize(1600.0, 0);
        theme.poll(100);
        assert!(theme.take_effects().is_empty());

        theme.poll(250);
        let effects = theme.take_effects();
        assert!(matches!(
            effects.first(),
            Some(Effect::ApplyLayout { columns: 4, .. })
        ));
        assert_eq!(theme.breakpoint(), Breakpoint::Wide);
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn repeated_relayout_is_quiet() {
        let mut theme = theme(ThemeOptions {
            viewport_width: 1200.0,
            items: item_handles(3),
            ..ThemeOptions::default()
        });
        let _ = theme.take_effects();

        theme.relayout();
        theme.relayout();
        assert!(theme.take_effects().is_empty());
    }

    #[test]
    fn fetched_page_appends_to_the_layout() {
        let mut theme = theme(pager_options());
        let _ = theme.take_effects();

        theme.trigger_visible(0);
        let effects = theme.take_effects();
        let id = fetch_id(&effects);
        let Some(Effect::FetchPage { request, .. }) = effects.first() else {
            panic!("expected FetchPage first, got {effects:?}");
        };
        assert!(request.url.contains("page=2"));
        assert!(request.url.contains("ajax=true"));

        let mut arena = Arena::new();
        theme.complete_page_fetch(id, Ok(page(&["x", "y"], 2, 3, true)), &mut arena);

        let widgets = theme.widgets();
        assert_eq!(widgets.masonry.items().len(), 5);
        let pager = widgets.pager.as_ref().expect("pager constructed");
        assert_eq!(pager.next_page(), 3);
        assert!(pager.has_more());

        let effects = theme.take_effects();
        let entrances = effects
            .iter()
            .find_map(|effect| match effect {
                Effect::ApplyLayout { entrances, .. } => Some(entrances.len()),
                _ => None,
            })
            .expect("a layout effect");
        assert_eq!(entrances, 2);
        assert!(
            effects
                .iter()
                .any(|effect| matches!(effect, Effect::WriteTriggerAttrs { .. }))
        );
    }

    #[test]
    fn wire_bodies_decode_through_the_completion_paths() {
        let mut theme = theme(pager_options());
        let _ = theme.take_effects();

        theme.trigger_visible(0);
        let id = fetch_id(&theme.take_effects());

        let body = r#"{
            "items": [
                {"id": "a1", "title": "First", "ownerName": "mira", "visits": 40},
                {"id": "a2", "title": "Second", "publishTime": "2025-05-01"}
            ],
            "pagination": {"number": 2, "totalPages": 3, "hasNext": true}
        }"#;
        let response: PageResponse = serde_json::from_str(body).expect("page body parses");
        let mut arena = Arena::new();
        theme.complete_page_fetch(id, Ok(response), &mut arena);

        let widgets = theme.widgets();
        assert_eq!(widgets.masonry.items().len(), 5);
        let pager = widgets.pager.as_ref().expect("pager constructed");
        assert_eq!(pager.next_page(), 3);
        let _ = theme.take_effects();

        // The like confirmation accepts the short `count` field name too.
        theme.like_clicked("a1", 4, 0);
        let id = toggle_id(&theme.take_effects());
        let confirmation: LikeResponse =
            serde_json::from_str(r#"{"count": 5}"#).expect("like body parses");
        theme.complete_like_toggle(id, Ok(confirmation));
        assert!(theme.is_liked("a1"));
    }

    #[test]
    fn empty_page_is_terminal_despite_has_next() {
        let mut theme = theme(pager_options());
        let _ = theme.take_effects();

        let exhausted = Rc::new(RefCell::new(false));
        let sink = Rc::clone(&exhausted);
        theme.subscribe(Topic::PageExhausted, move |_, _| {
            *sink.borrow_mut() = true;
            Ok(())
        });

        theme.trigger_visible(0);
        let id = fetch_id(&theme.take_effects());
        let mut arena = Arena::new();
        theme.complete_page_fetch(id, Ok(page(&[], 2, 3, true)), &mut arena);

        let effects = theme.take_effects();
        assert!(effects.iter().any(|effect| matches!(effect, Effect::ShowNoMore)));
        assert!(*exhausted.borrow());
        let pager = theme.widgets().pager.as_ref().expect("pager constructed");
        assert!(!pager.has_more());

        // Well past the spacing window, still nothing to load.
        theme.trigger_visible(60_000);
        assert!(theme.take_effects().is_empty());
    }

    #[test]
    fn materializer_failures_skip_without_aborting_the_batch() {
        let mut theme = theme(pager_options());
        let _ = theme.take_effects();

        theme.trigger_visible(0);
        let id = fetch_id(&theme.take_effects());
        let mut arena = Arena::new();
        arena.fail_on = Some("bad".to_owned());
        theme.complete_page_fetch(id, Ok(page(&["good", "bad", "fine"], 2, 3, true)), &mut arena);

        assert_eq!(theme.widgets().masonry.items().len(), 5);
    }

    #[test]
    fn failed_fetch_surfaces_error_and_manual_button() {
        let mut theme = theme(pager_options());
        let _ = theme.take_effects();

        theme.trigger_visible(0);
        let id = fetch_id(&theme.take_effects());
        let mut arena = Arena::new();
        theme.complete_page_fetch(id, Err(LoadError::Http(HttpError::Status(502))), &mut arena);

        let effects = theme.take_effects();
        assert!(effects.iter().any(|effect| matches!(
            effect,
            Effect::ShowInlineError {
                dismiss_after_ms: 3000,
                ..
            }
        )));
        assert!(
            effects
                .iter()
                .any(|effect| matches!(effect, Effect::ShowManualButton))
        );

        // Manual retry is the way out of the error phase.
        theme.trigger_visible(60_000);
        assert!(theme.take_effects().is_empty());
        theme.load_more_clicked(60_000);
        assert_eq!(theme.take_effects().len(), 1);
    }

    #[test]
    fn tab_change_rewrites_url_and_reloads() {
        let mut options = pager_options();
        options.tabs = vec![
            Tab::new(TabId(1), "Home", "/"),
            Tab::new(TabId(2), "News", "/news")
                .with_params(vec![("category".to_owned(), "news".to_owned())]),
        ];
        options.marked_active_tab = Some(0);
        let mut theme = theme(options);
        let _ = theme.take_effects();

        // An older fetch is in flight when the tab switches.
        theme.trigger_visible(0);
        let stale_id = fetch_id(&theme.take_effects());

        theme.select_tab(TabSelector::Index(1), 100);
        let effects = theme.take_effects();
        assert!(effects.iter().any(
            |effect| matches!(effect, Effect::RewriteUrl { path } if path == "/news")
        ));
        assert!(
            effects
                .iter()
                .any(|effect| matches!(effect, Effect::ClearContainer))
        );
        assert!(
            effects
                .iter()
                .any(|effect| matches!(effect, Effect::ShowSkeleton))
        );
        let fresh_id = fetch_id(&effects);
        let Some(Effect::FetchPage { request, .. }) = effects
            .iter()
            .find(|effect| matches!(effect, Effect::FetchPage { .. }))
        else {
            unreachable!();
        };
        assert!(request.url.contains("page=1"));
        assert!(request.url.contains("category=news"));

        // The superseded response is discarded against the fresh cursor.
        let mut arena = Arena::new();
        theme.complete_page_fetch(stale_id, Ok(page(&["old"], 2, 3, true)), &mut arena);
        assert_eq!(theme.widgets().masonry.items().len(), 0);

        theme.complete_page_fetch(fresh_id, Ok(page(&["new"], 1, 5, true)), &mut arena);
        assert_eq!(theme.widgets().masonry.items().len(), 1);
    }

    #[test]
    fn selecting_the_active_tab_is_a_no_op() {
        let mut options = pager_options();
        options.tabs = vec![Tab::new(TabId(1), "Home", "/"), Tab::new(TabId(2), "News", "/news")];
        options.marked_active_tab = Some(0);
        let mut theme = theme(options);
        let _ = theme.take_effects();

        let changes = Rc::new(RefCell::new(0_u32));
        let sink = Rc::clone(&changes);
        theme.subscribe(Topic::TabsChanged, move |_, _| {
            *sink.borrow_mut() += 1;
            Ok(())
        });

        theme.select_tab(TabSelector::Index(0), 0);
        assert_eq!(*changes.borrow(), 0);
        assert!(theme.take_effects().is_empty());
    }

    #[test]
    fn stacked_modals_close_independently() {
        let mut theme = theme(ThemeOptions {
            items: item_handles(1),
            ..ThemeOptions::default()
        });
        let _ = theme.take_effects();

        assert!(theme.open_modal(ModalId(1), vec![FocusId(11)], Some(FocusId(90)), 300.0));
        let effects = theme.take_effects();
        assert!(matches!(
            effects.first(),
            Some(Effect::ShowModal {
                z: 1000,
                lock_scroll: true,
                ..
            })
        ));

        assert!(theme.open_modal(ModalId(2), vec![FocusId(21), FocusId(22)], Some(FocusId(11)), 300.0));
        let _ = theme.take_effects();

        theme.close_modal(None);
        let effects = theme.take_effects();
        assert!(matches!(
            effects.first(),
            Some(Effect::AnimateModalClose {
                modal: ModalId(2),
                duration_ms: 300,
            })
        ));

        theme.modal_close_complete(ModalId(2));
        let effects = theme.take_effects();
        // Focus returns to B's pre-open trigger; scroll stays locked.
        assert!(matches!(
            effects.first(),
            Some(Effect::RemoveModal {
                modal: ModalId(2),
                restore_focus: Some(FocusId(11)),
                restore_scroll: None,
            })
        ));
        let modals = theme.widgets().modals.as_ref().expect("modals enabled");
        assert_eq!(modals.depth(), 1);
        assert!(modals.is_scroll_locked());

        theme.close_modal(None);
        let _ = theme.take_effects();
        theme.modal_close_complete(ModalId(1));
        let effects = theme.take_effects();
        assert!(matches!(
            effects.first(),
            Some(Effect::RemoveModal {
                restore_scroll: Some(s),
                ..
            }) if *s == 300.0
        ));
        let modals = theme.widgets().modals.as_ref().expect("modals enabled");
        assert!(!modals.is_scroll_locked());
    }

    #[test]
    fn focus_trap_consumes_tab_at_the_edges() {
        let mut theme = theme(ThemeOptions {
            items: item_handles(1),
            ..ThemeOptions::default()
        });
        theme.open_modal(ModalId(1), vec![FocusId(1), FocusId(2)], None, 0.0);
        let _ = theme.take_effects();

        assert!(theme.modal_tab_pressed(false, FocusId(2)));
        assert!(matches!(
            theme.take_effects().first(),
            Some(Effect::FocusNode { node: FocusId(1) })
        ));
        assert!(!theme.modal_tab_pressed(false, FocusId(1)));
    }

    #[test]
    fn disabled_modal_falls_back_to_navigation() {
        let mut theme = theme(ThemeOptions {
            settings_blob: Some(r#"{"enableModal": false}"#.to_owned()),
            items: item_handles(1),
            ..ThemeOptions::default()
        });
        let _ = theme.take_effects();

        theme.open_post_modal(ModalId(1), "p9", Vec::new(), None, 0.0);
        let effects = theme.take_effects();
        assert!(effects.iter().any(
            |effect| matches!(effect, Effect::Navigate { url } if url == "/posts/p9")
        ));
    }

    #[test]
    fn like_round_trip_persists_and_failed_unlike_rolls_back() {
        let mut theme = theme(ThemeOptions {
            items: item_handles(1),
            ..ThemeOptions::default()
        });
        let _ = theme.take_effects();

        theme.like_clicked("p1", 10, 0);
        let effects = theme.take_effects();
        assert!(effects.iter().any(|effect| matches!(
            effect,
            Effect::UpdateLikeControls {
                liked: true,
                count: 11,
                ..
            }
        )));
        let id = toggle_id(&effects);
        theme.complete_like_toggle(
            id,
            Ok(LikeResponse {
                like_count: Some(11),
            }),
        );
        assert!(theme.is_liked("p1"));
        let stored = theme
            .store()
            .get(canopy_like::STORAGE_KEY)
            .expect("persisted after confirmation");
        assert!(stored.contains("p1"));
        let _ = theme.take_effects();

        // The unlike fails through every retry and rolls back.
        theme.like_clicked("p1", 11, 5000);
        let mut id = toggle_id(&theme.take_effects());
        for _ in 0..2 {
            theme.complete_like_toggle(id, Err(HttpError::Status(500)));
            id = toggle_id(&theme.take_effects());
        }
        theme.complete_like_toggle(id, Err(HttpError::Status(500)));
        let effects = theme.take_effects();
        assert!(effects.iter().any(|effect| matches!(
            effect,
            Effect::RollbackLikeControls {
                liked: true,
                ..
            }
        )));
        assert!(theme.is_liked("p1"));
    }

    #[test]
    fn like_clicks_inside_the_cooldown_are_dropped() {
        let mut theme = theme(ThemeOptions {
            items: item_handles(1),
            ..ThemeOptions::default()
        });
        let _ = theme.take_effects();

        theme.like_clicked("p1", 5, 0);
        let _ = theme.take_effects();
        theme.like_clicked("p1", 6, 400);
        assert!(theme.take_effects().is_empty());
    }

    #[test]
    fn batch_status_reconciles_and_refreshes() {
        let mut theme = theme(ThemeOptions {
            items: item_handles(1),
            ..ThemeOptions::default()
        });
        let _ = theme.take_effects();

        theme.check_like_status(["p1", "p2"]);
        let effects = theme.take_effects();
        assert!(effects.iter().any(|effect| matches!(
            effect,
            Effect::FetchLikeStatus { request }
                if request.url == "/api/v1alpha1/posts/likes?postIds=p1&postIds=p2"
        )));

        theme.complete_like_status([("p1", true)]);
        assert!(theme.is_liked("p1"));
        assert!(
            theme
                .take_effects()
                .iter()
                .any(|effect| matches!(effect, Effect::RefreshLikeControls))
        );
    }

    #[test]
    fn removal_waits_for_the_exit_signal() {
        let mut theme = theme(ThemeOptions {
            viewport_width: 1200.0,
            items: item_handles(3),
            ..ThemeOptions::default()
        });
        let _ = theme.take_effects();

        theme.remove_items(&[ItemId(2)]);
        let effects = theme.take_effects();
        assert!(matches!(
            effects.first(),
            Some(Effect::ScheduleExit { after_ms: 300, .. })
        ));
        assert_eq!(theme.widgets().masonry.items().len(), 3);

        theme.exit_complete(ItemId(2));
        assert_eq!(theme.widgets().masonry.items().len(), 2);
        let effects = theme.take_effects();
        assert!(
            effects
                .iter()
                .any(|effect| matches!(effect, Effect::ApplyLayout { .. }))
        );
    }
}
