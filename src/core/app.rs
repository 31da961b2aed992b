//! # Navigation Controller
//!
//! `App` owns the surfaces, the ordered screen factories, the path-keyed
//! screen cache and the active screen, and drives every navigation through
//! the same protocol:
//!
//! ```text
//! navigate(path)
//!   │ path == active path ──────────────────────────► resolved(active), no events
//!   ├─ publish START
//!   │ active.before_deactivate() == true ───────────► END(fail), cancelled
//!   ├─ cached screen, else first matching factory
//!   │ nothing found ────────────────────────────────► END(fail), rejected
//!   ├─ cancel the in-flight navigation (Superseded)
//!   ├─ next.before_flip()  ── deferred? wait ─ fails ► dispose next, END(fail)
//!   ├─ active.deactivate(); every surface shows next
//!   ├─ wait for all surface transitions
//!   └─ finalize: history, title, after_flip, evict old
//!                non-cacheable screen, swap active, END(ok)
//! ```
//!
//! Everything runs on one thread. The only suspension points are the
//! readiness deferred and the transition deferreds; both are cancelled when
//! a newer navigation supersedes this one. Active screen, cache and pending
//! navigation change only in finalization or in failure handling, never
//! speculatively. A navigation that fails after the surfaces started
//! flipping shows the still-active screen again on every surface.
//!
//! `App` is a cheap handle (`Rc`); callbacks hold weak references so a
//! dropped app doesn't stay alive through its own pending deferreds.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use chrono::Utc;
use log::{debug, info, warn};

use crate::browser::{ClickEvent, Content, Document, Element, History, HistoryState};
use crate::core::deferred::{Deferred, join_all};
use crate::core::error::NavError;
use crate::core::pubsub::{NavEvent, PubSub, SubscriptionKey, Topic};
use crate::core::screen::{ScreenFactory, ScreenHandle, ScreenId};
use crate::core::surface::{DEFAULT_KEY, Surface, TransitionFn};

#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Prefix of every app-managed URL, relative to the host, e.g. `/app/`.
    pub base_path: String,
    /// Title for screens without one. `None` keeps the document's current title.
    pub default_title: Option<String>,
}

struct NavState {
    active: Option<(String, ScreenHandle)>,
    pending: Option<(String, Deferred<ScreenHandle>)>,
    screens: HashMap<String, ScreenHandle>,
    factories: Vec<Rc<dyn ScreenFactory>>,
    /// The active screen has had `deactivate()` called by a navigation that
    /// later failed; it is not deactivated a second time.
    deactivated: bool,
    next_uid: u64,
    bound: bool,
}

struct AppInner {
    base_path: String,
    default_title: String,
    document: Document,
    history: Rc<dyn History>,
    events: PubSub,
    surfaces: RefCell<Vec<Rc<Surface>>>,
    state: RefCell<NavState>,
}

#[derive(Clone)]
pub struct App {
    inner: Rc<AppInner>,
}

impl App {
    pub fn new(options: AppOptions, document: Document, history: Rc<dyn History>) -> Self {
        let default_title = options.default_title.unwrap_or_else(|| document.title());
        let seed = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        Self {
            inner: Rc::new(AppInner {
                base_path: options.base_path,
                default_title,
                document,
                history,
                events: PubSub::new(),
                surfaces: RefCell::new(Vec::new()),
                state: RefCell::new(NavState {
                    active: None,
                    pending: None,
                    screens: HashMap::new(),
                    factories: Vec::new(),
                    deactivated: false,
                    next_uid: seed,
                    bound: false,
                }),
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    /// Defines a surface that screens can render into. Its default content
    /// is shown whenever the active screen has nothing for it. Redefining an
    /// id replaces the earlier surface.
    pub fn define_surface(
        &self,
        id: &str,
        default_content: Option<Content>,
        transition: Option<TransitionFn>,
    ) {
        if let Some(existing) = self.surface(id) {
            existing.remove(DEFAULT_KEY);
        }
        let surface = Rc::new(Surface::new(
            &self.inner.document,
            id,
            default_content,
            transition,
        ));
        let mut surfaces = self.inner.surfaces.borrow_mut();
        match surfaces.iter_mut().find(|s| s.id() == id) {
            Some(existing) => *existing = surface,
            None => surfaces.push(surface),
        }
    }

    /// Factories are asked in registration order; the first match wins.
    pub fn register_screen_factory<F: ScreenFactory + 'static>(&self, factory: F) {
        self.inner
            .state
            .borrow_mut()
            .factories
            .push(Rc::new(factory));
    }

    /// Installs the click and popstate bindings, then either navigates to
    /// `path` (replacing the current history entry) or shows every surface's
    /// default content under the default title.
    pub fn init(&self, path: Option<&str>) -> Deferred<Option<ScreenHandle>> {
        self.bind_browser_events();

        if let Some(path) = path {
            return self.navigate(path, true).map(|screen| Some(screen.clone()));
        }

        // Replace the current entry so history can always return to the start.
        let title = self.inner.default_title.clone();
        if let Err(e) = self.inner.history.replace_state(
            HistoryState::navigate(""),
            &title,
            &self.inner.base_path,
        ) {
            warn!(
                "Unable to set initial history token {}: {}",
                self.inner.base_path, e
            );
        }
        self.inner.document.set_title(&title);

        for surface in self.surfaces() {
            surface.show(DEFAULT_KEY);
        }
        Deferred::resolved(None)
    }

    fn bind_browser_events(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.bound {
                return;
            }
            state.bound = true;
        }

        let weak = Rc::downgrade(&self.inner);
        self.inner.document.add_click_listener(move |event| {
            if let Some(app) = App::upgrade(&weak) {
                app.handle_click(event);
            }
        });

        let weak = Rc::downgrade(&self.inner);
        self.inner
            .history
            .add_pop_state_listener(Rc::new(move |state: Option<&HistoryState>| {
                if let Some(app) = App::upgrade(&weak) {
                    app.handle_pop_state(state);
                }
            }));
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    /// Navigates to `path`. The deferred resolves with the new active screen,
    /// or fails if the navigation fails or is cancelled. Never panics and
    /// never fails outside the deferred.
    pub fn navigate(&self, path: &str, replace_history: bool) -> Deferred<ScreenHandle> {
        if let Some(active) = self.active_at(path) {
            debug!("Not navigating, already at {}", path);
            return Deferred::resolved(active);
        }

        self.inner.events.publish(&NavEvent::Start {
            path: path.to_string(),
        });

        // Offer the active screen the chance to cancel the navigation.
        if let Some(active) = self.active_screen() {
            if active.before_deactivate() {
                info!("Navigation to {} cancelled by active screen", path);
                let err = NavError::Vetoed {
                    path: path.to_string(),
                };
                self.publish_end(path, Some(err.clone()));
                return Deferred::cancelled(err);
            }
        }

        info!("Navigating to {}", path);
        let (next, from_cache) = match self.cached_screen(path) {
            Some(screen) => {
                debug!("Cached screen {} found for {}", screen.uid(), path);
                (screen, true)
            }
            None => match self.create_screen(path) {
                Some(screen) => (screen, false),
                None => {
                    warn!("No screen or factory found for {}, cancelling navigation", path);
                    let err = NavError::NoScreenFound {
                        path: path.to_string(),
                    };
                    self.publish_end(path, Some(err.clone()));
                    return Deferred::rejected(err);
                }
            },
        };

        let superseded = self.inner.state.borrow_mut().pending.take();
        if let Some((old_path, pending)) = superseded {
            debug!("Cancelling pending navigation to {}", old_path);
            pending.cancel_with(NavError::Superseded { path: old_path });
        }

        let navigation = Deferred::new();
        self.inner.state.borrow_mut().pending = Some((path.to_string(), navigation.clone()));
        let flipped = Rc::new(Cell::new(false));
        self.watch(&navigation, path, &next, from_cache, &flipped);

        match next.before_flip() {
            None => self.update_surfaces(&navigation, path, &next, replace_history, &flipped),
            Some(ready) => {
                debug!("Waiting for screen {} to be ready", next.uid());
                let to_cancel = ready.clone();
                navigation.on_cancel(move |err| {
                    to_cancel.cancel_with(err.clone());
                });

                let weak = Rc::downgrade(&self.inner);
                let nav = navigation.clone();
                let path = path.to_string();
                let screen = next.clone();
                let flipped = Rc::clone(&flipped);
                ready.on_settled(move |result| match result {
                    Ok(()) => {
                        if let Some(app) = App::upgrade(&weak) {
                            app.update_surfaces(&nav, &path, &screen, replace_history, &flipped);
                        }
                    }
                    Err(err) => {
                        nav.reject(err.clone());
                    }
                });
            }
        }
        navigation
    }

    /// Publishes END for `navigation` however it settles, and cleans up
    /// after failures. `flipped` is set once the surfaces start showing
    /// `screen`.
    fn watch(
        &self,
        navigation: &Deferred<ScreenHandle>,
        path: &str,
        screen: &ScreenHandle,
        from_cache: bool,
        flipped: &Rc<Cell<bool>>,
    ) {
        let weak = Rc::downgrade(&self.inner);
        let nav = navigation.clone();
        let path = path.to_string();
        let screen = screen.clone();
        let flipped = Rc::clone(flipped);
        navigation.on_settled(move |result| {
            let Some(app) = App::upgrade(&weak) else {
                return;
            };
            match result {
                Ok(_) => app.publish_end(&path, None),
                Err(err) => {
                    app.handle_nav_error(&nav, &path, &screen, from_cache, err);
                    if flipped.get() {
                        app.restore_surfaces();
                    }
                    app.publish_end(&path, Some(err.clone()));
                }
            }
        });
    }

    fn update_surfaces(
        &self,
        navigation: &Deferred<ScreenHandle>,
        path: &str,
        next: &ScreenHandle,
        replace_history: bool,
        flipped: &Cell<bool>,
    ) {
        if !navigation.is_pending() {
            return;
        }
        debug!("Updating surfaces for navigation to {}", path);

        if let Some(active) = self.take_for_deactivation() {
            active.deactivate();
        }
        flipped.set(true);

        let key = next.uid().to_string();
        let transitions: Vec<Deferred<()>> = self
            .surfaces()
            .iter()
            .filter_map(|surface| surface.show(&key))
            .collect();

        let settled = join_all(transitions);
        let to_cancel = settled.clone();
        navigation.on_cancel(move |err| {
            to_cancel.cancel_with(err.clone());
        });

        let weak = Rc::downgrade(&self.inner);
        let nav = navigation.clone();
        let path = path.to_string();
        let screen = next.clone();
        settled.on_settled(move |result| match result {
            Ok(()) => {
                if let Some(app) = App::upgrade(&weak) {
                    app.finalize(&nav, &path, &screen, replace_history);
                }
            }
            Err(err) => {
                nav.reject(err.clone());
            }
        });
    }

    fn finalize(
        &self,
        navigation: &Deferred<ScreenHandle>,
        path: &str,
        next: &ScreenHandle,
        replace_history: bool,
    ) {
        if !navigation.is_pending() {
            return;
        }
        debug!("Finalizing navigation to {}", path);

        let title = next
            .title()
            .unwrap_or_else(|| self.inner.default_title.clone());
        let url = self.history_url(path);
        let state = HistoryState::navigate(path);
        let updated = if replace_history {
            self.inner.history.replace_state(state, &title, &url)
        } else {
            self.inner.history.push_state(state, &title, &url)
        };
        if let Err(e) = updated {
            warn!("Unable to update history token {}: {}", url, e);
        }

        // Title after history, so it belongs to the new entry.
        self.inner.document.set_title(&title);

        next.after_flip();

        let previous = self.inner.state.borrow().active.clone();
        if let Some((old_path, old)) = previous {
            if !old.is_cacheable() {
                self.remove_screen(&old_path, &old);
            }
        }

        let cacheable = next.is_cacheable();
        {
            let mut state = self.inner.state.borrow_mut();
            if cacheable {
                state.screens.insert(path.to_string(), next.clone());
            }
            state.active = Some((path.to_string(), next.clone()));
            state.deactivated = false;
            if state
                .pending
                .as_ref()
                .is_some_and(|(_, pending)| pending.ptr_eq(navigation))
            {
                state.pending = None;
            }
        }

        navigation.resolve(next.clone());
    }

    fn handle_nav_error(
        &self,
        navigation: &Deferred<ScreenHandle>,
        path: &str,
        screen: &ScreenHandle,
        from_cache: bool,
        err: &NavError,
    ) {
        if err.is_cancellation() {
            info!("Navigation to {} cancelled: {}", path, err);
        } else {
            warn!("Navigation error for {}: {}", path, err);
        }

        {
            let mut state = self.inner.state.borrow_mut();
            if state
                .pending
                .as_ref()
                .is_some_and(|(_, pending)| pending.ptr_eq(navigation))
            {
                state.pending = None;
            }
        }

        // A cached screen that merely lost the race stays cached.
        let keep = from_cache && err.is_cancellation();
        let active = self.active_screen();
        if !keep && !active.is_some_and(|a| a.same(screen)) {
            self.remove_screen(path, screen);
        }
    }

    /// Disposes `screen`, drops it from the cache (if it is the entry for
    /// `path`) and removes its content from every surface.
    fn remove_screen(&self, path: &str, screen: &ScreenHandle) {
        info!("Disposing screen {} for {}", screen.uid(), path);
        screen.dispose();
        {
            let mut state = self.inner.state.borrow_mut();
            if state.screens.get(path).is_some_and(|s| s.same(screen)) {
                state.screens.remove(path);
            }
        }
        let key = screen.uid().to_string();
        for surface in self.surfaces() {
            surface.remove(&key);
        }
    }

    /// After a navigation failed mid-flip, shows the still-active screen
    /// again (or the defaults when nothing is active) on every surface.
    fn restore_surfaces(&self) {
        let key = match self.active_screen() {
            Some(active) => active.uid().to_string(),
            None => DEFAULT_KEY.to_string(),
        };
        debug!("Restoring surfaces to {}", key);
        for surface in self.surfaces() {
            surface.show(&key);
        }
    }

    /// The active screen, unless an earlier failed navigation already
    /// deactivated it.
    fn take_for_deactivation(&self) -> Option<ScreenHandle> {
        let mut state = self.inner.state.borrow_mut();
        if state.deactivated {
            return None;
        }
        let active = state.active.as_ref().map(|(_, screen)| screen.clone())?;
        state.deactivated = true;
        Some(active)
    }

    fn create_screen(&self, path: &str) -> Option<ScreenHandle> {
        let factories = self.inner.state.borrow().factories.clone();
        let factory = factories.iter().find(|f| f.matches_path(path))?;

        let uid = {
            let mut state = self.inner.state.borrow_mut();
            let uid = ScreenId::new(state.next_uid);
            state.next_uid += 1;
            uid
        };
        debug!("Factory found for {}, creating screen {}", path, uid);
        let screen = ScreenHandle::new(uid, factory.create(path));

        let key = uid.to_string();
        let contents: Vec<(String, Option<Content>)> = self
            .surface_ids()
            .into_iter()
            .map(|id| {
                let content = screen.surface_content(&id);
                (id, content)
            })
            .collect();
        for (id, content) in contents {
            if let Some(surface) = self.surface(&id) {
                surface.add_content(&key, content);
            }
        }
        Some(screen)
    }

    fn history_url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_path, path).replace("//", "/")
    }

    fn publish_end(&self, path: &str, error: Option<NavError>) {
        self.inner.events.publish(&NavEvent::End {
            path: path.to_string(),
            success: error.is_none(),
            error,
        });
    }

    // ------------------------------------------------------------------------
    // Browser bindings
    // ------------------------------------------------------------------------

    /// Intercepts clicks on links under the base path. If the navigation
    /// fails straight away (nothing matches, or the active screen vetoes),
    /// the browser is left to follow the link.
    fn handle_click(&self, event: &ClickEvent) {
        let Some(anchor) = event.target().closest("a") else {
            return;
        };
        let Some(href) = anchor.attribute("href") else {
            return;
        };
        let location = self.inner.document.location();
        let Ok(url) = location.join(&href) else {
            debug!("Ignoring click on unparseable href {}", href);
            return;
        };
        if url.origin() != location.origin() {
            return;
        }

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        let Some(relative) = path.strip_prefix(&self.inner.base_path) else {
            return;
        };

        let navigation = self.navigate(relative, false);
        if navigation.is_failed() {
            debug!("Navigation to {} failed synchronously, not intercepting", relative);
        } else {
            event.prevent_default();
        }
    }

    /// Back/forward onto an entry this app created re-runs its navigation.
    fn handle_pop_state(&self, state: Option<&HistoryState>) {
        let Some(state) = state.filter(|s| s.is_navigate) else {
            return;
        };
        info!("History navigation to {}", state.path);
        self.navigate(&state.path, true);
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// The active screen. While a navigation is in flight this is still the
    /// screen being navigated away from.
    pub fn active_screen(&self) -> Option<ScreenHandle> {
        self.inner
            .state
            .borrow()
            .active
            .as_ref()
            .map(|(_, screen)| screen.clone())
    }

    pub fn active_path(&self) -> Option<String> {
        self.inner
            .state
            .borrow()
            .active
            .as_ref()
            .map(|(path, _)| path.clone())
    }

    fn active_at(&self, path: &str) -> Option<ScreenHandle> {
        self.inner
            .state
            .borrow()
            .active
            .as_ref()
            .filter(|(active_path, _)| active_path == path)
            .map(|(_, screen)| screen.clone())
    }

    pub fn is_navigating(&self) -> bool {
        self.inner.state.borrow().pending.is_some()
    }

    pub fn cached_screen(&self, path: &str) -> Option<ScreenHandle> {
        self.inner.state.borrow().screens.get(path).cloned()
    }

    pub fn cached_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.inner.state.borrow().screens.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Surface ids in definition order.
    pub fn surface_ids(&self) -> Vec<String> {
        self.inner
            .surfaces
            .borrow()
            .iter()
            .map(|s| s.id().to_string())
            .collect()
    }

    /// The wrapper element a surface is currently showing.
    pub fn active_wrapper(&self, surface_id: &str) -> Option<Element> {
        self.surface(surface_id).and_then(|s| s.active())
    }

    fn surface(&self, id: &str) -> Option<Rc<Surface>> {
        self.inner
            .surfaces
            .borrow()
            .iter()
            .find(|s| s.id() == id)
            .cloned()
    }

    /// Snapshot, so surface transitions run with no borrow held.
    fn surfaces(&self) -> Vec<Rc<Surface>> {
        self.inner.surfaces.borrow().clone()
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn base_path(&self) -> &str {
        &self.inner.base_path
    }

    pub fn default_title(&self) -> &str {
        &self.inner.default_title
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> SubscriptionKey
    where
        F: Fn(&NavEvent) + 'static,
    {
        self.inner.events.subscribe(topic, callback)
    }

    pub fn unsubscribe(&self, key: SubscriptionKey) -> bool {
        self.inner.events.unsubscribe(key)
    }

    // ------------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------------

    /// Cancels any pending navigation, then deactivates the active screen
    /// and disposes it along with every cached screen.
    pub fn dispose(&self) {
        let pending = self.inner.state.borrow_mut().pending.take();
        if let Some((_, navigation)) = pending {
            navigation.cancel();
        }

        let (active, cached) = {
            let mut state = self.inner.state.borrow_mut();
            let active = state.active.take();
            let cached: Vec<(String, ScreenHandle)> = state.screens.drain().collect();
            (active, cached)
        };

        if let Some((_, screen)) = &active {
            if !std::mem::take(&mut self.inner.state.borrow_mut().deactivated) {
                screen.deactivate();
            }
        }
        let mut disposed: Vec<ScreenHandle> = Vec::new();
        for (path, screen) in active.into_iter().chain(cached) {
            if disposed.iter().any(|d| d.same(&screen)) {
                continue;
            }
            self.remove_screen(&path, &screen);
            disposed.push(screen);
        }
    }

    fn upgrade(weak: &Weak<AppInner>) -> Option<App> {
        weak.upgrade().map(|inner| App { inner })
    }
}
