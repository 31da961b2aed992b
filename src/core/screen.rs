//! # Screens
//!
//! A screen supplies content for the app's surfaces and takes part in the
//! navigation lifecycle:
//!
//! ```text
//! factory.create(path)
//!   → surface_content(id)     once per defined surface, right after creation
//!   → before_flip()           may return a deferred; navigation waits on it
//!   → (surfaces show it)
//!   → after_flip()
//!   ...
//!   → before_deactivate()     true vetoes leaving the screen
//!   → deactivate()            the next screen is about to be shown
//!   → dispose()               non-cacheable screens, failed navigations,
//!                             or when the app itself is disposed
//! ```
//!
//! Clean-up belongs in `deactivate`, not `before_deactivate`: the
//! navigation may still be cancelled after the latter returns.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::browser::Content;
use crate::core::deferred::Deferred;

pub trait Screen {
    /// If false, the screen is disposed once it is navigated away from.
    /// If true, its surface content stays in the document, hidden, and the
    /// same instance is reused for later navigations to its path.
    fn is_cacheable(&self) -> bool;

    /// Document title while active. `None` uses the app's default title.
    fn title(&self) -> Option<String>;

    /// Content for the given surface, or `None` if the screen doesn't use it.
    fn surface_content(&self, surface_id: &str) -> Option<Content>;

    /// Last chance to prepare before the surfaces flip. A returned deferred
    /// holds the navigation until it settles; rejecting it fails the
    /// navigation. If the navigation is cancelled meanwhile, the deferred is
    /// cancelled and the screen should release whatever it was waiting on.
    fn before_flip(&mut self) -> Option<Deferred<()>>;

    /// Called once the screen's content is visible.
    fn after_flip(&mut self);

    /// Returning true cancels the navigation away from this screen.
    fn before_deactivate(&mut self) -> bool;

    fn deactivate(&mut self);

    fn dispose(&mut self);
}

/// Builds screens for the paths it matches.
pub trait ScreenFactory {
    fn matches_path(&self, path: &str) -> bool;

    fn create(&self, path: &str) -> Box<dyn Screen>;
}

/// Identity assigned by the app when a screen is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenId(u64);

impl ScreenId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "screen-{}", self.0)
    }
}

struct ScreenSlot {
    uid: ScreenId,
    screen: RefCell<Box<dyn Screen>>,
}

/// Shared handle to a screen owned by the app. Cloning shares the screen.
#[derive(Clone)]
pub struct ScreenHandle(Rc<ScreenSlot>);

impl fmt::Debug for ScreenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScreenHandle").field(&self.0.uid).finish()
    }
}

impl ScreenHandle {
    pub(crate) fn new(uid: ScreenId, screen: Box<dyn Screen>) -> Self {
        Self(Rc::new(ScreenSlot {
            uid,
            screen: RefCell::new(screen),
        }))
    }

    pub fn uid(&self) -> ScreenId {
        self.0.uid
    }

    /// Same screen instance.
    pub fn same(&self, other: &ScreenHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_cacheable(&self) -> bool {
        self.0.screen.borrow().is_cacheable()
    }

    pub fn title(&self) -> Option<String> {
        self.0.screen.borrow().title()
    }

    pub fn surface_content(&self, surface_id: &str) -> Option<Content> {
        self.0.screen.borrow().surface_content(surface_id)
    }

    pub(crate) fn before_flip(&self) -> Option<Deferred<()>> {
        self.0.screen.borrow_mut().before_flip()
    }

    pub(crate) fn after_flip(&self) {
        self.0.screen.borrow_mut().after_flip();
    }

    pub(crate) fn before_deactivate(&self) -> bool {
        self.0.screen.borrow_mut().before_deactivate()
    }

    pub(crate) fn deactivate(&self) {
        self.0.screen.borrow_mut().deactivate();
    }

    pub(crate) fn dispose(&self) {
        self.0.screen.borrow_mut().dispose();
    }

    /// Read access to the screen itself.
    pub fn with<R>(&self, f: impl FnOnce(&dyn Screen) -> R) -> R {
        f(self.0.screen.borrow().as_ref())
    }
}

/// A screen with no content, no title and no lifecycle behaviour.
/// Navigating to it reverts every surface to its default content.
#[derive(Debug, Default)]
pub struct NullScreen;

impl Screen for NullScreen {
    fn is_cacheable(&self) -> bool {
        false
    }

    fn title(&self) -> Option<String> {
        None
    }

    fn surface_content(&self, _surface_id: &str) -> Option<Content> {
        None
    }

    fn before_flip(&mut self) -> Option<Deferred<()>> {
        None
    }

    fn after_flip(&mut self) {}

    fn before_deactivate(&mut self) -> bool {
        false
    }

    fn deactivate(&mut self) {}

    fn dispose(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_id_display() {
        assert_eq!(ScreenId::new(42).to_string(), "screen-42");
    }

    #[test]
    fn test_handle_identity() {
        let a = ScreenHandle::new(ScreenId::new(1), Box::new(NullScreen));
        let b = ScreenHandle::new(ScreenId::new(1), Box::new(NullScreen));
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }

    #[test]
    fn test_null_screen_is_inert() {
        let handle = ScreenHandle::new(ScreenId::new(7), Box::new(NullScreen));
        assert!(!handle.is_cacheable());
        assert!(handle.title().is_none());
        assert!(handle.surface_content("main").is_none());
        assert!(handle.before_flip().is_none());
        assert!(!handle.before_deactivate());
    }
}
