//! # Surface
//!
//! One named region of the document. Each screen that has content for the
//! region gets a wrapper `<div id="{surface}-{screen}">` under the region's
//! root element; exactly one wrapper is shown at a time.
//!
//! ```text
//! <div id="main">                 ← surface root (must already exist)
//!   <div id="main-default">       ← default content, if any
//!   <div id="main-screen-17">     ← content of screen 17, hidden
//!   <div id="main-screen-18">     ← content of screen 18, shown
//! ```
//!
//! Swapping wrappers goes through the surface's transition function, which
//! may finish synchronously or hand back a deferred (an animation).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::{debug, warn};

use crate::browser::{Content, Document, Element};
use crate::core::deferred::Deferred;

/// Key of the content shown when a screen has nothing for a surface.
pub const DEFAULT_KEY: &str = "default";

/// `(outgoing, incoming)`; either side may be absent.
pub type TransitionFn = Rc<dyn Fn(Option<&Element>, Option<&Element>) -> Option<Deferred<()>>>;

/// Hides the outgoing wrapper and shows the incoming one, synchronously.
pub fn default_transition(from: Option<&Element>, to: Option<&Element>) -> Option<Deferred<()>> {
    if let Some(from) = from {
        from.set_display("none");
    }
    if let Some(to) = to {
        to.set_display("block");
    }
    None
}

/// Transitions are user code and may call back into the app, so they
/// always run with no borrow of the surface held.
pub struct Surface {
    id: String,
    document: Document,
    root: Option<Element>,
    transition: TransitionFn,
    wrappers: RefCell<Vec<(String, Element)>>,
    active: RefCell<Option<Element>>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.wrappers.borrow().iter().map(|(k, _)| k.clone()).collect();
        f.debug_struct("Surface")
            .field("id", &self.id)
            .field("wrappers", &keys)
            .field("active", &self.active().and_then(|a| a.id()))
            .finish()
    }
}

impl Surface {
    pub fn new(
        document: &Document,
        id: &str,
        default_content: Option<Content>,
        transition: Option<TransitionFn>,
    ) -> Self {
        let root = document.get_element_by_id(id);
        if root.is_none() {
            warn!("Surface element #{} not found, content will stay detached", id);
        }
        let surface = Self {
            id: id.to_string(),
            document: document.clone(),
            root,
            transition: transition.unwrap_or_else(|| Rc::new(default_transition)),
            wrappers: RefCell::new(Vec::new()),
            active: RefCell::new(None),
        };
        let default = surface.add_content(DEFAULT_KEY, default_content);
        *surface.active.borrow_mut() = default;
        surface
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Registers content for `key` (a screen id, or [`DEFAULT_KEY`]).
    ///
    /// Without content, an element already in the document with the wrapper
    /// id is adopted, which is how server-rendered markup is picked up.
    /// Returns the wrapper, or `None` if there is no content at all.
    pub fn add_content(&self, key: &str, content: Option<Content>) -> Option<Element> {
        let wrapper_id = self.wrapper_id(key);
        let wrapper = match content {
            None => {
                let existing = self.document.get_element_by_id(&wrapper_id)?;
                debug!("Adopting existing element #{}", wrapper_id);
                existing
            }
            Some(content) => {
                let wrapper = Element::with_id("div", &wrapper_id);
                (self.transition)(Some(&wrapper), None);
                if let Some(root) = &self.root {
                    root.append_child(&wrapper);
                }
                wrapper.append_content(&content);
                wrapper
            }
        };
        let mut wrappers = self.wrappers.borrow_mut();
        wrappers.retain(|(k, _)| k != key);
        wrappers.push((key.to_string(), wrapper.clone()));
        Some(wrapper)
    }

    /// Shows the content for `key`, or the default content if `key` has
    /// none. With no default either, the outgoing wrapper is hidden and
    /// nothing is shown.
    pub fn show(&self, key: &str) -> Option<Deferred<()>> {
        let target = self.wrapper(key).or_else(|| self.wrapper(DEFAULT_KEY));
        let outgoing = self.active.replace(target.clone());
        (self.transition)(outgoing.as_ref(), target.as_ref())
    }

    /// Detaches and forgets the content for `key`. No-op if there is none.
    pub fn remove(&self, key: &str) {
        let wrapper = {
            let mut wrappers = self.wrappers.borrow_mut();
            let Some(index) = wrappers.iter().position(|(k, _)| k == key) else {
                return;
            };
            wrappers.remove(index).1
        };
        let mut active = self.active.borrow_mut();
        if active.as_ref().is_some_and(|a| a.ptr_eq(&wrapper)) {
            *active = None;
        }
        wrapper.remove();
    }

    pub fn has_content(&self, key: &str) -> bool {
        self.wrapper(key).is_some()
    }

    /// The wrapper currently shown.
    pub fn active(&self) -> Option<Element> {
        self.active.borrow().clone()
    }

    fn wrapper(&self, key: &str) -> Option<Element> {
        self.wrappers
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, wrapper)| wrapper.clone())
    }

    fn wrapper_id(&self, key: &str) -> String {
        format!("{}-{}", self.id, key)
    }
}
