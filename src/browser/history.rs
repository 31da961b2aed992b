//! # Session History
//!
//! The `History` trait is what the navigation controller needs from a
//! browser's history API: push, replace and a popstate notification.
//! `MemoryHistory` is the in-process implementation used by the binary and
//! the tests; `back`/`forward` move through the stack and fire popstate the
//! way a browser does.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;
use serde::{Deserialize, Serialize};

/// State object stored with an app-driven history entry.
///
/// `is_navigate` marks entries created by the navigation controller, as
/// opposed to entries created by anything else on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    pub path: String,
    #[serde(rename = "isNavigate")]
    pub is_navigate: bool,
}

impl HistoryState {
    pub fn navigate(path: &str) -> Self {
        Self {
            path: path.to_string(),
            is_navigate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub state: Option<HistoryState>,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// The browser refused the update, e.g. a cross-origin URL.
    Security(String),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::Security(msg) => write!(f, "history security error: {msg}"),
        }
    }
}

impl std::error::Error for HistoryError {}

pub type PopStateListener = Rc<dyn Fn(Option<&HistoryState>)>;

pub trait History {
    fn push_state(&self, state: HistoryState, title: &str, url: &str) -> Result<(), HistoryError>;

    fn replace_state(&self, state: HistoryState, title: &str, url: &str)
    -> Result<(), HistoryError>;

    /// Called with the state of the entry that became current after a
    /// back/forward traversal.
    fn add_pop_state_listener(&self, listener: PopStateListener);
}

struct Stack {
    entries: Vec<HistoryEntry>,
    index: usize,
}

pub struct MemoryHistory {
    stack: RefCell<Stack>,
    listeners: RefCell<Vec<PopStateListener>>,
}

impl MemoryHistory {
    /// A history with one entry (no state) for `initial_url`.
    pub fn new(initial_url: &str) -> Self {
        Self {
            stack: RefCell::new(Stack {
                entries: vec![HistoryEntry {
                    state: None,
                    title: String::new(),
                    url: initial_url.to_string(),
                }],
                index: 0,
            }),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.stack.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self) -> usize {
        self.stack.borrow().index
    }

    pub fn current(&self) -> Option<HistoryEntry> {
        let stack = self.stack.borrow();
        stack.entries.get(stack.index).cloned()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.stack.borrow().entries.clone()
    }

    /// Moves one entry back and fires popstate. Returns `false` at the start.
    pub fn back(&self) -> bool {
        self.go(-1)
    }

    /// Moves one entry forward and fires popstate. Returns `false` at the end.
    pub fn forward(&self) -> bool {
        self.go(1)
    }

    pub fn go(&self, delta: isize) -> bool {
        let state = {
            let mut stack = self.stack.borrow_mut();
            let Some(target) = stack.index.checked_add_signed(delta) else {
                return false;
            };
            if delta == 0 || target >= stack.entries.len() {
                return false;
            }
            stack.index = target;
            stack.entries[target].state.clone()
        };
        debug!("History traversal by {} to {:?}", delta, state);
        let listeners: Vec<PopStateListener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(state.as_ref());
        }
        true
    }
}

impl History for MemoryHistory {
    fn push_state(&self, state: HistoryState, title: &str, url: &str) -> Result<(), HistoryError> {
        let mut stack = self.stack.borrow_mut();
        let keep = stack.index + 1;
        stack.entries.truncate(keep);
        stack.entries.push(HistoryEntry {
            state: Some(state),
            title: title.to_string(),
            url: url.to_string(),
        });
        stack.index = keep;
        Ok(())
    }

    fn replace_state(
        &self,
        state: HistoryState,
        title: &str,
        url: &str,
    ) -> Result<(), HistoryError> {
        let mut stack = self.stack.borrow_mut();
        let index = stack.index;
        stack.entries[index] = HistoryEntry {
            state: Some(state),
            title: title.to_string(),
            url: url.to_string(),
        };
        Ok(())
    }

    fn add_pop_state_listener(&self, listener: PopStateListener) {
        self.listeners.borrow_mut().push(listener);
    }
}
