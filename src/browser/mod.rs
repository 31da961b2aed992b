//! # Browser Model
//!
//! The pieces of a browser the navigation controller talks to, modelled in
//! process: a document tree, session history, timers and an HTTP helper.
//! The controller only depends on the types exported here, never on how
//! they are implemented.

pub mod dom;
pub mod history;
pub mod timer;
pub mod xhr;

pub use dom::{ClickEvent, Content, Document, Element, Node};
pub use history::{History, HistoryEntry, HistoryError, HistoryState, MemoryHistory};
pub use timer::{TimerSource, TokioTimers};
pub use xhr::HttpClient;
