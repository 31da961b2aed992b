//! # Core Navigation Logic
//!
//! This module contains surf's navigation logic.
//! It talks to the browser only through the types in [`crate::browser`].
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │          CORE           │
//!                    │     (this module)       │
//!                    │                         │
//!                    │  • App (controller)     │
//!                    │  • Screen / factories   │
//!                    │  • Surfaces             │
//!                    │  • Deferred, PubSub     │
//!                    └───────────┬─────────────┘
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │  Document  │      │  History   │      │ Timers/XHR │
//!     │   (dom)    │      │ (pushState)│      │  (tokio)   │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`app`]: The `App` struct, which drives every navigation
//! - [`screen`]: The `Screen` and `ScreenFactory` traits
//! - [`factory`]: Path-pattern screen factory
//! - [`surface`]: Named document regions and their transitions
//! - [`deferred`]: Cancellable single-threaded deferred values
//! - [`pubsub`]: Navigation START/END events
//! - [`config`]: Layered configuration for the `surf` binary

pub mod app;
pub mod config;
pub mod deferred;
pub mod error;
pub mod factory;
pub mod pubsub;
pub mod screen;
pub mod surface;

pub use app::{App, AppOptions};
pub use deferred::{Deferred, DeferredState, join_all};
pub use error::NavError;
pub use factory::RegexScreenFactory;
pub use pubsub::{NavEvent, SubscriptionKey, Topic};
pub use screen::{NullScreen, Screen, ScreenFactory, ScreenHandle, ScreenId};
pub use surface::{DEFAULT_KEY, Surface, TransitionFn, default_transition};
