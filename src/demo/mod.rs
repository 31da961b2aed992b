//! # Demo Page
//!
//! What the `surf` binary runs: screens built from configured routes, a page
//! assembled around them, and the line commands that drive it.
//!
//! ```text
//! ResolvedConfig ──► setup::build_page ──► Page { app, document, history }
//!                        │
//!                        └─ one RegexScreenFactory per route
//!                             null | static | delayed | fetch
//! ```

pub mod commands;
pub mod screens;
pub mod setup;

pub use commands::{Command, ParseError};
pub use setup::{Page, build_page};
