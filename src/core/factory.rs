//! Regex-based screen factory: the pattern decides whether a path matches,
//! and the capture groups are handed to the screen constructor.

use std::fmt;

use regex::Regex;

use crate::core::screen::{Screen, ScreenFactory};

type Constructor = Box<dyn Fn(&[String]) -> Box<dyn Screen>>;

pub struct RegexScreenFactory {
    pattern: Regex,
    constructor: Constructor,
}

impl fmt::Debug for RegexScreenFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexScreenFactory")
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

impl RegexScreenFactory {
    /// `constructor` receives the whole match at index 0 followed by each
    /// capture group (empty string for groups that didn't participate).
    pub fn new<F>(pattern: &str, constructor: F) -> Result<Self, regex::Error>
    where
        F: Fn(&[String]) -> Box<dyn Screen> + 'static,
    {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            constructor: Box::new(constructor),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    fn captures(&self, path: &str) -> Vec<String> {
        self.pattern
            .captures(path)
            .map(|caps| {
                caps.iter()
                    .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ScreenFactory for RegexScreenFactory {
    fn matches_path(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    fn create(&self, path: &str) -> Box<dyn Screen> {
        (self.constructor)(&self.captures(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::screen::NullScreen;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_matches_path_uses_pattern() {
        let factory = RegexScreenFactory::new(r"^delay-([0-9])\.html$", |_| Box::new(NullScreen))
            .unwrap();
        assert!(factory.matches_path("delay-3.html"));
        assert!(!factory.matches_path("delay-33.html"));
        assert!(!factory.matches_path("test.html"));
    }

    #[test]
    fn test_create_passes_captures() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let factory = RegexScreenFactory::new(r"^album/([a-z0-9]+)(/edit)?$", move |caps| {
            *sink.borrow_mut() = caps.to_vec();
            Box::new(NullScreen)
        })
        .unwrap();

        factory.create("album/x42");
        assert_eq!(*seen.borrow(), vec!["album/x42", "x42", ""]);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(RegexScreenFactory::new("(", |_| Box::new(NullScreen)).is_err());
    }
}
