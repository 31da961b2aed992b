//! Screens the `surf` binary builds from its configured routes.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use log::{debug, info};

use crate::browser::{Content, Element, HttpClient, TimerSource};
use crate::core::deferred::Deferred;
use crate::core::screen::Screen;

// ============================================================================
// Static
// ============================================================================

/// Fixed text per surface.
#[derive(Debug, Clone)]
pub struct StaticScreen {
    title: Option<String>,
    cacheable: bool,
    content: BTreeMap<String, String>,
}

impl StaticScreen {
    pub fn new(title: Option<String>, cacheable: bool, content: BTreeMap<String, String>) -> Self {
        Self {
            title,
            cacheable,
            content,
        }
    }
}

impl Screen for StaticScreen {
    fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    fn title(&self) -> Option<String> {
        self.title.clone()
    }

    fn surface_content(&self, surface_id: &str) -> Option<Content> {
        self.content
            .get(surface_id)
            .map(|text| Content::from(text.as_str()))
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

// ============================================================================
// Delayed
// ============================================================================

/// Shows its delay in the main surface and takes that long to flip to.
pub struct DelayedScreen {
    seconds: u64,
    title: Option<String>,
    cacheable: bool,
    timers: Rc<dyn TimerSource>,
}

impl DelayedScreen {
    pub fn new(
        seconds: u64,
        title: Option<String>,
        cacheable: bool,
        timers: Rc<dyn TimerSource>,
    ) -> Self {
        Self {
            seconds,
            title,
            cacheable,
            timers,
        }
    }
}

impl Screen for DelayedScreen {
    fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    fn title(&self) -> Option<String> {
        Some(
            self.title
                .clone()
                .unwrap_or_else(|| format!("I was {} seconds delayed.", self.seconds)),
        )
    }

    fn surface_content(&self, surface_id: &str) -> Option<Content> {
        match surface_id {
            "main" => {
                let heading = Element::new("h1");
                heading.append_text(&self.seconds.to_string());
                Some(heading.into())
            }
            "sidebar" => Some("DelayedScreen".into()),
            _ => None,
        }
    }

    fn before_flip(&mut self) -> Option<Deferred<()>> {
        let timer = self.timers.delay(Duration::from_secs(self.seconds));
        timer.on_cancel(|err| info!("Cancelling timeout: {}", err));
        Some(timer)
    }

    fn after_flip(&mut self) {}

    fn before_deactivate(&mut self) -> bool {
        false
    }

    fn deactivate(&mut self) {}

    fn dispose(&mut self) {}
}

// ============================================================================
// Fetch
// ============================================================================

/// Starts loading `url` as soon as it is created and holds the flip until
/// the response is in. The body ends up in the main surface.
pub struct FetchScreen {
    url: String,
    title: Option<String>,
    cacheable: bool,
    body: Element,
    load: Deferred<String>,
}

impl FetchScreen {
    pub fn new(url: &str, title: Option<String>, cacheable: bool, http: &HttpClient) -> Self {
        let body = Element::new("pre");
        let load = http.get_raw(url);
        let target = body.clone();
        load.on_success(move |text| target.append_text(text));
        Self {
            url: url.to_string(),
            title,
            cacheable,
            body,
            load,
        }
    }
}

impl Screen for FetchScreen {
    fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    fn title(&self) -> Option<String> {
        self.title.clone().or_else(|| Some(self.url.clone()))
    }

    fn surface_content(&self, surface_id: &str) -> Option<Content> {
        match surface_id {
            "main" => Some(self.body.clone().into()),
            "sidebar" => Some("FetchScreen".into()),
            _ => None,
        }
    }

    fn before_flip(&mut self) -> Option<Deferred<()>> {
        debug!("Waiting for {}", self.url);
        Some(self.load.map(|_| ()))
    }

    fn after_flip(&mut self) {}

    fn before_deactivate(&mut self) -> bool {
        false
    }

    fn deactivate(&mut self) {}

    fn dispose(&mut self) {
        if self.load.cancel() {
            debug!("Abandoned request to {}", self.url);
        }
    }
}

/// Replaces `{1}`, `{2}`… in `template` with the matching capture.
pub fn fill_captures(template: &str, captures: &[String]) -> String {
    captures
        .iter()
        .enumerate()
        .skip(1)
        .fold(template.to_string(), |url, (i, capture)| {
            url.replace(&format!("{{{i}}}"), capture)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ManualTimers;

    #[test]
    fn test_static_screen_content() {
        let content = BTreeMap::from([("main".to_string(), "Hello".to_string())]);
        let screen = StaticScreen::new(Some("T".into()), true, content);
        assert!(screen.is_cacheable());
        assert_eq!(screen.title().as_deref(), Some("T"));
        assert!(matches!(screen.surface_content("main"), Some(Content::Text(t)) if t == "Hello"));
        assert!(screen.surface_content("footer").is_none());
    }

    #[test]
    fn test_delayed_screen_waits_on_timer() {
        let timers = ManualTimers::default();
        let mut screen = DelayedScreen::new(3, None, false, Rc::new(timers.clone()));
        assert_eq!(screen.title().as_deref(), Some("I was 3 seconds delayed."));

        let ready = screen.before_flip().unwrap();
        assert!(ready.is_pending());
        assert_eq!(timers.pending_count(), 1);
        timers.fire_all();
        assert!(ready.is_resolved());
    }

    #[test]
    fn test_delayed_screen_cancel_clears_timer() {
        let timers = ManualTimers::default();
        let mut screen = DelayedScreen::new(5, None, false, Rc::new(timers.clone()));
        let ready = screen.before_flip().unwrap();
        ready.cancel();
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn test_delayed_screen_main_content_is_heading() {
        let screen = DelayedScreen::new(2, None, false, Rc::new(ManualTimers::default()));
        match screen.surface_content("main") {
            Some(Content::Element(e)) => {
                assert_eq!(e.tag(), "h1");
                assert_eq!(e.text_content(), "2");
            }
            _ => panic!("expected an element"),
        }
    }

    #[test]
    fn test_fill_captures() {
        let caps = vec!["user/7/x".to_string(), "7".to_string(), "x".to_string()];
        assert_eq!(
            fill_captures("http://h/users/{1}/{2}", &caps),
            "http://h/users/7/x"
        );
        assert_eq!(fill_captures("http://h/plain", &caps), "http://h/plain");
    }
}
