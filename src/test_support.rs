//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use reqwest::Url;

use crate::browser::{
    Content, Document, Element, History, HistoryError, HistoryState, MemoryHistory, TimerSource,
};
use crate::core::app::{App, AppOptions};
use crate::core::deferred::Deferred;
use crate::core::factory::RegexScreenFactory;
use crate::core::pubsub::{NavEvent, Topic};
use crate::core::screen::Screen;

pub const TEST_ORIGIN: &str = "http://localhost";
pub const TEST_BASE: &str = "/app/";

/// Shared, ordered record of what happened, e.g. `"a:after_flip"`.
pub type EventLog = Rc<RefCell<Vec<String>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

// ============================================================================
// Scripted screens
// ============================================================================

/// Recipe for a [`ScriptedScreen`]. Cloned into every instance a factory
/// builds, so the shared cells (veto, log, counters) are shared too.
#[derive(Clone)]
pub struct ScreenScript {
    pub name: String,
    pub cacheable: bool,
    pub title: Option<String>,
    pub content: Vec<(String, String)>,
    pub veto: Rc<Cell<bool>>,
    pub readiness: Option<Rc<dyn Fn() -> Deferred<()>>>,
    pub created: Rc<Cell<usize>>,
    pub log: EventLog,
}

impl ScreenScript {
    pub fn new(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            cacheable: false,
            title: None,
            content: Vec::new(),
            veto: Rc::new(Cell::new(false)),
            readiness: None,
            created: Rc::new(Cell::new(0)),
            log: Rc::clone(log),
        }
    }

    pub fn cacheable(mut self) -> Self {
        self.cacheable = true;
        self
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_content(mut self, surface: &str, text: &str) -> Self {
        self.content.push((surface.to_string(), text.to_string()));
        self
    }

    pub fn ready_when<F>(mut self, readiness: F) -> Self
    where
        F: Fn() -> Deferred<()> + 'static,
    {
        self.readiness = Some(Rc::new(readiness));
        self
    }

    /// Factory matching `pattern` that builds this screen.
    pub fn factory(&self, pattern: &str) -> RegexScreenFactory {
        let script = self.clone();
        RegexScreenFactory::new(pattern, move |_| {
            script.created.set(script.created.get() + 1);
            Box::new(ScriptedScreen {
                script: script.clone(),
            })
        })
        .unwrap()
    }
}

pub struct ScriptedScreen {
    script: ScreenScript,
}

impl ScriptedScreen {
    fn record(&self, hook: &str) {
        self.script
            .log
            .borrow_mut()
            .push(format!("{}:{}", self.script.name, hook));
    }
}

impl Screen for ScriptedScreen {
    fn is_cacheable(&self) -> bool {
        self.script.cacheable
    }

    fn title(&self) -> Option<String> {
        self.script.title.clone()
    }

    fn surface_content(&self, surface_id: &str) -> Option<Content> {
        self.script
            .content
            .iter()
            .find(|(id, _)| id == surface_id)
            .map(|(_, text)| Content::from(text.as_str()))
    }

    fn before_flip(&mut self) -> Option<Deferred<()>> {
        self.record("before_flip");
        self.script.readiness.as_ref().map(|ready| ready())
    }

    fn after_flip(&mut self) {
        self.record("after_flip");
    }

    fn before_deactivate(&mut self) -> bool {
        self.record("before_deactivate");
        self.script.veto.get()
    }

    fn deactivate(&mut self) {
        self.record("deactivate");
    }

    fn dispose(&mut self) {
        self.record("dispose");
    }
}

// ============================================================================
// Timers and history
// ============================================================================

/// Timers that only fire when told to.
#[derive(Clone, Default)]
pub struct ManualTimers {
    pending: Rc<RefCell<Vec<(Duration, Deferred<()>)>>>,
}

impl ManualTimers {
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Fires every pending timer; returns how many fired.
    pub fn fire_all(&self) -> usize {
        let due: Vec<_> = self.pending.borrow_mut().drain(..).collect();
        for (_, timer) in &due {
            timer.resolve(());
        }
        due.len()
    }
}

impl TimerSource for ManualTimers {
    fn delay(&self, duration: Duration) -> Deferred<()> {
        let timer = Deferred::new();
        self.pending.borrow_mut().push((duration, timer.clone()));

        let pending = Rc::clone(&self.pending);
        let handle = timer.clone();
        timer.on_cancel(move |_| {
            pending.borrow_mut().retain(|(_, t)| !t.ptr_eq(&handle));
        });
        timer
    }
}

/// History that refuses every write, like a browser blocking a
/// cross-origin URL.
#[derive(Default)]
pub struct FailingHistory;

impl History for FailingHistory {
    fn push_state(&self, _state: HistoryState, _title: &str, url: &str) -> Result<(), HistoryError> {
        Err(HistoryError::Security(format!("refused {}", url)))
    }

    fn replace_state(
        &self,
        _state: HistoryState,
        _title: &str,
        url: &str,
    ) -> Result<(), HistoryError> {
        Err(HistoryError::Security(format!("refused {}", url)))
    }

    fn add_pop_state_listener(&self, _listener: crate::browser::history::PopStateListener) {}
}

// ============================================================================
// Apps
// ============================================================================

/// A document with a `<div>` for each surface id under the body.
pub fn test_document(surfaces: &[&str]) -> Document {
    let url = Url::parse(&format!("{}{}", TEST_ORIGIN, TEST_BASE)).unwrap();
    let doc = Document::new(url, "Start");
    for id in surfaces {
        doc.body().append_child(&Element::with_id("div", id));
    }
    doc
}

pub struct TestApp {
    pub app: App,
    pub document: Document,
    pub history: Rc<MemoryHistory>,
    pub log: EventLog,
}

/// An app under `/app/` with a `main` surface and a `footer` surface whose
/// default content is "default footer". Navigation events are recorded into
/// `log` as `start:{path}`, `end:{path}:ok` or `end:{path}:fail`.
pub fn test_app() -> TestApp {
    let document = test_document(&["main", "footer"]);
    let history = Rc::new(MemoryHistory::new(&format!("{}{}", TEST_ORIGIN, TEST_BASE)));
    let app = App::new(
        AppOptions {
            base_path: TEST_BASE.to_string(),
            default_title: Some("Default".to_string()),
        },
        document.clone(),
        Rc::clone(&history) as Rc<dyn History>,
    );
    app.define_surface("main", None, None);
    app.define_surface("footer", Some("default footer".into()), None);

    let log = event_log();
    record_events(&app, &log);
    TestApp {
        app,
        document,
        history,
        log,
    }
}

pub fn record_events(app: &App, log: &EventLog) {
    let sink = Rc::clone(log);
    app.subscribe(Topic::Start, move |event| {
        sink.borrow_mut().push(format!("start:{}", event.path()));
    });
    let sink = Rc::clone(log);
    app.subscribe(Topic::End, move |event| {
        if let NavEvent::End { path, success, .. } = event {
            let outcome = if *success { "ok" } else { "fail" };
            sink.borrow_mut().push(format!("end:{}:{}", path, outcome));
        }
    });
}

/// Entries of `log` matching `prefix`, in order.
pub fn entries_with(log: &EventLog, prefix: &str) -> Vec<String> {
    log.borrow()
        .iter()
        .filter(|e| e.starts_with(prefix))
        .cloned()
        .collect()
}
