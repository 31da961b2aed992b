//! Builds a ready-to-init [`App`] from resolved configuration: a page with
//! one `<div>` per surface, in-memory history, and a factory per route.

use std::rc::Rc;

use log::info;
use reqwest::Url;

use crate::browser::{Document, Element, History, HttpClient, MemoryHistory, TimerSource};
use crate::core::app::{App, AppOptions};
use crate::core::config::{ConfigError, ResolvedConfig, RouteEntry, ScreenKind};
use crate::core::factory::RegexScreenFactory;
use crate::core::screen::{NullScreen, Screen};
use crate::demo::screens::{DelayedScreen, FetchScreen, StaticScreen, fill_captures};

/// The app plus the browser pieces the driver pokes at directly.
pub struct Page {
    pub app: App,
    pub document: Document,
    pub history: Rc<MemoryHistory>,
}

pub fn build_page(
    config: &ResolvedConfig,
    timers: Rc<dyn TimerSource>,
    http: HttpClient,
) -> Result<Page, ConfigError> {
    let location =
        Url::parse(&config.location).map_err(|e| ConfigError::InvalidLocation(e.to_string()))?;
    let document = Document::new(location.clone(), &config.default_title);
    for surface in &config.surfaces {
        document
            .body()
            .append_child(&Element::with_id("div", &surface.id));
    }

    let history = Rc::new(MemoryHistory::new(location.as_str()));
    let app = App::new(
        AppOptions {
            base_path: config.base_path.clone(),
            default_title: Some(config.default_title.clone()),
        },
        document.clone(),
        Rc::clone(&history) as Rc<dyn History>,
    );

    for surface in &config.surfaces {
        app.define_surface(
            &surface.id,
            surface.default_content.as_deref().map(Into::into),
            None,
        );
    }
    for route in &config.routes {
        app.register_screen_factory(route_factory(route, Rc::clone(&timers), http.clone())?);
    }
    info!(
        "Page ready at {} with {} surfaces and {} routes",
        location,
        config.surfaces.len(),
        config.routes.len()
    );

    Ok(Page {
        app,
        document,
        history,
    })
}

fn route_factory(
    route: &RouteEntry,
    timers: Rc<dyn TimerSource>,
    http: HttpClient,
) -> Result<RegexScreenFactory, ConfigError> {
    let entry = route.clone();
    RegexScreenFactory::new(&route.pattern, move |captures| {
        build_screen(&entry, captures, &timers, &http)
    })
    .map_err(|e| ConfigError::InvalidRoute {
        pattern: route.pattern.clone(),
        reason: e.to_string(),
    })
}

fn build_screen(
    route: &RouteEntry,
    captures: &[String],
    timers: &Rc<dyn TimerSource>,
    http: &HttpClient,
) -> Box<dyn Screen> {
    match route.screen {
        ScreenKind::Null => Box::new(NullScreen),
        ScreenKind::Static => Box::new(StaticScreen::new(
            route.title.clone(),
            route.cacheable.unwrap_or(true),
            route.content.clone(),
        )),
        ScreenKind::Delayed => {
            let seconds = route
                .delay_secs
                .or_else(|| captures.get(1).and_then(|c| c.parse().ok()))
                .unwrap_or(0);
            Box::new(DelayedScreen::new(
                seconds,
                route.title.clone(),
                route.cacheable.unwrap_or(false),
                Rc::clone(timers),
            ))
        }
        ScreenKind::Fetch => {
            let template = route.url.as_deref().unwrap_or_default();
            Box::new(FetchScreen::new(
                &fill_captures(template, captures),
                route.title.clone(),
                route.cacheable.unwrap_or(true),
                http,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{CliOverrides, SurfConfig, resolve};
    use crate::test_support::ManualTimers;

    fn page_with(timers: &ManualTimers) -> Page {
        let config = resolve(&SurfConfig::default(), &CliOverrides {
            base_path: Some("/".to_string()),
            log_level: None,
        })
        .unwrap();
        build_page(&config, Rc::new(timers.clone()), HttpClient::new()).unwrap()
    }

    fn main_text(page: &Page) -> Option<String> {
        page.app.active_wrapper("main").map(|w| w.text_content())
    }

    #[test]
    fn test_default_page_has_every_surface() {
        let page = page_with(&ManualTimers::default());
        assert_eq!(
            page.app.surface_ids(),
            vec!["main", "sidebar", "header", "footer"]
        );
        for id in ["main", "sidebar", "header", "footer"] {
            assert!(page.document.get_element_by_id(id).is_some());
        }
    }

    #[test]
    fn test_static_route_renders_and_caches() {
        let page = page_with(&ManualTimers::default());
        page.app.init(Some("index.html"));
        let nav = page.app.navigate("test.html", false);
        assert!(nav.is_resolved());
        assert!(main_text(&page).unwrap().starts_with("This is a test screen"));
        assert_eq!(page.document.title(), "Test screen");
        assert!(page.app.cached_screen("test.html").is_some());
    }

    #[test]
    fn test_delayed_route_uses_capture_as_seconds() {
        let timers = ManualTimers::default();
        let page = page_with(&timers);
        page.app.init(Some("index.html"));

        let nav = page.app.navigate("delay-4.html", false);
        assert!(nav.is_pending());
        assert_eq!(timers.pending_count(), 1);
        timers.fire_all();
        assert!(nav.is_resolved());
        assert_eq!(main_text(&page).as_deref(), Some("4"));
        assert_eq!(page.document.title(), "I was 4 seconds delayed.");
    }

    #[test]
    fn test_null_route_reverts_to_defaults() {
        let page = page_with(&ManualTimers::default());
        page.app.init(Some("test.html"));
        page.app.navigate("index.html", false);
        assert!(main_text(&page).is_none());
        let footer = page.app.active_wrapper("footer").unwrap();
        assert!(footer.text_content().starts_with("This is the default footer"));
    }

    #[test]
    fn test_invalid_location_is_rejected() {
        let mut config = resolve(&SurfConfig::default(), &CliOverrides::default()).unwrap();
        config.location = "not a url".to_string();
        let result = build_page(&config, Rc::new(ManualTimers::default()), HttpClient::new());
        assert!(matches!(result, Err(ConfigError::InvalidLocation(_))));
    }
}
