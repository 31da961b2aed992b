//! # Configuration
//!
//! Centralizes all settings for the `surf` binary with a clear override
//! hierarchy: defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.surf/config.toml` unless `--config` points elsewhere.
//! If the default file is missing on first run, a commented-out default is
//! generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use simplelog::LevelFilter;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SurfConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub log: LogSection,
    #[serde(default)]
    pub surfaces: Vec<SurfaceEntry>,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AppSection {
    pub base_path: Option<String>,
    pub default_title: Option<String>,
    /// URL of the simulated page the app runs in.
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LogSection {
    pub level: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SurfaceEntry {
    pub id: String,
    pub default_content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenKind {
    /// Reverts every surface to its default content.
    Null,
    /// Fixed text per surface.
    Static,
    /// Waits before flipping; the delay comes from `delay_secs` or the
    /// first capture group.
    Delayed,
    /// Fetches `url` and shows the response body.
    Fetch,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RouteEntry {
    pub pattern: String,
    pub screen: ScreenKind,
    pub title: Option<String>,
    pub cacheable: Option<bool>,
    /// Surface id → text, for static screens.
    #[serde(default)]
    pub content: BTreeMap<String, String>,
    pub delay_secs: Option<u64>,
    /// For fetch screens. `{1}`, `{2}`… are replaced by capture groups.
    pub url: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_BASE_PATH: &str = "/";
pub const DEFAULT_TITLE: &str = "surf";
pub const DEFAULT_LOCATION: &str = "http://localhost/";
pub const DEFAULT_LOG_FILE: &str = "surf.log";
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

/// Surfaces used when the config defines none.
pub fn default_surfaces() -> Vec<SurfaceEntry> {
    let surface = |id: &str, default_content: Option<&str>| SurfaceEntry {
        id: id.to_string(),
        default_content: default_content.map(str::to_string),
    };
    vec![
        surface("main", None),
        surface("sidebar", None),
        surface("header", None),
        surface("footer", Some("This is the default footer, set from config.")),
    ]
}

/// Routes used when the config defines none.
pub fn default_routes() -> Vec<RouteEntry> {
    let content = [
        (
            "main",
            "This is a test screen that simply returns some plain text as the main surface's content.",
        ),
        ("sidebar", "TestScreen"),
        ("header", "<< Back"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    vec![
        RouteEntry {
            pattern: r"^index\.html$".to_string(),
            screen: ScreenKind::Null,
            title: None,
            cacheable: None,
            content: BTreeMap::new(),
            delay_secs: None,
            url: None,
        },
        RouteEntry {
            pattern: r"^test\.html$".to_string(),
            screen: ScreenKind::Static,
            title: Some("Test screen".to_string()),
            cacheable: Some(true),
            content,
            delay_secs: None,
            url: None,
        },
        RouteEntry {
            pattern: r"^delay-([0-9])\.html$".to_string(),
            screen: ScreenKind::Delayed,
            title: None,
            cacheable: Some(false),
            content: BTreeMap::new(),
            delay_secs: None,
            url: None,
        },
    ]
}

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_path: String,
    pub default_title: String,
    pub location: String,
    pub log_level: LevelFilter,
    pub log_file: PathBuf,
    pub surfaces: Vec<SurfaceEntry>,
    pub routes: Vec<RouteEntry>,
}

/// Values from CLI flags (None = not specified).
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub base_path: Option<String>,
    pub log_level: Option<String>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    InvalidRoute { pattern: String, reason: String },
    InvalidLocation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::InvalidRoute { pattern, reason } => {
                write!(f, "invalid route {pattern}: {reason}")
            }
            ConfigError::InvalidLocation(msg) => write!(f, "invalid location: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.surf/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".surf").join("config.toml"))
}

/// Load config from `explicit`, or from `~/.surf/config.toml`.
///
/// If the default file doesn't exist, generates a commented-out default and
/// returns `SurfConfig::default()`. An explicit path must exist. A file that
/// exists but is malformed returns `ConfigError::Parse`.
pub fn load_config(explicit: Option<&Path>) -> Result<SurfConfig, ConfigError> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(SurfConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(SurfConfig::default());
    }

    read_config(&path)
}

fn read_config(path: &Path) -> Result<SurfConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: SurfConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# surf Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [app]
# base_path = "/"                    # Or set SURF_BASE_PATH
# default_title = "surf"             # Or set SURF_DEFAULT_TITLE
# location = "http://localhost/"     # URL of the simulated page

# [log]
# level = "debug"                    # Or set SURF_LOG_LEVEL
# file = "surf.log"

# Without any [[surfaces]], main/sidebar/header/footer are defined.
# [[surfaces]]
# id = "main"
#
# [[surfaces]]
# id = "footer"
# default_content = "This is the default footer."

# Without any [[routes]], index.html/test.html/delay-N.html are defined.
# Routes are tried in order; the first matching pattern wins.
# [[routes]]
# pattern = '^test\.html$'
# screen = "static"                  # "null", "static", "delayed" or "fetch"
# title = "Test screen"
# cacheable = true
# content = { main = "Hello", sidebar = "TestScreen" }
#
# [[routes]]
# pattern = '^delay-([0-9])\.html$'
# screen = "delayed"                 # delay_secs, or the first capture group
#
# [[routes]]
# pattern = '^user/([0-9]+)$'
# screen = "fetch"
# url = "http://localhost:8080/users/{1}"
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &SurfConfig, cli: &CliOverrides) -> Result<ResolvedConfig, ConfigError> {
    // Base path: CLI → env → config → default
    let base_path = cli
        .base_path
        .clone()
        .or_else(|| std::env::var("SURF_BASE_PATH").ok())
        .or_else(|| config.app.base_path.clone())
        .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string());

    // Title: env → config → default
    let default_title = std::env::var("SURF_DEFAULT_TITLE")
        .ok()
        .or_else(|| config.app.default_title.clone())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let location = config
        .app
        .location
        .clone()
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

    // Log level: CLI → env → config → default
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("SURF_LOG_LEVEL").ok())
        .or_else(|| config.log.level.clone())
        .map(|level| parse_level(&level))
        .unwrap_or(DEFAULT_LOG_LEVEL);

    let log_file = PathBuf::from(
        config
            .log
            .file
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
    );

    let surfaces = if config.surfaces.is_empty() {
        default_surfaces()
    } else {
        config.surfaces.clone()
    };

    let routes = if config.routes.is_empty() {
        default_routes()
    } else {
        config.routes.clone()
    };
    for route in &routes {
        validate_route(route)?;
    }

    Ok(ResolvedConfig {
        base_path,
        default_title,
        location,
        log_level,
        log_file,
        surfaces,
        routes,
    })
}

fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or_else(|_| {
        warn!("Unknown log level {:?}, using {}", level, DEFAULT_LOG_LEVEL);
        DEFAULT_LOG_LEVEL
    })
}

/// Checks that a route's pattern compiles and that it carries what its
/// screen kind needs.
pub fn validate_route(route: &RouteEntry) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidRoute {
        pattern: route.pattern.clone(),
        reason,
    };

    let regex = regex::Regex::new(&route.pattern).map_err(|e| invalid(e.to_string()))?;
    match route.screen {
        ScreenKind::Fetch if route.url.is_none() => {
            Err(invalid("fetch screens need a url".to_string()))
        }
        ScreenKind::Delayed if route.delay_secs.is_none() && regex.captures_len() < 2 => Err(
            invalid("delayed screens need delay_secs or a capture group".to_string()),
        ),
        _ => Ok(()),
    }
}
