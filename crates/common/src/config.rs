//! Three-tier configuration resolution
//!
//! Configuration is built fresh for every invocation by layering:
//!
//! 1. Built-in defaults ([`ConfigResolver::builtin_defaults`])
//! 2. Project overrides (`zypin.config` in the project's `package.json`)
//! 3. Per-call overrides (CLI flags or host parameters)
//!
//! Later layers overwrite earlier ones key by key, with no deep merge. The merged map
//! is then validated into a [`ValidatedConfig`]. Validation never fails. Malformed
//! values are replaced with the documented default.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::{Browser, TemplateKind};

/// One configuration layer, keyed by the camelCase field names
pub type ConfigLayer = Map<String, Value>;

pub const DEFAULT_BROWSER: Browser = Browser::Chrome;
pub const DEFAULT_HEADLESS: bool = false;
pub const DEFAULT_GRID_URL: &str = "http://localhost:8422";
pub const DEFAULT_WINDOW_SIZE: &str = "1920x1080";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const MIN_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_PARALLEL: u32 = 1;
pub const DEFAULT_RETRIES: u32 = 0;
pub const DEFAULT_PORT: u16 = 8422;
pub const DEFAULT_MAX_SESSIONS: u32 = 5;
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
pub const DEFAULT_JAR_FILE: &str = "selenium-server-4.25.0.jar";
pub const DEFAULT_JAR_URL: &str =
    "https://github.com/SeleniumHQ/selenium/releases/download/selenium-4.25.0/selenium-server-4.25.0.jar";

/// Keys the resolver owns; anything else is carried through in `extra`
const KNOWN_KEYS: &[&str] = &[
    "browser",
    "headless",
    "gridUrl",
    "windowSize",
    "timeout",
    "parallel",
    "retries",
    "port",
    "maxSessions",
    "logLevel",
    "jarFile",
    "jarUrl",
];

/// Fully resolved configuration. Every field always holds a usable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedConfig {
    pub browser: Browser,
    pub headless: bool,
    pub grid_url: String,
    pub window_size: String,
    /// Per-test timeout in milliseconds
    pub timeout: u64,
    pub parallel: u32,
    pub retries: u32,

    // Server-start fields
    pub port: u16,
    pub max_sessions: u32,
    pub log_level: String,
    pub jar_file: String,
    pub jar_url: String,

    /// Unrecognized keys, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ValidatedConfig {
    fn default() -> Self {
        Self {
            browser: DEFAULT_BROWSER,
            headless: DEFAULT_HEADLESS,
            grid_url: DEFAULT_GRID_URL.to_string(),
            window_size: DEFAULT_WINDOW_SIZE.to_string(),
            timeout: DEFAULT_TIMEOUT_MS,
            parallel: DEFAULT_PARALLEL,
            retries: DEFAULT_RETRIES,
            port: DEFAULT_PORT,
            max_sessions: DEFAULT_MAX_SESSIONS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            jar_file: DEFAULT_JAR_FILE.to_string(),
            jar_url: DEFAULT_JAR_URL.to_string(),
            extra: Map::new(),
        }
    }
}

/// Merges and validates configuration layers
pub struct ConfigResolver;

impl ConfigResolver {
    /// The built-in default layer
    pub fn builtin_defaults() -> ConfigLayer {
        match serde_json::to_value(ValidatedConfig::default()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Shallow-merge `defaults < project < overrides` and validate the result
    pub fn resolve(defaults: &ConfigLayer, project: &ConfigLayer, overrides: &ConfigLayer) -> ValidatedConfig {
        let merged = Self::merge(&[defaults, project, overrides]);
        Self::validate(&merged)
    }

    /// Key-by-key overwrite, later layers win
    pub fn merge(layers: &[&ConfigLayer]) -> ConfigLayer {
        let mut merged = Map::new();
        for layer in layers {
            for (key, value) in layer.iter() {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    /// Coerce a merged layer into a [`ValidatedConfig`]
    pub fn validate(merged: &ConfigLayer) -> ValidatedConfig {
        let fallback = ValidatedConfig::default();

        let browser = match merged.get("browser").and_then(Value::as_str).and_then(Browser::from_name) {
            Some(browser) => browser,
            None => {
                warn!(
                    "Invalid browser '{}', defaulting to '{}'",
                    display_value(merged.get("browser")),
                    DEFAULT_BROWSER
                );
                DEFAULT_BROWSER
            }
        };

        let timeout = number(merged, "timeout")
            .filter(|ms| *ms >= MIN_TIMEOUT_MS as f64)
            .map(|ms| ms as u64)
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        let parallel = number(merged, "parallel")
            .filter(|n| *n >= 1.0)
            .map(|n| n.min(u32::MAX as f64) as u32)
            .unwrap_or(DEFAULT_PARALLEL);

        let retries = number(merged, "retries")
            .filter(|n| *n >= 0.0)
            .map(|n| n.min(u32::MAX as f64) as u32)
            .unwrap_or(DEFAULT_RETRIES);

        let headless = merged.get("headless").and_then(Value::as_bool).unwrap_or(DEFAULT_HEADLESS);

        let window_size = merged
            .get("windowSize")
            .and_then(Value::as_str)
            .filter(|s| is_window_size(s))
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_WINDOW_SIZE.to_string());

        let extra = merged
            .iter()
            .filter(|(key, _)| !KNOWN_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        ValidatedConfig {
            browser,
            headless,
            grid_url: string_or(merged, "gridUrl", fallback.grid_url),
            window_size,
            timeout,
            parallel,
            retries,
            port: merged
                .get("port")
                .and_then(Value::as_u64)
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or_else(|| typed_fallback(merged, "port", fallback.port)),
            max_sessions: merged
                .get("maxSessions")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or_else(|| typed_fallback(merged, "maxSessions", fallback.max_sessions)),
            log_level: string_or(merged, "logLevel", fallback.log_level),
            jar_file: string_or(merged, "jarFile", fallback.jar_file),
            jar_url: string_or(merged, "jarUrl", fallback.jar_url),
            extra,
        }
    }
}

/// Numeric value of a key, accepting integers and floats alike
fn number(layer: &ConfigLayer, key: &str) -> Option<f64> {
    layer.get(key).and_then(Value::as_f64).filter(|n| n.is_finite())
}

fn string_or(layer: &ConfigLayer, key: &str, fallback: String) -> String {
    match layer.get(key) {
        Some(Value::String(s)) => s.clone(),
        None => fallback,
        Some(other) => {
            warn!("Ignoring non-string value for '{}': {}", key, other);
            fallback
        }
    }
}

fn typed_fallback<T: std::fmt::Display>(layer: &ConfigLayer, key: &str, fallback: T) -> T {
    if let Some(value) = layer.get(key) {
        warn!("Ignoring unusable value for '{}': {} (using {})", key, value, fallback);
    }
    fallback
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "undefined".to_string(),
    }
}

fn window_size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]+x[0-9]+$").expect("static regex"))
}

/// `WIDTHxHEIGHT`, digits only
pub fn is_window_size(value: &str) -> bool {
    window_size_pattern().is_match(value)
}

/// The `zypin` section of a project's `package.json`
#[derive(Debug, Clone, Default)]
pub struct ProjectManifest {
    pub template: Option<String>,
    pub config: ConfigLayer,
}

#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    zypin: Option<ZypinSection>,
}

#[derive(Deserialize)]
struct ZypinSection {
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    config: Option<Value>,
}

impl ProjectManifest {
    pub const FILE_NAME: &'static str = "package.json";

    /// Load the manifest from `<project_dir>/package.json`
    ///
    /// A missing file is an error: the run cannot pick a template without it.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(Self::FILE_NAME);
        if !path.is_file() {
            return Err(Error::ProjectManifestMissing(project_dir.to_path_buf()));
        }
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: PathBuf) -> Result<Self> {
        let package: PackageJson = serde_json::from_str(content).map_err(|e| Error::InvalidProjectManifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let Some(section) = package.zypin else {
            return Ok(Self::default());
        };

        let config = match section.config {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                warn!("Ignoring non-object zypin.config in {}: {}", path.display(), other);
                Map::new()
            }
        };

        Ok(Self {
            template: section.template,
            config,
        })
    }

    /// Template id, defaulting to `basic-webdriver`
    pub fn template_id(&self) -> &str {
        self.template.as_deref().unwrap_or(TemplateKind::BasicWebdriver.id())
    }

    /// Resolve the template id to a known template
    pub fn template_kind(&self) -> Result<TemplateKind> {
        let id = self.template_id();
        TemplateKind::from_id(id).ok_or_else(|| Error::UnknownTemplate(id.to_string()))
    }
}
