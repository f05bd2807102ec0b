//! Configuration management with TOML, environment variables, and CLI overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable holding the Google Play details URL.
pub const ENV_GOOGLE_URL: &str = "google_app_package_url";
/// Environment variable holding the App Store app URL.
pub const ENV_APPLE_URL: &str = "apple_app_package_url";
pub const ENV_LANG: &str = "lang";
pub const ENV_COUNTRY: &str = "country";
pub const ENV_RESULT_FOLDER: &str = "RESULT_FOLDER";
pub const ENV_PROXY: &str = "APP_REVIEWS_PROXY";
/// Comma-separated App Store search keywords for batch exports.
pub const ENV_KEYWORD: &str = "KEYWORD";
/// Comma-separated App Store links for batch exports.
pub const ENV_URLS: &str = "URLS";

pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_COUNTRY: &str = "us";

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Google Play store URL (`https://play.google.com/store/apps/details?id=...`)
    #[serde(default)]
    pub google_url: Option<String>,

    /// App Store URL (`https://apps.apple.com/{country}/app/{name}/id{digits}`)
    #[serde(default)]
    pub apple_url: Option<String>,

    /// Review language; `en` when unset
    #[serde(default)]
    pub lang: Option<String>,

    /// Store country; derived from the App Store URL, then `us`, when unset
    #[serde(default)]
    pub country: Option<String>,

    /// Directory that receives the CSV files
    #[serde(default = "default_result_dir")]
    pub result_dir: PathBuf,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Sort order requested from Google Play
    #[serde(default)]
    pub google_sort: SortOrder,

    /// Delay between Google Play review pages in milliseconds
    #[serde(default)]
    pub google_delay_ms: u64,

    /// Lower bound of the random delay between App Store feed pages
    #[serde(default = "default_apple_delay_min_secs")]
    pub apple_delay_min_secs: u64,

    /// Upper bound of the random delay between App Store feed pages
    #[serde(default = "default_apple_delay_max_secs")]
    pub apple_delay_max_secs: u64,

    /// Number of RSS feed pages to walk; the feed stops serving after 10
    #[serde(default = "default_apple_max_pages")]
    pub apple_max_pages: u32,

    /// Batch export: comma-separated search keywords
    #[serde(default)]
    pub keyword: Option<String>,

    /// Batch export: comma-separated App Store links
    #[serde(default)]
    pub urls: Option<String>,

    /// Batch export: expand keywords with the store's search suggestions
    #[serde(default = "default_expand_suggestions")]
    pub expand_suggestions: bool,
}

fn default_result_dir() -> PathBuf {
    PathBuf::from("result")
}

fn default_apple_delay_min_secs() -> u64 {
    3
}

fn default_apple_delay_max_secs() -> u64 {
    6
}

fn default_apple_max_pages() -> u32 {
    10
}

fn default_expand_suggestions() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_url: None,
            apple_url: None,
            lang: None,
            country: None,
            result_dir: default_result_dir(),
            proxy: None,
            google_sort: SortOrder::MostRelevant,
            google_delay_ms: 0,
            apple_delay_min_secs: default_apple_delay_min_secs(),
            apple_delay_max_secs: default_apple_delay_max_secs(),
            apple_max_pages: default_apple_max_pages(),
            keyword: None,
            urls: None,
            expand_suggestions: default_expand_suggestions(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("app-reviews").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides. Empty values count as unset.
    pub fn with_env(mut self) -> Self {
        if let Some(url) = env_value(ENV_GOOGLE_URL) {
            self.google_url = Some(url);
        }

        if let Some(url) = env_value(ENV_APPLE_URL) {
            self.apple_url = Some(url);
        }

        if let Some(lang) = env_value(ENV_LANG) {
            self.lang = Some(lang);
        }

        if let Some(country) = env_value(ENV_COUNTRY) {
            self.country = Some(country);
        }

        if let Some(dir) = env_value(ENV_RESULT_FOLDER) {
            self.result_dir = PathBuf::from(dir);
        }

        if let Some(proxy) = env_value(ENV_PROXY) {
            self.proxy = Some(proxy);
        }

        if let Some(keyword) = env_value(ENV_KEYWORD) {
            self.keyword = Some(keyword);
        }

        if let Some(urls) = env_value(ENV_URLS) {
            self.urls = Some(urls);
        }

        self
    }

    /// Applies command-line overrides; these win over file and environment.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if overrides.lang.is_some() {
            self.lang = overrides.lang;
        }
        if overrides.country.is_some() {
            self.country = overrides.country;
        }
        if let Some(dir) = overrides.result_dir {
            self.result_dir = dir;
        }
        if overrides.proxy.is_some() {
            self.proxy = overrides.proxy;
        }
        if overrides.google_url.is_some() {
            self.google_url = overrides.google_url;
        }
        if overrides.apple_url.is_some() {
            self.apple_url = overrides.apple_url;
        }
        if let Some(sort) = overrides.google_sort {
            self.google_sort = sort;
        }
        if overrides.keyword.is_some() {
            self.keyword = overrides.keyword;
        }
        if overrides.urls.is_some() {
            self.urls = overrides.urls;
        }
        if overrides.no_suggestions {
            self.expand_suggestions = false;
        }

        self
    }

    /// Returns the review language, falling back to `en`.
    pub fn effective_lang(&self) -> &str {
        non_empty(self.lang.as_deref()).unwrap_or(DEFAULT_LANG)
    }
}

/// Values taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub lang: Option<String>,
    pub country: Option<String>,
    pub result_dir: Option<PathBuf>,
    pub proxy: Option<String>,
    pub google_url: Option<String>,
    pub apple_url: Option<String>,
    pub google_sort: Option<SortOrder>,
    pub keyword: Option<String>,
    pub urls: Option<String>,
    pub no_suggestions: bool,
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Treats blank strings the same as absent ones.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Google Play review sort order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    MostRelevant,
    Newest,
    Rating,
}

impl SortOrder {
    /// Returns the numeric code the review RPC expects.
    pub fn code(&self) -> u8 {
        match self {
            SortOrder::MostRelevant => 1,
            SortOrder::Newest => 2,
            SortOrder::Rating => 3,
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "most_relevant" | "relevant" => Ok(SortOrder::MostRelevant),
            "newest" => Ok(SortOrder::Newest),
            "rating" => Ok(SortOrder::Rating),
            _ => Err(format!("Unknown sort order: {}. Use: most-relevant, newest, rating", s)),
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::MostRelevant => write!(f, "most-relevant"),
            SortOrder::Newest => write!(f, "newest"),
            SortOrder::Rating => write!(f, "rating"),
        }
    }
}
