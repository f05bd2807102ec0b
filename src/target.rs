//! Store URL parsing and the per-marketplace target descriptor.

use crate::config::{non_empty, Config, DEFAULT_COUNTRY, DEFAULT_LANG};
use crate::error::{ReviewError, ReviewResult};
use std::fmt;
use tracing::debug;

/// Prefix every supported Google Play link starts with.
pub const GOOGLE_DETAILS_PREFIX: &str = "https://play.google.com/store/apps/details?id=";

/// Host prefix of App Store links.
pub const APPLE_STORE_PREFIX: &str = "https://apps.apple.com";

/// Country whose App Store feed needs an encoded name and a CJK locale.
pub const CN_COUNTRY: &str = "cn";
pub const CN_LANG: &str = "zh-Hans-CN";

/// The two review sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marketplace {
    Google,
    Apple,
}

impl Marketplace {
    /// Returns the tag used in output file names.
    pub fn slug(&self) -> &'static str {
        match self {
            Marketplace::Google => "google",
            Marketplace::Apple => "apple",
        }
    }

    /// Returns the environment variable that configures this marketplace.
    pub fn env_key(&self) -> &'static str {
        match self {
            Marketplace::Google => crate::config::ENV_GOOGLE_URL,
            Marketplace::Apple => crate::config::ENV_APPLE_URL,
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marketplace::Google => write!(f, "Google Play"),
            Marketplace::Apple => write!(f, "App Store"),
        }
    }
}

/// Everything needed to fetch one app's reviews from one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub marketplace: Marketplace,
    /// Package name (Google) or URL slug (Apple)
    pub identifier: String,
    /// Numeric App Store id, when the URL carried one
    pub app_id: Option<u64>,
    pub country: String,
    pub lang: String,
}

impl Target {
    /// Creates a Google Play target.
    pub fn google(package: impl Into<String>, country: &str, lang: &str) -> Self {
        Self {
            marketplace: Marketplace::Google,
            identifier: package.into(),
            app_id: None,
            country: country.to_string(),
            lang: lang.to_string(),
        }
    }

    /// Creates an App Store target, applying the `cn` locale rules.
    pub fn apple(name: &str, app_id: Option<u64>, country: &str, lang: &str) -> Self {
        let (identifier, lang) = apple_locale(name, country, lang);
        Self {
            marketplace: Marketplace::Apple,
            identifier,
            app_id,
            country: country.to_string(),
            lang,
        }
    }
}

/// Result of reading a Google Play URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GooglePackage {
    /// A regular `a.b.c` package name
    Package(String),
    /// Anything else; tried as-is, then resolved through store search
    NeedsSearch(String),
}

impl GooglePackage {
    /// Returns the id exactly as the URL carried it.
    pub fn as_str(&self) -> &str {
        match self {
            GooglePackage::Package(id) | GooglePackage::NeedsSearch(id) => id,
        }
    }
}

/// Extracts the package id from a Play Store details URL.
pub fn parse_google_url(url: &str) -> ReviewResult<GooglePackage> {
    let url = url.trim();
    let start = url
        .find(GOOGLE_DETAILS_PREFIX)
        .ok_or_else(|| ReviewError::invalid_url(url, "not a Google Play details link"))?;

    let id = url[start + GOOGLE_DETAILS_PREFIX.len()..]
        .split(['&', '#'])
        .next()
        .unwrap_or_default()
        .trim();

    if id.is_empty() {
        return Err(ReviewError::invalid_url(url, "missing package id"));
    }

    if is_standard_package(id) {
        Ok(GooglePackage::Package(id.to_string()))
    } else {
        Ok(GooglePackage::NeedsSearch(id.to_string()))
    }
}

/// Returns true for ids shaped like `com.vendor.app`.
pub fn is_standard_package(id: &str) -> bool {
    let segments: Vec<&str> = id.split('.').collect();
    segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
}

/// Result of reading an App Store URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppleApp {
    pub name: String,
    pub app_id: Option<u64>,
}

/// Extracts the app slug (and numeric id if present) from an App Store URL.
pub fn parse_apple_url(url: &str) -> ReviewResult<AppleApp> {
    let url = url.trim();
    let start = url
        .find(APPLE_STORE_PREFIX)
        .ok_or_else(|| ReviewError::invalid_url(url, "not an App Store link"))?;

    let path = url[start + APPLE_STORE_PREFIX.len()..]
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');

    let segments: Vec<&str> = path.split('/').skip(1).collect();
    if segments.len() < 2 {
        return Err(ReviewError::invalid_url(url, "missing app name"));
    }

    let name = segments[segments.len() - 2];
    if name.is_empty() {
        return Err(ReviewError::invalid_url(url, "missing app name"));
    }

    let app_id = segments[segments.len() - 1].strip_prefix("id").and_then(|d| d.parse().ok());

    Ok(AppleApp { name: name.to_string(), app_id })
}

/// Collects App Store ids from a comma-separated list of app links.
///
/// Entries without an `/app/` path or an `id<digits>` last segment are
/// ignored; duplicates keep their first position.
pub fn app_ids_from_urls(list: &str) -> Vec<u64> {
    let mut ids: Vec<u64> = Vec::new();

    for url in list.split(',').map(str::trim).filter(|u| u.contains("/app/")) {
        let path = url.split(['?', '#']).next().unwrap_or_default().trim_end_matches('/');
        let id = path
            .rsplit('/')
            .next()
            .and_then(|last| last.strip_prefix("id"))
            .and_then(|digits| digits.parse::<u64>().ok());

        match id {
            Some(id) if !ids.contains(&id) => ids.push(id),
            Some(_) => {}
            None => debug!("No app id in '{}'", url),
        }
    }

    ids
}

/// Reads the storefront country from an App Store URL (`/us/app/...`).
pub fn country_from_apple_url(url: &str) -> Option<String> {
    let url = url.trim();
    let start = url.find(APPLE_STORE_PREFIX)? + APPLE_STORE_PREFIX.len();
    let first = url[start..].trim_start_matches('/').split(['/', '?', '#']).next()?;

    if first.len() == 2 && first.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(first.to_lowercase())
    } else {
        None
    }
}

/// Picks the country: explicit setting, then the App Store URL, then `us`.
pub fn resolve_country(config: &Config) -> String {
    if let Some(country) = non_empty(config.country.as_deref()) {
        return country.to_lowercase();
    }

    non_empty(config.apple_url.as_deref())
        .and_then(country_from_apple_url)
        .unwrap_or_else(|| DEFAULT_COUNTRY.to_string())
}

/// Applies the China storefront rules to an App Store name and language.
///
/// The `cn` feed only resolves percent-encoded names and answers in
/// `zh-Hans-CN`. Names already encoded in the URL are decoded first so they
/// are not encoded twice.
pub fn apple_locale(name: &str, country: &str, lang: &str) -> (String, String) {
    let lang = if lang.is_empty() { DEFAULT_LANG } else { lang };

    if !country.eq_ignore_ascii_case(CN_COUNTRY) {
        return (name.to_string(), lang.to_string());
    }

    let decoded =
        urlencoding::decode(name).map(|d| d.into_owned()).unwrap_or_else(|_| name.to_string());
    (urlencoding::encode(&decoded).into_owned(), CN_LANG.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_standard_package() {
        let parsed =
            parse_google_url("https://play.google.com/store/apps/details?id=com.twitter.android")
                .unwrap();
        assert_eq!(parsed, GooglePackage::Package("com.twitter.android".to_string()));
    }

    #[test]
    fn test_google_strips_extra_params() {
        let parsed = parse_google_url(
            "  https://play.google.com/store/apps/details?id=com.lemon.lvoverseas&hl=en&gl=US ",
        )
        .unwrap();
        assert_eq!(parsed.as_str(), "com.lemon.lvoverseas");
        assert!(matches!(parsed, GooglePackage::Package(_)));
    }

    #[test]
    fn test_google_non_standard_needs_search() {
        let parsed =
            parse_google_url("https://play.google.com/store/apps/details?id=com.whatsapp").unwrap();
        assert_eq!(parsed, GooglePackage::NeedsSearch("com.whatsapp".to_string()));

        let parsed = parse_google_url(
            "https://play.google.com/store/apps/details?id=com.google.android.youtube",
        )
        .unwrap();
        assert!(matches!(parsed, GooglePackage::NeedsSearch(_)));
    }

    #[test]
    fn test_google_invalid_urls() {
        let err = parse_google_url("https://example.com/app").unwrap_err();
        assert!(matches!(err, ReviewError::InvalidUrl { .. }));

        let err = parse_google_url("https://play.google.com/store/apps/details?id=&hl=en")
            .unwrap_err();
        assert!(err.to_string().contains("missing package id"));
    }

    #[test]
    fn test_is_standard_package() {
        assert!(is_standard_package("com.twitter.android"));
        assert!(!is_standard_package("com.twitter"));
        assert!(!is_standard_package("com..android"));
        assert!(!is_standard_package("a.b.c.d"));
    }

    #[test]
    fn test_apple_url_with_id() {
        let app = parse_apple_url("https://apps.apple.com/us/app/capcut-video-editor/id1500855883")
            .unwrap();
        assert_eq!(app.name, "capcut-video-editor");
        assert_eq!(app.app_id, Some(1500855883));
    }

    #[test]
    fn test_apple_url_strips_query() {
        let app = parse_apple_url(
            concat!(
                "https://apps.apple.com/cn/app/%E5%A6%99%E5%81%A5%E5%BA%B7/id841386224",
                "?l=ru&see-all=reviews"
            ),
        )
        .unwrap();
        assert_eq!(app.name, "%E5%A6%99%E5%81%A5%E5%BA%B7");
        assert_eq!(app.app_id, Some(841386224));
    }

    #[test]
    fn test_apple_url_trailing_slash() {
        let app = parse_apple_url("https://apps.apple.com/us/app/indycar/id606905722/").unwrap();
        assert_eq!(app.name, "indycar");
        assert_eq!(app.app_id, Some(606905722));
    }

    #[test]
    fn test_apple_url_without_numeric_id() {
        let app = parse_apple_url("https://apps.apple.com/us/app/indycar/reviews").unwrap();
        assert_eq!(app.name, "indycar");
        assert_eq!(app.app_id, None);
    }

    #[test]
    fn test_apple_invalid_urls() {
        assert!(matches!(
            parse_apple_url("https://play.google.com/store/apps/details?id=a.b.c"),
            Err(ReviewError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_apple_url("https://apps.apple.com/id606905722"),
            Err(ReviewError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_apple_url("https://apps.apple.com//id606905722"),
            Err(ReviewError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_app_ids_from_urls() {
        let list = "https://apps.apple.com/us/app/indycar/id606905722, \
                    https://apps.apple.com/cn/app/x/id841386224?l=ru&see-all=reviews,\
                    https://apps.apple.com/us/app/indycar/id606905722/,\
                    https://apps.apple.com/us/developer/acme/id123,\
                    https://apps.apple.com/us/app/no-id,\
                    ";

        assert_eq!(app_ids_from_urls(list), vec![606905722, 841386224]);
        assert!(app_ids_from_urls("").is_empty());
    }

    #[test]
    fn test_country_from_apple_url() {
        assert_eq!(
            country_from_apple_url("https://apps.apple.com/gb/app/indycar/id606905722").as_deref(),
            Some("gb")
        );
        assert_eq!(country_from_apple_url("https://apps.apple.com/app/indycar/id606905722"), None);
        assert_eq!(country_from_apple_url("https://example.com/us/app"), None);
    }

    #[test]
    fn test_resolve_country_precedence() {
        let mut config = Config::new();
        assert_eq!(resolve_country(&config), "us");

        config.apple_url = Some("https://apps.apple.com/jp/app/line/id443904275".to_string());
        assert_eq!(resolve_country(&config), "jp");

        config.country = Some("DE".to_string());
        assert_eq!(resolve_country(&config), "de");

        config.country = Some(String::new());
        assert_eq!(resolve_country(&config), "jp");
    }

    #[test]
    fn test_apple_locale_cn() {
        let (name, lang) = apple_locale("妙健康-健康管理平台", "cn", "en");
        assert_eq!(
            name,
            "%E5%A6%99%E5%81%A5%E5%BA%B7-%E5%81%A5%E5%BA%B7%E7%AE%A1%E7%90%86%E5%B9%B3%E5%8F%B0"
        );
        assert_eq!(lang, "zh-Hans-CN");

        // Already-encoded names come out the same
        let (again, _) = apple_locale(&name, "cn", "en");
        assert_eq!(again, name);
    }

    #[test]
    fn test_apple_locale_other_country() {
        let (name, lang) = apple_locale("capcut-video-editor", "us", "fr");
        assert_eq!(name, "capcut-video-editor");
        assert_eq!(lang, "fr");
    }

    #[test]
    fn test_target_constructors() {
        let target = Target::google("com.twitter.android", "us", "en");
        assert_eq!(target.marketplace, Marketplace::Google);
        assert_eq!(target.identifier, "com.twitter.android");

        let target = Target::apple("测试", Some(1), "cn", "en");
        assert_eq!(target.marketplace, Marketplace::Apple);
        assert_eq!(target.identifier, "%E6%B5%8B%E8%AF%95");
        assert_eq!(target.lang, "zh-Hans-CN");
        assert_eq!(target.app_id, Some(1));
    }

    #[test]
    fn test_marketplace_labels() {
        assert_eq!(Marketplace::Google.slug(), "google");
        assert_eq!(Marketplace::Apple.slug(), "apple");
        assert_eq!(Marketplace::Apple.env_key(), "apple_app_package_url");
        assert_eq!(Marketplace::Google.to_string(), "Google Play");
    }
}
