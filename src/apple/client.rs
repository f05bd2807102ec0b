//! HTTP client for the iTunes search API and customer-review feed.

use crate::apple::models::{AppDetails, AppleReview};
use crate::apple::parser;
use crate::config::Config;
use crate::http;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};
use wreq::Client;
use wreq_util::Emulation;

const ITUNES_BASE: &str = "https://itunes.apple.com";
const HINTS_BASE: &str = "https://search.itunes.apple.com";
const HINTS_PATH: &str = "/WebObjects/MZSearchHints.woa/wa/hints";

/// Storefront header value the hints service expects (US store, software).
const HINTS_STORE_FRONT: &str = "143441-1,29";

/// Apps requested per keyword search.
pub const SEARCH_LIMIT: u32 = 50;

/// Trait for App Store operations - enables mocking for tests.
#[async_trait]
pub trait AppStore: Send + Sync {
    /// Looks up the numeric app id for a search term.
    async fn lookup_id(&self, term: &str, country: &str) -> Result<Option<u64>>;

    /// Searches the store and returns app ids in ranking order.
    async fn search_ids(&self, term: &str, country: &str) -> Result<Vec<u64>>;

    /// Returns the store's search suggestions for a term.
    async fn suggest(&self, term: &str) -> Result<Vec<String>>;

    /// Fetches app metadata by numeric id.
    async fn app_details(&self, app_id: u64, country: &str) -> Result<Option<AppDetails>>;

    /// Fetches one page (1-based) of the customer-review feed.
    async fn reviews(
        &self,
        app_id: u64,
        country: &str,
        lang: &str,
        page: u32,
    ) -> Result<Vec<AppleReview>>;
}

/// App Store HTTP client.
pub struct AppStoreClient {
    client: Client,
    delay_min_secs: u64,
    delay_max_secs: u64,
    base_url: String,
    hints_base_url: String,
}

impl AppStoreClient {
    /// Creates a new App Store client with the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut client = Self::with_base_url(config, ITUNES_BASE.to_string())?;
        client.hints_base_url = HINTS_BASE.to_string();
        Ok(client)
    }

    /// Creates a client against a custom base URL (for testing).
    ///
    /// Search hints are served from the same base.
    pub fn with_base_url(config: &Config, base_url: String) -> Result<Self> {
        let client = http::build_client(config.proxy.as_deref())?;

        Ok(Self {
            client,
            delay_min_secs: config.apple_delay_min_secs,
            delay_max_secs: config.apple_delay_max_secs.max(config.apple_delay_min_secs),
            hints_base_url: base_url.clone(),
            base_url,
        })
    }

    async fn search_apps(&self, term: &str, country: &str, limit: u32) -> Result<Vec<AppDetails>> {
        let url = format!(
            "{}/search?term={}&country={}&entity=software&limit={}",
            self.base_url,
            urlencoding::encode(term),
            urlencoding::encode(country),
            limit
        );

        let body = self.get(&url, "en").await?;
        parser::parse_search_response(&body)
    }

    async fn get(&self, url: &str, lang: &str) -> Result<String> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("Accept", "application/json")
            .header("Accept-Language", lang)
            .send()
            .await
            .context("Failed to send request")?;

        http::read_body(response, "App Store").await
    }

    /// Sleeps a random whole number of seconds between feed pages.
    async fn delay(&self) {
        if self.delay_max_secs == 0 {
            return;
        }

        let secs = rand::rng().random_range(self.delay_min_secs..=self.delay_max_secs);
        debug!("Delaying {}s", secs);
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }
}

#[async_trait]
impl AppStore for AppStoreClient {
    async fn lookup_id(&self, term: &str, country: &str) -> Result<Option<u64>> {
        info!("Looking up App Store id: {} ({})", term, country);
        let apps = self.search_apps(term, country, 1).await?;
        Ok(apps.first().map(|app| app.app_id))
    }

    async fn search_ids(&self, term: &str, country: &str) -> Result<Vec<u64>> {
        info!("Searching App Store: {} ({})", term, country);
        let apps = self.search_apps(term, country, SEARCH_LIMIT).await?;
        Ok(apps.into_iter().map(|app| app.app_id).collect())
    }

    async fn suggest(&self, term: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}{}?clientApplication=Software&term={}",
            self.hints_base_url,
            HINTS_PATH,
            urlencoding::encode(term)
        );

        info!("Fetching App Store suggestions: {}", term);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .emulation(Emulation::Chrome131)
            .header("X-Apple-Store-Front", HINTS_STORE_FRONT)
            .send()
            .await
            .context("Failed to send request")?;

        let body = http::read_body(response, "App Store").await?;
        Ok(parser::parse_suggestions(&body))
    }

    async fn app_details(&self, app_id: u64, country: &str) -> Result<Option<AppDetails>> {
        let url = format!(
            "{}/lookup?id={}&country={}&entity=software",
            self.base_url,
            app_id,
            urlencoding::encode(country)
        );

        info!("Fetching App Store details: id{} ({})", app_id, country);
        let body = self.get(&url, "en").await?;
        let apps = parser::parse_search_response(&body)
            .with_context(|| format!("Failed to decode details for id{}", app_id))?;
        Ok(apps.into_iter().find(|app| app.app_id == app_id))
    }

    async fn reviews(
        &self,
        app_id: u64,
        country: &str,
        lang: &str,
        page: u32,
    ) -> Result<Vec<AppleReview>> {
        if page > 1 {
            self.delay().await;
        }

        let url = format!(
            "{}/{}/rss/customerreviews/page={}/id={}/sortby=mostrecent/json",
            self.base_url,
            urlencoding::encode(country),
            page,
            app_id
        );

        info!("Fetching App Store reviews: id{} (page {})", app_id, page);
        let body = self.get(&url, lang).await?;
        parser::parse_review_feed(&body)
            .with_context(|| format!("Failed to decode review page {} for id{}", page, app_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_test_config() -> Config {
        Config { apple_delay_min_secs: 0, apple_delay_max_secs: 0, ..Config::default() }
    }

    #[tokio::test]
    async fn test_reviews_success() {
        let mock_server = MockServer::start().await;

        let feed = r#"{"feed": {"entry": [
            {"author": {"name": {"label": "alice"}}, "im:rating": {"label": "5"},
             "id": {"label": "1"}, "title": {"label": "t"}, "content": {"label": "Great"}}
        ]}}"#;

        Mock::given(method("GET"))
            .and(path("/us/rss/customerreviews/page=2/id=606905722/sortby=mostrecent/json"))
            .and(header("Accept-Language", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed))
            .mount(&mock_server)
            .await;

        let client =
            AppStoreClient::with_base_url(&make_test_config(), mock_server.uri()).unwrap();
        let reviews = client.reviews(606905722, "us", "en", 2).await.unwrap();

        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].user_name, "alice");
        assert_eq!(reviews[0].rating, 5);
    }

    #[tokio::test]
    async fn test_reviews_http_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client =
            AppStoreClient::with_base_url(&make_test_config(), mock_server.uri()).unwrap();
        let err = client.reviews(1, "us", "en", 1).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_lookup_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("term", "capcut video editor"))
            .and(query_param("country", "us"))
            .and(query_param("entity", "software"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"resultCount": 1, "results": [{"trackId": 1500855883}]}"#),
            )
            .mount(&mock_server)
            .await;

        let client =
            AppStoreClient::with_base_url(&make_test_config(), mock_server.uri()).unwrap();
        let id = client.lookup_id("capcut video editor", "us").await.unwrap();
        assert_eq!(id, Some(1500855883));
    }

    #[tokio::test]
    async fn test_search_ids() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("term", "bible"))
            .and(query_param("country", "gb"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"resultCount": 2, "results": [{"trackId": 11}, {"trackId": 22}]}"#,
            ))
            .mount(&mock_server)
            .await;

        let client =
            AppStoreClient::with_base_url(&make_test_config(), mock_server.uri()).unwrap();
        assert_eq!(client.search_ids("bible", "gb").await.unwrap(), vec![11, 22]);
    }

    #[tokio::test]
    async fn test_suggest() {
        let mock_server = MockServer::start().await;

        let plist = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0"><dict><key>hints</key><array>
<dict><key>term</key><string>bible app</string></dict>
<dict><key>term</key><string>bible audio</string></dict>
</array></dict></plist>"#;

        Mock::given(method("GET"))
            .and(path("/WebObjects/MZSearchHints.woa/wa/hints"))
            .and(query_param("clientApplication", "Software"))
            .and(query_param("term", "bible"))
            .and(header("X-Apple-Store-Front", "143441-1,29"))
            .respond_with(ResponseTemplate::new(200).set_body_string(plist))
            .mount(&mock_server)
            .await;

        let client =
            AppStoreClient::with_base_url(&make_test_config(), mock_server.uri()).unwrap();
        let terms = client.suggest("bible").await.unwrap();
        assert_eq!(terms, vec!["bible app", "bible audio"]);
    }

    #[tokio::test]
    async fn test_app_details() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/lookup"))
            .and(query_param("id", "606905722"))
            .and(query_param("country", "us"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"resultCount": 1, "results": [{"trackId": 606905722,
                    "trackName": "INDYCAR", "price": 0, "description": "Racing"}]}"#,
            ))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/lookup"))
            .and(query_param("id", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"resultCount": 0, "results": []}"#),
            )
            .mount(&mock_server)
            .await;

        let client =
            AppStoreClient::with_base_url(&make_test_config(), mock_server.uri()).unwrap();
        let details = client.app_details(606905722, "us").await.unwrap().unwrap();
        assert_eq!(details.title, "INDYCAR");
        assert_eq!(details.description, "Racing");
        assert!(details.is_free());

        assert!(client.app_details(1, "us").await.unwrap().is_none());
    }

    #[test]
    fn test_delay_bounds_are_ordered() {
        let config =
            Config { apple_delay_min_secs: 5, apple_delay_max_secs: 2, ..Config::default() };
        let client =
            AppStoreClient::with_base_url(&config, "http://localhost".to_string()).unwrap();
        assert_eq!(client.delay_min_secs, 5);
        assert_eq!(client.delay_max_secs, 5);
    }
}
