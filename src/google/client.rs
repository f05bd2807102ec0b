//! HTTP client for Google Play review and search requests.

use crate::config::{Config, SortOrder};
use crate::google::models::ReviewPage;
use crate::google::parser::{self, REVIEWS_RPC_ID};
use crate::http;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use wreq::Client;
use wreq_util::Emulation;

const PLAY_STORE_BASE: &str = "https://play.google.com";

/// Most reviews the RPC hands back per request.
pub const MAX_REVIEWS_PER_PAGE: u32 = 199;

/// Trait for Google Play operations - enables mocking for tests.
#[async_trait]
pub trait GooglePlay: Send + Sync {
    /// Fetches one page of reviews; `token` continues a previous page.
    async fn reviews(
        &self,
        package: &str,
        lang: &str,
        country: &str,
        sort: SortOrder,
        token: Option<&str>,
    ) -> Result<ReviewPage>;

    /// Searches the store and returns package ids in ranking order.
    async fn search(&self, query: &str, lang: &str, country: &str) -> Result<Vec<String>>;
}

/// Google Play HTTP client.
pub struct GooglePlayClient {
    client: Client,
    delay_ms: u64,
    base_url: String,
}

impl GooglePlayClient {
    /// Creates a new Google Play client with the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(config, PLAY_STORE_BASE.to_string())
    }

    /// Creates a client against a custom base URL (for testing).
    pub fn with_base_url(config: &Config, base_url: String) -> Result<Self> {
        let client = http::build_client(config.proxy.as_deref())?;
        Ok(Self { client, delay_ms: config.google_delay_ms, base_url })
    }

    /// Builds the form body of a review RPC call.
    fn review_request_body(
        package: &str,
        sort: SortOrder,
        count: u32,
        token: Option<&str>,
    ) -> String {
        let token = token.map(Value::from).unwrap_or(Value::Null);
        let request =
            json!([null, null, [2, sort.code(), [count, null, token], null, []], [package, 7]]);
        let envelope = json!([[[REVIEWS_RPC_ID, request.to_string(), null, "generic"]]]);

        format!("f.req={}", urlencoding::encode(&envelope.to_string()))
    }

    async fn delay(&self) {
        if self.delay_ms > 0 {
            debug!("Delaying {}ms", self.delay_ms);
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }
}

#[async_trait]
impl GooglePlay for GooglePlayClient {
    async fn reviews(
        &self,
        package: &str,
        lang: &str,
        country: &str,
        sort: SortOrder,
        token: Option<&str>,
    ) -> Result<ReviewPage> {
        if token.is_some() {
            self.delay().await;
        }

        let url = format!(
            "{}/_/PlayStoreUi/data/batchexecute?hl={}&gl={}",
            self.base_url,
            urlencoding::encode(lang),
            urlencoding::encode(country)
        );
        let body = Self::review_request_body(package, sort, MAX_REVIEWS_PER_PAGE, token);

        info!("Fetching Google Play reviews: {} ({}-{})", package, lang, country);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .emulation(Emulation::Chrome131)
            .header("Content-Type", "application/x-www-form-urlencoded;charset=UTF-8")
            .body(body)
            .send()
            .await
            .context("Failed to send request")?;

        let text = http::read_body(response, "Google Play").await?;
        parser::parse_reviews_response(&text)
            .with_context(|| format!("Failed to decode reviews for {}", package))
    }

    async fn search(&self, query: &str, lang: &str, country: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/store/search?q={}&c=apps&hl={}&gl={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(lang),
            urlencoding::encode(country)
        );

        info!("Searching Google Play: {}", query);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .emulation(Emulation::Chrome131)
            .header("Accept-Language", lang)
            .send()
            .await
            .context("Failed to send request")?;

        let html = http::read_body(response, "Google Play").await?;
        Ok(parser::parse_search_results(&html))
    }
}
