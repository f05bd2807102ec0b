//! App Store fetch-and-write.

use crate::apple::{AppStore, AppStoreClient, AppleReview, AppleReviewRow};
use crate::config::Config;
use crate::error::{ReviewError, ReviewResult};
use crate::format::{self, OutputFile};
use crate::target::Target;
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Fetches App Store reviews for an app and writes the projected rows to CSV.
pub struct AppleCommand {
    config: Config,
}

impl AppleCommand {
    /// Creates a new App Store command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs against the live store.
    pub async fn execute(&self, target: &Target) -> ReviewResult<OutputFile> {
        let client = AppStoreClient::new(&self.config).map_err(ReviewError::upstream)?;
        self.execute_with_client(&client, target).await
    }

    /// Runs with a provided client (for testing).
    pub async fn execute_with_client(
        &self,
        client: &impl AppStore,
        target: &Target,
    ) -> ReviewResult<OutputFile> {
        let reviews = self.fetch_all(client, target).await.map_err(ReviewError::upstream)?;
        let rows: Vec<AppleReviewRow> = reviews.iter().map(AppleReview::to_row).collect();

        format::write_reviews(&self.config.result_dir, target, &rows)
    }

    /// Walks the review feed until an empty page or the page limit.
    pub async fn fetch_all(
        &self,
        client: &impl AppStore,
        target: &Target,
    ) -> Result<Vec<AppleReview>> {
        let app_id = self.resolve_app_id(client, target).await?;
        let mut all_reviews: Vec<AppleReview> = Vec::new();

        for page in 1..=self.config.apple_max_pages {
            let reviews = client.reviews(app_id, &target.country, &target.lang, page).await?;

            if reviews.is_empty() {
                debug!("No reviews on page {}, stopping", page);
                break;
            }

            debug!("Page {} returned {} reviews", page, reviews.len());
            all_reviews.extend(reviews);
        }

        info!("Fetched {} App Store reviews for {}", all_reviews.len(), target.identifier);
        Ok(all_reviews)
    }

    async fn resolve_app_id(&self, client: &impl AppStore, target: &Target) -> Result<u64> {
        if let Some(id) = target.app_id {
            return Ok(id);
        }

        let term = search_term(&target.identifier);
        client
            .lookup_id(&term, &target.country)
            .await?
            .with_context(|| format!("No App Store app found for '{}'", term))
    }
}

/// Turns a URL slug (possibly percent-encoded) into a search phrase.
fn search_term(identifier: &str) -> String {
    let decoded = urlencoding::decode(identifier)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| identifier.to_string());
    decoded.replace('-', " ")
}
