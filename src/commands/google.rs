//! Google Play fetch-and-write.

use crate::config::{Config, DEFAULT_COUNTRY, DEFAULT_LANG};
use crate::error::{ReviewError, ReviewResult};
use crate::format::{self, OutputFile};
use crate::google::{GooglePlay, GooglePlayClient, GoogleReview};
use crate::target::Target;
use anyhow::Result;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Fetches every Google Play review for a package and writes them to CSV.
pub struct GoogleCommand {
    config: Config,
}

impl GoogleCommand {
    /// Creates a new Google Play command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs against the live store.
    pub async fn execute(&self, target: &Target) -> ReviewResult<OutputFile> {
        let client = GooglePlayClient::new(&self.config).map_err(ReviewError::upstream)?;
        self.execute_with_client(&client, target).await
    }

    /// Runs with a provided client (for testing).
    pub async fn execute_with_client(
        &self,
        client: &impl GooglePlay,
        target: &Target,
    ) -> ReviewResult<OutputFile> {
        let reviews = self.fetch_all(client, target).await.map_err(ReviewError::upstream)?;
        let rows: Vec<GoogleReview> = reviews.into_iter().map(GoogleReview::normalized).collect();

        format::write_reviews(&self.config.result_dir, target, &rows)
    }

    /// Pages through the review RPC until the store stops handing out tokens.
    pub async fn fetch_all(
        &self,
        client: &impl GooglePlay,
        target: &Target,
    ) -> Result<Vec<GoogleReview>> {
        let mut all_reviews: Vec<GoogleReview> = Vec::new();
        let mut token: Option<String> = None;
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut page = 1;

        loop {
            debug!("Fetching page {}", page);

            let result = client
                .reviews(
                    &target.identifier,
                    &target.lang,
                    &target.country,
                    self.config.google_sort,
                    token.as_deref(),
                )
                .await?;

            all_reviews.extend(result.reviews);

            match result.next_token {
                Some(next) if !seen_tokens.insert(next.clone()) => {
                    warn!("Store handed out continuation token '{}' again, stopping", next);
                    break;
                }
                Some(next) => token = Some(next),
                None => {
                    debug!("No more pages available");
                    break;
                }
            }

            page += 1;
        }

        info!("Fetched {} Google Play reviews for {}", all_reviews.len(), target.identifier);
        Ok(all_reviews)
    }
}

/// Searches the store for a package id and returns the top hit.
pub async fn search_package(client: &impl GooglePlay, query: &str) -> ReviewResult<String> {
    info!("Searching the store for '{}'", query);

    let hits = client
        .search(query, DEFAULT_LANG, DEFAULT_COUNTRY)
        .await
        .map_err(ReviewError::upstream)?;
    debug!("Search hits: {:?}", hits);

    hits.into_iter()
        .next()
        .ok_or_else(|| ReviewError::Upstream(format!("No Google Play app found for '{}'", query)))
}
