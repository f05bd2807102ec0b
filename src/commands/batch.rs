//! App Store batch export: keywords and link lists to app details and reviews.

use crate::apple::{AppRecord, AppStore, AppStoreClient, KeywordReview};
use crate::commands::apple::AppleCommand;
use crate::config::{non_empty, Config, ENV_KEYWORD, ENV_URLS};
use crate::error::{ReviewError, ReviewResult};
use crate::format;
use crate::target::{self, Target};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// File-name label for review exports driven only by links.
const URLS_LABEL: &str = "urls";

/// Files and counts produced by a batch export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub apps: usize,
    pub reviews: usize,
    pub details_file: PathBuf,
    pub reviews_file: PathBuf,
}

/// Collects App Store ids from keywords and links, then exports details and reviews.
pub struct BatchCommand {
    config: Config,
}

impl BatchCommand {
    /// Creates a new batch command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs against the live store.
    pub async fn execute(&self) -> ReviewResult<BatchReport> {
        let client = AppStoreClient::new(&self.config).map_err(ReviewError::upstream)?;
        self.execute_with_client(&client, Utc::now()).await
    }

    /// Runs with a provided client and clock (for testing).
    pub async fn execute_with_client(
        &self,
        client: &impl AppStore,
        now: DateTime<Utc>,
    ) -> ReviewResult<BatchReport> {
        let keyword = non_empty(self.config.keyword.as_deref());
        let urls = non_empty(self.config.urls.as_deref());
        if keyword.is_none() && urls.is_none() {
            return Err(ReviewError::MissingConfig("KEYWORD or URLS"));
        }

        let country = target::resolve_country(&self.config);

        let mut ids = match keyword {
            Some(keyword) => {
                let keywords = self.expand_keywords(client, keyword).await;
                ids_from_keywords(client, &keywords, &country).await
            }
            None => Vec::new(),
        };
        info!("Found {} app ids from keywords", ids.len());

        let linked = urls.map(target::app_ids_from_urls).unwrap_or_default();
        info!("Found {} app ids from links", linked.len());
        push_unique(&mut ids, linked);

        if ids.is_empty() {
            return Err(ReviewError::Upstream(format!(
                "No apps found for {}='{}' {}='{}'",
                ENV_KEYWORD,
                keyword.unwrap_or_default(),
                ENV_URLS,
                urls.unwrap_or_default()
            )));
        }

        let apps = self.collect_details(client, &ids, &country, now).await;
        let stamp = format::file_stamp(now);
        let details_file = format::write_json(
            &self.config.result_dir,
            &format!("app-details-{}.json", stamp),
            &apps,
        )?;

        let label = keyword.unwrap_or(URLS_LABEL);
        let reviews = self.collect_reviews(client, &apps, label).await;
        let reviews_file = format::write_json(
            &self.config.result_dir,
            &format!("{}-app-reviews-{}.json", label, stamp),
            &reviews,
        )?;

        Ok(BatchReport { apps: apps.len(), reviews: reviews.len(), details_file, reviews_file })
    }

    /// Splits the keyword list and appends one round of store suggestions.
    pub async fn expand_keywords(&self, client: &impl AppStore, keyword: &str) -> Vec<String> {
        let mut keywords: Vec<String> = Vec::new();
        let base: Vec<String> = keyword
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        push_unique(&mut keywords, base.clone());

        if self.config.expand_suggestions {
            for term in &base {
                match client.suggest(term).await {
                    Ok(suggestions) => push_unique(&mut keywords, suggestions),
                    Err(e) => warn!("No suggestions for '{}': {:#}", term, e),
                }
            }
        }

        debug!("Keywords: {:?}", keywords);
        keywords
    }

    async fn collect_details(
        &self,
        client: &impl AppStore,
        ids: &[u64],
        country: &str,
        now: DateTime<Utc>,
    ) -> Vec<AppRecord> {
        let mut apps = Vec::new();

        for &id in ids {
            match client.app_details(id, country).await {
                Ok(Some(details)) => apps.push(AppRecord::new(&details, country, now)),
                Ok(None) => warn!("No App Store details for id{}", id),
                Err(e) => warn!("Failed to fetch details for id{}: {:#}", id, e),
            }
        }

        apps
    }

    async fn collect_reviews(
        &self,
        client: &impl AppStore,
        apps: &[AppRecord],
        keyword: &str,
    ) -> Vec<KeywordReview> {
        let command = AppleCommand::new(self.config.clone());
        let mut rows = Vec::new();

        for app in apps {
            let target = Target::apple(
                &app.appname,
                Some(app.appid),
                &app.country,
                self.config.effective_lang(),
            );

            match command.fetch_all(client, &target).await {
                Ok(reviews) => {
                    rows.extend(reviews.iter().map(|r| KeywordReview::new(app, keyword, r)));
                }
                Err(e) => warn!("Failed to fetch reviews for id{}: {:#}", app.appid, e),
            }
        }

        rows
    }
}

/// Searches every keyword and returns the distinct ids in first-seen order.
async fn ids_from_keywords(
    client: &impl AppStore,
    keywords: &[String],
    country: &str,
) -> Vec<u64> {
    let mut ids = Vec::new();

    for keyword in keywords {
        match client.search_ids(keyword, country).await {
            Ok(found) => push_unique(&mut ids, found),
            Err(e) => warn!("Search failed for '{}': {:#}", keyword, e),
        }
    }

    ids
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, more: impl IntoIterator<Item = T>) {
    for item in more {
        if !items.contains(&item) {
            items.push(item);
        }
    }
}
