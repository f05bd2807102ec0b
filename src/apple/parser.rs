//! Decoders for the iTunes customer-review feed, search API, and search hints.

use crate::apple::models::{AppDetails, AppleReview};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Keys of a search-hints property list.
static PLIST_KEY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("dict > key").unwrap());

#[derive(Debug, Deserialize)]
struct FeedResponse {
    feed: Feed,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: OneOrMany<FeedEntry>,
}

/// The feed collapses a single entry into a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
struct Label {
    label: String,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Label,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    author: Option<Author>,
    content: Option<Label>,
    #[serde(rename = "im:rating")]
    rating: Option<Label>,
    updated: Option<Label>,
}

impl FeedEntry {
    /// Converts a feed entry; app metadata entries carry no rating and yield None.
    fn into_review(self) -> Option<AppleReview> {
        let rating = self.rating?.label.trim().parse::<u8>().ok()?;

        Some(AppleReview {
            user_name: self.author.map(|a| a.name.label).unwrap_or_default(),
            review: self.content.map(|l| l.label).unwrap_or_default(),
            rating: rating.min(5),
            updated: self.updated.and_then(|l| parse_feed_date(&l.label)),
        })
    }
}

fn parse_feed_date(label: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(label.trim()).ok().map(|d| d.with_timezone(&Utc))
}

/// Parses one page of the customer-review JSON feed.
pub fn parse_review_feed(body: &str) -> Result<Vec<AppleReview>> {
    let response: FeedResponse =
        serde_json::from_str(body).context("Malformed customer review feed")?;

    let reviews: Vec<AppleReview> = response
        .feed
        .entry
        .into_vec()
        .into_iter()
        .filter_map(|entry| {
            let review = entry.into_review();
            if review.is_none() {
                trace!("Skipping non-review feed entry");
            }
            review
        })
        .collect();

    debug!("Parsed {} reviews from feed page", reviews.len());
    Ok(reviews)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// Parses an iTunes search or lookup response into app details.
///
/// Results without a `trackId` (non-software hits) are dropped.
pub fn parse_search_response(body: &str) -> Result<Vec<AppDetails>> {
    let response: SearchResponse =
        serde_json::from_str(body).context("Malformed iTunes search response")?;

    let apps: Vec<AppDetails> = response
        .results
        .into_iter()
        .filter_map(|r| serde_json::from_value(r).ok())
        .collect();

    debug!("Search returned {} apps", apps.len());
    Ok(apps)
}

/// Extracts the suggested terms from a search-hints property list.
pub fn parse_suggestions(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let mut terms: Vec<String> = Vec::new();

    for key in document.select(&PLIST_KEY) {
        if key.text().collect::<String>().trim() != "term" {
            continue;
        }

        let value = key.next_siblings().find_map(ElementRef::wrap);
        if let Some(term) = value.map(|v| v.text().collect::<String>().trim().to_string()) {
            if !term.is_empty() && !terms.contains(&term) {
                terms.push(term);
            }
        }
    }

    debug!("Parsed {} search suggestions", terms.len());
    terms
}
