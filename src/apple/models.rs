//! Data models for App Store reviews, app details, and the batch exports.

use crate::format::{iso_millis, normalize_body, CsvRow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One App Store review as listed in the customer-review feed.
#[derive(Debug, Clone, PartialEq)]
pub struct AppleReview {
    pub user_name: String,
    pub review: String,
    /// Star rating (1-5)
    pub rating: u8,
    pub updated: Option<DateTime<Utc>>,
}

impl AppleReview {
    /// Projects the review to the three exported columns.
    pub fn to_row(&self) -> AppleReviewRow {
        AppleReviewRow {
            score: self.rating,
            user_name: self.user_name.clone(),
            review: normalize_body(&self.review),
        }
    }
}

/// CSV row written for the App Store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppleReviewRow {
    pub score: u8,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub review: String,
}

impl CsvRow for AppleReviewRow {
    const HEADERS: &'static [&'static str] = &["score", "userName", "review"];
}

/// App metadata from the iTunes search and lookup APIs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppDetails {
    #[serde(rename = "trackId")]
    pub app_id: u64,
    #[serde(rename = "trackName", default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "artworkUrl512", default)]
    pub icon: String,
    #[serde(rename = "trackViewUrl", default)]
    pub url: String,
    #[serde(default)]
    pub price: f64,
}

impl AppDetails {
    pub fn is_free(&self) -> bool {
        self.price <= 0.0
    }
}

/// One entry of the `app-details-*.json` export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppRecord {
    pub platform: &'static str,
    pub country: String,
    /// `top-free` or `top-paid`
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub appname: String,
    pub appid: u64,
    pub icon: String,
    pub link: String,
    /// Store description
    pub title: String,
    #[serde(rename = "updateAt")]
    pub update_at: String,
}

impl AppRecord {
    pub fn new(details: &AppDetails, country: &str, now: DateTime<Utc>) -> Self {
        Self {
            platform: "ios",
            country: country.to_string(),
            kind: if details.is_free() { "top-free" } else { "top-paid" },
            appname: details.title.clone(),
            appid: details.app_id,
            icon: details.icon.clone(),
            link: details.url.clone(),
            title: details.description.clone(),
            update_at: iso_millis(now),
        }
    }
}

/// One entry of the `<keyword>-app-reviews-*.json` export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordReview {
    pub appid: u64,
    pub appname: String,
    pub country: String,
    pub keyword: String,
    pub score: u8,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub date: Option<String>,
    pub review: String,
}

impl KeywordReview {
    pub fn new(app: &AppRecord, keyword: &str, review: &AppleReview) -> Self {
        Self {
            appid: app.appid,
            appname: app.appname.clone(),
            country: app.country.clone(),
            keyword: keyword.to_string(),
            score: review.rating,
            user_name: review.user_name.trim().to_string(),
            date: review.updated.map(iso_millis),
            review: normalize_body(&review.review).trim().to_string(),
        }
    }
}
