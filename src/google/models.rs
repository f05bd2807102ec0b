//! Data models for Google Play reviews.

use crate::format::{normalize_body, CsvRow};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// One Google Play review as returned by the review RPC.
///
/// Field names follow the Play Store's own record so the CSV header matches
/// what other Play scrapers emit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleReview {
    pub review_id: String,
    pub user_name: String,
    pub user_image: Option<String>,
    pub content: String,
    /// Star rating (1-5)
    pub score: u8,
    pub thumbs_up_count: u64,
    pub review_created_version: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub at: Option<DateTime<Utc>>,
    pub reply_content: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub replied_at: Option<DateTime<Utc>>,
    pub app_version: Option<String>,
}

impl GoogleReview {
    /// Returns the review with newline-free text fields.
    pub fn normalized(mut self) -> Self {
        self.content = normalize_body(&self.content);
        self.reply_content = self.reply_content.map(|r| normalize_body(&r));
        self
    }
}

impl CsvRow for GoogleReview {
    const HEADERS: &'static [&'static str] = &[
        "reviewId",
        "userName",
        "userImage",
        "content",
        "score",
        "thumbsUpCount",
        "reviewCreatedVersion",
        "at",
        "replyContent",
        "repliedAt",
        "appVersion",
    ];
}

/// One page of reviews plus the token for the next page.
#[derive(Debug, Clone, Default)]
pub struct ReviewPage {
    pub reviews: Vec<GoogleReview>,
    pub next_token: Option<String>,
}

fn serialize_timestamp<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(ts) => serializer.collect_str(&ts.format("%Y-%m-%d %H:%M:%S")),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_review() -> GoogleReview {
        GoogleReview {
            review_id: "gp:AOqpTOE".to_string(),
            user_name: "Jane Doe".to_string(),
            user_image: None,
            content: "Great app,\r\nworks offline".to_string(),
            score: 5,
            thumbs_up_count: 12,
            review_created_version: Some("10.1.0".to_string()),
            at: DateTime::from_timestamp(1_700_000_000, 0),
            reply_content: Some("Thanks!\nThe team".to_string()),
            replied_at: None,
            app_version: Some("10.1.0".to_string()),
        }
    }

    #[test]
    fn test_normalized_strips_newlines() {
        let review = make_review().normalized();
        assert_eq!(review.content, "Great app,  works offline");
        assert_eq!(review.reply_content.as_deref(), Some("Thanks! The team"));
    }

    #[test]
    fn test_csv_serialization() {
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(vec![]);
        wtr.serialize(make_review()).unwrap();
        let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();

        assert!(out.starts_with("gp:AOqpTOE,Jane Doe,,"));
        assert!(out.contains(",5,12,10.1.0,2023-11-14 22:13:20,"));
    }

    #[test]
    fn test_headers_match_field_count() {
        assert_eq!(GoogleReview::HEADERS.len(), 11);
        assert_eq!(GoogleReview::HEADERS[0], "reviewId");
    }
}
