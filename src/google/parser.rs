//! Decoders for Play Store review RPC responses and search pages.

use crate::google::models::{GoogleReview, ReviewPage};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, trace, warn};

/// RPC id of the review list call.
pub const REVIEWS_RPC_ID: &str = "UsvDTd";

/// Anti-JSON-hijacking prefix on every batchexecute response.
const XSSI_PREFIX: &str = ")]}'";

/// Links to app detail pages on a search results page.
static APP_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='/store/apps/details?id=']").unwrap());

/// Parses a batchexecute body into a page of reviews.
pub fn parse_reviews_response(body: &str) -> Result<ReviewPage> {
    let json = body.trim_start();
    let json = json.strip_prefix(XSSI_PREFIX).unwrap_or(json).trim_start();

    let envelope: Value = serde_json::from_str(json).context("Malformed batchexecute response")?;

    let payload = envelope
        .as_array()
        .into_iter()
        .flatten()
        .find(|entry| {
            entry.get(0).and_then(Value::as_str) == Some("wrb.fr")
                && entry.get(1).and_then(Value::as_str) == Some(REVIEWS_RPC_ID)
        })
        .context("No review payload in response")?;

    // A null payload means the store rejected the request, usually an unknown package
    let inner = match payload.get(2).and_then(Value::as_str) {
        Some(inner) => inner,
        None => anyhow::bail!("Review RPC returned no data (unknown package?)"),
    };

    let data: Value = serde_json::from_str(inner).context("Malformed review payload")?;

    let mut page = ReviewPage::default();

    for raw in data.get(0).and_then(Value::as_array).into_iter().flatten() {
        match parse_review(raw) {
            Some(review) => page.reviews.push(review),
            None => warn!("Skipping review entry with unexpected shape"),
        }
    }

    page.next_token = data.as_array().and_then(|a| next_token(a));

    debug!("Parsed {} reviews (more: {})", page.reviews.len(), page.next_token.is_some());
    Ok(page)
}

/// Reads the continuation token from the pagination block.
///
/// Live responses put the block second to last (`[reviews, [null, token], ..]`
/// with trailing metadata); short payloads carry it right after the reviews.
fn next_token(data: &[Value]) -> Option<String> {
    let candidates = [data.len().checked_sub(2), Some(1)];
    candidates
        .into_iter()
        .flatten()
        .filter(|&i| i > 0)
        .filter_map(|i| data.get(i))
        .filter_map(Value::as_array)
        .find_map(|block| block.last().and_then(Value::as_str))
        .map(str::to_string)
}

/// Maps one positional review array to a review.
fn parse_review(raw: &Value) -> Option<GoogleReview> {
    let review_id = at(raw, &[0])?.as_str()?.to_string();
    trace!("Parsing review {}", review_id);

    Some(GoogleReview {
        review_id,
        user_name: text(raw, &[1, 0]).unwrap_or_default(),
        user_image: text(raw, &[1, 1, 3, 2]),
        content: text(raw, &[4]).unwrap_or_default(),
        score: at(raw, &[2]).and_then(Value::as_u64).unwrap_or(0).min(5) as u8,
        thumbs_up_count: at(raw, &[6]).and_then(Value::as_u64).unwrap_or(0),
        review_created_version: text(raw, &[10]),
        at: timestamp(raw, &[5, 0]),
        reply_content: text(raw, &[7, 1]),
        replied_at: timestamp(raw, &[7, 2, 0]),
        app_version: text(raw, &[10]),
    })
}

fn at<'a>(value: &'a Value, path: &[usize]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, &i| v.get(i)).filter(|v| !v.is_null())
}

fn text(value: &Value, path: &[usize]) -> Option<String> {
    at(value, path).and_then(Value::as_str).map(str::to_string)
}

fn timestamp(value: &Value, path: &[usize]) -> Option<DateTime<Utc>> {
    at(value, path).and_then(Value::as_i64).and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Extracts package ids from a Play Store search results page, in page order.
pub fn parse_search_results(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut ids: Vec<String> = Vec::new();

    for link in document.select(&APP_LINK) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };

        if let Some(id) = package_from_href(href) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    debug!("Search page listed {} apps", ids.len());
    ids
}

fn package_from_href(href: &str) -> Option<String> {
    let (_, query) = href.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("id="))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Wraps an inner payload the way batchexecute does.
    fn envelope(inner: &Value) -> String {
        let outer = json!([
            ["wrb.fr", REVIEWS_RPC_ID, inner.to_string(), null, null, null, "generic"],
            ["di", 42],
            ["af.httprm", 41, "-123", 7]
        ]);
        format!(")]}}'\n\n{}", outer)
    }

    fn raw_review(id: &str, score: u64, text: &str) -> Value {
        json!([
            id,
            ["Jane Doe", [null, 2, null, [null, null, "https://img/avatar.png"]]],
            score,
            null,
            text,
            [1_700_000_000, 0],
            3,
            [null, "Thanks for the feedback", [1_700_086_400, 0]],
            null,
            null,
            "10.1.0"
        ])
    }

    #[test]
    fn test_parse_reviews_with_token() {
        let inner = json!([
            [raw_review("gp:1", 5, "Love it"), raw_review("gp:2", 2, "Crashes")],
            [null, "NEXT_TOKEN"]
        ]);

        let page = parse_reviews_response(&envelope(&inner)).unwrap();
        assert_eq!(page.reviews.len(), 2);
        assert_eq!(page.next_token.as_deref(), Some("NEXT_TOKEN"));

        let first = &page.reviews[0];
        assert_eq!(first.review_id, "gp:1");
        assert_eq!(first.user_name, "Jane Doe");
        assert_eq!(first.user_image.as_deref(), Some("https://img/avatar.png"));
        assert_eq!(first.content, "Love it");
        assert_eq!(first.score, 5);
        assert_eq!(first.thumbs_up_count, 3);
        assert_eq!(first.app_version.as_deref(), Some("10.1.0"));
        assert_eq!(first.at, DateTime::from_timestamp(1_700_000_000, 0));
        assert_eq!(first.reply_content.as_deref(), Some("Thanks for the feedback"));
        assert_eq!(first.replied_at, DateTime::from_timestamp(1_700_086_400, 0));
    }

    #[test]
    fn test_parse_token_with_trailing_metadata() {
        let inner = json!([
            [raw_review("gp:1", 5, "Love it")],
            null,
            [null, "LIVE_TOKEN"],
            [[null, 1]]
        ]);

        let page = parse_reviews_response(&envelope(&inner)).unwrap();
        assert_eq!(page.reviews.len(), 1);
        assert_eq!(page.next_token.as_deref(), Some("LIVE_TOKEN"));
    }

    #[test]
    fn test_parse_token_never_read_from_review_list() {
        // Second-to-last element is the review list itself
        let inner = json!([[raw_review("gp:1", 5, "a"), raw_review("gp:2", 4, "b")], "meta"]);
        let page = parse_reviews_response(&envelope(&inner)).unwrap();
        assert_eq!(page.reviews.len(), 2);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn test_parse_last_page_has_no_token() {
        let inner = json!([[raw_review("gp:9", 4, "ok")], [null]]);
        let page = parse_reviews_response(&envelope(&inner)).unwrap();
        assert_eq!(page.reviews.len(), 1);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn test_parse_empty_review_list() {
        let inner = json!([null, null]);
        let page = parse_reviews_response(&envelope(&inner)).unwrap();
        assert!(page.reviews.is_empty());
        assert!(page.next_token.is_none());
    }

    #[test]
    fn test_parse_skips_malformed_entries() {
        let inner = json!([[raw_review("gp:1", 5, "fine"), [null, "no id"]], [null]]);
        let page = parse_reviews_response(&envelope(&inner)).unwrap();
        assert_eq!(page.reviews.len(), 1);
    }

    #[test]
    fn test_parse_null_payload_is_error() {
        let body = r#")]}'

[["wrb.fr","UsvDTd",null,null,null,[3],"generic"]]"#;
        let err = parse_reviews_response(body).unwrap_err();
        assert!(err.to_string().contains("no data"));
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(parse_reviews_response("<html>captcha</html>").is_err());
        assert!(parse_reviews_response(r#")]}' [["di",1]]"#).is_err());
    }

    #[test]
    fn test_parse_search_results() {
        let html = r#"
            <html><body>
                <a href="/store/apps/details?id=com.whatsapp&hl=en">WhatsApp</a>
                <a href="/store/apps/details?id=com.whatsapp">WhatsApp again</a>
                <a href="/store/apps/details?id=com.whatsapp.w4b">WhatsApp Business</a>
                <a href="/store/apps/dev?id=123">Developer</a>
            </body></html>
        "#;

        let ids = parse_search_results(html);
        assert_eq!(ids, vec!["com.whatsapp", "com.whatsapp.w4b"]);
    }

    #[test]
    fn test_parse_search_no_results() {
        assert!(parse_search_results("<html><body>No results</body></html>").is_empty());
    }
}
