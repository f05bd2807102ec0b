//! App Store modules for the iTunes client, feed parsing, and data models.

pub mod client;
pub mod models;
pub mod parser;

pub use client::{AppStore, AppStoreClient};
pub use models::{AppDetails, AppRecord, AppleReview, AppleReviewRow, KeywordReview};
