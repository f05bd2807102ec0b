//! app-reviews - Scrape Google Play and App Store reviews into CSV files
//!
//! Reads store URLs from the environment (or config/CLI), derives a target per
//! marketplace, pages through every review the store exposes and writes one
//! CSV per marketplace. A batch mode exports App Store details and reviews as
//! JSON for search keywords and lists of app links.

pub mod apple;
pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod google;
pub mod http;
pub mod target;

pub use commands::{app_reviews, Outcome, RunReport};
pub use config::Config;
pub use error::ReviewError;
pub use target::{Marketplace, Target};
