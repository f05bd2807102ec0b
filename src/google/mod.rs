//! Google Play modules for the review RPC client, parsing, and data models.

pub mod client;
pub mod models;
pub mod parser;

pub use client::{GooglePlay, GooglePlayClient};
pub use models::{GoogleReview, ReviewPage};
