//! CLI command implementations.

pub mod apple;
pub mod batch;
pub mod google;
pub mod reviews;

pub use apple::AppleCommand;
pub use batch::{BatchCommand, BatchReport};
pub use google::GoogleCommand;
pub use reviews::{app_reviews, Outcome, ReviewsCommand, RunReport};
