pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use client::{PricingServiceClient, MAX_ASINS_PER_REQUEST};
pub use error::FeedError;
pub use types::{RefreshRequest, RefreshResponse, RefreshSummary};
