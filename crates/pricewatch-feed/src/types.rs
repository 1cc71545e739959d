use serde::{Deserialize, Serialize};

/// Body of `POST /api/fetch-multiple-competitor-data`.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub asins: &'a [String],
    /// Free-form tag the pricing service logs against the fetch.
    pub source: &'a str,
}

/// Response from the pricing service. Every field is optional; an empty
/// 2xx body counts as accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RefreshResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub error: Option<String>,
    /// Number of ASINs the service refreshed, when it reports one.
    pub processed: Option<u64>,
}

/// Outcome of [`crate::PricingServiceClient::refresh_asins`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub requested: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
}
