//! HTTP client for the upstream pricing service that refreshes the listing
//! tables the monitoring engine reads.

use std::time::Duration;

use pricewatch_core::AppConfig;
use reqwest::Client;

use crate::error::FeedError;
use crate::retry::retry_with_backoff;
use crate::types::{RefreshRequest, RefreshResponse, RefreshSummary};

/// The pricing service accepts at most this many ASINs per request.
pub const MAX_ASINS_PER_REQUEST: usize = 20;

const REFRESH_PATH: &str = "/api/fetch-multiple-competitor-data";
const REFRESH_SOURCE: &str = "price_monitoring";

/// Client for `POST /api/fetch-multiple-competitor-data`.
///
/// 429 and network failures are retried with exponential backoff; other
/// non-2xx statuses and `{"success": false}` bodies fail the request.
pub struct PricingServiceClient {
    client: Client,
    refresh_url: String,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl PricingServiceClient {
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidBaseUrl`] if `base_url` is not an absolute
    /// URL, or [`FeedError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, FeedError> {
        let refresh_url = Self::refresh_url(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            refresh_url,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Builds a client from application config. Returns `Ok(None)` when no
    /// pricing service URL is configured.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_app_config(config: &AppConfig) -> Result<Option<Self>, FeedError> {
        config
            .pricing_service_url
            .as_deref()
            .map(|url| {
                Self::new(
                    url,
                    config.feed_request_timeout_secs,
                    &config.user_agent,
                    config.feed_max_retries,
                    config.feed_retry_backoff_base_secs,
                )
            })
            .transpose()
    }

    /// Asks the pricing service to refresh every ASIN in `asins`, in chunks of
    /// [`MAX_ASINS_PER_REQUEST`].
    ///
    /// A failed chunk is logged and counted; the remaining chunks are still
    /// sent.
    pub async fn refresh_asins(&self, asins: &[String]) -> RefreshSummary {
        let mut summary = RefreshSummary {
            requested: asins.len(),
            ..RefreshSummary::default()
        };

        for chunk in asins.chunks(MAX_ASINS_PER_REQUEST) {
            summary.chunks += 1;
            match self.refresh_chunk(chunk).await {
                Ok(response) => {
                    tracing::debug!(
                        asins = chunk.len(),
                        processed = ?response.processed,
                        "feed: pricing service refreshed chunk"
                    );
                }
                Err(e) => {
                    summary.failed_chunks += 1;
                    tracing::warn!(
                        asins = chunk.len(),
                        error = %e,
                        "feed: pricing service refresh failed for chunk"
                    );
                }
            }
        }

        summary
    }

    /// Sends one refresh request, retrying transient errors.
    ///
    /// # Errors
    ///
    /// - [`FeedError::RateLimited`]: HTTP 429 after all retries.
    /// - [`FeedError::Http`]: network failure after all retries.
    /// - [`FeedError::NotFound`]: HTTP 404 (not retried).
    /// - [`FeedError::UnexpectedStatus`]: any other non-2xx status.
    /// - [`FeedError::Deserialize`]: non-empty body that is not valid JSON.
    /// - [`FeedError::Rejected`]: body reports `"success": false`.
    pub async fn refresh_chunk(&self, asins: &[String]) -> Result<RefreshResponse, FeedError> {
        let request = &RefreshRequest {
            asins,
            source: REFRESH_SOURCE,
        };
        let client = &self.client;
        let refresh_url = self.refresh_url.as_str();

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || async move {
            let response = client
                .post(refresh_url)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(request)
                .send()
                .await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(FeedError::RateLimited { retry_after_secs });
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(FeedError::NotFound {
                    url: refresh_url.to_owned(),
                });
            }

            if !status.is_success() {
                return Err(FeedError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: refresh_url.to_owned(),
                });
            }

            let body = response.text().await?;
            let parsed = parse_refresh_body(&body)?;
            if parsed.success == Some(false) {
                return Err(FeedError::Rejected {
                    message: parsed
                        .error
                        .or(parsed.message)
                        .unwrap_or_else(|| "no reason given".to_owned()),
                });
            }
            Ok(parsed)
        })
        .await
    }

    fn refresh_url(base_url: &str) -> Result<String, FeedError> {
        let base = reqwest::Url::parse(base_url.trim()).map_err(|e| FeedError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(FeedError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: "URL cannot be used as a base".to_owned(),
            });
        }
        let trimmed = base.as_str().trim_end_matches('/');
        Ok(format!("{trimmed}{REFRESH_PATH}"))
    }
}

fn parse_refresh_body(body: &str) -> Result<RefreshResponse, FeedError> {
    if body.trim().is_empty() {
        return Ok(RefreshResponse::default());
    }
    serde_json::from_str::<RefreshResponse>(body).map_err(|e| FeedError::Deserialize {
        context: "pricing service refresh response".to_owned(),
        source: e,
    })
}
