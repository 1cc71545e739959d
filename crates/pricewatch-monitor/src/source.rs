//! Where current prices come from.

use std::collections::HashSet;
use std::future::Future;

use pricewatch_core::SnapshotSource;
use pricewatch_db::{
    get_catalog_product, latest_own_listing_price, list_active_competitor_mappings,
    lowest_competitor_price,
};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::MonitorError;

/// One current price for one series of an ASIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceObservation {
    pub source: SnapshotSource,
    pub price: Decimal,
    pub currency: String,
    pub seller_sku: Option<String>,
    pub product_name: Option<String>,
}

/// Supplies the current prices of an ASIN: at most one own-listing price and
/// any number of competitor prices.
pub trait PriceSource: Sync {
    /// # Errors
    ///
    /// Returns [`MonitorError`] when no price can be determined for `asin`.
    /// Callers skip the ASIN.
    fn current_prices(
        &self,
        asin: &str,
    ) -> impl Future<Output = Result<Vec<PriceObservation>, MonitorError>> + Send;
}

/// Reads the latest prices written to the listing tables by the upstream
/// pricing ingester.
#[derive(Debug, Clone)]
pub struct ListingPriceSource {
    pool: PgPool,
}

impl ListingPriceSource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl PriceSource for ListingPriceSource {
    async fn current_prices(&self, asin: &str) -> Result<Vec<PriceObservation>, MonitorError> {
        let catalog = get_catalog_product(&self.pool, asin).await?;
        let own_listing = latest_own_listing_price(&self.pool, asin).await?;

        let seller_sku = own_listing
            .as_ref()
            .and_then(|row| row.seller_sku.clone())
            .or_else(|| catalog.as_ref().and_then(|c| c.seller_sku.clone()));

        let mappings =
            list_active_competitor_mappings(&self.pool, asin, seller_sku.as_deref()).await?;

        let product_name = catalog
            .as_ref()
            .and_then(|c| c.item_name.clone())
            .or_else(|| mappings.iter().find_map(|m| m.product_name.clone()));

        let mut observations = Vec::new();

        let catalog_price = catalog.as_ref().and_then(|c| {
            c.price
                .filter(|p| *p > Decimal::ZERO)
                .map(|p| (p, c.currency.clone()))
        });
        let own_price = own_listing
            .map(|row| (row.price, row.currency))
            .or(catalog_price);
        if let Some((price, currency)) = own_price {
            observations.push(PriceObservation {
                source: SnapshotSource::Own,
                price,
                currency,
                seller_sku: seller_sku.clone(),
                product_name: product_name.clone(),
            });
        }

        let mut seen_labels = HashSet::new();
        for mapping in &mappings {
            let label = mapping
                .competitor_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(mapping.competitor_asin.as_str())
                .to_string();
            if !seen_labels.insert(label.clone()) {
                continue;
            }
            if let Some(row) = lowest_competitor_price(&self.pool, &mapping.competitor_asin).await? {
                observations.push(PriceObservation {
                    source: SnapshotSource::Competitor(label),
                    price: row.price,
                    currency: row.currency,
                    seller_sku: seller_sku.clone(),
                    product_name: product_name.clone(),
                });
            }
        }

        // An ASIN known only from the competitor table is tracked on its own
        // competitor series.
        if observations.is_empty() {
            if let Some(row) = lowest_competitor_price(&self.pool, asin).await? {
                observations.push(PriceObservation {
                    source: SnapshotSource::Competitor(asin.to_string()),
                    price: row.price,
                    currency: row.currency,
                    seller_sku,
                    product_name,
                });
            }
        }

        if observations.is_empty() {
            return Err(MonitorError::NoObservations {
                asin: asin.to_string(),
            });
        }

        Ok(observations)
    }
}
