//! Read-only queries over the listing, catalog, and competitor-mapping tables.
//!
//! These tables are written by the upstream pricing ingester and the admin
//! catalog; the monitoring engine never mutates them.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// One distinct ASIN across all listing sources.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TrackedAsinRow {
    pub asin: String,
    /// The lowest seller SKU seen for the ASIN in the own-listing or catalog
    /// tables. `None` for competitor-only ASINs.
    pub seller_sku: Option<String>,
    /// Every distinct seller SKU the ASIN is listed under, sorted.
    pub seller_skus: Vec<String>,
}

/// A single positive price pulled from a listing table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ListingPriceRow {
    pub price: Decimal,
    pub currency: String,
    pub seller_sku: Option<String>,
}

/// A row from `amzn_product_list`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogProductRow {
    pub id: i64,
    pub asin: String,
    pub seller_sku: Option<String>,
    pub item_name: Option<String>,
    /// List price. `NULL` or zero for items without one.
    pub price: Option<Decimal>,
    pub currency: String,
}

/// A row from `competitor_product_mappings`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompetitorMappingRow {
    pub id: i64,
    pub our_seller_sku: String,
    pub our_asin: Option<String>,
    pub competitor_asin: String,
    pub competitor_name: Option<String>,
    pub product_name: Option<String>,
    pub mapping_priority: i32,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Returns every distinct, non-blank ASIN in the own-listing, competitor, and
/// catalog tables, ordered by ASIN.
///
/// A competitor-table ASIN that is the `competitor_asin` of an active mapping
/// is already priced as a competitor series of the product it maps to, so it
/// is only returned when it also appears in the own-listing or catalog table.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tracked_asins(pool: &PgPool) -> Result<Vec<TrackedAsinRow>, DbError> {
    let rows = sqlx::query_as::<_, TrackedAsinRow>(
        "SELECT asin, \
                MIN(seller_sku) AS seller_sku, \
                COALESCE( \
                    ARRAY_AGG(DISTINCT seller_sku ORDER BY seller_sku) \
                        FILTER (WHERE seller_sku IS NOT NULL), \
                    '{}'::text[] \
                ) AS seller_skus \
         FROM ( \
             SELECT BTRIM(asin) AS asin, seller_sku \
             FROM amzn_competitive_pricing_main \
             WHERE asin IS NOT NULL AND BTRIM(asin) <> '' \
             UNION ALL \
             SELECT BTRIM(c.asin), NULL::text \
             FROM amzn_competitive_pricing_competitors c \
             WHERE c.asin IS NOT NULL AND BTRIM(c.asin) <> '' \
               AND NOT EXISTS ( \
                   SELECT 1 FROM competitor_product_mappings m \
                   WHERE m.is_active AND BTRIM(m.competitor_asin) = BTRIM(c.asin) \
               ) \
             UNION ALL \
             SELECT BTRIM(asin1), seller_sku \
             FROM amzn_product_list \
             WHERE asin1 IS NOT NULL AND BTRIM(asin1) <> '' \
         ) sources \
         GROUP BY asin \
         ORDER BY asin",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

/// Newest positive price recorded for our own listing of `asin`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_own_listing_price(
    pool: &PgPool,
    asin: &str,
) -> Result<Option<ListingPriceRow>, DbError> {
    let row = sqlx::query_as::<_, ListingPriceRow>(
        "SELECT p.price_amount AS price, p.price_currency AS currency, m.seller_sku \
         FROM amzn_competitive_prices p \
         JOIN amzn_competitive_pricing_main m ON m.id = p.pricing_main_id \
         WHERE BTRIM(m.asin) = $1 AND p.price_amount > 0 \
         ORDER BY p.created_at DESC, p.id DESC \
         LIMIT 1",
    )
    .bind(asin)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Lowest positive price in the most recent competitor fetch for `asin`.
///
/// The most recent fetch is the newest competitor pricing row that carries at
/// least one positive price; older fetches are ignored so a stale low offer
/// does not mask the current one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn lowest_competitor_price(
    pool: &PgPool,
    asin: &str,
) -> Result<Option<ListingPriceRow>, DbError> {
    let row = sqlx::query_as::<_, ListingPriceRow>(
        "WITH latest AS ( \
             SELECT c.id \
             FROM amzn_competitive_pricing_competitors c \
             WHERE BTRIM(c.asin) = $1 \
               AND EXISTS ( \
                   SELECT 1 FROM amzn_competitor_competitive_prices p \
                   WHERE p.competitor_pricing_id = c.id AND p.price_amount > 0 \
               ) \
             ORDER BY c.created_at DESC, c.id DESC \
             LIMIT 1 \
         ) \
         SELECT p.price_amount AS price, p.price_currency AS currency, NULL::text AS seller_sku \
         FROM amzn_competitor_competitive_prices p \
         JOIN latest ON latest.id = p.competitor_pricing_id \
         WHERE p.price_amount > 0 \
         ORDER BY p.price_amount ASC, p.id ASC \
         LIMIT 1",
    )
    .bind(asin)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// Catalog and mappings
// ---------------------------------------------------------------------------

/// Fetches the catalog entry for `asin`, preferring one with a list price.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_catalog_product(
    pool: &PgPool,
    asin: &str,
) -> Result<Option<CatalogProductRow>, DbError> {
    let row = sqlx::query_as::<_, CatalogProductRow>(
        "SELECT id, BTRIM(asin1) AS asin, seller_sku, item_name, price, currency \
         FROM amzn_product_list \
         WHERE BTRIM(asin1) = $1 \
         ORDER BY (price IS NOT NULL AND price > 0) DESC, id DESC \
         LIMIT 1",
    )
    .bind(asin)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns active competitor mappings for one of our products, matched by our
/// ASIN or by our seller SKU, in priority order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_competitor_mappings(
    pool: &PgPool,
    our_asin: &str,
    our_seller_sku: Option<&str>,
) -> Result<Vec<CompetitorMappingRow>, DbError> {
    let rows = sqlx::query_as::<_, CompetitorMappingRow>(
        "SELECT id, our_seller_sku, our_asin, competitor_asin, competitor_name, \
                product_name, mapping_priority \
         FROM competitor_product_mappings \
         WHERE is_active \
           AND (our_asin = $1 OR our_seller_sku = $2) \
         ORDER BY mapping_priority ASC, id ASC",
    )
    .bind(our_asin)
    .bind(our_seller_sku)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
