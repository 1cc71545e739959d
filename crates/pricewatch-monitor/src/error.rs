use pricewatch_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("no current price available for {asin}")]
    NoObservations { asin: String },

    #[error("corrupt row {id} in {table}: {reason}")]
    CorruptRow {
        table: &'static str,
        id: i64,
        reason: String,
    },

    #[error("price source failed for {asin}: {reason}")]
    Source { asin: String, reason: String },
}
