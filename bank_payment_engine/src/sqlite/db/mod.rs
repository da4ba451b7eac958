//! # SQLite database methods
//!
//! "Low-level" SQLite interactions, kept as free functions that take a `&mut SqliteConnection`. Callers obtain a
//! connection from a pool, or open a transaction and pass `&mut *tx`, so any combination of these calls can be made
//! atomic without the functions themselves knowing about it.
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod jobs;
pub mod orders;
pub mod payments;
pub mod transactions;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
