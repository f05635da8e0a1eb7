//! Query and write repositories for the spans hypertable
//!
//! Free functions over `&PgPool`, one module per concern. Every database
//! round trip carries its own deadline: reads are cheap and interactive,
//! writes are batched and allowed longer.

pub mod pipeline;
pub mod span;
pub mod trending;

use std::future::Future;
use std::time::Duration;

use super::PostgresError;
use crate::core::constants::{QUERY_READ_TIMEOUT_SECS, QUERY_WRITE_TIMEOUT_SECS};

/// Await a read query with the read deadline applied.
pub(crate) async fn read_deadline<T, F>(fut: F) -> Result<T, PostgresError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let deadline = Duration::from_secs(QUERY_READ_TIMEOUT_SECS);
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(PostgresError::Timeout(deadline)),
    }
}

/// Await a write query with the write deadline applied.
pub(crate) async fn write_deadline<T, F>(fut: F) -> Result<T, PostgresError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let deadline = Duration::from_secs(QUERY_WRITE_TIMEOUT_SECS);
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(PostgresError::Timeout(deadline)),
    }
}
