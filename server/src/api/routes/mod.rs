//! API route handlers

pub mod health;
pub mod pipelines;
pub mod traces;
pub mod trending;

use sqlx::PgPool;

/// Shared state for the query endpoints.
#[derive(Clone)]
pub struct QueryState {
    pub pool: PgPool,
}
