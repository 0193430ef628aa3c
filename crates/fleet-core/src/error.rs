//! Hand-rolled error enums. No `thiserror`/`anyhow` — each error carries just
//! enough context to log or return to an RPC caller, matching the teacher's
//! `CollectError`/`PgCollectError` idiom.

use std::fmt;

/// A `MonitorInfo` sample carried no usable host identity (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityError;

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sample has no host identity (hostname, ip, and name all empty)")
    }
}

impl std::error::Error for IdentityError {}

/// Failure writing to or reading from the historical store.
#[derive(Debug)]
pub enum StoreError {
    /// The underlying `sqlx` driver returned an error.
    Db(sqlx::Error),
    /// Pool/connection was never established (configuration error at boot).
    Unconfigured,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Db(e) => write!(f, "store error: {}", e),
            StoreError::Unconfigured => write!(f, "store error: no database connection configured"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Db(e)
    }
}

/// Failure validating or executing a query-engine request.
#[derive(Debug)]
pub enum QueryError {
    /// `t0 > t1` in a requested time range.
    InvalidTimeRange,
    Store(StoreError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidTimeRange => write!(f, "invalid time range: start is after end"),
            QueryError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<StoreError> for QueryError {
    fn from(e: StoreError) -> Self {
        QueryError::Store(e)
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(e: sqlx::Error) -> Self {
        QueryError::Store(StoreError::Db(e))
    }
}
