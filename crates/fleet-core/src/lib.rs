//! Core ingest-and-scoring pipeline for the host fleet telemetry service:
//! Shard Router/Workers, the Live Directory and its Staleness Sweeper, the
//! Historical Store Adapter, and the Query Engine. Wire-level conversions
//! (`fleet_proto` <-> these types) live in `fleet-manager`, not here.

pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod model;
pub mod query;
pub mod queue;
pub mod rates;
pub mod router;
pub mod scorer;
pub mod shard;
pub mod store;
pub mod sweeper;

pub use directory::LiveDirectory;
pub use error::{IdentityError, QueryError, StoreError};
pub use query::QueryEngine;
pub use store::HistoricalStore;
