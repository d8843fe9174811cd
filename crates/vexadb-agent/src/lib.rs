//! Write front-end for VexaDB
//!
//! The IndexAgent is the authoritative write funnel: it validates and
//! transcodes incoming writes, applies admission control, tracks in-flight
//! rows per collection and dispatches to the index layer in direct or
//! proxy mode.

pub mod column_order;
pub mod counter;
pub mod index_agent;
pub mod rate_limiter;
pub mod write_request;

pub use column_order::{ColumnOrder, ColumnOrderMap};
pub use counter::{CollectionCounter, CollectionCounterMap};
pub use index_agent::IndexAgent;
pub use rate_limiter::RateLimiter;
pub use write_request::{RequestType, WriteRequest, WriteRequestBuilder};
