//! Schema catalog for VexaDB
//!
//! A versioned collection catalog persisted in a relational store with a
//! write-through in-memory cache. Collections are multi-revision: all
//! revisions of a name share a `uid`, each revision owns a unique `uuid`,
//! and exactly one enabled revision per name is `current` at a time.

pub mod agent;
pub mod cache;
pub mod meta;
pub mod records;
pub mod service;
pub mod sqlite;
pub mod store;

pub use agent::MetaAgent;
pub use meta::{CollectionMeta, CollectionParams, ColumnMeta, ColumnParams, RepositoryMeta};
pub use service::MetaService;
