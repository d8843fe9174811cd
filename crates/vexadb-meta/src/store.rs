//! Persistent store contract for the catalog.

use vexadb_common::error::Result;

use crate::records::{CollectionRecord, ColumnRecord, RepositoryRecord};

/// Durable CRUD over collections, columns and repositories.
///
/// `list_*` drives a caller-provided visitor per row so the store never
/// owns the domain representation. Implementations are safe to call again
/// after a failed statement; initialization failures are fatal to the meta
/// subsystem.
pub trait MetaStore: Send + Sync {
    fn create_collection(&self, collection: &CollectionRecord) -> Result<()>;

    /// Update the row identified by `collection.uuid`.
    fn update_collection(&self, collection: &CollectionRecord) -> Result<()>;

    /// Delete every revision of a name.
    fn delete_collection(&self, name: &str) -> Result<()>;

    fn delete_collection_by_uuid(&self, uuid: &str) -> Result<()>;

    fn list_collections(&self, visitor: &mut dyn FnMut(CollectionRecord)) -> Result<()>;

    fn create_column(&self, column: &ColumnRecord) -> Result<()>;

    fn delete_columns_by_uid(&self, collection_uid: &str) -> Result<()>;

    fn delete_columns_by_uuid(&self, collection_uuid: &str) -> Result<()>;

    fn list_columns(&self, visitor: &mut dyn FnMut(ColumnRecord)) -> Result<()>;

    fn create_repository(&self, repository: &RepositoryRecord) -> Result<()>;

    fn delete_repositories_by_uid(&self, collection_uid: &str) -> Result<()>;

    fn delete_repositories_by_uuid(&self, collection_uuid: &str) -> Result<()>;

    fn list_repositories(&self, visitor: &mut dyn FnMut(RepositoryRecord)) -> Result<()>;

    fn flush(&self) -> Result<()>;
}
