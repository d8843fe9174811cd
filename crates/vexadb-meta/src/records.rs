//! Flat row DTOs exchanged with the catalog store.
//!
//! The store never owns the domain objects; it reads and writes these
//! records and the service assembles `CollectionMeta` out of them.

use vexadb_common::error::{Error, Result};
use vexadb_common::types::{CollectionStatus, DataType, IndexType};

use crate::meta::{CollectionMeta, ColumnMeta, RepositoryMeta};

/// One row of the `collections` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionRecord {
    pub id: i64,
    pub name: String,
    pub uid: String,
    pub uuid: String,
    /// Forward column names joined by ','
    pub forward_columns: String,
    pub max_docs_per_segment: u64,
    pub revision: u32,
    pub status: i32,
    pub current: bool,
    pub readable: bool,
    pub writable: bool,
}

impl CollectionRecord {
    pub fn from_meta(meta: &CollectionMeta) -> Self {
        CollectionRecord {
            id: 0,
            name: meta.name.clone(),
            uid: meta.uid.clone(),
            uuid: meta.uuid.clone(),
            forward_columns: meta.forward_columns.join(","),
            max_docs_per_segment: meta.max_docs_per_segment,
            revision: meta.revision,
            status: meta.status as i32,
            current: meta.current,
            readable: meta.readable,
            writable: meta.writable,
        }
    }

    /// Build the column-less domain object; columns and repository rows are
    /// attached afterwards by the loader.
    pub fn into_meta(self) -> CollectionMeta {
        let forward_columns = if self.forward_columns.is_empty() {
            Vec::new()
        } else {
            self.forward_columns
                .split(',')
                .map(str::to_string)
                .collect()
        };
        CollectionMeta {
            name: self.name,
            uid: self.uid,
            uuid: self.uuid,
            revision: self.revision,
            status: CollectionStatus::from_i32(self.status),
            current: self.current,
            readable: self.readable,
            writable: self.writable,
            max_docs_per_segment: self.max_docs_per_segment,
            forward_columns,
            index_columns: Vec::new(),
            repository: None,
        }
    }
}

/// One row of the `columns` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnRecord {
    pub id: i64,
    pub collection_uid: String,
    pub collection_uuid: String,
    pub name: String,
    pub uid: String,
    pub dimension: u32,
    pub index_type: i32,
    pub data_type: i32,
    /// Extra parameters as a JSON array of pairs
    pub parameters: String,
}

impl ColumnRecord {
    pub fn from_meta(collection: &CollectionMeta, column: &ColumnMeta) -> Result<Self> {
        let parameters =
            serde_json::to_string(&column.parameters).map_err(|_| Error::SerializeError)?;
        Ok(ColumnRecord {
            id: 0,
            collection_uid: collection.uid.clone(),
            collection_uuid: collection.uuid.clone(),
            name: column.name.clone(),
            uid: column.uid.clone(),
            dimension: column.dimension,
            index_type: column.index_type as i32,
            data_type: column.data_type as i32,
            parameters,
        })
    }

    pub fn into_meta(self) -> Result<ColumnMeta> {
        let parameters = if self.parameters.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&self.parameters).map_err(|_| Error::DeserializeError)?
        };
        Ok(ColumnMeta {
            name: self.name,
            uid: self.uid,
            index_type: IndexType::from_i32(self.index_type),
            data_type: DataType::from_i32(self.data_type),
            dimension: self.dimension,
            parameters,
        })
    }
}

/// One row of the `repositories` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryRecord {
    pub id: i64,
    pub collection_uid: String,
    pub collection_uuid: String,
    pub name: String,
    pub connection_uri: String,
    pub user: String,
    pub password: String,
    pub table_name: String,
}

impl RepositoryRecord {
    pub fn from_meta(collection: &CollectionMeta, repository: &RepositoryMeta) -> Self {
        RepositoryRecord {
            id: 0,
            collection_uid: collection.uid.clone(),
            collection_uuid: collection.uuid.clone(),
            name: repository.name.clone(),
            connection_uri: repository.connection_uri.clone(),
            user: repository.user.clone(),
            password: repository.password.clone(),
            table_name: repository.table_name.clone(),
        }
    }

    pub fn into_meta(self) -> RepositoryMeta {
        RepositoryMeta {
            name: self.name,
            connection_uri: self.connection_uri,
            user: self.user,
            password: self.password,
            table_name: self.table_name,
        }
    }
}
