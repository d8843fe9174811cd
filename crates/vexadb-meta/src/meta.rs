//! Catalog domain objects and schema-change rules.

use serde::{Deserialize, Serialize};

use vexadb_common::error::{Error, Result};
use vexadb_common::types::{CollectionStatus, DataType, IndexType};

/// Vector column schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnMeta {
    /// Column name, unique within the collection
    pub name: String,
    /// Column uid; regenerated when the column is renamed
    pub uid: String,
    pub index_type: IndexType,
    pub data_type: DataType,
    pub dimension: u32,
    /// Extra index parameters, order preserved
    pub parameters: Vec<(String, String)>,
}

/// External CDC source attached to a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryMeta {
    pub name: String,
    pub connection_uri: String,
    pub user: String,
    pub password: String,
    pub table_name: String,
}

/// One revision of a collection schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionMeta {
    pub name: String,
    /// Shared by every revision of this name
    pub uid: String,
    /// Unique per revision
    pub uuid: String,
    pub revision: u32,
    pub status: CollectionStatus,
    pub current: bool,
    pub readable: bool,
    pub writable: bool,
    /// 0 means unlimited
    pub max_docs_per_segment: u64,
    pub forward_columns: Vec<String>,
    pub index_columns: Vec<ColumnMeta>,
    pub repository: Option<RepositoryMeta>,
}

impl CollectionMeta {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::EmptyCollectionName);
        }
        if self.index_columns.is_empty() {
            return Err(Error::EmptyColumns);
        }
        for column in &self.index_columns {
            if column.name.is_empty() {
                return Err(Error::EmptyColumnName);
            }
            if column.dimension == 0 {
                return Err(Error::InvalidArgument);
            }
            if column.data_type == DataType::Undefined || !column.data_type.is_vector() {
                return Err(Error::InvalidDataType);
            }
            if column.index_type == IndexType::Undefined {
                return Err(Error::InvalidIndexType);
            }
        }
        if let Some(repository) = &self.repository {
            if repository.name.is_empty() {
                return Err(Error::EmptyRepositoryName);
            }
            if repository.table_name.is_empty() {
                return Err(Error::EmptyRepositoryTable);
            }
        }
        Ok(())
    }

    pub fn column_by_name(&self, name: &str) -> Option<&ColumnMeta> {
        self.index_columns.iter().find(|c| c.name == name)
    }

    pub fn serving(&self) -> bool {
        self.status == CollectionStatus::Serving
    }

    /// Name of the attached repository, empty when none.
    pub fn repository_name(&self) -> &str {
        self.repository.as_ref().map(|r| r.name.as_str()).unwrap_or("")
    }
}

/// Column definition supplied by create/update requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnParams {
    pub name: String,
    pub index_type: IndexType,
    pub data_type: DataType,
    pub dimension: u32,
    pub parameters: Vec<(String, String)>,
}

/// Collection definition supplied by create/update requests.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionParams {
    pub name: String,
    pub max_docs_per_segment: u64,
    pub forward_columns: Vec<String>,
    pub index_columns: Vec<ColumnParams>,
    pub repository: Option<RepositoryMeta>,
}

impl CollectionParams {
    /// Materialize revision 0 of a brand-new collection.
    pub fn into_new_collection(self) -> Result<CollectionMeta> {
        let meta = CollectionMeta {
            name: self.name,
            uid: new_id(),
            uuid: new_id(),
            revision: 0,
            status: CollectionStatus::Initialized,
            current: false,
            readable: false,
            writable: false,
            max_docs_per_segment: self.max_docs_per_segment,
            forward_columns: self.forward_columns,
            index_columns: self
                .index_columns
                .into_iter()
                .map(|c| ColumnMeta {
                    name: c.name,
                    uid: new_id(),
                    index_type: c.index_type,
                    data_type: c.data_type,
                    dimension: c.dimension,
                    parameters: c.parameters,
                })
                .collect(),
            repository: self.repository,
        };
        meta.validate()?;
        Ok(meta)
    }

    /// Merge this update onto the latest revision.
    ///
    /// Mutable: max_docs_per_segment, forward columns, repository fields,
    /// column parameters, column names (rename regenerates the column uid).
    /// Everything else is rejected with the matching `Update*Field` error.
    /// The caller bumps the revision and assigns the fresh uuid.
    pub fn merge_onto(&self, latest: &CollectionMeta) -> Result<CollectionMeta> {
        if self.index_columns.len() != latest.index_columns.len() {
            return Err(Error::MismatchedSchema);
        }
        match (&self.repository, &latest.repository) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::UpdateRepositoryTypeField);
            }
            _ => {}
        }

        let mut columns = Vec::with_capacity(self.index_columns.len());
        for (param, previous) in self.index_columns.iter().zip(&latest.index_columns) {
            if param.index_type != previous.index_type {
                return Err(Error::UpdateIndexTypeField);
            }
            if param.data_type != previous.data_type {
                return Err(Error::UpdateDataTypeField);
            }
            if param.dimension != previous.dimension {
                return Err(Error::UpdateDimensionField);
            }
            let renamed = param.name != previous.name;
            if renamed
                && latest
                    .index_columns
                    .iter()
                    .any(|other| other.name == param.name)
            {
                // renaming onto a sibling column is not a rename
                return Err(Error::UpdateColumnNameField);
            }
            columns.push(ColumnMeta {
                name: param.name.clone(),
                uid: if renamed { new_id() } else { previous.uid.clone() },
                index_type: previous.index_type,
                data_type: previous.data_type,
                dimension: previous.dimension,
                parameters: param.parameters.clone(),
            });
        }

        let merged = CollectionMeta {
            name: latest.name.clone(),
            uid: latest.uid.clone(),
            uuid: latest.uuid.clone(),
            revision: latest.revision,
            status: latest.status,
            current: latest.current,
            readable: latest.readable,
            writable: latest.writable,
            max_docs_per_segment: self.max_docs_per_segment,
            forward_columns: self.forward_columns.clone(),
            index_columns: columns,
            repository: self.repository.clone(),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Generate a catalog identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
