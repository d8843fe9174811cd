//! Index layer contract for VexaDB
//!
//! The per-collection segmented ANN store is an external collaborator with
//! the narrow contract below. The crate ships a linear-scan in-memory
//! backend so the server is runnable and testable end to end; graph index
//! internals live outside this repository.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use vexadb_common::error::Result;
use vexadb_common::types::{DataType, OperationType};
use vexadb_meta::CollectionMeta;

/// One transcoded vector column value of a row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnData {
    pub column_name: String,
    pub data_type: DataType,
    pub dimension: u32,
    pub data: Vec<u8>,
}

/// One write operation in index form.
#[derive(Debug, Clone, PartialEq)]
pub struct RowData {
    pub primary_key: u64,
    pub operation: OperationType,
    /// Whether the row carries a CDC checkpoint to record
    pub lsn_check: bool,
    pub lsn: u64,
    pub lsn_context: String,
    /// Serialized forward attribute values in meta order
    pub forward_data: Vec<u8>,
    pub columns: Vec<ColumnData>,
}

impl RowData {
    pub fn new(primary_key: u64, operation: OperationType) -> Self {
        RowData {
            primary_key,
            operation,
            lsn_check: false,
            lsn: 0,
            lsn_context: String::new(),
            forward_data: Vec::new(),
            columns: Vec::new(),
        }
    }
}

/// A batch of rows bound for one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionDataset {
    pub schema_revision: u32,
    pub rows: Vec<RowData>,
}

impl CollectionDataset {
    pub fn new(schema_revision: u32) -> Self {
        CollectionDataset {
            schema_revision,
            rows: Vec::new(),
        }
    }
}

/// k-NN request against one vector column.
#[derive(Debug, Clone)]
pub struct KnnRequest {
    pub column_name: String,
    /// `batch_count` packed vectors in the column's native data type
    pub features: Vec<u8>,
    pub data_type: DataType,
    pub dimension: u32,
    pub batch_count: u32,
    pub topk: u32,
    pub radius: Option<f32>,
    pub linear: bool,
    pub extra_params: Vec<(String, String)>,
}

/// One k-NN hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub primary_key: u64,
    pub score: f32,
    pub forward_data: Vec<u8>,
}

/// Per-segment statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentStats {
    pub segment_id: u64,
    pub doc_count: u64,
}

/// Per-collection statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionStats {
    pub collection_name: String,
    pub total_doc_count: u64,
    pub total_segment_count: u64,
    pub segments: Vec<SegmentStats>,
}

/// Narrow contract required of the segmented index store.
///
/// Schema operations are idempotent and arrive under the exclusive schema
/// lock; writes for the same primary key may arrive out of order across
/// concurrent callers.
#[async_trait]
pub trait IndexService: Send + Sync {
    async fn create_collection(&self, name: &str, meta: Arc<CollectionMeta>) -> Result<()>;

    async fn update_collection(&self, name: &str, meta: Arc<CollectionMeta>) -> Result<()>;

    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// Apply the dataset's INSERT/UPDATE/DELETE rows.
    async fn write_records(&self, name: &str, dataset: &CollectionDataset) -> Result<()>;

    /// Per-batch top-k hits, ordered by ascending score.
    async fn knn(&self, name: &str, request: &KnnRequest) -> Result<Vec<Vec<SearchHit>>>;

    /// Point lookup by primary key.
    async fn get_document_by_key(&self, name: &str, primary_key: u64)
        -> Result<Option<SearchHit>>;

    /// Most recently applied CDC checkpoint.
    async fn get_latest_lsn(&self, name: &str) -> Result<(u64, String)>;

    async fn get_collection_stats(&self, name: &str) -> Result<CollectionStats>;

    /// Bulk startup recovery.
    async fn load_collections(
        &self,
        names: &[String],
        metas: &[Arc<CollectionMeta>],
    ) -> Result<()>;
}
