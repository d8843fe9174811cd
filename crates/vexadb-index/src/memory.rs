//! In-memory segmented reference backend.
//!
//! Segments roll over at `max_docs_per_segment` and queries scan every
//! segment linearly. Good enough to serve and to test against; not an ANN
//! graph.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use vexadb_common::error::{Error, Result};
use vexadb_common::transform;
use vexadb_common::types::{DataType, OperationType};
use vexadb_meta::CollectionMeta;

use crate::{
    CollectionDataset, CollectionStats, IndexService, KnnRequest, SearchHit, SegmentStats,
};

#[derive(Default)]
struct StoredRow {
    forward_data: Vec<u8>,
    vectors: HashMap<String, Vec<u8>>,
}

struct Segment {
    id: u64,
    docs: HashMap<u64, StoredRow>,
}

impl Segment {
    fn new(id: u64) -> Self {
        Segment {
            id,
            docs: HashMap::new(),
        }
    }
}

struct CollectionState {
    meta: RwLock<Arc<CollectionMeta>>,
    segments: RwLock<Vec<Segment>>,
    latest_lsn: Mutex<(u64, String)>,
}

impl CollectionState {
    fn new(meta: Arc<CollectionMeta>) -> Arc<Self> {
        Arc::new(CollectionState {
            meta: RwLock::new(meta),
            segments: RwLock::new(vec![Segment::new(0)]),
            latest_lsn: Mutex::new((0, String::new())),
        })
    }
}

/// Linear-scan index store keyed by collection name.
#[derive(Default)]
pub struct MemoryIndexService {
    collections: DashMap<String, Arc<CollectionState>>,
}

impl MemoryIndexService {
    pub fn new() -> Self {
        MemoryIndexService::default()
    }

    fn state(&self, name: &str) -> Result<Arc<CollectionState>> {
        self.collections
            .get(name)
            .map(|s| s.clone())
            .ok_or(Error::InexistentCollection)
    }
}

fn score(data_type: DataType, dimension: u32, query: &QueryVector, stored: &[u8]) -> Result<f32> {
    match query {
        QueryVector::Numeric(q) => {
            let doc = transform::decode_to_f32(data_type, dimension, stored)?;
            if doc.len() != q.len() {
                return Err(Error::MismatchedDimension);
            }
            Ok(q.iter()
                .zip(doc.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum())
        }
        QueryVector::Binary(q) => {
            if stored.len() != q.len() {
                return Err(Error::MismatchedDimension);
            }
            let bits: u32 = q
                .iter()
                .zip(stored.iter())
                .map(|(a, b)| (a ^ b).count_ones())
                .sum();
            Ok(bits as f32)
        }
    }
}

enum QueryVector {
    Numeric(Vec<f32>),
    Binary(Vec<u8>),
}

fn query_vector(data_type: DataType, dimension: u32, bytes: &[u8]) -> Result<QueryVector> {
    match data_type {
        DataType::VectorBinary32 | DataType::VectorBinary64 => {
            transform::validate_vector_bytes(data_type, dimension, bytes)?;
            Ok(QueryVector::Binary(bytes.to_vec()))
        }
        _ => Ok(QueryVector::Numeric(transform::decode_to_f32(
            data_type, dimension, bytes,
        )?)),
    }
}

#[async_trait]
impl IndexService for MemoryIndexService {
    async fn create_collection(&self, name: &str, meta: Arc<CollectionMeta>) -> Result<()> {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| CollectionState::new(meta));
        Ok(())
    }

    async fn update_collection(&self, name: &str, meta: Arc<CollectionMeta>) -> Result<()> {
        let state = self.state(name)?;
        *state.meta.write() = meta;
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.collections.remove(name);
        Ok(())
    }

    async fn write_records(&self, name: &str, dataset: &CollectionDataset) -> Result<()> {
        let state = self.state(name)?;
        let max_docs = state.meta.read().max_docs_per_segment;
        let mut segments = state.segments.write();

        for row in &dataset.rows {
            match row.operation {
                OperationType::Delete => {
                    for segment in segments.iter_mut() {
                        segment.docs.remove(&row.primary_key);
                    }
                }
                OperationType::Insert | OperationType::Update => {
                    let exists = segments
                        .iter_mut()
                        .find(|s| s.docs.contains_key(&row.primary_key));
                    if let Some(segment) = exists {
                        if row.operation == OperationType::Insert {
                            return Err(Error::DuplicateKey);
                        }
                        segment.docs.insert(row.primary_key, stored_row(row));
                    } else {
                        let rollover = max_docs > 0
                            && segments
                                .last()
                                .map(|s| s.docs.len() as u64 >= max_docs)
                                .unwrap_or(false);
                        if rollover {
                            let next_id = segments.last().map(|s| s.id + 1).unwrap_or(0);
                            debug!(
                                "Segment rollover. collection[{}] segment[{}]",
                                name, next_id
                            );
                            segments.push(Segment::new(next_id));
                        }
                        segments
                            .last_mut()
                            .ok_or(Error::LostSegment)?
                            .docs
                            .insert(row.primary_key, stored_row(row));
                    }
                }
            }

            if row.lsn_check {
                let mut latest = state.latest_lsn.lock();
                if row.lsn >= latest.0 {
                    *latest = (row.lsn, row.lsn_context.clone());
                }
            }
        }
        Ok(())
    }

    async fn knn(&self, name: &str, request: &KnnRequest) -> Result<Vec<Vec<SearchHit>>> {
        let state = self.state(name)?;
        let meta = state.meta.read().clone();
        let column = meta
            .column_by_name(&request.column_name)
            .ok_or(Error::InexistentColumn)?;

        let vector_len = column.data_type.vector_byte_len(request.dimension)?;
        if request.batch_count == 0
            || request.features.len() != vector_len * request.batch_count as usize
        {
            return Err(Error::MismatchedDimension);
        }

        let segments = state.segments.read();
        let mut batches = Vec::with_capacity(request.batch_count as usize);
        for chunk in request.features.chunks_exact(vector_len) {
            let query = query_vector(column.data_type, request.dimension, chunk)?;
            let mut hits = Vec::new();
            for segment in segments.iter() {
                for (key, row) in &segment.docs {
                    let Some(stored) = row.vectors.get(&request.column_name) else {
                        continue;
                    };
                    let score = score(column.data_type, request.dimension, &query, stored)?;
                    if let Some(radius) = request.radius {
                        if score > radius {
                            continue;
                        }
                    }
                    hits.push(SearchHit {
                        primary_key: *key,
                        score,
                        forward_data: row.forward_data.clone(),
                    });
                }
            }
            hits.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
            hits.truncate(request.topk as usize);
            batches.push(hits);
        }
        Ok(batches)
    }

    async fn get_document_by_key(
        &self,
        name: &str,
        primary_key: u64,
    ) -> Result<Option<SearchHit>> {
        let state = self.state(name)?;
        let segments = state.segments.read();
        for segment in segments.iter() {
            if let Some(row) = segment.docs.get(&primary_key) {
                return Ok(Some(SearchHit {
                    primary_key,
                    score: 0.0,
                    forward_data: row.forward_data.clone(),
                }));
            }
        }
        Ok(None)
    }

    async fn get_latest_lsn(&self, name: &str) -> Result<(u64, String)> {
        let state = self.state(name)?;
        let latest = state.latest_lsn.lock();
        Ok(latest.clone())
    }

    async fn get_collection_stats(&self, name: &str) -> Result<CollectionStats> {
        let state = self.state(name)?;
        let segments = state.segments.read();
        let mut stats = CollectionStats {
            collection_name: name.to_string(),
            total_doc_count: 0,
            total_segment_count: segments.len() as u64,
            segments: Vec::with_capacity(segments.len()),
        };
        for segment in segments.iter() {
            stats.total_doc_count += segment.docs.len() as u64;
            stats.segments.push(SegmentStats {
                segment_id: segment.id,
                doc_count: segment.docs.len() as u64,
            });
        }
        Ok(stats)
    }

    async fn load_collections(
        &self,
        names: &[String],
        metas: &[Arc<CollectionMeta>],
    ) -> Result<()> {
        if names.len() != metas.len() {
            return Err(Error::InvalidArgument);
        }
        for (name, meta) in names.iter().zip(metas) {
            self.create_collection(name, meta.clone()).await?;
        }
        Ok(())
    }
}

fn stored_row(row: &crate::RowData) -> StoredRow {
    StoredRow {
        forward_data: row.forward_data.clone(),
        vectors: row
            .columns
            .iter()
            .map(|c| (c.column_name.clone(), c.data.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use vexadb_common::types::{CollectionStatus, IndexType};
    use vexadb_meta::ColumnMeta;

    use crate::{ColumnData, RowData};

    use super::*;

    fn meta(max_docs: u64) -> Arc<CollectionMeta> {
        Arc::new(CollectionMeta {
            name: "c".to_string(),
            uid: "uid".to_string(),
            uuid: "uuid".to_string(),
            revision: 0,
            status: CollectionStatus::Serving,
            current: true,
            readable: true,
            writable: true,
            max_docs_per_segment: max_docs,
            forward_columns: vec!["f1".to_string()],
            index_columns: vec![ColumnMeta {
                name: "v".to_string(),
                uid: "col".to_string(),
                index_type: IndexType::VectorGraph,
                data_type: DataType::VectorFp32,
                dimension: 4,
                parameters: vec![],
            }],
            repository: None,
        })
    }

    fn fp32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn insert_row(key: u64, values: &[f32]) -> RowData {
        let mut row = RowData::new(key, OperationType::Insert);
        row.forward_data = vec![key as u8];
        row.columns.push(ColumnData {
            column_name: "v".to_string(),
            data_type: DataType::VectorFp32,
            dimension: 4,
            data: fp32_bytes(values),
        });
        row
    }

    fn dataset(rows: Vec<RowData>) -> CollectionDataset {
        CollectionDataset {
            schema_revision: 0,
            rows,
        }
    }

    #[tokio::test]
    async fn write_then_knn_returns_nearest_first() {
        let service = MemoryIndexService::new();
        service.create_collection("c", meta(0)).await.unwrap();

        let rows = (0..10u64)
            .map(|i| insert_row(i, &[i as f32, 0.0, 0.0, 0.0]))
            .collect();
        service.write_records("c", &dataset(rows)).await.unwrap();

        let hits = service
            .knn(
                "c",
                &KnnRequest {
                    column_name: "v".to_string(),
                    features: fp32_bytes(&[0.0, 0.0, 0.0, 0.0]),
                    data_type: DataType::VectorFp32,
                    dimension: 4,
                    batch_count: 1,
                    topk: 3,
                    radius: None,
                    linear: true,
                    extra_params: vec![],
                },
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].len(), 3);
        assert_eq!(hits[0][0].primary_key, 0);
        assert_eq!(hits[0][0].score, 0.0);
        assert_eq!(hits[0][1].primary_key, 1);
    }

    #[tokio::test]
    async fn batch_queries_return_one_list_per_vector() {
        let service = MemoryIndexService::new();
        service.create_collection("c", meta(0)).await.unwrap();
        let rows = (0..4u64)
            .map(|i| insert_row(i, &[i as f32, 0.0, 0.0, 0.0]))
            .collect();
        service.write_records("c", &dataset(rows)).await.unwrap();

        let mut features = fp32_bytes(&[0.0, 0.0, 0.0, 0.0]);
        features.extend(fp32_bytes(&[3.0, 0.0, 0.0, 0.0]));
        let hits = service
            .knn(
                "c",
                &KnnRequest {
                    column_name: "v".to_string(),
                    features,
                    data_type: DataType::VectorFp32,
                    dimension: 4,
                    batch_count: 2,
                    topk: 1,
                    radius: None,
                    linear: false,
                    extra_params: vec![],
                },
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0][0].primary_key, 0);
        assert_eq!(hits[1][0].primary_key, 3);
    }

    #[tokio::test]
    async fn radius_filters_far_hits() {
        let service = MemoryIndexService::new();
        service.create_collection("c", meta(0)).await.unwrap();
        let rows = (0..10u64)
            .map(|i| insert_row(i, &[i as f32, 0.0, 0.0, 0.0]))
            .collect();
        service.write_records("c", &dataset(rows)).await.unwrap();

        let hits = service
            .knn(
                "c",
                &KnnRequest {
                    column_name: "v".to_string(),
                    features: fp32_bytes(&[0.0, 0.0, 0.0, 0.0]),
                    data_type: DataType::VectorFp32,
                    dimension: 4,
                    batch_count: 1,
                    topk: 10,
                    radius: Some(4.5),
                    linear: true,
                    extra_params: vec![],
                },
            )
            .await
            .unwrap();
        // squared distances 0, 1, 4 pass; 9 and beyond do not
        assert_eq!(hits[0].len(), 3);
    }

    #[tokio::test]
    async fn duplicate_insert_rejected_update_upserts_delete_removes() {
        let service = MemoryIndexService::new();
        service.create_collection("c", meta(0)).await.unwrap();
        service
            .write_records("c", &dataset(vec![insert_row(1, &[1.0, 0.0, 0.0, 0.0])]))
            .await
            .unwrap();

        let err = service
            .write_records("c", &dataset(vec![insert_row(1, &[2.0, 0.0, 0.0, 0.0])]))
            .await
            .unwrap_err();
        assert_eq!(err, Error::DuplicateKey);

        let mut update = insert_row(1, &[5.0, 0.0, 0.0, 0.0]);
        update.operation = OperationType::Update;
        service
            .write_records("c", &dataset(vec![update]))
            .await
            .unwrap();
        let stats = service.get_collection_stats("c").await.unwrap();
        assert_eq!(stats.total_doc_count, 1);

        let mut delete = RowData::new(1, OperationType::Delete);
        delete.operation = OperationType::Delete;
        service
            .write_records("c", &dataset(vec![delete]))
            .await
            .unwrap();
        assert!(service.get_document_by_key("c", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn segments_roll_over_at_max_docs() {
        let service = MemoryIndexService::new();
        service.create_collection("c", meta(2)).await.unwrap();
        let rows = (0..5u64)
            .map(|i| insert_row(i, &[i as f32, 0.0, 0.0, 0.0]))
            .collect();
        service.write_records("c", &dataset(rows)).await.unwrap();

        let stats = service.get_collection_stats("c").await.unwrap();
        assert_eq!(stats.total_doc_count, 5);
        assert_eq!(stats.total_segment_count, 3);
        assert_eq!(stats.segments[0].doc_count, 2);
        assert_eq!(stats.segments[2].doc_count, 1);
    }

    #[tokio::test]
    async fn lsn_checkpoint_advances() {
        let service = MemoryIndexService::new();
        service.create_collection("c", meta(0)).await.unwrap();
        let mut row = insert_row(1, &[0.0, 0.0, 0.0, 0.0]);
        row.lsn_check = true;
        row.lsn = 42;
        row.lsn_context = "binlog:42".to_string();
        service.write_records("c", &dataset(vec![row])).await.unwrap();

        let (lsn, context) = service.get_latest_lsn("c").await.unwrap();
        assert_eq!(lsn, 42);
        assert_eq!(context, "binlog:42");
    }

    #[tokio::test]
    async fn unknown_collection_and_column_are_reported() {
        let service = MemoryIndexService::new();
        assert_eq!(
            service
                .write_records("missing", &dataset(vec![]))
                .await
                .unwrap_err(),
            Error::InexistentCollection
        );

        service.create_collection("c", meta(0)).await.unwrap();
        let err = service
            .knn(
                "c",
                &KnnRequest {
                    column_name: "nope".to_string(),
                    features: vec![],
                    data_type: DataType::VectorFp32,
                    dimension: 4,
                    batch_count: 1,
                    topk: 1,
                    radius: None,
                    linear: false,
                    extra_params: vec![],
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, Error::InexistentColumn);
    }
}
