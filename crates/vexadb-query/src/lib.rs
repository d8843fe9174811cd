//! Query front-end for VexaDB
//!
//! k-NN dispatch under a bounded concurrency budget: search tasks run as
//! detached tasks gated by a semaphore sized to the configured query
//! thread count, so a cancelled caller never cancels the index work.

mod forward;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{error, info};

use vexadb_common::config::QueryConfig;
use vexadb_common::error::{Error, Result};
use vexadb_common::transform;
use vexadb_common::types::DataType;
use vexadb_index::{IndexService, KnnRequest};
use vexadb_meta::{CollectionMeta, MetaAgent};
use vexadb_proto::{
    Document, GetDocumentRequest, GetDocumentResponse, QueryRequest, QueryResponse, QueryResult,
};

pub use forward::decode_forward_values;

pub struct QueryAgent {
    meta_agent: Arc<MetaAgent>,
    index_service: Arc<dyn IndexService>,
    query_pool: Arc<Semaphore>,
    running: AtomicBool,
}

impl QueryAgent {
    pub fn new(
        meta_agent: Arc<MetaAgent>,
        index_service: Arc<dyn IndexService>,
        config: &QueryConfig,
    ) -> Arc<Self> {
        let agent = Arc::new(QueryAgent {
            meta_agent,
            index_service,
            query_pool: Arc::new(Semaphore::new(config.thread_count as usize)),
            running: AtomicBool::new(false),
        });
        info!("QueryAgent initialize complete.");
        agent
    }

    pub fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::Release);
        info!("QueryAgent start complete.");
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::Release);
        info!("QueryAgent stopped.");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Execute a k-NN query and assemble documents with their forward
    /// attributes. Results reflect the current revision as of the time the
    /// search task starts.
    pub async fn search(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let started = Instant::now();
        let meta = self.readable_collection(&request.collection_name)?;

        let param = request.knn_param.as_ref().ok_or(Error::InvalidQuery)?;
        if param.column_name.is_empty()
            || param.topk == 0
            || param.batch_count == 0
            || param.dimension == 0
            || param.data_type() == DataType::Undefined
            || (param.features.is_empty() && param.matrix.is_empty())
        {
            return Err(Error::InvalidQuery);
        }

        let column = meta
            .column_by_name(&param.column_name)
            .ok_or(Error::InexistentColumn)?;
        if column.dimension != param.dimension {
            return Err(Error::MismatchedDimension);
        }

        // transcode features into the column's native data type
        let (features, batch_count) = if !param.matrix.is_empty() {
            let (bytes, rows) = transform::transform_json_matrix(
                param.data_type(),
                &param.matrix,
                column.data_type,
            )?;
            if rows != param.batch_count {
                return Err(Error::InvalidQuery);
            }
            (bytes, rows)
        } else {
            let bytes = transform::transform_bytes(
                param.data_type(),
                &param.features,
                column.data_type,
            )?;
            let expected = column.data_type.vector_byte_len(param.dimension)?
                * param.batch_count as usize;
            if bytes.len() != expected {
                return Err(Error::MismatchedDimension);
            }
            (bytes, param.batch_count)
        };

        let knn = KnnRequest {
            column_name: param.column_name.clone(),
            features,
            data_type: column.data_type,
            dimension: param.dimension,
            batch_count,
            topk: param.topk,
            radius: param.radius,
            linear: param.is_linear,
            extra_params: param
                .extra_params
                .iter()
                .map(|kv| (kv.key.clone(), kv.value.clone()))
                .collect(),
        };

        let batches = {
            let permit = self
                .query_pool
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::ScheduleError)?;
            let index_service = self.index_service.clone();
            let collection = request.collection_name.clone();
            // detached: a cancelled caller discards the result, the task
            // still runs to completion
            let task = tokio::spawn(async move {
                let _permit = permit;
                index_service.knn(&collection, &knn).await
            });
            task.await.map_err(|err| {
                error!("Search task failed. error[{}]", err);
                Error::ScheduleError
            })??
        };

        let mut response = QueryResponse::default();
        for hits in batches {
            let mut result = QueryResult::default();
            for hit in hits {
                result.documents.push(Document {
                    primary_key: hit.primary_key,
                    score: hit.score,
                    forward_column_values: decode_forward_values(
                        &meta.forward_columns,
                        &hit.forward_data,
                    )?,
                });
            }
            response.results.push(result);
        }
        response.latency_us = started.elapsed().as_micros() as u64;
        Ok(response)
    }

    /// Point lookup by primary key; at most one document.
    pub async fn search_by_key(
        &self,
        request: &GetDocumentRequest,
    ) -> Result<GetDocumentResponse> {
        let meta = self.readable_collection(&request.collection_name)?;

        let hit = self
            .index_service
            .get_document_by_key(&request.collection_name, request.primary_key)
            .await?;

        let mut response = GetDocumentResponse::default();
        if let Some(hit) = hit {
            response.document = Some(Document {
                primary_key: hit.primary_key,
                score: hit.score,
                forward_column_values: decode_forward_values(
                    &meta.forward_columns,
                    &hit.forward_data,
                )?,
            });
        }
        Ok(response)
    }

    fn readable_collection(&self, name: &str) -> Result<Arc<CollectionMeta>> {
        if name.is_empty() {
            return Err(Error::EmptyCollectionName);
        }
        let meta = self
            .meta_agent
            .get_collection(name)
            .ok_or(Error::InexistentCollection)?;
        if !meta.readable {
            return Err(Error::UnreadableCollection);
        }
        Ok(meta)
    }
}
