//! Shared request handler behind both protocol adapters.

use std::sync::Arc;

use tracing::error;

use vexadb_admin::AdminAgent;
use vexadb_agent::{IndexAgent, WriteRequestBuilder};
use vexadb_common::error::{Error, Result};
use vexadb_common::metrics::{GetDocumentMetrics, Protocol, QueryMetrics, WriteMetrics};
use vexadb_proto as proto;
use vexadb_query::QueryAgent;

pub struct RequestHandler {
    index_agent: Arc<IndexAgent>,
    query_agent: Arc<QueryAgent>,
    admin_agent: Arc<AdminAgent>,
    version: String,
}

fn status_of(result: &Result<()>) -> proto::Status {
    match result {
        Ok(()) => proto::Status::success(),
        Err(err) => proto::Status::from(err),
    }
}

impl RequestHandler {
    pub fn new(
        index_agent: Arc<IndexAgent>,
        query_agent: Arc<QueryAgent>,
        admin_agent: Arc<AdminAgent>,
        version: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(RequestHandler {
            index_agent,
            query_agent,
            admin_agent,
            version: version.into(),
        })
    }

    pub async fn create_collection(&self, request: &proto::CollectionConfig) -> proto::Status {
        status_of(&self.admin_agent.create_collection(request).await)
    }

    pub async fn drop_collection(&self, request: &proto::CollectionName) -> proto::Status {
        status_of(
            &self
                .admin_agent
                .drop_collection(&request.collection_name)
                .await,
        )
    }

    pub async fn describe_collection(
        &self,
        request: &proto::CollectionName,
    ) -> proto::DescribeCollectionResponse {
        let mut response = proto::DescribeCollectionResponse::default();
        match self
            .admin_agent
            .describe_collection(&request.collection_name)
            .await
        {
            Ok(info) => {
                response.collection = Some(info);
                response.status = Some(proto::Status::success());
            }
            Err(err) => response.status = Some(proto::Status::from(&err)),
        }
        response
    }

    pub async fn list_collections(
        &self,
        request: &proto::ListCondition,
    ) -> proto::ListCollectionsResponse {
        let mut response = proto::ListCollectionsResponse::default();
        match self.admin_agent.list_collections(request).await {
            Ok(collections) => {
                response.collections = collections;
                response.status = Some(proto::Status::success());
            }
            Err(err) => response.status = Some(proto::Status::from(&err)),
        }
        response
    }

    pub async fn stats_collection(
        &self,
        request: &proto::CollectionName,
    ) -> proto::StatsCollectionResponse {
        let mut response = proto::StatsCollectionResponse::default();
        match self
            .admin_agent
            .stats_collection(&request.collection_name)
            .await
        {
            Ok(stats) => {
                response.collection_stats = Some(stats);
                response.status = Some(proto::Status::success());
            }
            Err(err) => response.status = Some(proto::Status::from(&err)),
        }
        response
    }

    pub async fn write(&self, request: &proto::WriteRequest, protocol: Protocol) -> proto::Status {
        let mut metrics = WriteMetrics::new(protocol);
        metrics.record_rows(request.rows.len() as u64);
        let result = self.write_impl(request).await;
        let status = status_of(&result);
        metrics.set_code(status.code);
        status
    }

    async fn write_impl(&self, request: &proto::WriteRequest) -> Result<()> {
        let collection = &request.collection_name;
        let (meta, column_order) = match (
            self.index_agent.get_collection_meta(collection),
            self.index_agent.get_column_order(collection),
        ) {
            (Some(meta), Some(order)) => (meta, order),
            _ => {
                error!("Invalid collection. collection[{}]", collection);
                return Err(Error::InexistentCollection);
            }
        };

        let write_request = WriteRequestBuilder::build(&meta, &column_order, request)
            .map_err(|err| {
                error!(
                    "Write request builder build failed. code[{}] collection[{}]",
                    err.code(),
                    collection
                );
                err
            })?;

        self.index_agent.write(write_request).await.map_err(|err| {
            error!(
                "Index agent write request failed. code[{}] collection[{}]",
                err.code(),
                collection
            );
            err
        })
    }

    pub async fn query(
        &self,
        request: &proto::QueryRequest,
        protocol: Protocol,
    ) -> proto::QueryResponse {
        let mut metrics = QueryMetrics::new(protocol);
        match self.query_agent.search(request).await {
            Ok(mut response) => {
                response.status = Some(proto::Status::success());
                response
            }
            Err(err) => {
                error!("Can't handle query. code[{}] what[{}]", err.code(), err.reason());
                metrics.set_code(err.code());
                proto::QueryResponse {
                    status: Some(proto::Status::from(&err)),
                    ..Default::default()
                }
            }
        }
    }

    pub async fn get_document_by_key(
        &self,
        request: &proto::GetDocumentRequest,
        protocol: Protocol,
    ) -> proto::GetDocumentResponse {
        let mut metrics = GetDocumentMetrics::new(protocol);
        match self.query_agent.search_by_key(request).await {
            Ok(mut response) => {
                response.status = Some(proto::Status::success());
                response
            }
            Err(err) => {
                error!("Can't handle query. code[{}] what[{}]", err.code(), err.reason());
                metrics.set_code(err.code());
                proto::GetDocumentResponse {
                    status: Some(proto::Status::from(&err)),
                    ..Default::default()
                }
            }
        }
    }

    pub fn get_version(&self) -> proto::GetVersionResponse {
        proto::GetVersionResponse {
            status: Some(proto::Status::success()),
            version: self.version.clone(),
        }
    }
}
