//! Administrative orchestration for VexaDB
//!
//! Thin coordination of create/drop/describe/list/stats across the meta,
//! index and query agents, with compensating rollback on partial failure.

pub mod convert;

use std::sync::Arc;

use tracing::{error, info, warn};

use vexadb_common::error::{Error, Result};
use vexadb_meta::MetaAgent;
use vexadb_proto as proto;
use vexadb_agent::IndexAgent;
use vexadb_query::QueryAgent;

use crate::convert::{
    collection_info_from_meta, collection_params_from_config, collection_stats_to_pb,
};

pub struct AdminAgent {
    meta_agent: Arc<MetaAgent>,
    index_agent: Arc<IndexAgent>,
    query_agent: Arc<QueryAgent>,
}

impl AdminAgent {
    pub fn new(
        meta_agent: Arc<MetaAgent>,
        index_agent: Arc<IndexAgent>,
        query_agent: Arc<QueryAgent>,
    ) -> Arc<Self> {
        info!("AdminAgent initialize complete.");
        Arc::new(AdminAgent {
            meta_agent,
            index_agent,
            query_agent,
        })
    }

    /// Create in meta, register with the index layer, then enable. A
    /// failing index registration deletes the meta again.
    pub async fn create_collection(&self, config: &proto::CollectionConfig) -> Result<()> {
        let params = collection_params_from_config(config)?;
        let collection = self.meta_agent.create_collection(params)?;

        match self.index_agent.create_collection(&collection.name).await {
            Ok(()) => {
                info!("Create collection success. collection[{}]", collection.name);
                self.meta_agent
                    .enable_collection(&collection.name, collection.revision)
            }
            Err(err) => {
                self.meta_agent.delete_collection(&collection.name)?;
                error!(
                    "IndexAgent create collection failed. code[{}] what[{}]",
                    err.code(),
                    err.reason()
                );
                Err(err)
            }
        }
    }

    /// Persist the next schema revision, drain and swap it in, then enable.
    pub async fn update_collection(&self, config: &proto::CollectionConfig) -> Result<()> {
        let params = collection_params_from_config(config)?;
        let name = params.name.clone();
        let next = self.meta_agent.update_collection(params)?;
        self.index_agent
            .update_collection(&name, next.revision)
            .await?;
        self.meta_agent.enable_collection(&name, next.revision)
    }

    /// Drop from index first; meta stays intact on failure so the drop can
    /// be retried idempotently.
    pub async fn drop_collection(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::EmptyCollectionName);
        }
        self.index_agent.drop_collection(name).await.map_err(|err| {
            error!(
                "IndexAgent drop collection failed. code[{}] what[{}]",
                err.code(),
                err.reason()
            );
            err
        })?;
        self.meta_agent.delete_collection(name)
    }

    pub async fn describe_collection(&self, name: &str) -> Result<proto::CollectionInfo> {
        let meta = self
            .meta_agent
            .get_collection(name)
            .ok_or(Error::InexistentCollection)?;
        let mut info = collection_info_from_meta(&meta);
        if meta.repository.is_some() {
            self.fill_lsn_context_and_magic_number(name, &mut info)
                .await?;
        }
        Ok(info)
    }

    pub async fn list_collections(
        &self,
        condition: &proto::ListCondition,
    ) -> Result<Vec<proto::CollectionInfo>> {
        let collections = if condition.repository_name.is_empty() {
            self.meta_agent.list_collections()
        } else {
            self.meta_agent
                .get_collections_by_repo(&condition.repository_name)
        };

        let mut infos = Vec::with_capacity(collections.len());
        for meta in collections {
            let mut info = collection_info_from_meta(&meta);
            if meta.repository.is_some() {
                self.fill_lsn_context_and_magic_number(&meta.name, &mut info)
                    .await?;
            }
            infos.push(info);
        }
        Ok(infos)
    }

    pub async fn stats_collection(&self, name: &str) -> Result<proto::CollectionStats> {
        let stats = self.index_agent.get_collection_stats(name).await.map_err(|err| {
            error!(
                "Failed to get collection stats. collection[{}] code[{}] what[{}]",
                name,
                err.code(),
                err.reason()
            );
            err
        })?;
        Ok(collection_stats_to_pb(&stats))
    }

    pub fn reload_meta(&self) -> Result<()> {
        self.meta_agent.reload()
    }

    pub fn start_query_service(&self) -> Result<()> {
        self.query_agent.start()
    }

    pub fn stop_query_service(&self) -> Result<()> {
        self.query_agent.stop()
    }

    pub fn query_service_running(&self) -> bool {
        self.query_agent.is_running()
    }

    /// Proxy collections expose the restart fence and CDC checkpoint so
    /// repositories can stamp writes and detect a server restart.
    async fn fill_lsn_context_and_magic_number(
        &self,
        name: &str,
        info: &mut proto::CollectionInfo,
    ) -> Result<()> {
        info.magic_number = self.index_agent.magic_number();
        match self.index_agent.get_latest_lsn(name).await {
            Ok((lsn, context)) => {
                info.latest_lsn_context = Some(proto::LsnContext { lsn, context });
                Ok(())
            }
            Err(err) => {
                warn!(
                    "Get latest lsn failed. collection[{}] code[{}]",
                    name,
                    err.code()
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use vexadb_common::config::{IndexConfig, MetaConfig, QueryConfig};
    use vexadb_common::types::{CollectionStatus, DataType, IndexType};
    use vexadb_index::memory::MemoryIndexService;

    use super::*;

    async fn setup(dir: &tempfile::TempDir) -> Arc<AdminAgent> {
        let config = MetaConfig {
            uri: format!("sqlite://{}", dir.path().join("meta.sqlite").display()),
        };
        let meta = MetaAgent::create(&config).unwrap();
        meta.init().unwrap();
        let index_service = Arc::new(MemoryIndexService::new());
        let index_agent = IndexAgent::new(meta.clone(), index_service.clone(), &IndexConfig::default());
        index_agent.start().await.unwrap();
        let query_agent = QueryAgent::new(meta.clone(), index_service, &QueryConfig::default());
        query_agent.start().unwrap();
        AdminAgent::new(meta, index_agent, query_agent)
    }

    fn config(name: &str) -> proto::CollectionConfig {
        proto::CollectionConfig {
            collection_name: name.to_string(),
            max_docs_per_segment: 0,
            forward_column_names: vec!["f1".to_string(), "f2".to_string()],
            index_column_params: vec![proto::IndexColumnParam {
                column_name: "v".to_string(),
                index_type: IndexType::VectorGraph as i32,
                data_type: DataType::VectorFp32 as i32,
                dimension: 8,
                extra_params: vec![],
            }],
            repository_config: None,
        }
    }

    #[tokio::test]
    async fn create_describe_drop_list() {
        let dir = tempfile::tempdir().unwrap();
        let admin = setup(&dir).await;

        admin.create_collection(&config("c")).await.unwrap();

        let info = admin.describe_collection("c").await.unwrap();
        assert_eq!(info.revision, 0);
        assert_eq!(info.status(), CollectionStatus::Serving);
        assert!(!info.uid.is_empty());
        assert_eq!(info.forward_column_names.len(), 2);
        assert_eq!(info.index_column_params.len(), 1);
        assert_eq!(info.index_column_params[0].dimension, 8);

        let listed = admin
            .list_collections(&proto::ListCondition::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        admin.drop_collection("c").await.unwrap();
        let listed = admin
            .list_collections(&proto::ListCondition::default())
            .await
            .unwrap();
        assert!(listed.is_empty());
        assert_eq!(
            admin.describe_collection("c").await.unwrap_err(),
            Error::InexistentCollection
        );
    }

    #[tokio::test]
    async fn duplicate_create_fails() {
        let dir = tempfile::tempdir().unwrap();
        let admin = setup(&dir).await;
        admin.create_collection(&config("c")).await.unwrap();
        assert_eq!(
            admin.create_collection(&config("c")).await.unwrap_err(),
            Error::DuplicateCollection
        );
    }

    #[tokio::test]
    async fn update_rejects_immutable_change_and_keeps_revision() {
        let dir = tempfile::tempdir().unwrap();
        let admin = setup(&dir).await;
        admin.create_collection(&config("c")).await.unwrap();

        let mut bad = config("c");
        bad.index_column_params[0].data_type = DataType::VectorInt8 as i32;
        assert_eq!(
            admin.update_collection(&bad).await.unwrap_err(),
            Error::UpdateDataTypeField
        );

        let info = admin.describe_collection("c").await.unwrap();
        assert_eq!(info.revision, 0);
        assert_eq!(
            info.index_column_params[0].data_type(),
            DataType::VectorFp32
        );
    }

    #[tokio::test]
    async fn update_swaps_in_next_revision() {
        let dir = tempfile::tempdir().unwrap();
        let admin = setup(&dir).await;
        admin.create_collection(&config("c")).await.unwrap();

        let mut update = config("c");
        update.max_docs_per_segment = 500;
        admin.update_collection(&update).await.unwrap();

        let info = admin.describe_collection("c").await.unwrap();
        assert_eq!(info.revision, 1);
        assert!(info.current);
        assert_eq!(info.max_docs_per_segment, 500);
    }

    #[tokio::test]
    async fn stats_reports_doc_counts() {
        let dir = tempfile::tempdir().unwrap();
        let admin = setup(&dir).await;
        admin.create_collection(&config("c")).await.unwrap();
        let stats = admin.stats_collection("c").await.unwrap();
        assert_eq!(stats.total_doc_count, 0);
        assert_eq!(stats.total_segment_count, 1);
    }

    #[tokio::test]
    async fn query_service_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let admin = setup(&dir).await;
        assert!(admin.query_service_running());
        admin.stop_query_service().unwrap();
        assert!(!admin.query_service_running());
        admin.start_query_service().unwrap();
        assert!(admin.query_service_running());
    }
}
