//! Meta agent: the catalog entry point used by the other agents.
//!
//! Selects the store backend from the configured DSN scheme and owns the
//! service lifecycle.

use std::sync::Arc;

use tracing::{error, info};

use vexadb_common::config::MetaConfig;
use vexadb_common::error::{Error, Result};
use vexadb_common::types::CollectionStatus;

use crate::meta::{CollectionMeta, CollectionParams};
use crate::service::MetaService;
use crate::sqlite::SqliteMetaStore;

pub struct MetaAgent {
    service: MetaService,
}

impl MetaAgent {
    /// Build the agent for the configured catalog DSN.
    pub fn create(config: &MetaConfig) -> Result<Arc<MetaAgent>> {
        let service = match config.scheme() {
            Some("sqlite") => {
                let store = SqliteMetaStore::open(config.path())?;
                MetaService::new(Box::new(store))
            }
            Some(scheme) => {
                error!("Unsupported meta store scheme. scheme[{}]", scheme);
                return Err(Error::UnsupportedConnection);
            }
            None => {
                error!("Invalid meta uri. uri[{}]", config.uri);
                return Err(Error::InvalidUri);
            }
        };
        Ok(Arc::new(MetaAgent { service }))
    }

    pub fn init(&self) -> Result<()> {
        self.service.init()?;
        info!("MetaAgent initialize complete.");
        Ok(())
    }

    pub fn cleanup(&self) -> Result<()> {
        self.service.cleanup()?;
        info!("MetaAgent cleanup complete.");
        Ok(())
    }

    pub fn start(&self) -> Result<()> {
        info!("MetaAgent start complete.");
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        info!("MetaAgent stopped.");
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        self.service.reload()
    }

    pub fn create_collection(&self, params: CollectionParams) -> Result<Arc<CollectionMeta>> {
        self.service.create_collection(params)
    }

    pub fn update_collection(&self, params: CollectionParams) -> Result<Arc<CollectionMeta>> {
        self.service.update_collection(params)
    }

    pub fn enable_collection(&self, name: &str, revision: u32) -> Result<()> {
        self.service.enable_collection(name, revision)
    }

    pub fn delete_collection(&self, name: &str) -> Result<()> {
        self.service.drop_collection(name)
    }

    pub fn update_status(&self, name: &str, status: CollectionStatus) -> Result<()> {
        self.service.update_status(name, status)
    }

    pub fn suspend_collection_read(&self, name: &str) -> Result<()> {
        self.service.suspend_collection_read(name)
    }

    pub fn resume_collection_read(&self, name: &str) -> Result<()> {
        self.service.resume_collection_read(name)
    }

    pub fn suspend_collection_write(&self, name: &str) -> Result<()> {
        self.service.suspend_collection_write(name)
    }

    pub fn resume_collection_write(&self, name: &str) -> Result<()> {
        self.service.resume_collection_write(name)
    }

    /// Current revision of a name.
    pub fn get_collection(&self, name: &str) -> Option<Arc<CollectionMeta>> {
        self.service.get_current_collection(name)
    }

    pub fn get_collection_by_revision(
        &self,
        name: &str,
        revision: u32,
    ) -> Option<Arc<CollectionMeta>> {
        self.service.get_collection(name, revision)
    }

    pub fn get_latest_collection(&self, name: &str) -> Option<Arc<CollectionMeta>> {
        self.service.get_latest_collection(name)
    }

    /// Current revisions of every enabled collection.
    pub fn list_collections(&self) -> Vec<Arc<CollectionMeta>> {
        self.service.get_latest_collections()
    }

    pub fn get_collections_by_repo(&self, repository: &str) -> Vec<Arc<CollectionMeta>> {
        self.service.get_collections_by_repo(repository)
    }

    pub fn exist_collection(&self, name: &str) -> bool {
        self.service.exist_collection(name)
    }
}
