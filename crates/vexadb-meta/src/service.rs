//! Transactional façade over the catalog store and cache.
//!
//! One shared/exclusive lock gates the whole meta subsystem: reads take
//! the shared side and never block each other, every mutation takes the
//! exclusive side and serializes with everything, store writes included.
//! Reads hand out immutable snapshots, so no caller can observe a torn
//! multi-field change.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info};

use vexadb_common::error::{Error, Result};
use vexadb_common::types::CollectionStatus;

use crate::cache::MetaCache;
use crate::meta::{self, CollectionMeta, CollectionParams};
use crate::records::{CollectionRecord, ColumnRecord, RepositoryRecord};
use crate::store::MetaStore;

pub struct MetaService {
    store: Box<dyn MetaStore>,
    cache: RwLock<MetaCache>,
}

impl MetaService {
    pub fn new(store: Box<dyn MetaStore>) -> Self {
        MetaService {
            store,
            cache: RwLock::new(MetaCache::new()),
        }
    }

    /// Load the persisted catalog into the cache.
    pub fn init(&self) -> Result<()> {
        let mut cache = self.cache.write();
        Self::load_into(&*self.store, &mut cache)
    }

    pub fn cleanup(&self) -> Result<()> {
        self.cache.write().clear();
        Ok(())
    }

    /// Drop the cache and re-load everything from the store.
    pub fn reload(&self) -> Result<()> {
        info!("Reload meta service.");
        let mut cache = self.cache.write();
        cache.clear();
        Self::load_into(&*self.store, &mut cache)
    }

    fn load_into(store: &dyn MetaStore, cache: &mut MetaCache) -> Result<()> {
        let mut failed = None;
        store.list_collections(&mut |record| {
            cache.append_collection(Arc::new(record.into_meta()));
        })?;
        store.list_columns(&mut |record| {
            let uuid = record.collection_uuid.clone();
            match record.into_meta() {
                Ok(column) => {
                    if cache.append_column(&uuid, column).is_err() {
                        debug!("Column without collection skipped. uuid[{}]", uuid);
                    }
                }
                Err(err) => failed = Some(err),
            }
        })?;
        store.list_repositories(&mut |record| {
            let uuid = record.collection_uuid.clone();
            if cache.append_repository(&uuid, record.into_meta()).is_err() {
                debug!("Repository without collection skipped. uuid[{}]", uuid);
            }
        })?;
        if let Some(err) = failed {
            cache.clear();
            error!("Failed to load meta into cache. error[{}]", err);
            return Err(Error::RuntimeError);
        }
        Ok(())
    }

    /// Persist collection, repository and columns, compensating partial
    /// writes by deleting what was already stored.
    fn store_collection(&self, meta: &CollectionMeta) -> Result<()> {
        self.store
            .create_collection(&CollectionRecord::from_meta(meta))?;

        if let Some(repository) = &meta.repository {
            let record = RepositoryRecord::from_meta(meta, repository);
            if let Err(err) = self.store.create_repository(&record) {
                let _ = self.store.delete_repositories_by_uuid(&meta.uuid);
                let _ = self.store.delete_collection_by_uuid(&meta.uuid);
                return Err(err);
            }
        }

        for column in &meta.index_columns {
            let record = ColumnRecord::from_meta(meta, column)?;
            if let Err(err) = self.store.create_column(&record) {
                let _ = self.store.delete_columns_by_uuid(&meta.uuid);
                let _ = self.store.delete_repositories_by_uuid(&meta.uuid);
                let _ = self.store.delete_collection_by_uuid(&meta.uuid);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Create revision 0 of a new collection.
    pub fn create_collection(&self, params: CollectionParams) -> Result<Arc<CollectionMeta>> {
        let mut cache = self.cache.write();
        if cache.exist_collection(&params.name) {
            return Err(Error::DuplicateCollection);
        }

        let meta = Arc::new(params.into_new_collection()?);
        self.store_collection(&meta)?;
        cache.append_collection(meta.clone());
        Ok(meta)
    }

    /// Copy the latest revision, merge mutable fields and persist the next
    /// revision with a fresh uuid, not yet current.
    pub fn update_collection(&self, params: CollectionParams) -> Result<Arc<CollectionMeta>> {
        let mut cache = self.cache.write();
        let latest = cache
            .get_latest_collection(&params.name)
            .ok_or(Error::InexistentCollection)?;

        let mut merged = params.merge_onto(&latest)?;
        merged.revision = latest.revision + 1;
        merged.uuid = meta::new_id();
        merged.current = false;

        let merged = Arc::new(merged);
        self.store_collection(&merged)?;
        cache.append_collection(merged.clone());
        Ok(merged)
    }

    /// Promote a revision to current/serving, demoting the previous one.
    pub fn enable_collection(&self, name: &str, revision: u32) -> Result<()> {
        let mut cache = self.cache.write();
        let target = cache
            .get_collection_with(name, &|c| c.revision == revision)
            .ok_or(Error::InexistentCollection)?;

        if let Some(current) = cache.get_collection(name) {
            if current.uuid != target.uuid {
                let mut demoted = (*current).clone();
                demoted.current = false;
                demoted.readable = false;
                demoted.writable = false;
                let demoted = Arc::new(demoted);
                self.store
                    .update_collection(&CollectionRecord::from_meta(&demoted))?;
                cache.replace_collection(demoted)?;
            }
        }

        let mut promoted = (*target).clone();
        promoted.status = CollectionStatus::Serving;
        promoted.current = true;
        promoted.readable = true;
        promoted.writable = true;
        let promoted = Arc::new(promoted);
        self.store
            .update_collection(&CollectionRecord::from_meta(&promoted))?;
        cache.replace_collection(promoted)
    }

    /// Mutate the current revision in place and persist it.
    fn update_current(
        &self,
        name: &str,
        mutate: impl FnOnce(&mut CollectionMeta),
    ) -> Result<()> {
        let mut cache = self.cache.write();
        let current = cache
            .get_collection(name)
            .ok_or(Error::InexistentCollection)?;
        let mut updated = (*current).clone();
        mutate(&mut updated);
        let updated = Arc::new(updated);
        self.store
            .update_collection(&CollectionRecord::from_meta(&updated))?;
        cache.replace_collection(updated)
    }

    pub fn update_status(&self, name: &str, status: CollectionStatus) -> Result<()> {
        self.update_current(name, |meta| meta.status = status)
    }

    pub fn suspend_collection_read(&self, name: &str) -> Result<()> {
        self.update_current(name, |meta| meta.readable = false)
    }

    pub fn resume_collection_read(&self, name: &str) -> Result<()> {
        self.update_current(name, |meta| meta.readable = true)
    }

    pub fn suspend_collection_write(&self, name: &str) -> Result<()> {
        self.update_current(name, |meta| meta.writable = false)
    }

    pub fn resume_collection_write(&self, name: &str) -> Result<()> {
        self.update_current(name, |meta| meta.writable = true)
    }

    /// Remove every revision of a name; idempotent.
    pub fn drop_collection(&self, name: &str) -> Result<()> {
        let mut cache = self.cache.write();
        let Some(any) = cache.get_latest_collection(name) else {
            return Ok(());
        };
        cache.delete_collection(name);
        self.store.delete_collection(name)?;
        self.store.delete_columns_by_uid(&any.uid)?;
        self.store.delete_repositories_by_uid(&any.uid)?;
        Ok(())
    }

    pub fn get_current_collection(&self, name: &str) -> Option<Arc<CollectionMeta>> {
        self.cache.read().get_collection(name)
    }

    pub fn get_latest_collection(&self, name: &str) -> Option<Arc<CollectionMeta>> {
        self.cache.read().get_latest_collection(name)
    }

    pub fn get_collection(&self, name: &str, revision: u32) -> Option<Arc<CollectionMeta>> {
        self.cache
            .read()
            .get_collection_with(name, &|c| c.revision == revision)
    }

    /// Current revision of every enabled collection.
    pub fn get_latest_collections(&self) -> Vec<Arc<CollectionMeta>> {
        self.cache.read().get_current_collections()
    }

    /// Every cached revision.
    pub fn get_collections(&self) -> Vec<Arc<CollectionMeta>> {
        self.cache.read().get_collections_with(&|_| true)
    }

    pub fn get_collections_by_name(&self, name: &str) -> Vec<Arc<CollectionMeta>> {
        self.cache.read().get_collections_by_name(name)
    }

    pub fn get_collections_by_repo(&self, repository: &str) -> Vec<Arc<CollectionMeta>> {
        self.cache.read().get_collections_by_repo(repository)
    }

    pub fn exist_collection(&self, name: &str) -> bool {
        self.cache.read().exist_collection(name)
    }
}

#[cfg(test)]
mod tests {
    use vexadb_common::types::{DataType, IndexType};

    use crate::meta::ColumnParams;
    use crate::sqlite::SqliteMetaStore;

    use super::*;

    fn service(dir: &tempfile::TempDir) -> MetaService {
        let path = dir.path().join("meta.sqlite");
        let store = SqliteMetaStore::open(path.to_str().unwrap()).unwrap();
        let service = MetaService::new(Box::new(store));
        service.init().unwrap();
        service
    }

    fn params(name: &str) -> CollectionParams {
        CollectionParams {
            name: name.to_string(),
            max_docs_per_segment: 0,
            forward_columns: vec!["f1".to_string(), "f2".to_string()],
            index_columns: vec![ColumnParams {
                name: "v".to_string(),
                index_type: IndexType::VectorGraph,
                data_type: DataType::VectorFp32,
                dimension: 8,
                parameters: vec![],
            }],
            repository: None,
        }
    }

    #[test]
    fn create_enable_describe_drop() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);

        let meta = service.create_collection(params("c")).unwrap();
        assert_eq!(meta.revision, 0);
        assert_eq!(meta.status, CollectionStatus::Initialized);

        service.enable_collection("c", 0).unwrap();
        let current = service.get_current_collection("c").unwrap();
        assert!(current.current && current.readable && current.writable);
        assert_eq!(current.status, CollectionStatus::Serving);
        assert_eq!(current.forward_columns.len(), 2);
        assert_eq!(current.index_columns[0].dimension, 8);

        assert_eq!(service.get_latest_collections().len(), 1);
        service.drop_collection("c").unwrap();
        assert!(service.get_latest_collections().is_empty());
        assert!(!service.exist_collection("c"));
        // idempotent
        service.drop_collection("c").unwrap();
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        service.create_collection(params("c")).unwrap();
        assert_eq!(
            service.create_collection(params("c")).unwrap_err(),
            Error::DuplicateCollection
        );
    }

    #[test]
    fn at_most_one_current_revision() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        service.create_collection(params("c")).unwrap();
        service.enable_collection("c", 0).unwrap();

        let updated = service.update_collection(params("c")).unwrap();
        assert_eq!(updated.revision, 1);
        assert!(!updated.current);
        // both revisions cached, still exactly one current
        let currents: Vec<_> = service
            .get_collections_by_name("c")
            .into_iter()
            .filter(|c| c.current)
            .collect();
        assert_eq!(currents.len(), 1);
        assert_eq!(currents[0].revision, 0);

        service.enable_collection("c", 1).unwrap();
        let revisions = service.get_collections_by_name("c");
        let currents: Vec<_> = revisions.iter().filter(|c| c.current).collect();
        assert_eq!(currents.len(), 1);
        assert_eq!(currents[0].revision, 1);
        // previous revision fully suspended
        let old = revisions.iter().find(|c| c.revision == 0).unwrap();
        assert!(!old.readable && !old.writable);
    }

    #[test]
    fn update_with_immutable_change_leaves_revision_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        service.create_collection(params("c")).unwrap();
        service.enable_collection("c", 0).unwrap();

        let mut bad = params("c");
        bad.index_columns[0].data_type = DataType::VectorInt8;
        assert_eq!(
            service.update_collection(bad).unwrap_err(),
            Error::UpdateDataTypeField
        );

        let latest = service.get_latest_collection("c").unwrap();
        assert_eq!(latest.revision, 0);
        assert_eq!(latest.index_columns[0].data_type, DataType::VectorFp32);
    }

    #[test]
    fn rename_bumps_column_uid() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        let created = service.create_collection(params("c")).unwrap();
        service.enable_collection("c", 0).unwrap();

        let mut update = params("c");
        update.index_columns[0].name = "v2".to_string();
        let next = service.update_collection(update).unwrap();
        assert_ne!(next.index_columns[0].uid, created.index_columns[0].uid);
        assert_ne!(next.uuid, created.uuid);
        assert_eq!(next.uid, created.uid);
    }

    #[test]
    fn suspension_flags_touch_only_current_revision() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        service.create_collection(params("c")).unwrap();
        service.enable_collection("c", 0).unwrap();

        service.suspend_collection_write("c").unwrap();
        let current = service.get_current_collection("c").unwrap();
        assert!(!current.writable);
        assert!(current.readable);

        service.resume_collection_write("c").unwrap();
        service.suspend_collection_read("c").unwrap();
        let current = service.get_current_collection("c").unwrap();
        assert!(current.writable);
        assert!(!current.readable);
    }

    #[test]
    fn reload_restores_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.sqlite");
        {
            let store = SqliteMetaStore::open(path.to_str().unwrap()).unwrap();
            let service = MetaService::new(Box::new(store));
            service.init().unwrap();
            let mut p = params("c");
            p.repository = Some(crate::meta::RepositoryMeta {
                name: "repo".to_string(),
                connection_uri: "mysql://h/db".to_string(),
                user: "u".to_string(),
                password: "p".to_string(),
                table_name: "t".to_string(),
            });
            service.create_collection(p).unwrap();
            service.enable_collection("c", 0).unwrap();
        }

        let store = SqliteMetaStore::open(path.to_str().unwrap()).unwrap();
        let service = MetaService::new(Box::new(store));
        service.init().unwrap();
        let current = service.get_current_collection("c").unwrap();
        assert_eq!(current.index_columns.len(), 1);
        assert_eq!(current.repository_name(), "repo");
        assert_eq!(service.get_collections_by_repo("repo").len(), 1);
    }
}
