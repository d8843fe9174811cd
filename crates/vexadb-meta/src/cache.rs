//! In-memory multi-revision catalog cache.
//!
//! Keyed by collection name with revisions ordered newest first, plus a
//! uuid reverse index. The owning service's lock serializes every call;
//! the cache itself takes no locks.

use std::collections::HashMap;
use std::sync::Arc;

use vexadb_common::error::{Error, Result};

use crate::meta::{CollectionMeta, ColumnMeta, RepositoryMeta};

/// Predicate over cached revisions.
pub type CollectionFilter<'a> = &'a dyn Fn(&CollectionMeta) -> bool;

#[derive(Default)]
pub struct MetaCache {
    /// name -> revisions, descending by revision
    cache: HashMap<String, Vec<Arc<CollectionMeta>>>,
    /// uuid -> revision
    mapping: HashMap<String, Arc<CollectionMeta>>,
}

impl MetaCache {
    pub fn new() -> Self {
        MetaCache::default()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.mapping.clear();
    }

    pub fn exist_collection(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Append one revision, keeping the per-name list ordered.
    pub fn append_collection(&mut self, collection: Arc<CollectionMeta>) {
        let revisions = self.cache.entry(collection.name.clone()).or_default();
        revisions.push(collection.clone());
        revisions.sort_by(|a, b| b.revision.cmp(&a.revision));
        self.mapping.insert(collection.uuid.clone(), collection);
    }

    /// Swap the revision with the same uuid for an updated snapshot.
    pub fn replace_collection(&mut self, collection: Arc<CollectionMeta>) -> Result<()> {
        let revisions = self
            .cache
            .get_mut(&collection.name)
            .ok_or(Error::InexistentCollection)?;
        let slot = revisions
            .iter_mut()
            .find(|c| c.uuid == collection.uuid)
            .ok_or(Error::InexistentCollection)?;
        *slot = collection.clone();
        self.mapping.insert(collection.uuid.clone(), collection);
        Ok(())
    }

    /// Remove every revision of a name.
    pub fn delete_collection(&mut self, name: &str) {
        if let Some(revisions) = self.cache.remove(name) {
            for collection in revisions {
                self.mapping.remove(&collection.uuid);
            }
        }
    }

    /// Attach a column to the revision identified by uuid; used while
    /// loading the store, before any snapshot escapes the cache.
    pub fn append_column(&mut self, collection_uuid: &str, column: ColumnMeta) -> Result<()> {
        self.mutate_by_uuid(collection_uuid, |meta| meta.index_columns.push(column))
    }

    /// Attach a repository to the revision identified by uuid.
    pub fn append_repository(
        &mut self,
        collection_uuid: &str,
        repository: RepositoryMeta,
    ) -> Result<()> {
        self.mutate_by_uuid(collection_uuid, |meta| meta.repository = Some(repository))
    }

    fn mutate_by_uuid(
        &mut self,
        uuid: &str,
        mutate: impl FnOnce(&mut CollectionMeta),
    ) -> Result<()> {
        let name = self
            .mapping
            .get(uuid)
            .map(|c| c.name.clone())
            .ok_or(Error::InvalidArgument)?;
        let revisions = self.cache.get_mut(&name).ok_or(Error::InvalidArgument)?;
        let slot = revisions
            .iter_mut()
            .find(|c| c.uuid == uuid)
            .ok_or(Error::InvalidArgument)?;
        mutate(Arc::make_mut(slot));
        self.mapping.insert(uuid.to_string(), slot.clone());
        Ok(())
    }

    /// Current revision of a name.
    pub fn get_collection(&self, name: &str) -> Option<Arc<CollectionMeta>> {
        self.get_collection_with(name, &|c| c.current)
    }

    /// Highest revision of a name regardless of current flag.
    pub fn get_latest_collection(&self, name: &str) -> Option<Arc<CollectionMeta>> {
        self.cache.get(name).and_then(|l| l.first().cloned())
    }

    /// First revision of a name matching the filter.
    pub fn get_collection_with(
        &self,
        name: &str,
        filter: CollectionFilter<'_>,
    ) -> Option<Arc<CollectionMeta>> {
        self.cache
            .get(name)?
            .iter()
            .find(|c| filter(c))
            .cloned()
    }

    pub fn get_collection_by_uuid(&self, uuid: &str) -> Option<Arc<CollectionMeta>> {
        self.mapping.get(uuid).cloned()
    }

    /// Current revision of every name.
    pub fn get_current_collections(&self) -> Vec<Arc<CollectionMeta>> {
        self.cache
            .values()
            .filter_map(|revisions| revisions.iter().find(|c| c.current).cloned())
            .collect()
    }

    /// Every cached revision matching the filter.
    pub fn get_collections_with(&self, filter: CollectionFilter<'_>) -> Vec<Arc<CollectionMeta>> {
        self.mapping
            .values()
            .filter(|c| filter(c))
            .cloned()
            .collect()
    }

    /// Every revision of one name, newest first.
    pub fn get_collections_by_name(&self, name: &str) -> Vec<Arc<CollectionMeta>> {
        self.cache.get(name).cloned().unwrap_or_default()
    }

    /// Current serving revisions attached to a repository.
    pub fn get_collections_by_repo(&self, repository: &str) -> Vec<Arc<CollectionMeta>> {
        self.cache
            .values()
            .filter_map(|revisions| {
                revisions
                    .iter()
                    .find(|c| c.repository_name() == repository && c.current && c.serving())
                    .cloned()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use vexadb_common::types::CollectionStatus;

    use super::*;

    fn collection(name: &str, uuid: &str, revision: u32, current: bool) -> Arc<CollectionMeta> {
        Arc::new(CollectionMeta {
            name: name.to_string(),
            uid: format!("{name}-uid"),
            uuid: uuid.to_string(),
            revision,
            status: CollectionStatus::Serving,
            current,
            readable: current,
            writable: current,
            max_docs_per_segment: 0,
            forward_columns: vec![],
            index_columns: vec![],
            repository: None,
        })
    }

    #[test]
    fn revisions_stay_ordered_descending() {
        let mut cache = MetaCache::new();
        cache.append_collection(collection("c", "a", 0, false));
        cache.append_collection(collection("c", "c", 2, true));
        cache.append_collection(collection("c", "b", 1, false));

        let latest = cache.get_latest_collection("c").unwrap();
        assert_eq!(latest.revision, 2);
        let all = cache.get_collections_by_name("c");
        assert_eq!(
            all.iter().map(|c| c.revision).collect::<Vec<_>>(),
            vec![2, 1, 0]
        );
    }

    #[test]
    fn current_lookup_uses_current_flag() {
        let mut cache = MetaCache::new();
        cache.append_collection(collection("c", "a", 0, false));
        cache.append_collection(collection("c", "b", 1, true));
        assert_eq!(cache.get_collection("c").unwrap().uuid, "b");
        assert_eq!(cache.get_collection_by_uuid("a").unwrap().revision, 0);
        assert!(cache.get_collection("missing").is_none());
    }

    #[test]
    fn delete_removes_reverse_mappings() {
        let mut cache = MetaCache::new();
        cache.append_collection(collection("c", "a", 0, true));
        cache.append_collection(collection("d", "b", 0, true));
        cache.delete_collection("c");
        assert!(!cache.exist_collection("c"));
        assert!(cache.get_collection_by_uuid("a").is_none());
        assert!(cache.get_collection_by_uuid("b").is_some());
    }

    #[test]
    fn replace_updates_both_maps() {
        let mut cache = MetaCache::new();
        cache.append_collection(collection("c", "a", 0, false));
        let mut updated = (*cache.get_latest_collection("c").unwrap()).clone();
        updated.current = true;
        cache.replace_collection(Arc::new(updated)).unwrap();
        assert!(cache.get_collection("c").is_some());
        assert!(cache.get_collection_by_uuid("a").unwrap().current);
    }

    #[test]
    fn append_column_attaches_by_uuid() {
        use vexadb_common::types::{DataType, IndexType};

        let mut cache = MetaCache::new();
        cache.append_collection(collection("c", "a", 0, true));
        cache
            .append_column(
                "a",
                ColumnMeta {
                    name: "v".to_string(),
                    uid: "col".to_string(),
                    index_type: IndexType::VectorGraph,
                    data_type: DataType::VectorFp32,
                    dimension: 4,
                    parameters: vec![],
                },
            )
            .unwrap();
        assert_eq!(cache.get_collection("c").unwrap().index_columns.len(), 1);
        assert!(cache
            .append_column("missing", ColumnMeta {
                name: "v".to_string(),
                uid: "col".to_string(),
                index_type: IndexType::VectorGraph,
                data_type: DataType::VectorFp32,
                dimension: 4,
                parameters: vec![],
            })
            .is_err());
    }

    #[test]
    fn repo_filter_requires_current_and_serving() {
        let mut cache = MetaCache::new();
        let mut with_repo = (*collection("c", "a", 0, true)).clone();
        with_repo.repository = Some(RepositoryMeta {
            name: "repo".to_string(),
            connection_uri: String::new(),
            user: String::new(),
            password: String::new(),
            table_name: "t".to_string(),
        });
        cache.append_collection(Arc::new(with_repo));
        cache.append_collection(collection("d", "b", 0, true));

        let matched = cache.get_collections_by_repo("repo");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "c");
        assert!(cache.get_collections_by_repo("other").is_empty());
    }
}
