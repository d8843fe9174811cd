//! Column ordinal snapshots used to reorder out-of-order write values.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use vexadb_meta::CollectionMeta;

/// Immutable name -> ordinal maps of one collection revision.
pub struct ColumnOrder {
    forward_order: HashMap<String, usize>,
    index_order: HashMap<String, usize>,
}

impl ColumnOrder {
    pub fn new(meta: &CollectionMeta) -> Self {
        ColumnOrder {
            forward_order: meta
                .forward_columns
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect(),
            index_order: meta
                .index_columns
                .iter()
                .enumerate()
                .map(|(i, column)| (column.name.clone(), i))
                .collect(),
        }
    }

    pub fn forward_order(&self) -> &HashMap<String, usize> {
        &self.forward_order
    }

    pub fn index_order(&self) -> &HashMap<String, usize> {
        &self.index_order
    }
}

/// name -> snapshot registry, rebuilt on create and schema update.
#[derive(Default)]
pub struct ColumnOrderMap {
    orders: RwLock<HashMap<String, Arc<ColumnOrder>>>,
}

impl ColumnOrderMap {
    pub fn new() -> Self {
        ColumnOrderMap::default()
    }

    pub fn add_column_order(&self, meta: &CollectionMeta) {
        self.orders
            .write()
            .insert(meta.name.clone(), Arc::new(ColumnOrder::new(meta)));
    }

    pub fn update_column_order(&self, meta: &CollectionMeta) {
        self.add_column_order(meta);
    }

    pub fn remove_column_order(&self, name: &str) {
        self.orders.write().remove(name);
    }

    pub fn get_column_order(&self, name: &str) -> Option<Arc<ColumnOrder>> {
        self.orders.read().get(name).cloned()
    }
}
