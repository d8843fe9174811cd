//! IndexAgent: the authoritative write funnel.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use vexadb_common::config::IndexConfig;
use vexadb_common::error::{Error, Result};
use vexadb_index::{CollectionStats, IndexService};
use vexadb_meta::{CollectionMeta, MetaAgent};

use crate::column_order::{ColumnOrder, ColumnOrderMap};
use crate::counter::{CollectionCounter, CollectionCounterMap};
use crate::rate_limiter::RateLimiter;
use crate::write_request::WriteRequest;

const ACQUIRE_TIMEOUT: Duration = Duration::from_millis(500);
const DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct IndexAgent {
    meta_agent: Arc<MetaAgent>,
    index_service: Arc<dyn IndexService>,
    counters: CollectionCounterMap,
    column_orders: ColumnOrderMap,
    rate_limiter: RateLimiter,
    build_pool: Arc<Semaphore>,
    build_thread_count: u32,
    /// Monotonic microseconds captured at init; proxy writes must echo it
    /// so a restarted server rejects stale CDC streams.
    agent_timestamp: u64,
}

impl IndexAgent {
    pub fn new(
        meta_agent: Arc<MetaAgent>,
        index_service: Arc<dyn IndexService>,
        config: &IndexConfig,
    ) -> Arc<Self> {
        let agent = Arc::new(IndexAgent {
            meta_agent,
            index_service,
            counters: CollectionCounterMap::new(),
            column_orders: ColumnOrderMap::new(),
            rate_limiter: RateLimiter::new(config.max_build_qps),
            build_pool: Arc::new(Semaphore::new(config.build_thread_count as usize)),
            build_thread_count: config.build_thread_count,
            agent_timestamp: monotonic_micros(),
        });
        info!("IndexAgent initialize complete.");
        agent
    }

    /// Recover collections registered before the last shutdown.
    pub async fn start(&self) -> Result<()> {
        let schemas = self.meta_agent.list_collections();
        let mut names = Vec::with_capacity(schemas.len());
        for schema in &schemas {
            names.push(schema.name.clone());
            self.column_orders.add_column_order(schema);
            self.counters.add_counter(&schema.name);
        }
        self.index_service.load_collections(&names, &schemas).await?;
        info!("IndexAgent start complete.");
        Ok(())
    }

    /// Stop accepting fan-out work and wait for in-flight tasks to finish.
    pub async fn stop(&self) -> Result<()> {
        if let Ok(permits) = self.build_pool.acquire_many(self.build_thread_count).await {
            permits.forget();
        }
        self.build_pool.close();
        info!("IndexAgent stopped.");
        Ok(())
    }

    pub fn magic_number(&self) -> u64 {
        self.agent_timestamp
    }

    pub fn get_collection_meta(&self, name: &str) -> Option<Arc<CollectionMeta>> {
        self.meta_agent.get_collection(name)
    }

    pub fn get_column_order(&self, name: &str) -> Option<Arc<ColumnOrder>> {
        self.column_orders.get_column_order(name)
    }

    pub async fn create_collection(&self, name: &str) -> Result<()> {
        self.counters.add_counter(name);

        let Some(schema) = self.meta_agent.get_latest_collection(name) else {
            error!(
                "Get latest collection from meta service failed. collection[{}]",
                name
            );
            return Err(Error::InexistentCollection);
        };
        self.column_orders.add_column_order(&schema);

        self.index_service.create_collection(name, schema).await
    }

    /// Apply a new schema revision once every in-flight write has drained.
    ///
    /// The drain has no timeout: operators who need a bound can suspend
    /// writes on the collection first.
    pub async fn update_collection(&self, name: &str, revision: u32) -> Result<()> {
        let counter = self
            .counters
            .get_counter(name)
            .ok_or(Error::RuntimeError)?;

        while counter.active_count() != 0 {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }

        let Some(schema) = self.meta_agent.get_collection_by_revision(name, revision) else {
            error!(
                "Meta service get collection revision failed. collection[{}] revision[{}]",
                name, revision
            );
            return Err(Error::InexistentCollection);
        };
        self.column_orders.update_column_order(&schema);

        self.index_service.update_collection(name, schema).await
    }

    pub async fn drop_collection(&self, name: &str) -> Result<()> {
        self.index_service.drop_collection(name).await?;
        self.counters.remove_counter(name);
        self.column_orders.remove_column_order(name);
        Ok(())
    }

    fn is_collection_suspend(&self, name: &str) -> bool {
        match self.meta_agent.get_collection(name) {
            Some(meta) => !meta.writable,
            None => false,
        }
    }

    pub async fn write(&self, request: WriteRequest) -> Result<()> {
        let row_count = request.row_count;
        if row_count == 0 {
            return Ok(());
        }

        let collection = request.collection_name.clone();
        if self.is_collection_suspend(&collection) {
            return Err(Error::SuspendedCollection);
        }

        if request.is_proxy() && request.magic_number != self.agent_timestamp {
            error!("Write request magic number mismatched.");
            return Err(Error::MismatchedMagicNumber);
        }

        if !self.rate_limiter.try_acquire(row_count, ACQUIRE_TIMEOUT).await {
            warn!(
                "Acquire permits failed. count[{}] collection[{}]",
                row_count, collection
            );
            return Err(Error::ExceedRateLimit);
        }

        let counter = self
            .counters
            .get_counter(&collection)
            .ok_or(Error::InexistentCollection)?;
        counter.add_active_count(row_count);

        // the flag may have flipped while acquiring permits
        if self.is_collection_suspend(&collection) {
            counter.sub_active_count(row_count);
            return Err(Error::SuspendedCollection);
        }

        if request.is_proxy() {
            self.proxy_write(request, counter)
        } else {
            self.direct_write(request, counter).await
        }
    }

    /// Fan out one task per row dataset on the bounded build pool.
    fn proxy_write(&self, request: WriteRequest, counter: Arc<CollectionCounter>) -> Result<()> {
        let collection = request.collection_name;
        for dataset in request.datasets {
            let pool = self.build_pool.clone();
            let index_service = self.index_service.clone();
            let counter = counter.clone();
            let collection = collection.clone();
            tokio::spawn(async move {
                match pool.acquire().await {
                    Ok(_permit) => {
                        if let Err(err) = index_service.write_records(&collection, &dataset).await
                        {
                            error!(
                                "Index service write record failed. code[{}] reason[{}] collection[{}]",
                                err.code(),
                                err.reason(),
                                collection
                            );
                        }
                    }
                    Err(_) => {
                        error!(
                            "Build pool closed, record dropped. collection[{}]",
                            collection
                        );
                    }
                }
                counter.dec_active_count();
            });
        }
        Ok(())
    }

    async fn direct_write(
        &self,
        request: WriteRequest,
        counter: Arc<CollectionCounter>,
    ) -> Result<()> {
        let result = self
            .index_service
            .write_records(&request.collection_name, &request.datasets[0])
            .await;
        counter.sub_active_count(request.row_count);
        if let Err(err) = result {
            error!(
                "Index service write records failed. collection[{}]",
                request.collection_name
            );
            return Err(err);
        }
        Ok(())
    }

    pub async fn get_latest_lsn(&self, name: &str) -> Result<(u64, String)> {
        self.index_service.get_latest_lsn(name).await
    }

    pub async fn get_collection_stats(&self, name: &str) -> Result<CollectionStats> {
        self.index_service.get_collection_stats(name).await
    }
}

fn monotonic_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}
