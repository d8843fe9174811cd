//! Server orchestration
//!
//! Agents come up meta -> index -> query -> admin -> servers and stop in
//! reverse order; each agent drains its own pool before returning.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};
use anyhow::{anyhow, Result};

use vexadb_admin::AdminAgent;
use vexadb_agent::IndexAgent;
use vexadb_api::{HttpServer, RequestHandler, RpcServer};
use vexadb_common::config::Config;
use vexadb_index::memory::MemoryIndexService;
use vexadb_meta::MetaAgent;
use vexadb_query::QueryAgent;

/// Main VexaDB server orchestrating all components
pub struct VexaServer {
    config: Config,

    meta_agent: Arc<MetaAgent>,
    index_agent: Arc<IndexAgent>,
    query_agent: Arc<QueryAgent>,
    #[allow(dead_code)]
    admin_agent: Arc<AdminAgent>,

    rpc_server: Option<Arc<RpcServer>>,
    http_server: Option<Arc<HttpServer>>,
}

impl VexaServer {
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing VexaDB components...");

        let meta_agent =
            MetaAgent::create(&config.meta).map_err(|e| anyhow!("meta agent: {e}"))?;
        meta_agent.init().map_err(|e| anyhow!("meta init: {e}"))?;
        meta_agent.start().map_err(|e| anyhow!("meta start: {e}"))?;

        let index_service = Arc::new(MemoryIndexService::new());
        let index_agent = IndexAgent::new(meta_agent.clone(), index_service.clone(), &config.index);
        index_agent
            .start()
            .await
            .map_err(|e| anyhow!("index agent start: {e}"))?;

        let query_agent = QueryAgent::new(meta_agent.clone(), index_service, &config.query);
        query_agent
            .start()
            .map_err(|e| anyhow!("query agent start: {e}"))?;

        let admin_agent = AdminAgent::new(meta_agent.clone(), index_agent.clone(), query_agent.clone());

        let handler = RequestHandler::new(
            index_agent.clone(),
            query_agent.clone(),
            admin_agent.clone(),
            env!("CARGO_PKG_VERSION"),
        );

        let rpc_server = config
            .server
            .grpc_enabled()
            .then(|| RpcServer::new(config.server.grpc_listen_port, handler.clone()));
        let http_server = config
            .server
            .http_enabled()
            .then(|| HttpServer::new(config.server.http_listen_port, handler.clone()));

        info!("VexaDB initialization complete");

        Ok(Self {
            config,
            meta_agent,
            index_agent,
            query_agent,
            admin_agent,
            rpc_server,
            http_server,
        })
    }

    /// Serve until every listener exits.
    pub async fn run(&self) -> Result<()> {
        let mut listeners = JoinSet::new();

        if let Some(rpc_server) = self.rpc_server.clone() {
            listeners.spawn(async move {
                if let Err(e) = rpc_server.run().await {
                    error!("Rpc server error: {}", e);
                }
            });
        }
        if let Some(http_server) = self.http_server.clone() {
            listeners.spawn(async move {
                if let Err(e) = http_server.run().await {
                    error!("Http server error: {}", e);
                }
            });
        }

        info!(
            "VexaDB server started. rpc_port[{}] http_port[{}]",
            self.config.server.grpc_listen_port, self.config.server.http_listen_port
        );

        while let Some(joined) = listeners.join_next().await {
            joined?;
        }
        Ok(())
    }

    /// Graceful shutdown in reverse init order.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Initiating graceful shutdown...");

        if let Some(http_server) = &self.http_server {
            http_server.shutdown().await.ok();
        }
        if let Some(rpc_server) = &self.rpc_server {
            rpc_server.shutdown();
        }
        self.query_agent.stop().ok();
        self.index_agent.stop().await.ok();
        self.meta_agent.stop().ok();
        self.meta_agent.cleanup().ok();

        info!("Shutdown complete");
        Ok(())
    }
}
