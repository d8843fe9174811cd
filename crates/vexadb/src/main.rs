//! VexaDB - vector search engine server
//!
//! Single binary serving k-NN queries and streamed writes over binary RPC
//! and HTTP/JSON.

use clap::{Parser, Subcommand};
use tracing::info;
use anyhow::Result;

mod logging;
mod server;

use vexadb_common::config::Config;

use server::VexaServer;

#[derive(Parser)]
#[command(name = "vexadb")]
#[command(author, version, about = "VexaDB - vector search engine server", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the VexaDB server
    Server {
        /// Configuration file path; defaults apply when omitted
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Server { config } => {
            let config = match config {
                Some(path) => Config::load(&path)?,
                None => Config::default(),
            };
            config.validate()?;

            let _log_guard = logging::init(&config.log)?;
            info!(
                "Load config complete. protocol[{}] grpc_listen_port[{}] http_listen_port[{}] \
                 build_thread_count[{}] dump_thread_count[{}] max_build_qps[{}] \
                 index_directory[{}] flush_internal[{}] optimize_internal[{}] \
                 meta_uri[{}] query_thread_count[{}]",
                config.server.protocol,
                config.server.grpc_listen_port,
                config.server.http_listen_port,
                config.index.build_thread_count,
                config.index.dump_thread_count,
                config.index.max_build_qps,
                config.index.directory,
                config.index.flush_internal_s,
                config.index.optimize_internal_s,
                config.meta.uri,
                config.query.thread_count,
            );

            let server = VexaServer::new(config).await?;

            let shutdown = async {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutdown signal received");
            };

            tokio::select! {
                result = server.run() => result?,
                _ = shutdown => {
                    server.shutdown().await?;
                }
            }
        }

        Commands::Version => {
            println!("VexaDB version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
