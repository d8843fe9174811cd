//! Configuration management for VexaDB

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{Error, Result};

/// Hard cap applied to every configurable thread pool.
pub const MAX_THREAD_COUNT: u32 = 500;

/// Main configuration structure for VexaDB
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Logging configuration
    pub log: LogConfig,

    /// Index subsystem configuration
    pub index: IndexConfig,

    /// Meta catalog configuration
    pub meta: MetaConfig,

    /// Query subsystem configuration
    pub query: QueryConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            error!("Failed to read config file: {}", e);
            Error::LoadConfig
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            error!("Failed to parse TOML config: {}", e);
            Error::LoadConfig
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges; called after load and before server start.
    pub fn validate(&self) -> Result<()> {
        let protocols: Vec<&str> = self.server.protocol.split('|').collect();
        if !protocols.iter().any(|p| *p == "grpc" || *p == "http") {
            error!(
                "Config error, protocol must contain grpc or http at least. protocol[{}]",
                self.server.protocol
            );
            return Err(Error::ConfigError);
        }

        if !matches!(
            self.log.logger_type.as_str(),
            "AppendLogger" | "ConsoleLogger" | "SysLogger"
        ) {
            error!("Config error, unknown logger type. logger[{}]", self.log.logger_type);
            return Err(Error::ConfigError);
        }
        if self.log.log_level > 4 {
            error!("Config error, log_level must be in [0, 4]. level[{}]", self.log.log_level);
            return Err(Error::ConfigError);
        }

        if self.index.build_thread_count == 0 || self.index.build_thread_count > MAX_THREAD_COUNT {
            error!(
                "Config error, index.build_thread_count must be in [1, {}]. count[{}]",
                MAX_THREAD_COUNT, self.index.build_thread_count
            );
            return Err(Error::ConfigError);
        }
        if self.index.dump_thread_count == 0 || self.index.dump_thread_count > MAX_THREAD_COUNT {
            error!(
                "Config error, index.dump_thread_count must be in [1, {}]. count[{}]",
                MAX_THREAD_COUNT, self.index.dump_thread_count
            );
            return Err(Error::ConfigError);
        }
        if self.query.thread_count == 0 || self.query.thread_count > MAX_THREAD_COUNT {
            error!(
                "Config error, query.thread_count must be in [1, {}]. count[{}]",
                MAX_THREAD_COUNT, self.query.thread_count
            );
            return Err(Error::ConfigError);
        }

        if self.meta.scheme().is_none() {
            error!("Config error, invalid meta uri. uri[{}]", self.meta.uri);
            return Err(Error::ConfigError);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Enabled protocols, '|' separated ("grpc", "http")
    pub protocol: String,
    /// Binary RPC listen port
    pub grpc_listen_port: u16,
    /// HTTP listen port
    pub http_listen_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol: "grpc|http".to_string(),
            grpc_listen_port: 16000,
            http_listen_port: 16001,
        }
    }
}

impl ServerConfig {
    pub fn grpc_enabled(&self) -> bool {
        self.protocol.split('|').any(|p| p == "grpc")
    }

    pub fn http_enabled(&self) -> bool {
        self.protocol.split('|').any(|p| p == "http")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log output directory
    pub log_directory: String,
    /// Log file name
    pub log_file: String,
    /// Log level, 0..4 maps debug..fatal
    pub log_level: u32,
    /// Logger backend: AppendLogger, ConsoleLogger or SysLogger
    pub logger_type: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_directory: "./log/".to_string(),
            log_file: "vexadb.log".to_string(),
            log_level: 2,
            logger_type: "AppendLogger".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Fan-out write pool size
    pub build_thread_count: u32,
    /// Dump pool size, passed through to the index layer
    pub dump_thread_count: u32,
    /// Write admission budget in rows per second, 0 means unlimited
    pub max_build_qps: u32,
    /// Index data directory, passed through to the index layer
    pub directory: String,
    /// Flush interval in seconds, passed through to the index layer
    pub flush_internal_s: u32,
    /// Optimize interval in seconds, passed through to the index layer
    pub optimize_internal_s: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            build_thread_count: 10,
            dump_thread_count: 3,
            max_build_qps: 0,
            directory: ".".to_string(),
            flush_internal_s: 300,
            optimize_internal_s: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    /// Catalog DSN; the scheme selects the backing driver
    pub uri: String,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            uri: "sqlite://./vexadb_meta.sqlite".to_string(),
        }
    }
}

impl MetaConfig {
    /// URI scheme, `None` when the DSN carries no `scheme://` prefix.
    pub fn scheme(&self) -> Option<&str> {
        self.uri.split_once("://").map(|(scheme, _)| scheme)
    }

    /// Path component of the DSN.
    pub fn path(&self) -> &str {
        self.uri
            .split_once("://")
            .map(|(_, path)| path)
            .unwrap_or(self.uri.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Query pool size, defaults to hardware concurrency
    pub thread_count: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            thread_count: num_cpus::get().min(MAX_THREAD_COUNT as usize) as u32,
        }
    }
}
