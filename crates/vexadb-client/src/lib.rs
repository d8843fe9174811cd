//! Blocking client for VexaDB
//!
//! The same verbs over either transport: binary RPC frames on a pooled
//! TCP channel, or HTTP/JSON via reqwest. Transport failures are retried
//! up to the configured budget; semantic errors come back as the status
//! pair and are never retried.

mod http_channel;
mod rpc_channel;

use prost::Message;
use tracing::{info, warn};

use vexadb_common::error::{Error, Result};
use vexadb_proto as proto;
use vexadb_proto::method::Method;

use crate::http_channel::HttpChannel;
use crate::rpc_channel::RpcChannel;

/// Channel behavior knobs.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
    /// Transport-failure retries per call
    pub retry_count: u32,
    /// Pooled connections kept per channel
    pub pool_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            timeout_ms: 1000,
            retry_count: 3,
            pool_size: 4,
        }
    }
}

enum Channel {
    Rpc(RpcChannel),
    Http(HttpChannel),
}

pub struct VexaClient {
    channel: Channel,
}

impl VexaClient {
    /// Connect over the binary RPC transport and handshake versions.
    pub fn connect_rpc(address: &str, options: ClientOptions) -> Result<Self> {
        let client = VexaClient {
            channel: Channel::Rpc(RpcChannel::new(address, options)),
        };
        client.handshake()?;
        Ok(client)
    }

    /// Connect over the HTTP transport and handshake versions.
    pub fn connect_http(address: &str, options: ClientOptions) -> Result<Self> {
        let client = VexaClient {
            channel: Channel::Http(HttpChannel::new(address, options)?),
        };
        client.handshake()?;
        Ok(client)
    }

    fn handshake(&self) -> Result<()> {
        let response = self.get_version()?;
        let server_version = response.version;
        let client_version = env!("CARGO_PKG_VERSION");
        if server_version != client_version {
            warn!(
                "Server version mismatched. server[{}] client[{}]",
                server_version, client_version
            );
        } else {
            info!("Connected. server version[{}]", server_version);
        }
        Ok(())
    }

    pub fn create_collection(&self, config: &proto::CollectionConfig) -> Result<proto::Status> {
        match &self.channel {
            Channel::Rpc(rpc) => rpc.call(Method::CreateCollection, config),
            Channel::Http(http) => http.post_json(
                &format!("/v1/collection/{}", config.collection_name),
                config,
            ),
        }
    }

    pub fn drop_collection(&self, name: &str) -> Result<proto::Status> {
        match &self.channel {
            Channel::Rpc(rpc) => rpc.call(
                Method::DropCollection,
                &proto::CollectionName {
                    collection_name: name.to_string(),
                },
            ),
            Channel::Http(http) => http.delete(&format!("/v1/collection/{name}")),
        }
    }

    pub fn describe_collection(&self, name: &str) -> Result<proto::DescribeCollectionResponse> {
        match &self.channel {
            Channel::Rpc(rpc) => rpc.call(
                Method::DescribeCollection,
                &proto::CollectionName {
                    collection_name: name.to_string(),
                },
            ),
            Channel::Http(http) => http.get(&format!("/v1/collection/{name}")),
        }
    }

    pub fn list_collections(
        &self,
        condition: &proto::ListCondition,
    ) -> Result<proto::ListCollectionsResponse> {
        match &self.channel {
            Channel::Rpc(rpc) => rpc.call(Method::ListCollections, condition),
            Channel::Http(http) => {
                let path = if condition.repository_name.is_empty() {
                    "/v1/collections".to_string()
                } else {
                    format!("/v1/collections?repository={}", condition.repository_name)
                };
                http.get(&path)
            }
        }
    }

    pub fn stats_collection(&self, name: &str) -> Result<proto::StatsCollectionResponse> {
        match &self.channel {
            Channel::Rpc(rpc) => rpc.call(
                Method::StatsCollection,
                &proto::CollectionName {
                    collection_name: name.to_string(),
                },
            ),
            Channel::Http(http) => http.get(&format!("/v1/collection/{name}/stats")),
        }
    }

    pub fn write(&self, request: &proto::WriteRequest) -> Result<proto::Status> {
        match &self.channel {
            Channel::Rpc(rpc) => rpc.call(Method::Write, request),
            Channel::Http(http) => http.post_json(
                &format!("/v1/collection/{}/index", request.collection_name),
                request,
            ),
        }
    }

    pub fn query(&self, request: &proto::QueryRequest) -> Result<proto::QueryResponse> {
        match &self.channel {
            Channel::Rpc(rpc) => rpc.call(Method::Query, request),
            Channel::Http(http) => http.post_json(
                &format!("/v1/collection/{}/query", request.collection_name),
                request,
            ),
        }
    }

    pub fn get_document_by_key(
        &self,
        name: &str,
        primary_key: u64,
    ) -> Result<proto::GetDocumentResponse> {
        match &self.channel {
            Channel::Rpc(rpc) => rpc.call(
                Method::GetDocumentByKey,
                &proto::GetDocumentRequest {
                    collection_name: name.to_string(),
                    primary_key,
                },
            ),
            Channel::Http(http) => {
                http.get(&format!("/v1/collection/{name}/doc?key={primary_key}"))
            }
        }
    }

    pub fn get_version(&self) -> Result<proto::GetVersionResponse> {
        match &self.channel {
            Channel::Rpc(rpc) => rpc.call(Method::GetVersion, &proto::GetVersionRequest::default()),
            Channel::Http(http) => http.get("/service_version"),
        }
    }
}

/// Encode one request frame: method id then prost body.
pub(crate) fn encode_frame(method: Method, message: &impl Message) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + message.encoded_len());
    frame.push(method.as_u8());
    frame.extend(message.encode_to_vec());
    frame
}

/// Split a response frame and decode the body, checking the method echo.
pub(crate) fn decode_frame<T: Message + Default>(method: Method, frame: &[u8]) -> Result<T> {
    let Some((&echoed, body)) = frame.split_first() else {
        return Err(Error::DeserializeError);
    };
    if echoed != method.as_u8() {
        return Err(Error::DeserializeError);
    }
    T::decode(body).map_err(|_| Error::DeserializeError)
}
