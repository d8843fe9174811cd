//! Binary RPC protocol adapter.
//!
//! Length-delimited frames over TCP: each frame is one method-id byte
//! followed by the prost-encoded message body; the response echoes the
//! method id. Every connection runs on its own task.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use prost::Message;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, error, info};

use vexadb_common::error::{Error, Result};
use vexadb_common::metrics::Protocol;
use vexadb_proto as proto;
use vexadb_proto::method::Method;

use crate::handler::RequestHandler;

pub struct RpcServer {
    port: u16,
    handler: Arc<RequestHandler>,
    shutdown: Notify,
}

impl RpcServer {
    pub fn new(port: u16, handler: Arc<RequestHandler>) -> Arc<Self> {
        Arc::new(RpcServer {
            port,
            handler,
            shutdown: Notify::new(),
        })
    }

    /// Accept connections until shutdown.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.port))
            .await
            .map_err(|e| {
                error!("Failed to bind rpc port. port[{}] error[{}]", self.port, e);
                Error::StartServer
            })?;
        info!("Rpc server listening on port {}", self.port);

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                accepted = listener.accept() => {
                    match accepted {
                        Ok((socket, peer)) => {
                            debug!("New rpc connection from {}", peer);
                            let handler = self.handler.clone();
                            tokio::spawn(async move {
                                if let Err(err) = handle_connection(socket, handler).await {
                                    debug!("Rpc connection closed. peer[{}] error[{}]", peer, err);
                                }
                            });
                        }
                        Err(e) => error!("Failed to accept rpc connection: {}", e),
                    }
                }
            }
        }
        info!("Rpc server stopped.");
        Ok(())
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

async fn handle_connection(
    socket: TcpStream,
    handler: Arc<RequestHandler>,
) -> std::io::Result<()> {
    let mut framed = Framed::new(socket, LengthDelimitedCodec::new());
    while let Some(frame) = framed.next().await {
        let frame = frame?;
        let response = dispatch(&handler, &frame).await;
        framed.send(response).await?;
    }
    Ok(())
}

fn encode_frame(method: u8, message: &impl Message) -> Bytes {
    let mut buffer = BytesMut::with_capacity(1 + message.encoded_len());
    buffer.put_u8(method);
    buffer.extend_from_slice(&message.encode_to_vec());
    buffer.freeze()
}

fn decode_failure(method: u8) -> Bytes {
    encode_frame(method, &proto::Status::from(&Error::DeserializeError))
}

/// Decode one frame, run the verb, encode the response.
pub(crate) async fn dispatch(handler: &RequestHandler, frame: &[u8]) -> Bytes {
    let Some((&method_byte, body)) = frame.split_first() else {
        return encode_frame(0, &proto::Status::from(&Error::InvalidArgument));
    };
    let Some(method) = Method::from_u8(method_byte) else {
        return encode_frame(method_byte, &proto::Status::from(&Error::InvalidArgument));
    };

    match method {
        Method::CreateCollection => match proto::CollectionConfig::decode(body) {
            Ok(request) => {
                encode_frame(method_byte, &handler.create_collection(&request).await)
            }
            Err(_) => decode_failure(method_byte),
        },
        Method::DropCollection => match proto::CollectionName::decode(body) {
            Ok(request) => encode_frame(method_byte, &handler.drop_collection(&request).await),
            Err(_) => decode_failure(method_byte),
        },
        Method::DescribeCollection => match proto::CollectionName::decode(body) {
            Ok(request) => {
                encode_frame(method_byte, &handler.describe_collection(&request).await)
            }
            Err(_) => decode_failure(method_byte),
        },
        Method::ListCollections => match proto::ListCondition::decode(body) {
            Ok(request) => encode_frame(method_byte, &handler.list_collections(&request).await),
            Err(_) => decode_failure(method_byte),
        },
        Method::StatsCollection => match proto::CollectionName::decode(body) {
            Ok(request) => encode_frame(method_byte, &handler.stats_collection(&request).await),
            Err(_) => decode_failure(method_byte),
        },
        Method::Write => match proto::WriteRequest::decode(body) {
            Ok(request) => {
                encode_frame(method_byte, &handler.write(&request, Protocol::Grpc).await)
            }
            Err(_) => decode_failure(method_byte),
        },
        Method::Query => match proto::QueryRequest::decode(body) {
            Ok(request) => {
                encode_frame(method_byte, &handler.query(&request, Protocol::Grpc).await)
            }
            Err(_) => decode_failure(method_byte),
        },
        Method::GetDocumentByKey => match proto::GetDocumentRequest::decode(body) {
            Ok(request) => encode_frame(
                method_byte,
                &handler.get_document_by_key(&request, Protocol::Grpc).await,
            ),
            Err(_) => decode_failure(method_byte),
        },
        Method::GetVersion => encode_frame(method_byte, &handler.get_version()),
    }
}

#[cfg(test)]
mod tests {
    use vexadb_admin::AdminAgent;
    use vexadb_agent::IndexAgent;
    use vexadb_common::config::{IndexConfig, MetaConfig, QueryConfig};
    use vexadb_common::types::{DataType, IndexType};
    use vexadb_index::memory::MemoryIndexService;
    use vexadb_meta::MetaAgent;
    use vexadb_query::QueryAgent;

    use super::*;

    async fn handler(dir: &tempfile::TempDir) -> Arc<RequestHandler> {
        let config = MetaConfig {
            uri: format!("sqlite://{}", dir.path().join("meta.sqlite").display()),
        };
        let meta = MetaAgent::create(&config).unwrap();
        meta.init().unwrap();
        let index_service = Arc::new(MemoryIndexService::new());
        let index_agent =
            IndexAgent::new(meta.clone(), index_service.clone(), &IndexConfig::default());
        index_agent.start().await.unwrap();
        let query_agent = QueryAgent::new(meta.clone(), index_service, &QueryConfig::default());
        query_agent.start().unwrap();
        let admin_agent = AdminAgent::new(meta, index_agent.clone(), query_agent.clone());
        RequestHandler::new(index_agent, query_agent, admin_agent, "0.1.0-test")
    }

    fn request_frame(method: Method, message: &impl Message) -> Vec<u8> {
        let mut frame = vec![method.as_u8()];
        frame.extend(message.encode_to_vec());
        frame
    }

    #[tokio::test]
    async fn create_and_describe_over_rpc_frames() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(&dir).await;

        let config = proto::CollectionConfig {
            collection_name: "c".to_string(),
            forward_column_names: vec!["f1".to_string()],
            index_column_params: vec![proto::IndexColumnParam {
                column_name: "v".to_string(),
                index_type: IndexType::VectorGraph as i32,
                data_type: DataType::VectorFp32 as i32,
                dimension: 4,
                extra_params: vec![],
            }],
            ..Default::default()
        };
        let response = dispatch(&handler, &request_frame(Method::CreateCollection, &config)).await;
        assert_eq!(response[0], Method::CreateCollection.as_u8());
        let status = proto::Status::decode(&response[1..]).unwrap();
        assert_eq!(status.code, 0);

        let name = proto::CollectionName {
            collection_name: "c".to_string(),
        };
        let response =
            dispatch(&handler, &request_frame(Method::DescribeCollection, &name)).await;
        let describe = proto::DescribeCollectionResponse::decode(&response[1..]).unwrap();
        assert_eq!(describe.collection.unwrap().collection_name, "c");
    }

    #[tokio::test]
    async fn version_and_bad_frames() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(&dir).await;

        let response = dispatch(
            &handler,
            &request_frame(Method::GetVersion, &proto::GetVersionRequest::default()),
        )
        .await;
        let version = proto::GetVersionResponse::decode(&response[1..]).unwrap();
        assert_eq!(version.version, "0.1.0-test");

        // unknown method id
        let response = dispatch(&handler, &[200u8, 1, 2, 3]).await;
        let status = proto::Status::decode(&response[1..]).unwrap();
        assert_eq!(status.code, Error::InvalidArgument.code());

        // empty frame
        let response = dispatch(&handler, &[]).await;
        let status = proto::Status::decode(&response[1..]).unwrap();
        assert_eq!(status.code, Error::InvalidArgument.code());
    }
}
