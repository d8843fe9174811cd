//! HTTP/JSON protocol adapter.
//!
//! Routes per the public surface; semantic errors come back as HTTP 200
//! with a `{code, reason}` status object, method mismatches as 405 with an
//! `Allowed` header carrying the same status body.

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpResponse};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::info;

use vexadb_common::error::{Error, Result};
use vexadb_common::metrics::Protocol;
use vexadb_proto as proto;

use crate::handler::RequestHandler;

pub struct HttpServer {
    port: u16,
    handler: Arc<RequestHandler>,
    handle: Mutex<Option<ServerHandle>>,
}

impl HttpServer {
    pub fn new(port: u16, handler: Arc<RequestHandler>) -> Arc<Self> {
        Arc::new(HttpServer {
            port,
            handler,
            handle: Mutex::new(None),
        })
    }

    /// Bind and serve until shutdown.
    pub async fn run(&self) -> Result<()> {
        let handler = self.handler.clone();
        let server = actix_web::HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(handler.clone()))
                .service(
                    web::resource("/v1/collection/{name}/stats")
                        .route(web::get().to(stats_collection))
                        .default_service(web::to(|| async { method_not_allowed("GET") })),
                )
                .service(
                    web::resource("/v1/collection/{name}/index")
                        .route(web::post().to(write))
                        .default_service(web::to(|| async { method_not_allowed("POST") })),
                )
                .service(
                    web::resource("/v1/collection/{name}/query")
                        .route(web::post().to(query))
                        .default_service(web::to(|| async { method_not_allowed("POST") })),
                )
                .service(
                    web::resource("/v1/collection/{name}/doc")
                        .route(web::get().to(get_document_by_key))
                        .default_service(web::to(|| async { method_not_allowed("GET") })),
                )
                .service(
                    web::resource("/v1/collection/{name}")
                        .route(web::post().to(create_collection))
                        .route(web::get().to(describe_collection))
                        .route(web::delete().to(drop_collection))
                        .default_service(web::to(|| async { method_not_allowed("POST, GET, DELETE") })),
                )
                .service(
                    web::resource("/v1/collections")
                        .route(web::get().to(list_collections))
                        .default_service(web::to(|| async { method_not_allowed("GET") })),
                )
                .service(
                    web::resource("/service_version")
                        .route(web::get().to(service_version))
                        .default_service(web::to(|| async { method_not_allowed("GET") })),
                )
        })
        .bind(("0.0.0.0", self.port))
        .map_err(|e| {
            tracing::error!("Failed to bind http port. port[{}] error[{}]", self.port, e);
            Error::StartServer
        })?
        .run();

        info!("Http server listening on port {}", self.port);
        *self.handle.lock() = Some(server.handle());
        server.await.map_err(|_| Error::RuntimeError)
    }

    pub async fn shutdown(&self) -> Result<()> {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            handle.stop(true).await;
        }
        info!("Http server stopped.");
        Ok(())
    }
}

fn method_not_allowed(allowed: &str) -> HttpResponse {
    let status = proto::Status {
        code: Error::InvalidQuery.code(),
        reason: format!("{}: invalid http method", Error::InvalidQuery.reason()),
    };
    HttpResponse::MethodNotAllowed()
        .insert_header(("Allowed", allowed))
        .json(status)
}

/// Decode a JSON body, ignoring unknown fields like the rest of the
/// server surface.
fn parse_body<T: DeserializeOwned + Default>(body: &web::Bytes) -> Result<T> {
    if body.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|_| Error::InvalidArgument)
}

async fn create_collection(
    handler: web::Data<Arc<RequestHandler>>,
    path: web::Path<String>,
    body: web::Bytes,
) -> HttpResponse {
    let status = match parse_body::<proto::CollectionConfig>(&body) {
        Ok(mut config) => {
            if config.collection_name.is_empty() {
                config.collection_name = path.into_inner();
            }
            handler.create_collection(&config).await
        }
        Err(err) => proto::Status::from(&err),
    };
    HttpResponse::Ok().json(status)
}

async fn describe_collection(
    handler: web::Data<Arc<RequestHandler>>,
    path: web::Path<String>,
) -> HttpResponse {
    let request = proto::CollectionName {
        collection_name: path.into_inner(),
    };
    HttpResponse::Ok().json(handler.describe_collection(&request).await)
}

async fn drop_collection(
    handler: web::Data<Arc<RequestHandler>>,
    path: web::Path<String>,
) -> HttpResponse {
    let request = proto::CollectionName {
        collection_name: path.into_inner(),
    };
    HttpResponse::Ok().json(handler.drop_collection(&request).await)
}

async fn stats_collection(
    handler: web::Data<Arc<RequestHandler>>,
    path: web::Path<String>,
) -> HttpResponse {
    let request = proto::CollectionName {
        collection_name: path.into_inner(),
    };
    HttpResponse::Ok().json(handler.stats_collection(&request).await)
}

async fn write(
    handler: web::Data<Arc<RequestHandler>>,
    path: web::Path<String>,
    body: web::Bytes,
) -> HttpResponse {
    let status = match parse_body::<proto::WriteRequest>(&body) {
        Ok(mut request) => {
            request.collection_name = path.into_inner();
            handler.write(&request, Protocol::Http).await
        }
        Err(err) => proto::Status::from(&err),
    };
    HttpResponse::Ok().json(status)
}

async fn query(
    handler: web::Data<Arc<RequestHandler>>,
    path: web::Path<String>,
    body: web::Bytes,
) -> HttpResponse {
    let response = match parse_body::<proto::QueryRequest>(&body) {
        Ok(mut request) => {
            request.collection_name = path.into_inner();
            handler.query(&request, Protocol::Http).await
        }
        Err(err) => proto::QueryResponse {
            status: Some(proto::Status::from(&err)),
            ..Default::default()
        },
    };
    HttpResponse::Ok().json(response)
}

async fn get_document_by_key(
    handler: web::Data<Arc<RequestHandler>>,
    path: web::Path<String>,
    params: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    let response = match params.get("key").and_then(|key| key.parse::<u64>().ok()) {
        Some(primary_key) => {
            let request = proto::GetDocumentRequest {
                collection_name: path.into_inner(),
                primary_key,
            };
            handler.get_document_by_key(&request, Protocol::Http).await
        }
        None => proto::GetDocumentResponse {
            status: Some(proto::Status::from(&Error::InvalidArgument)),
            ..Default::default()
        },
    };
    HttpResponse::Ok().json(response)
}

async fn list_collections(
    handler: web::Data<Arc<RequestHandler>>,
    params: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    let request = proto::ListCondition {
        repository_name: params.get("repository").cloned().unwrap_or_default(),
    };
    HttpResponse::Ok().json(handler.list_collections(&request).await)
}

async fn service_version(handler: web::Data<Arc<RequestHandler>>) -> HttpResponse {
    HttpResponse::Ok().json(handler.get_version())
}
