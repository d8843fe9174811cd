//! Request surface for VexaDB
//!
//! Both listeners route through one `RequestHandler`: the binary RPC
//! server decodes prost frames, the HTTP server decodes JSON bodies, and
//! the handler owns validation and execution for both.

pub mod handler;
pub mod http;
pub mod rpc;

pub use handler::RequestHandler;
pub use http::HttpServer;
pub use rpc::RpcServer;
