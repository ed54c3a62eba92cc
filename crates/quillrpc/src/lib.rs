//! # quillrpc
//!
//! Transport-agnostic JSON-RPC 2.0 server runtime, built for dispatch code
//! emitted by `quillrpc-gen`. The generator parses annotated service sources
//! and writes a `<package>_quillrpc.rs` file whose [`Invoker`] impls this
//! crate routes to: envelope validation, batch execution, notification
//! handling and the middleware chain all live here.
//!
//! ## Wiring a server
//!
//! ```rust,ignore
//! let server = quillrpc::Server::builder(quillrpc::Options::default())
//!     .register("arith", ArithService)
//!     .with_middleware(quillrpc::middleware::logger())
//!     .build();
//!
//! let body = server.handle(Extensions::new(), request_bytes).await;
//! ```
//!
//! Transports (HTTP, WebSocket, ...) are external collaborators: they read a
//! message, call [`Server::handle`] and write the returned bytes, emitting no
//! body when the result is `None`.

pub mod context;
pub mod error;
pub mod middleware;
pub mod params;
pub mod request;
pub mod response;
pub mod server;

pub use quillrpc_smd as smd;

pub use context::{Context, Extensions};
pub use error::{Error, ErrorCode};
pub use request::Request;
pub use response::Response;
pub use server::{Options, Outcome, Server, ServerBuilder};

use async_trait::async_trait;
use serde_json::Value;

/// JSON-RPC protocol version constant.
pub const VERSION: &str = "2.0";

/// Content type advertised in the SMD schema.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Service handler implemented by generated dispatch code.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Route a routing-name/params pair to a typed user-method call.
    async fn invoke(&self, ctx: &Context, method: &str, params: Option<Value>) -> Response;

    /// Self-description of this service's methods.
    fn smd(&self) -> smd::ServiceInfo;
}

/// Marker field type for service discovery by the generator: embed a
/// `quillrpc::Service` field in a struct to mark it as an RPC service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Service;

/// Commonly used types for service crates and transports.
pub mod prelude {
    pub use crate::context::{Context, Extensions};
    pub use crate::error::{Error, ErrorCode};
    pub use crate::middleware::{InvokeFn, Middleware};
    pub use crate::request::Request;
    pub use crate::response::Response;
    pub use crate::server::{Options, Outcome, Server, ServerBuilder};
    pub use crate::{Invoker, Service};
}
