//! Middleware chain for wrapping method invocation.
//!
//! Every link has the same shape as the service invoker itself, so a
//! middleware wraps the next [`InvokeFn`] and returns a new one. The server
//! folds the registered middleware right-to-left, which makes the
//! first-registered middleware the outermost.

use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::Context;
use crate::response::Response;

/// A single JSON-RPC 2.0 invocation after validation and routing.
pub type InvokeFn =
    Arc<dyn Fn(Context, String, Option<Value>) -> BoxFuture<'static, Response> + Send + Sync>;

/// A middleware wraps an [`InvokeFn`] with another.
pub type Middleware = Arc<dyn Fn(InvokeFn) -> InvokeFn + Send + Sync>;

/// Dispatch logging middleware: one event per invocation with namespace,
/// method, duration and the error code if the call failed.
pub fn logger() -> Middleware {
    Arc::new(|next: InvokeFn| {
        Arc::new(move |ctx: Context, method: String, params: Option<Value>| {
            let next = Arc::clone(&next);
            Box::pin(async move {
                let start = Instant::now();
                let namespace = ctx.namespace().to_string();

                let response = next(ctx, method.clone(), params).await;

                match &response.error {
                    Some(err) => warn!(
                        namespace = %namespace,
                        method = %method,
                        code = err.code,
                        elapsed = ?start.elapsed(),
                        "rpc call failed: {}",
                        err.message,
                    ),
                    None => {
                        debug!(namespace = %namespace, method = %method, elapsed = ?start.elapsed(), "rpc call")
                    }
                }

                response
            }) as BoxFuture<'static, Response>
        })
    })
}
