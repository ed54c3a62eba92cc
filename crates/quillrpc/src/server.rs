use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::context::{Context, Extensions};
use crate::error::ErrorCode;
use crate::middleware::{InvokeFn, Middleware};
use crate::params;
use crate::request::Request;
use crate::response::Response;
use crate::{smd, Invoker, CONTENT_TYPE_JSON, VERSION};

/// Default maximum quantity of requests in a single batch.
const DEFAULT_BATCH_MAX_LEN: usize = 10;

/// Default SMD target url.
const DEFAULT_TARGET_URL: &str = "/";

/// Options for a JSON-RPC 2.0 [`Server`].
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum quantity of requests in a single batch.
    pub batch_max_len: usize,

    /// RPC endpoint advertised in the SMD schema.
    pub target_url: String,

    /// Whether transports should expose the SMD schema.
    pub expose_smd: bool,

    /// Strip the `data` field from error envelopes. For production use.
    pub hide_error_data: bool,

    /// Character separating namespace from method in wire method names.
    pub scope_separator: char,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            batch_max_len: DEFAULT_BATCH_MAX_LEN,
            target_url: DEFAULT_TARGET_URL.to_string(),
            expose_smd: false,
            hide_error_data: false,
            scope_separator: '.',
        }
    }
}

/// Builder for [`Server`]. Registration happens here; the built server's
/// services map and middleware chain are frozen.
pub struct ServerBuilder {
    options: Options,
    services: BTreeMap<String, Arc<dyn Invoker>>,
    middleware: Vec<Middleware>,
}

impl ServerBuilder {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            services: BTreeMap::new(),
            middleware: Vec::new(),
        }
    }

    /// Register a service invoker under the given namespace. Use the empty
    /// string for the public namespace.
    pub fn register(mut self, namespace: impl Into<String>, service: impl Invoker + 'static) -> Self {
        self.services
            .insert(namespace.into().to_lowercase(), Arc::new(service));
        self
    }

    /// Append a middleware. Registration order is outermost-first.
    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn build(self) -> Server {
        Server {
            options: Arc::new(self.options),
            services: Arc::new(self.services),
            middleware: Arc::new(self.middleware),
        }
    }
}

/// Output of processing one message: a single envelope or a batch of them.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Single(Response),
    Batch(Vec<Response>),
}

/// JSON-RPC 2.0 server: envelope validation, batch handling, namespace
/// routing and the middleware chain. Transport-agnostic; transports feed
/// message bytes into [`Server::process`] or [`Server::handle`].
#[derive(Clone)]
pub struct Server {
    options: Arc<Options>,
    services: Arc<BTreeMap<String, Arc<dyn Invoker>>>,
    middleware: Arc<Vec<Middleware>>,
}

impl Server {
    pub fn builder(options: Options) -> ServerBuilder {
        ServerBuilder::new(options)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Process one JSON-RPC 2.0 message. Returns `None` when no body must be
    /// written (the message was a notification, or a batch of nothing but
    /// notifications).
    pub async fn process(&self, extensions: Extensions, message: &[u8]) -> Option<Outcome> {
        let batch = params::is_array(message);

        let mut requests: Vec<Request> = if batch {
            match serde_json::from_slice(message) {
                Ok(requests) => requests,
                Err(err) => {
                    debug!("batch parse failed: {err}");
                    return Some(Outcome::Single(Response::error_code(ErrorCode::ParseError, None)));
                }
            }
        } else {
            match serde_json::from_slice::<Request>(message) {
                Ok(request) => vec![request],
                Err(err) => {
                    debug!("request parse failed: {err}");
                    return Some(Outcome::Single(Response::error_code(ErrorCode::ParseError, None)));
                }
            }
        };

        if requests.is_empty() {
            return Some(Outcome::Single(Response::error_code(ErrorCode::InvalidRequest, None)));
        } else if requests.len() > self.options.batch_max_len {
            return Some(Outcome::Single(Response::error_code(
                ErrorCode::InvalidRequest,
                Some(Value::String("max requests length in batch exceeded".to_string())),
            )));
        }

        // Single request: run on the caller's task.
        if !batch {
            let request = requests.remove(0);
            let notification = request.is_notification();
            let response = self.process_request(extensions, request).await;
            return (!notification).then_some(Outcome::Single(response));
        }

        // Batch: every request runs in its own task; notifications run for
        // their side effects but produce no envelope.
        let mut tasks = Vec::with_capacity(requests.len());
        for request in requests {
            let server = self.clone();
            let extensions = extensions.clone();
            tasks.push(tokio::spawn(async move {
                let notification = request.is_notification();
                let response = server.process_request(extensions, request).await;
                (!notification).then_some(response)
            }));
        }

        let mut responses = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(Some(response)) => responses.push(response),
                Ok(None) => {}
                Err(err) => {
                    error!("batch task panicked: {err}");
                    responses.push(Response::error_code(ErrorCode::InternalError, None));
                }
            }
        }

        if responses.is_empty() {
            None
        } else {
            Some(Outcome::Batch(responses))
        }
    }

    /// Like [`Server::process`] but serializes the outcome. `None` still
    /// means "write no body at all".
    pub async fn handle(&self, extensions: Extensions, message: &[u8]) -> Option<Vec<u8>> {
        let outcome = self.process(extensions, message).await?;
        match serde_json::to_vec(&outcome) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                error!("response marshalling failed: {err}");
                Some(Response::error_code(ErrorCode::ServerError, None).to_bytes())
            }
        }
    }

    /// Validate, route and invoke a single request. Always returns an
    /// envelope; the caller drops it for notifications.
    async fn process_request(&self, extensions: Extensions, request: Request) -> Response {
        let id = request.id.clone();

        let mut response = self.invoke_validated(extensions, request).await;
        response.version = VERSION.to_string();
        response.id = id.unwrap_or(Value::Null);
        if self.options.hide_error_data {
            if let Some(error) = response.error.as_mut() {
                error.data = None;
            }
        }

        response
    }

    async fn invoke_validated(&self, extensions: Extensions, request: Request) -> Response {
        if request.version != VERSION || request.method.is_empty() {
            return Response::error_code(ErrorCode::InvalidRequest, None);
        }

        // Method names are case-insensitive; the first separator (if any)
        // splits namespace from method.
        let lowered = request.method.to_lowercase();
        let (namespace, method) = match lowered.split_once(self.options.scope_separator) {
            Some((namespace, method)) => (namespace, method),
            None => ("", lowered.as_str()),
        };

        let Some(service) = self.services.get(namespace) else {
            return Response::error_code(ErrorCode::MethodNotFound, None);
        };

        let ctx = Context::new(namespace, request.id, extensions);

        let service = Arc::clone(service);
        let mut chain: InvokeFn = Arc::new(move |ctx: Context, method: String, params| {
            let service = Arc::clone(&service);
            Box::pin(async move { service.invoke(&ctx, &method, params).await })
        });
        for middleware in self.middleware.iter().rev() {
            chain = middleware(chain);
        }

        chain(ctx, method.to_string(), request.params).await
    }

    /// Service Mapping Description for every registered method.
    pub fn smd(&self) -> smd::Schema {
        let mut schema = smd::Schema {
            transport: "POST".to_string(),
            envelope: "JSON-RPC-2.0".to_string(),
            content_type: CONTENT_TYPE_JSON.to_string(),
            smd_version: smd::SMD_VERSION.to_string(),
            target: self.options.target_url.clone(),
            description: String::new(),
            services: BTreeMap::new(),
        };

        for (namespace, service) in self.services.iter() {
            let info = service.smd();
            let prefix = if namespace.is_empty() {
                String::new()
            } else {
                format!("{namespace}{}", self.options.scope_separator)
            };

            let mut methods: Vec<_> = info.methods.into_iter().collect();
            methods.sort_by(|a, b| a.0.cmp(&b.0));
            for (method, descriptor) in methods {
                schema.services.insert(format!("{prefix}{method}"), descriptor);
            }
            schema.description.push_str(&info.description);
        }

        schema
    }
}
