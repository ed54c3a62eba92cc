use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Typed, transport-populated values shared with every request of a message.
///
/// Transports insert their request handle (or anything else) before calling
/// [`crate::Server::process`]; middleware and service methods read it back by
/// type.
#[derive(Clone, Default)]
pub struct Extensions {
    map: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.map.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions").field("len", &self.map.len()).finish()
    }
}

/// Per-request call context handed to middleware and service methods.
///
/// Carries the routing namespace, the raw request id (absent for
/// notifications) and the transport extensions. The context is also the
/// cancellation boundary: the runtime never blocks on it, it only passes it
/// through unmodified.
#[derive(Debug, Clone)]
pub struct Context {
    namespace: String,
    id: Option<Value>,
    extensions: Extensions,
}

impl Context {
    pub(crate) fn new(namespace: impl Into<String>, id: Option<Value>, extensions: Extensions) -> Self {
        Self {
            namespace: namespace.into(),
            id,
            extensions,
        }
    }

    /// Empty context for direct invoker calls in tests and tools.
    pub fn background() -> Self {
        Self::new("", None, Extensions::new())
    }

    /// Namespace the current method was routed under; empty for the public
    /// namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Raw request id; `None` for notifications.
    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    /// Transport-supplied value of type `T`, if one was inserted.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct RemoteAddr(&'static str);

    #[test]
    fn extensions_are_typed() {
        let mut exts = Extensions::new();
        exts.insert(RemoteAddr("127.0.0.1:4545"));
        exts.insert(7usize);

        let ctx = Context::new("arith", Some(json!(1)), exts);
        assert_eq!(ctx.get::<RemoteAddr>(), Some(&RemoteAddr("127.0.0.1:4545")));
        assert_eq!(ctx.get::<usize>(), Some(&7));
        assert_eq!(ctx.get::<String>(), None);
    }

    #[test]
    fn background_context_is_empty() {
        let ctx = Context::background();
        assert_eq!(ctx.namespace(), "");
        assert!(ctx.id().is_none());
    }
}
