//! Service invocation seam
//!
//! Calls are forwarded through explicit delegation objects rather than
//! dynamic proxies: anything that can serve a call implements
//! [`Invocable`], and a typed facade per service interface delegates to
//! one. Failures raised by the callee pass through this layer unwrapped.

use std::sync::Arc;

use serde_json::Value;
use weft_error::ServiceError;

/// A single service call
#[derive(Debug, Clone)]
pub struct Invocation {
    pub method: String,
    pub args: Value,
}

impl Invocation {
    pub fn new(method: impl Into<String>, args: Value) -> Self {
        Invocation {
            method: method.into(),
            args,
        }
    }
}

/// Anything that can serve an invocation: a local implementation, a remote
/// proxy, or a lazy handler standing in for one.
pub trait Invocable: Send + Sync {
    fn invoke(&self, invocation: Invocation) -> Result<Value, ServiceError>;
}

/// A local service implementation registered in the component registry.
///
/// The newtype keeps the registry's components uniformly `Any` while still
/// giving the binder a typed path back to the invocable object.
pub struct ServiceInstance(Arc<dyn Invocable>);

impl ServiceInstance {
    pub fn new(inner: Arc<dyn Invocable>) -> Self {
        ServiceInstance(inner)
    }

    pub fn invocable(&self) -> Arc<dyn Invocable> {
        self.0.clone()
    }
}

/// Closure-backed invocable for small services and tests
pub struct ServiceFn {
    f: Box<dyn Fn(Invocation) -> Result<Value, ServiceError> + Send + Sync>,
}

impl ServiceFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Invocation) -> Result<Value, ServiceError> + Send + Sync + 'static,
    {
        ServiceFn { f: Box::new(f) }
    }
}

impl Invocable for ServiceFn {
    fn invoke(&self, invocation: Invocation) -> Result<Value, ServiceError> {
        (self.f)(invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_fn_serves_calls() {
        let service = ServiceFn::new(|invocation| Ok(json!({ "echo": invocation.method })));
        let result = service
            .invoke(Invocation::new("greet", Value::Null))
            .unwrap();
        assert_eq!(result, json!({ "echo": "greet" }));
    }

    #[test]
    fn test_callee_error_passes_through() {
        let service = ServiceFn::new(|_| Err("downstream unavailable".into()));
        let err = service
            .invoke(Invocation::new("greet", Value::Null))
            .unwrap_err();
        assert_eq!(err.to_string(), "downstream unavailable");
    }
}
