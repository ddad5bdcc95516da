//! Method Registry
//!
//! Maps method names to typed handlers. Each registration wraps a strongly
//! typed closure in an adapter that decodes params, validates them and
//! serializes the result, so the dispatcher only ever sees the uniform
//! [`MethodHandler`] interface.
//!
//! # Example
//!
//! ```
//! use rpcgate_core::application::registry::{MethodRegistry, Params};
//! use rpcgate_core::application::validation::{require_non_empty, ValidationError};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Greet {
//!     name: String,
//! }
//!
//! impl Params for Greet {
//!     fn validate(&self) -> Result<(), ValidationError> {
//!         require_non_empty("name", &self.name)
//!     }
//! }
//!
//! let mut builder = MethodRegistry::builder();
//! builder
//!     .register_fn("getSuccess", |_ctx| async { Ok("ok") })
//!     .register_with_params("greet", |_ctx, p: Greet| async move { Ok(format!("hi {}", p.name)) });
//! let registry = builder.build();
//! assert!(registry.contains("greet"));
//! ```

use super::context::ExecutionContext;
use super::validation::ValidationError;
use crate::error::{Result, RpcError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Uniform decode-and-invoke interface stored in the registry
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn decode_and_invoke(
        &self,
        ctx: ExecutionContext,
        params: Option<&RawValue>,
    ) -> Result<Value>;
}

/// A type a handler can declare as its params
///
/// Structured records override [`Params::validate`]; plain lists are never
/// validated.
pub trait Params: DeserializeOwned + Send + 'static {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        Ok(())
    }
}

impl<T> Params for Vec<T> where T: DeserializeOwned + Send + 'static {}

/// Registered association between a method name and its handler
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    handler: Arc<dyn MethodHandler>,
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &Arc<dyn MethodHandler> {
        &self.handler
    }
}

impl std::fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Immutable method table, frozen before the first request is served
#[derive(Debug, Default)]
pub struct MethodRegistry {
    methods: HashMap<String, MethodDescriptor>,
}

impl MethodRegistry {
    pub fn builder() -> MethodRegistryBuilder {
        MethodRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Mutable stage of the registry; only exists during startup wiring
#[derive(Default)]
pub struct MethodRegistryBuilder {
    methods: HashMap<String, MethodDescriptor>,
}

impl MethodRegistryBuilder {
    /// Register a handler object. A later registration under the same name
    /// replaces the earlier one.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn MethodHandler>,
    ) -> &mut Self {
        let name = name.into();
        if self.methods.contains_key(&name) {
            tracing::warn!(method = %name, "Method registered twice; last registration wins");
        }
        self.methods
            .insert(name.clone(), MethodDescriptor { name, handler });
        self
    }

    /// Register a handler that takes no params; any params sent are ignored.
    pub fn register_fn<F, Fut, R>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        self.register(name, Arc::new(NoParams { f }))
    }

    /// Register a handler whose params decode into `P`.
    pub fn register_with_params<P, F, Fut, R>(
        &mut self,
        name: impl Into<String>,
        f: F,
    ) -> &mut Self
    where
        P: Params,
        F: Fn(ExecutionContext, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Serialize + Send + 'static,
    {
        self.register(
            name,
            Arc::new(WithParams {
                f,
                _params: PhantomData,
            }),
        )
    }

    pub fn build(self) -> MethodRegistry {
        MethodRegistry {
            methods: self.methods,
        }
    }
}

struct NoParams<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, R> MethodHandler for NoParams<F>
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Serialize + Send + 'static,
{
    async fn decode_and_invoke(
        &self,
        ctx: ExecutionContext,
        _params: Option<&RawValue>,
    ) -> Result<Value> {
        let result = (self.f)(ctx).await?;
        to_result_value(result)
    }
}

struct WithParams<P, F> {
    f: F,
    // fn() -> P keeps the adapter Send + Sync whatever P is
    _params: PhantomData<fn() -> P>,
}

#[async_trait]
impl<P, F, Fut, R> MethodHandler for WithParams<P, F>
where
    P: Params,
    F: Fn(ExecutionContext, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Serialize + Send + 'static,
{
    async fn decode_and_invoke(
        &self,
        ctx: ExecutionContext,
        params: Option<&RawValue>,
    ) -> Result<Value> {
        let params = decode_params::<P>(params)?;
        let result = (self.f)(ctx, params).await?;
        to_result_value(result)
    }
}

/// Decode and validate params. Absent params decode from `null`.
pub fn decode_params<P: Params>(raw: Option<&RawValue>) -> Result<P> {
    let text = raw.map(RawValue::get).unwrap_or("null");
    let params: P = serde_json::from_str(text).map_err(|e| RpcError::Parse(e.to_string()))?;
    params.validate().map_err(|e| {
        RpcError::InvalidParams(format!(
            "input: {}, err: {}",
            std::any::type_name::<P>(),
            e
        ))
    })?;
    Ok(params)
}

fn to_result_value<R: Serialize>(result: R) -> Result<Value> {
    serde_json::to_value(result)
        .map_err(|e| RpcError::Internal(format!("failed to serialize result: {}", e)))
}
