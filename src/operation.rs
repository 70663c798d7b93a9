//! The zero-argument callable a runner retries.
//!
//! Whatever arguments an operation needs are bound here, before a runner ever sees it. The
//! runner only calls [`Operation::call`], once per attempt. Operations are reference counted so
//! a fallback runner can inherit the previous runner's operation.

use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tower::{Service, ServiceExt};

type BoxedFn<T, E> = dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync;

/// Shared handle to a retryable operation.
pub struct Operation<T, E> {
    inner: Arc<BoxedFn<T, E>>,
}

impl<T, E> Clone for Operation<T, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T, E> fmt::Debug for Operation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Operation(<fn>)")
    }
}

impl<T, E> Operation<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Wrap an async closure. Each attempt calls it again to get a fresh future.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self { inner: Arc::new(move || f().boxed()) }
    }

    /// Wrap a synchronous closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self::new(move || future::ready(f()))
    }

    /// Bind `arg` to a one-argument async closure. The argument is cloned for every attempt.
    ///
    /// Tuples cover operations that take several arguments.
    pub fn bind<A, F, Fut>(f: F, arg: A) -> Self
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::new(move || f(arg.clone()))
    }

    /// Drive a tower service with a fixed request. Service and request are cloned per attempt.
    pub fn from_service<S, Req>(service: S, request: Req) -> Self
    where
        S: Service<Req, Response = T, Error = E> + Clone + Send + Sync + 'static,
        S::Future: Send + 'static,
        Req: Clone + Send + Sync + 'static,
    {
        Self::new(move || service.clone().oneshot(request.clone()))
    }

    /// Start one attempt.
    pub fn call(&self) -> BoxFuture<'static, Result<T, E>> {
        (self.inner)()
    }
}
