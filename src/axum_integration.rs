//! Axum integration: one runtime context per HTTP request.
//!
//! [`LifecycleLayer`] opens a labeled runtime context (`"GET /users"`) for
//! every request, stores it in the request extensions and releases it when
//! the inner service's future finishes or is dropped. Handlers reach it
//! through the [`RequestScope`] extractor. A handler that panics, e.g. on
//! an unbound type through `scope.service::<T>()`, gets a 500 response
//! carrying the panic message.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use ferrous_scope::axum_integration::{LifecycleLayer, RequestScope};
//! use ferrous_scope::Application;
//!
//! struct Greeter;
//! impl Greeter {
//!     fn greet(&self) -> &'static str { "hello" }
//! }
//!
//! async fn hello(scope: RequestScope) -> &'static str {
//!     scope.service::<Greeter>().greet()
//! }
//!
//! # async fn run() {
//! let mut builder = Application::builder();
//! builder.bind_service(|| Greeter);
//! let app = builder.build().unwrap();
//!
//! let router: Router = Router::new()
//!     .route("/", get(hello))
//!     .layer(LifecycleLayer::new(app));
//! # let _ = router;
//! # }
//! ```

use std::future::Future;
use std::ops::Deref;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use futures::FutureExt;
use tower::{Layer, Service};

use crate::internal::panic_message;
use crate::{Application, PoolError, RuntimeContext};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Tower layer scoping each request to its own runtime context.
#[derive(Clone)]
pub struct LifecycleLayer {
    app: Application,
}

impl LifecycleLayer {
    pub fn new(app: Application) -> Self {
        Self { app }
    }
}

impl<S> Layer<S> for LifecycleLayer {
    type Service = LifecycleService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LifecycleService {
            inner,
            app: self.app.clone(),
        }
    }
}

/// Service produced by [`LifecycleLayer`].
#[derive(Clone)]
pub struct LifecycleService<S> {
    inner: S,
    app: Application,
}

impl<S> Service<Request> for LifecycleService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let label = format!("{} {}", req.method(), req.uri().path());
        let guard = self.app.open_scope_labeled(label);
        req.extensions_mut()
            .insert(RequestScope(guard.context().clone()));

        // The instance that was polled ready must be the one called
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let request_id = guard.request_id();
            // Panicking accessors unwind out of the handler; answer with a 500 instead
            let outcome = AssertUnwindSafe(async move { inner.call(req).await })
                .catch_unwind()
                .await;
            drop(guard);
            match outcome {
                Ok(response) => response,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(request_id, reason = %message, "request handler panicked");
                    Ok(ScopeRejection::HandlerPanicked(message).into_response())
                }
            }
        })
    }
}

/// Extractor for the current request's runtime context.
#[derive(Clone)]
pub struct RequestScope(pub Arc<RuntimeContext>);

impl RequestScope {
    pub fn context(&self) -> &Arc<RuntimeContext> {
        &self.0
    }
}

impl Deref for RequestScope {
    type Target = RuntimeContext;

    fn deref(&self) -> &RuntimeContext {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = ScopeRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestScope>()
            .cloned()
            .ok_or(ScopeRejection::MissingLayer)
    }
}

/// Failure to obtain or use the request's runtime context.
///
/// Handlers may return `Result<_, ScopeRejection>` and use `?` on the
/// `try_*` accessors.
#[derive(Debug)]
pub enum ScopeRejection {
    /// The route is not wrapped in a [`LifecycleLayer`]
    MissingLayer,
    Resolution(PoolError),
    /// The handler panicked, e.g. through a panicking accessor
    HandlerPanicked(String),
}

impl From<PoolError> for ScopeRejection {
    fn from(err: PoolError) -> Self {
        ScopeRejection::Resolution(err)
    }
}

impl IntoResponse for ScopeRejection {
    fn into_response(self) -> Response {
        let message = match self {
            ScopeRejection::MissingLayer => "runtime context missing, is LifecycleLayer installed?".to_string(),
            ScopeRejection::Resolution(err) => {
                tracing::error!(error = %err, "request resolution failed");
                err.to_string()
            }
            ScopeRejection::HandlerPanicked(message) => message,
        };
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}

/// Wraps every route of `router` in a [`LifecycleLayer`].
pub fn with_lifecycle<St>(router: Router<St>, app: Application) -> Router<St>
where
    St: Clone + Send + Sync + 'static,
{
    router.layer(LifecycleLayer::new(app))
}
