//! The application façade.
//!
//! [`ApplicationBuilder`] is the startup phase: bindings, resource installs
//! and boot hooks are registered on it with `&mut self`. [`Application`] is
//! the frozen serving phase: cheap to clone, shared by every request, and
//! the only way to open runtime contexts.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::error::{PoolError, PoolResult};
use crate::lifetime::{Lifetime, PoolKind};
use crate::observer::Observers;
use crate::pool::Pool;
use crate::runtime::{RequestInfo, RuntimeContext, ScopeGuard};

pub mod builder;
mod preheat;
pub mod resources;

pub use builder::ApplicationBuilder;
pub use resources::Repository;

pub(crate) use resources::Resources;

pub(crate) struct AppInner {
    pub(crate) services: Pool,
    pub(crate) repositories: Pool,
    pub(crate) components: Pool,
    pub(crate) resources: Arc<Resources>,
    pub(crate) observers: Observers,
    pub(crate) config: EngineConfig,
    next_request: AtomicU64,
}

impl AppInner {
    #[inline]
    pub(crate) fn pool(&self, kind: PoolKind) -> &Pool {
        match kind {
            PoolKind::Service => &self.services,
            PoolKind::Repository => &self.repositories,
            PoolKind::Component => &self.components,
        }
    }
}

/// Diagnostic view of one binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo {
    pub pool: PoolKind,
    pub type_name: &'static str,
    pub lifetime: Lifetime,
    pub recyclable: bool,
}

/// A built application.
///
/// Holds the three frozen pools (services, repositories, components), the
/// installed resources and the observers. Cloning is an `Arc` bump.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{Application, Component};
/// use std::sync::Arc;
///
/// struct Settings {
///     greeting: &'static str,
/// }
/// struct Greeter {
///     settings: Arc<Settings>,
/// }
///
/// let mut builder = Application::builder();
/// builder.bind_component(Component::single(Settings { greeting: "hello" }));
/// builder.bind_service_with(|ctx| Greeter { settings: ctx.component::<Settings>() });
/// let app = builder.build().unwrap();
///
/// let greeting = app.scoped(|ctx| ctx.service::<Greeter>().settings.greeting);
/// assert_eq!(greeting, "hello");
/// ```
#[derive(Clone)]
pub struct Application {
    inner: Arc<AppInner>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub(crate) fn from_inner(inner: Arc<AppInner>) -> Self {
        Self { inner }
    }

    /// Opens a runtime context for a new request.
    pub fn open_scope(&self) -> ScopeGuard {
        self.open(None)
    }

    /// Opens a runtime context carrying a label, e.g. `GET /users`.
    pub fn open_scope_labeled(&self, label: impl Into<String>) -> ScopeGuard {
        self.open(Some(label.into()))
    }

    fn open(&self, label: Option<String>) -> ScopeGuard {
        let info = RequestInfo {
            id: self.inner.next_request.fetch_add(1, Ordering::Relaxed),
            label,
            started: Instant::now(),
        };
        ScopeGuard::new(Arc::new(RuntimeContext::new(self.inner.clone(), info)))
    }

    /// Runs `f` inside a fresh runtime context and releases it afterwards,
    /// also when `f` panics.
    pub fn scoped<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&RuntimeContext) -> R,
    {
        let guard = self.open_scope();
        f(&guard)
    }

    /// Async variant of [`scoped`](Self::scoped).
    ///
    /// The context is released when the returned future completes or is
    /// dropped before completion.
    pub async fn scoped_async<F, Fut, R>(&self, f: F) -> R
    where
        F: FnOnce(Arc<RuntimeContext>) -> Fut,
        Fut: Future<Output = R>,
    {
        let guard = self.open_scope();
        f(guard.context().clone()).await
    }

    pub fn get_service<T: ?Sized + Send + Sync + 'static>(&self, ctx: &RuntimeContext) -> PoolResult<Arc<T>> {
        self.check_owner(ctx)?;
        self.inner.services.resolve::<T>(ctx)
    }

    pub fn get_repository<T: ?Sized + Send + Sync + 'static>(&self, ctx: &RuntimeContext) -> PoolResult<Arc<T>> {
        self.check_owner(ctx)?;
        self.inner.repositories.resolve::<T>(ctx)
    }

    pub fn get_component<T: ?Sized + Send + Sync + 'static>(&self, ctx: &RuntimeContext) -> PoolResult<Arc<T>> {
        self.check_owner(ctx)?;
        self.inner.components.resolve::<T>(ctx)
    }

    /// Every binding of every pool, sorted by pool then type name.
    pub fn bindings(&self) -> Vec<BindingInfo> {
        let mut out: Vec<BindingInfo> = PoolKind::ALL
            .iter()
            .flat_map(|kind| {
                self.inner.pool(*kind).registry.iter().map(move |binding| BindingInfo {
                    pool: *kind,
                    type_name: binding.key.display_name(),
                    lifetime: binding.lifetime,
                    recyclable: binding.recycler.is_some(),
                })
            })
            .collect();
        out.sort_by(|a, b| (a.pool, a.type_name).cmp(&(b.pool, b.type_name)));
        out
    }

    pub fn pool(&self, kind: PoolKind) -> &Pool {
        self.inner.pool(kind)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// An installed resource.
    pub fn resource<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner.resources.get::<T>()
    }

    fn check_owner(&self, ctx: &RuntimeContext) -> PoolResult<()> {
        if ctx.belongs_to(&self.inner) {
            Ok(())
        } else {
            Err(PoolError::ForeignScope {
                request_id: ctx.request_id(),
            })
        }
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("services", &self.inner.services.registry.len())
            .field("repositories", &self.inner.repositories.registry.len())
            .field("components", &self.inner.components.registry.len())
            .field("config", &self.inner.config)
            .finish()
    }
}
