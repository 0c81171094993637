//! Single and pooled component bindings.

use std::sync::Arc;

use crate::error::PoolResult;
use crate::key::TypeKey;
use crate::lifetime::Lifetime;
use crate::registration::{erase, Binding, Ctor, Instance};
use crate::runtime::RuntimeContext;

type LazyFactory<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;
type PooledFactory<T> = Arc<dyn Fn(&RuntimeContext) -> Arc<T> + Send + Sync>;

enum Mode<T: ?Sized> {
    Shared(Arc<T>),
    Lazy(LazyFactory<T>),
    Pooled(PooledFactory<T>),
}

/// A component binding together with its lifetime mode.
///
/// Single components (`single`, `shared`, `lazy`) have exactly one instance
/// per process and ignore runtime-context memoization entirely. Pooled
/// components (`pooled`, `pooled_with`, `pooled_shared`) behave like
/// services: one instance per request.
///
/// Only values behind an `Arc` can be shared across requests, so a single
/// component is always stored as `Arc<T>` and handed out by clone.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{Application, Component};
/// use std::sync::Arc;
///
/// trait Cache: Send + Sync {
///     fn name(&self) -> &str;
/// }
///
/// struct RedisCache;
/// impl Cache for RedisCache {
///     fn name(&self) -> &str { "redis" }
/// }
///
/// let mut builder = Application::builder();
/// builder.bind_component(Component::<dyn Cache>::shared(Arc::new(RedisCache)));
/// let app = builder.build().unwrap();
///
/// let scope = app.open_scope();
/// assert_eq!(scope.component::<dyn Cache>().name(), "redis");
/// ```
pub struct Component<T: ?Sized> {
    mode: Mode<T>,
}

impl<T: Send + Sync + 'static> Component<T> {
    /// Single component around an already constructed value.
    pub fn single(value: T) -> Self {
        Self::shared(Arc::new(value))
    }

    /// Single component constructed on first resolution.
    ///
    /// The factory runs exactly once per process, even when many requests
    /// race to resolve the component for the first time.
    pub fn lazy<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            mode: Mode::Lazy(Arc::new(move || Arc::new(factory()))),
        }
    }

    /// Pooled component built by a zero-argument factory.
    pub fn pooled<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            mode: Mode::Pooled(Arc::new(move |_: &RuntimeContext| Arc::new(factory()))),
        }
    }

    /// Pooled component built by a context-aware factory.
    pub fn pooled_with<F>(factory: F) -> Self
    where
        F: Fn(&RuntimeContext) -> T + Send + Sync + 'static,
    {
        Self {
            mode: Mode::Pooled(Arc::new(move |ctx: &RuntimeContext| Arc::new(factory(ctx)))),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Component<T> {
    /// Single component around an existing `Arc`, e.g. a trait object.
    pub fn shared(value: Arc<T>) -> Self {
        Self {
            mode: Mode::Shared(value),
        }
    }

    /// Lazily created single component producing an `Arc`.
    pub fn lazy_shared<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        Self {
            mode: Mode::Lazy(Arc::new(factory)),
        }
    }

    /// Pooled component producing an `Arc`.
    pub fn pooled_shared<F>(factory: F) -> Self
    where
        F: Fn(&RuntimeContext) -> Arc<T> + Send + Sync + 'static,
    {
        Self {
            mode: Mode::Pooled(Arc::new(factory)),
        }
    }

    pub fn lifetime(&self) -> Lifetime {
        match self.mode {
            Mode::Shared(_) | Mode::Lazy(_) => Lifetime::Single,
            Mode::Pooled(_) => Lifetime::Pooled,
        }
    }

    pub fn is_single(&self) -> bool {
        self.lifetime() == Lifetime::Single
    }

    pub(crate) fn into_binding(self) -> Binding {
        let key = TypeKey::of::<T>();
        match self.mode {
            Mode::Shared(value) => Binding::single(key, value),
            Mode::Lazy(factory) => {
                let ctor: Ctor = Arc::new(move |_: &RuntimeContext| -> PoolResult<Instance> {
                    Ok(erase(factory()))
                });
                Binding::lazy_single(key, ctor)
            }
            Mode::Pooled(factory) => {
                let ctor: Ctor = Arc::new(move |ctx: &RuntimeContext| -> PoolResult<Instance> {
                    Ok(erase(factory(ctx)))
                });
                Binding::pooled(key, ctor)
            }
        }
    }
}
