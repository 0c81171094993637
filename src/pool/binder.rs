//! Registration surface for one pool.

use std::sync::Arc;

use crate::error::PoolResult;
use crate::key::TypeKey;
use crate::lifetime::PoolKind;
use crate::registration::{erase, Binding, Ctor, Instance, Recycler, Registry};
use crate::runtime::RuntimeContext;
use crate::traits::Recycle;

use super::Component;

/// Binds factories into one pool's registry.
///
/// Obtained from [`ApplicationBuilder::services`](crate::ApplicationBuilder::services),
/// [`repositories`](crate::ApplicationBuilder::repositories) or
/// [`components`](crate::ApplicationBuilder::components). Every binding made
/// here is pooled: one instance per runtime context.
///
/// Factories come in two shapes, zero-argument (`bind`) and context-aware
/// (`bind_with`). Context-aware factories receive the resolving request's
/// [`RuntimeContext`] and may resolve their own dependencies through it.
///
/// # Examples
///
/// ```
/// use ferrous_scope::Application;
///
/// struct UserRepository;
/// struct UserService {
///     repo: std::sync::Arc<UserRepository>,
/// }
///
/// let mut builder = Application::builder();
/// builder.repositories().bind(|| UserRepository);
/// builder
///     .services()
///     .bind_with(|ctx| UserService { repo: ctx.repository::<UserRepository>() });
/// let app = builder.build().unwrap();
///
/// let scope = app.open_scope();
/// let service = scope.service::<UserService>();
/// assert!(std::sync::Arc::ptr_eq(&service.repo, &scope.repository::<UserRepository>()));
/// ```
pub struct Binder<'a> {
    registry: &'a mut Registry,
}

impl<'a> Binder<'a> {
    pub(crate) fn new(registry: &'a mut Registry) -> Self {
        Self { registry }
    }

    pub fn kind(&self) -> PoolKind {
        self.registry.kind
    }

    /// Binds a zero-argument factory.
    pub fn bind<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let ctor: Ctor = Arc::new(move |_: &RuntimeContext| -> PoolResult<Instance> {
            Ok(erase(Arc::new(factory())))
        });
        self.insert(Binding::pooled(TypeKey::of::<T>(), ctor))
    }

    /// Binds a factory that receives the resolving request's context.
    pub fn bind_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&RuntimeContext) -> T + Send + Sync + 'static,
    {
        let ctor: Ctor = Arc::new(move |ctx: &RuntimeContext| -> PoolResult<Instance> {
            Ok(erase(Arc::new(factory(ctx))))
        });
        self.insert(Binding::pooled(TypeKey::of::<T>(), ctor))
    }

    /// Binds a fallible context-aware factory.
    ///
    /// Errors propagate to the `try_*` accessor that triggered construction,
    /// so nested resolutions can use `?` instead of panicking.
    pub fn try_bind_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&RuntimeContext) -> PoolResult<T> + Send + Sync + 'static,
    {
        let ctor: Ctor = Arc::new(move |ctx: &RuntimeContext| -> PoolResult<Instance> {
            Ok(erase(Arc::new(factory(ctx)?)))
        });
        self.insert(Binding::pooled(TypeKey::of::<T>(), ctor))
    }

    /// Binds a factory producing an `Arc`, typically of a trait object.
    pub fn bind_shared<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&RuntimeContext) -> Arc<T> + Send + Sync + 'static,
    {
        let ctor: Ctor = Arc::new(move |ctx: &RuntimeContext| -> PoolResult<Instance> {
            Ok(erase(factory(ctx)))
        });
        self.insert(Binding::pooled(TypeKey::of::<T>(), ctor))
    }

    /// Binds a zero-argument factory whose instances are recycled
    /// through a free list when their request is released.
    ///
    /// Only zero-argument factories are accepted: a recycled instance is
    /// handed to a later request without running the factory again, so it
    /// must not hold anything resolved from the request that built it.
    pub fn bind_recycled<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Recycle,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let ctor: Ctor = Arc::new(move |_: &RuntimeContext| -> PoolResult<Instance> {
            Ok(erase(Arc::new(factory())))
        });
        let binding = Binding::pooled(TypeKey::of::<T>(), ctor).with_recycler(Recycler::new::<T>());
        self.insert(binding)
    }

    pub(crate) fn component<T>(&mut self, component: Component<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.insert(component.into_binding())
    }

    fn insert(&mut self, binding: Binding) -> &mut Self {
        self.registry.insert(binding);
        self
    }
}
