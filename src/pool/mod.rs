//! Pools resolve bound types against a runtime context.
//!
//! One [`Pool`] exists per [`PoolKind`]. A pool owns its frozen registry and
//! the singleton slots of its single bindings; it never owns runtime
//! contexts, it only reads and writes the one it is handed.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{PoolError, PoolResult};
use crate::internal::ResolutionGuard;
use crate::key::{SlotKey, TypeKey};
use crate::lifetime::{Lifetime, PoolKind};
use crate::observer::Origin;
use crate::registration::{downcast, Binding, Instance, Registry};
use crate::runtime::RuntimeContext;

pub mod binder;
pub mod component;

pub use binder::Binder;
pub use component::Component;

/// Resolver for one dependency category.
pub struct Pool {
    pub(crate) registry: Registry,
}

impl Pool {
    pub(crate) fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn kind(&self) -> PoolKind {
        self.registry.kind
    }

    /// True if `T` has a binding in this pool.
    pub fn is_bound<T: ?Sized + 'static>(&self) -> bool {
        self.registry.contains_key(&TypeKey::of::<T>())
    }

    /// Number of idle recycled instances waiting for `T`.
    pub fn idle<T: ?Sized + 'static>(&self) -> usize {
        self.registry
            .get(&TypeKey::of::<T>())
            .and_then(|b| b.recycler.as_ref())
            .map_or(0, |r| r.idle())
    }

    /// Resolves `T` for the request owning `ctx`.
    pub(crate) fn resolve<T>(&self, ctx: &RuntimeContext) -> PoolResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        ctx.ensure_open()?;

        let key = TypeKey::of::<T>();
        let binding = self.registry.get(&key).ok_or(PoolError::NotBound {
            pool: self.kind(),
            type_name: key.display_name(),
        })?;
        let slot = SlotKey::new(self.kind(), key);

        match binding.lifetime {
            Lifetime::Single => self.resolve_single(binding, slot, ctx),
            Lifetime::Pooled => self.resolve_pooled(binding, slot, ctx),
        }
    }

    fn resolve_single<T>(&self, binding: &Binding, slot: SlotKey, ctx: &RuntimeContext) -> PoolResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let cell = binding
            .slot
            .as_ref()
            .ok_or(PoolError::TypeMismatch(binding.key.display_name()))?;

        // Lock-free after the first initialization
        if let Some(instance) = cell.get() {
            return downcast(instance);
        }

        // Entered before the cell: a self-referencing factory must fail, not block on its own init
        let _guard = ResolutionGuard::enter(slot)?;
        let start = Instant::now();
        let mut created = false;
        let instance = cell.get_or_try_init(|| {
            created = true;
            (binding.ctor)(ctx)
        })?;
        if created {
            ctx.observers()
                .resolved(ctx.request_id(), slot.pool, &slot.key, Origin::Singleton, start.elapsed());
        }
        downcast(instance)
    }

    fn resolve_pooled<T>(&self, binding: &Binding, slot: SlotKey, ctx: &RuntimeContext) -> PoolResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        // Per-request reuse, the common case
        if let Some(found) = ctx.memoized::<T>(&slot)? {
            return Ok(found);
        }

        let start = Instant::now();
        let _guard = ResolutionGuard::enter(slot)?;
        let (instance, origin): (Instance, Origin) =
            match binding.recycler.as_ref().and_then(|r| r.take()) {
                Some(instance) => (instance, Origin::FreeList),
                None => ((binding.ctor)(ctx)?, Origin::Factory),
            };
        let resolved = ctx.memoize::<T>(slot, instance)?;
        ctx.observers()
            .resolved(ctx.request_id(), slot.pool, &slot.key, origin, start.elapsed());
        Ok(resolved)
    }
}
