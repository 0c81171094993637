//! Binding registry types.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{PoolError, PoolResult};
use crate::key::TypeKey;
use crate::lifetime::{Lifetime, PoolKind};
use crate::runtime::RuntimeContext;
use crate::traits::Recycle;

/// Type-erased resolved instance. Always holds an `Arc<T>` for the bound `T`.
pub(crate) type Instance = Box<dyn Any + Send + Sync>;

/// Type-erased recycled value waiting on a free list. Holds a bare `T`.
type Spare = Box<dyn Any + Send + Sync>;

pub(crate) type Ctor = Arc<dyn Fn(&RuntimeContext) -> PoolResult<Instance> + Send + Sync>;

type Reclaim = Box<dyn Fn(Instance) -> Option<Spare> + Send + Sync>;
type Revive = Box<dyn Fn(Spare) -> Option<Instance> + Send + Sync>;

#[inline(always)]
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Instance {
    Box::new(value)
}

#[inline(always)]
pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(instance: &Instance) -> PoolResult<Arc<T>> {
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or(PoolError::TypeMismatch(std::any::type_name::<T>()))
}

/// One registered construction strategy.
pub(crate) struct Binding {
    pub(crate) key: TypeKey,
    pub(crate) lifetime: Lifetime,
    pub(crate) ctor: Ctor,
    /// Process-wide slot, present only for single bindings
    pub(crate) slot: Option<OnceCell<Instance>>,
    /// Free list, present only for recycled pooled bindings
    pub(crate) recycler: Option<Recycler>,
}

impl Binding {
    pub(crate) fn pooled(key: TypeKey, ctor: Ctor) -> Self {
        Self {
            key,
            lifetime: Lifetime::Pooled,
            ctor,
            slot: None,
            recycler: None,
        }
    }

    /// Single binding created on first resolution.
    pub(crate) fn lazy_single(key: TypeKey, ctor: Ctor) -> Self {
        Self {
            key,
            lifetime: Lifetime::Single,
            ctor,
            slot: Some(OnceCell::new()),
            recycler: None,
        }
    }

    /// Single binding around an already constructed value.
    pub(crate) fn single<T: ?Sized + Send + Sync + 'static>(key: TypeKey, value: Arc<T>) -> Self {
        let shared = value.clone();
        let ctor: Ctor =
            Arc::new(move |_: &RuntimeContext| -> PoolResult<Instance> { Ok(erase(shared.clone())) });
        Self {
            key,
            lifetime: Lifetime::Single,
            ctor,
            slot: Some(OnceCell::with_value(erase(value))),
            recycler: None,
        }
    }

    pub(crate) fn with_recycler(mut self, recycler: Recycler) -> Self {
        self.recycler = Some(recycler);
        self
    }
}

/// Free list of released instances for one recycled binding.
pub(crate) struct Recycler {
    reclaim: Reclaim,
    revive: Revive,
    free: Mutex<Vec<Spare>>,
    capacity: usize,
}

impl Recycler {
    pub(crate) fn new<T: Recycle>() -> Self {
        let reclaim: Reclaim = Box::new(|instance: Instance| {
            let shared = instance.downcast::<Arc<T>>().ok()?;
            // Escaped clones keep the value alive elsewhere; only the sole owner may recycle it
            let mut value = Arc::try_unwrap(*shared).ok()?;
            value.recycle();
            Some(Box::new(value) as Spare)
        });
        let revive: Revive = Box::new(|spare: Spare| {
            spare
                .downcast::<T>()
                .ok()
                .map(|value| erase(Arc::new(*value)))
        });
        Self {
            reclaim,
            revive,
            free: Mutex::new(Vec::new()),
            capacity: 0,
        }
    }

    /// Pops a recycled instance, if any.
    pub(crate) fn take(&self) -> Option<Instance> {
        let spare = self.free.lock().pop()?;
        (self.revive)(spare)
    }

    /// Offers a released instance back to the free list.
    ///
    /// Returns true when the instance was reclaimed.
    pub(crate) fn give_back(&self, instance: Instance) -> bool {
        if self.free.lock().len() >= self.capacity {
            return false;
        }
        // User reset code runs outside the lock
        let Some(spare) = (self.reclaim)(instance) else {
            return false;
        };
        let mut free = self.free.lock();
        if free.len() >= self.capacity {
            return false;
        }
        free.push(spare);
        true
    }

    pub(crate) fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

/// Binding table of one pool.
pub(crate) struct Registry {
    pub(crate) kind: PoolKind,
    bindings: HashMap<TypeKey, Binding, ahash::RandomState>,
    /// Keys that were bound more than once, in rebind order
    rebound: Vec<TypeKey>,
}

impl Registry {
    pub(crate) fn new(kind: PoolKind) -> Self {
        Self {
            kind,
            bindings: HashMap::default(),
            rebound: Vec::new(),
        }
    }

    /// Inserts a binding; an existing binding for the same key is replaced.
    pub(crate) fn insert(&mut self, binding: Binding) {
        let key = binding.key;
        if self.bindings.insert(key, binding).is_some() {
            self.rebound.push(key);
        }
    }

    #[inline(always)]
    pub(crate) fn get(&self, key: &TypeKey) -> Option<&Binding> {
        self.bindings.get(key)
    }

    pub(crate) fn contains_key(&self, key: &TypeKey) -> bool {
        self.bindings.contains_key(key)
    }

    pub(crate) fn rebound(&self) -> &[TypeKey] {
        &self.rebound
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Applies engine settings before the registry is frozen.
    pub(crate) fn finalize(&mut self, recycle_capacity: usize) {
        for binding in self.bindings.values_mut() {
            if let Some(recycler) = binding.recycler.as_mut() {
                recycler.capacity = recycle_capacity;
            }
        }
    }
}
