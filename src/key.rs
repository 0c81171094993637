//! Type keys for binding storage and lookup.

use std::any::TypeId;
use std::hash::{Hash, Hasher};

use crate::lifetime::PoolKind;

/// Identifies one bound dependency type.
///
/// Carries the `TypeId` for lookup and the type name for diagnostics.
/// Unsized types are supported, so `dyn Trait` can be bound and resolved
/// like any concrete type.
///
/// # Examples
///
/// ```rust
/// use ferrous_scope::TypeKey;
///
/// trait Clock: Send + Sync {}
///
/// let a = TypeKey::of::<String>();
/// let b = TypeKey::of::<String>();
/// assert_eq!(a, b);
/// assert_eq!(a.display_name(), "alloc::string::String");
///
/// let dyn_key = TypeKey::of::<dyn Clock>();
/// assert_ne!(dyn_key, a);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Type name for display
    pub fn display_name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }
}

// Hot path: TypeId-only comparison, the name is diagnostics only
impl PartialEq for TypeKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Key of a memoized instance inside a runtime context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotKey {
    pub(crate) pool: PoolKind,
    pub(crate) key: TypeKey,
}

impl SlotKey {
    #[inline(always)]
    pub(crate) fn new(pool: PoolKind, key: TypeKey) -> Self {
        Self { pool, key }
    }
}
