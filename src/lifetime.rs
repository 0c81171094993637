//! Pool categories and instance lifetimes.

use std::fmt;

/// Dependency category, one pool per kind.
///
/// Bindings are namespaced by pool: the same Rust type may be bound as a
/// service and as a repository without the two registrations colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PoolKind {
    /// Business services, fresh per request
    Service,
    /// Data access objects, fresh per request
    Repository,
    /// Infrastructure components, single or per request
    Component,
}

impl PoolKind {
    pub const ALL: [PoolKind; 3] = [PoolKind::Service, PoolKind::Repository, PoolKind::Component];

    pub fn as_str(&self) -> &'static str {
        match self {
            PoolKind::Service => "service",
            PoolKind::Repository => "repository",
            PoolKind::Component => "component",
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long a resolved instance lives.
///
/// # Examples
///
/// ```rust
/// use ferrous_scope::{Application, Component};
/// use std::sync::Arc;
///
/// struct CacheClient;
/// struct Accumulator(Vec<u32>);
///
/// let mut builder = Application::builder();
/// builder.bind_component(Component::single(CacheClient));
/// builder.bind_component(Component::pooled(|| Accumulator(Vec::new())));
/// let app = builder.build().unwrap();
///
/// let first = app.open_scope();
/// let second = app.open_scope();
///
/// // Single: one instance for the whole process
/// assert!(Arc::ptr_eq(
///     &first.component::<CacheClient>(),
///     &second.component::<CacheClient>(),
/// ));
///
/// // Pooled: one instance per request
/// assert!(!Arc::ptr_eq(
///     &first.component::<Accumulator>(),
///     &second.component::<Accumulator>(),
/// ));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// One instance per process, held in the binding's slot
    Single,
    /// One instance per runtime context, memoized in the context
    Pooled,
}
