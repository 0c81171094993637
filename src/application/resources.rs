//! Installed resources and the repository base handle.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{PoolError, PoolResult};

/// Type map of collaborators installed at startup.
#[derive(Default)]
pub(crate) struct Resources {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>, ahash::RandomState>,
    names: Vec<&'static str>,
}

impl Resources {
    /// Stores `value`, replacing an earlier install of the same type.
    pub(crate) fn insert<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        if self.entries.insert(TypeId::of::<T>(), Box::new(value)).is_none() {
            self.names.push(type_name::<T>());
        }
    }

    pub(crate) fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Arc<T>>())
            .cloned()
    }

    pub(crate) fn names(&self) -> &[&'static str] {
        &self.names
    }
}

/// Base handle for data access code.
///
/// Carries the installed resources (database pools, cache clients and the
/// like) and, when obtained from a request, that request's id. Repository
/// factories usually embed one; preheat callbacks receive a bare one.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{Application, Repository};
/// use std::sync::Arc;
///
/// struct DbPool {
///     dsn: String,
/// }
///
/// struct UserRepository {
///     base: Repository,
/// }
///
/// let mut builder = Application::builder();
/// builder.provide(DbPool { dsn: "postgres://localhost/app".into() });
/// builder.bind_repository_with(|ctx| UserRepository { base: ctx.bare_repository() });
/// let app = builder.build().unwrap();
///
/// let scope = app.open_scope();
/// let repo = scope.repository::<UserRepository>();
/// assert_eq!(repo.base.require::<DbPool>().unwrap().dsn, "postgres://localhost/app");
/// assert_eq!(repo.base.request_id(), Some(scope.request_id()));
/// ```
#[derive(Clone)]
pub struct Repository {
    resources: Arc<Resources>,
    request_id: Option<u64>,
}

impl Repository {
    pub(crate) fn new(resources: Arc<Resources>, request_id: Option<u64>) -> Self {
        Self {
            resources,
            request_id,
        }
    }

    /// An installed resource, if one of type `T` exists.
    pub fn resource<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.resources.get::<T>()
    }

    /// Like [`resource`](Self::resource) but fails with
    /// [`PoolError::ResourceMissing`].
    pub fn require<T: Send + Sync + 'static>(&self) -> PoolResult<Arc<T>> {
        self.resource::<T>()
            .ok_or(PoolError::ResourceMissing(type_name::<T>()))
    }

    /// Id of the owning request, `None` outside any request.
    pub fn request_id(&self) -> Option<u64> {
        self.request_id
    }

    /// True when not tied to a request, as during cache preheating.
    pub fn is_bare(&self) -> bool {
        self.request_id.is_none()
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("request_id", &self.request_id)
            .field("resources", &self.resources.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Cache(u32);

    #[test]
    fn lookups_are_typed() {
        let mut resources = Resources::default();
        resources.insert(Arc::new(Cache(3)));
        let repo = Repository::new(Arc::new(resources), None);

        assert_eq!(repo.require::<Cache>().unwrap().0, 3);
        assert!(repo.resource::<String>().is_none());
        assert!(matches!(
            repo.require::<String>(),
            Err(PoolError::ResourceMissing(name)) if name.contains("String")
        ));
        assert!(repo.is_bare());
    }

    #[test]
    fn reinstall_replaces_without_duplicating_names() {
        let mut resources = Resources::default();
        resources.insert(Arc::new(Cache(1)));
        resources.insert(Arc::new(Cache(2)));
        assert_eq!(resources.get::<Cache>().unwrap().0, 2);
        assert_eq!(resources.names().len(), 1);
    }
}
