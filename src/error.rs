//! Error types for the binding and resolution engine.

use thiserror::Error;

use crate::lifetime::PoolKind;

/// Errors raised while binding, resolving or releasing dependencies.
///
/// Configuration errors (`AlreadyBound`, `Config`, `Install`) surface from
/// [`ApplicationBuilder::build`](crate::ApplicationBuilder::build) and must
/// stop the process from serving. Resolution errors (`NotBound`, `Circular`,
/// `DepthExceeded`, `ScopeReleased`) fail the current request only.
///
/// # Examples
///
/// ```rust
/// use ferrous_scope::{Application, PoolError};
///
/// struct Mailer;
///
/// let app = Application::builder().build().unwrap();
/// let scope = app.open_scope();
/// match scope.try_service::<Mailer>() {
///     Err(PoolError::NotBound { type_name, .. }) => assert!(type_name.ends_with("Mailer")),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// No binding registered for the requested type in that pool
    #[error("{pool} not bound: {type_name}")]
    NotBound {
        pool: PoolKind,
        type_name: &'static str,
    },
    /// A second binding for the same type was rejected
    #[error("{pool} already bound: {type_name}")]
    AlreadyBound {
        pool: PoolKind,
        type_name: &'static str,
    },
    /// Stored instance did not downcast to the requested type
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Resolution cycle (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),
    /// Maximum resolution depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// The runtime context was already released
    #[error("Runtime context of request {request_id} already released")]
    ScopeReleased { request_id: u64 },
    /// The runtime context was opened by a different application
    #[error("Runtime context of request {request_id} belongs to another application")]
    ForeignScope { request_id: u64 },
    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),
    /// A resource install or boot hook failed
    #[error("Install failed: {0}")]
    Install(String),
    /// An installed resource was requested but never installed
    #[error("Resource not installed: {0}")]
    ResourceMissing(&'static str),
    /// A cache preheat callback failed
    #[error("Cache preheat failed: {0}")]
    Preheat(String),
}

impl PoolError {
    /// True for errors that indicate a startup misconfiguration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PoolError::AlreadyBound { .. } | PoolError::Config(_) | PoolError::Install(_)
        )
    }
}

/// Result type for engine operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Boxed error returned by install hooks and preheat callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
