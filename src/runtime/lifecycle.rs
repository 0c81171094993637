//! Scope ownership and release reporting.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use super::RuntimeContext;

/// Summary of one context release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseReport {
    pub request_id: u64,
    pub label: Option<String>,
    /// Pooled instances held by the context at release
    pub released: usize,
    /// How many of those went back to a free list
    pub recycled: usize,
    /// Release hooks run, including disposers
    pub hooks: usize,
    /// Time from context creation to release
    pub elapsed: Duration,
}

/// Owner of a request's [`RuntimeContext`].
///
/// Dropping the guard releases the context, so release happens on normal
/// return, on early return with an error, while unwinding from a panic and
/// when an enclosing future is cancelled.
///
/// # Examples
///
/// ```
/// use ferrous_scope::Application;
///
/// struct Cart;
///
/// let mut builder = Application::builder();
/// builder.bind_service(|| Cart);
/// let app = builder.build().unwrap();
///
/// let scope = app.open_scope_labeled("POST /checkout");
/// let _cart = scope.service::<Cart>();
/// let ctx = scope.context().clone();
///
/// let report = scope.release().unwrap();
/// assert_eq!(report.released, 1);
/// assert_eq!(report.label.as_deref(), Some("POST /checkout"));
/// assert!(ctx.try_service::<Cart>().is_err());
/// ```
#[must_use = "dropping the guard releases the runtime context immediately"]
pub struct ScopeGuard {
    ctx: Arc<RuntimeContext>,
}

impl ScopeGuard {
    pub(crate) fn new(ctx: Arc<RuntimeContext>) -> Self {
        Self { ctx }
    }

    /// Shared handle on the context, e.g. for spawned subtasks.
    ///
    /// Clones stay usable as handles after the guard is gone, but every
    /// resolution through them fails once the context is released.
    pub fn context(&self) -> &Arc<RuntimeContext> {
        &self.ctx
    }

    /// Releases now and returns the report.
    pub fn release(self) -> Option<ReleaseReport> {
        self.ctx.release()
    }
}

impl Deref for ScopeGuard {
    type Target = RuntimeContext;

    fn deref(&self) -> &RuntimeContext {
        &self.ctx
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.ctx.release();
    }
}
