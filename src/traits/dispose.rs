//! Disposal trait for per-request resource cleanup.

/// Synchronous teardown run when a runtime context is released.
///
/// Register an instance with
/// [`RuntimeContext::register_disposer`](crate::RuntimeContext::register_disposer),
/// typically from a context-aware factory. Disposers run in LIFO order
/// during release; a panicking disposer is logged and skipped.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{Application, Dispose};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Transaction {
///     committed: Arc<AtomicBool>,
/// }
///
/// impl Dispose for Transaction {
///     fn dispose(&self) {
///         self.committed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let committed = Arc::new(AtomicBool::new(false));
/// let flag = committed.clone();
///
/// let mut builder = Application::builder();
/// builder.bind_repository_shared::<Transaction, _>(move |ctx| {
///     let tx = Arc::new(Transaction { committed: flag.clone() });
///     ctx.register_disposer(tx.clone());
///     tx
/// });
/// let app = builder.build().unwrap();
///
/// {
///     let scope = app.open_scope();
///     let _tx = scope.repository::<Transaction>();
/// } // released here
///
/// assert!(committed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
