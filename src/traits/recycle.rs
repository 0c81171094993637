//! Reset hook for physically reusable pooled instances.

/// Types whose allocations are worth keeping between requests.
///
/// Bindings made with the `bind_*_recycled` methods return released
/// instances to a per-binding free list instead of dropping them. Before an
/// instance goes back on the list, `recycle` must clear every trace of the
/// previous request; the next request receives it in place of a freshly
/// built value.
///
/// An instance is only reclaimed when the context held the last reference
/// to it. Clones of the `Arc` that escaped the request make it ineligible,
/// and it is dropped normally.
///
/// # Examples
///
/// ```
/// use ferrous_scope::Recycle;
///
/// struct QueryBuffer {
///     rows: Vec<String>,
/// }
///
/// impl Recycle for QueryBuffer {
///     fn recycle(&mut self) {
///         // keep capacity, drop contents
///         self.rows.clear();
///     }
/// }
/// ```
pub trait Recycle: Send + Sync + 'static {
    fn recycle(&mut self);
}
