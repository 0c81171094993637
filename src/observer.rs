//! Observation hooks for binding, resolution and release events.
//!
//! Every application carries a list of [`PoolObserver`]s. The built-in
//! [`TracingObserver`] is installed unless the builder opts out and turns
//! each event into a structured `tracing` event, so subscribers configured
//! by the host process (e.g. `tracing-subscriber`) pick them up.

use std::sync::Arc;
use std::time::Duration;

use crate::key::TypeKey;
use crate::lifetime::{Lifetime, PoolKind};
use crate::runtime::ReleaseReport;

/// Where a pooled or single instance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Built by the bound factory
    Factory,
    /// Taken from the binding's free list
    FreeList,
    /// First initialization of a single component
    Singleton,
}

/// Observer of engine events.
///
/// All methods default to no-ops. Calls happen synchronously on the thread
/// doing the work, so implementations should stay cheap.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{Application, PoolObserver, ReleaseReport};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct ReleaseCounter(Arc<AtomicUsize>);
///
/// impl PoolObserver for ReleaseCounter {
///     fn released(&self, _report: &ReleaseReport) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// let releases = Arc::new(AtomicUsize::new(0));
/// let mut builder = Application::builder();
/// builder.add_observer(ReleaseCounter(releases.clone()));
/// let app = builder.build().unwrap();
///
/// app.scoped(|_| ());
/// app.scoped(|_| ());
/// assert_eq!(releases.load(Ordering::SeqCst), 2);
/// ```
pub trait PoolObserver: Send + Sync {
    /// A binding was frozen into its pool.
    fn bound(&self, _pool: PoolKind, _key: &TypeKey, _lifetime: Lifetime) {}

    /// A binding replaced an earlier one for the same type.
    fn rebound(&self, _pool: PoolKind, _key: &TypeKey) {}

    /// The application finished building.
    fn ready(&self, _bindings: usize) {}

    /// A new instance entered a runtime context or a single slot.
    fn resolved(&self, _request_id: u64, _pool: PoolKind, _key: &TypeKey, _origin: Origin, _elapsed: Duration) {}

    fn released(&self, _report: &ReleaseReport) {}

    /// A release hook or recycle reset panicked. Release continues.
    fn hook_panicked(&self, _request_id: u64, _message: &str) {}

    fn preheat_finished(&self) {}

    fn preheat_failed(&self, _message: &str) {}
}

/// Emits engine events through `tracing`.
///
/// Levels: `debug` for per-request resolution and release, `info` for
/// startup and preheat completion, `warn` for rebinds and panicking hooks,
/// `error` for failed preheats.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PoolObserver for TracingObserver {
    fn bound(&self, pool: PoolKind, key: &TypeKey, lifetime: Lifetime) {
        tracing::debug!(%pool, ty = key.display_name(), ?lifetime, "binding registered");
    }

    fn rebound(&self, pool: PoolKind, key: &TypeKey) {
        tracing::warn!(%pool, ty = key.display_name(), "binding replaced, last registration wins");
    }

    fn ready(&self, bindings: usize) {
        tracing::info!(bindings, "application ready");
    }

    fn resolved(&self, request_id: u64, pool: PoolKind, key: &TypeKey, origin: Origin, elapsed: Duration) {
        tracing::debug!(
            request_id,
            %pool,
            ty = key.display_name(),
            ?origin,
            elapsed_us = elapsed.as_micros() as u64,
            "instance resolved"
        );
    }

    fn released(&self, report: &ReleaseReport) {
        tracing::debug!(
            request_id = report.request_id,
            label = report.label.as_deref().unwrap_or(""),
            released = report.released,
            recycled = report.recycled,
            hooks = report.hooks,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "runtime context released"
        );
    }

    fn hook_panicked(&self, request_id: u64, message: &str) {
        tracing::warn!(request_id, reason = message, "release hook panicked");
    }

    fn preheat_finished(&self) {
        tracing::info!("cache preheat finished");
    }

    fn preheat_failed(&self, message: &str) {
        tracing::error!(reason = message, "cache preheat failed");
    }
}

/// Fan-out over the registered observers.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn PoolObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, observer: Arc<dyn PoolObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn extend(&mut self, other: Observers) {
        self.observers.extend(other.observers);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn bound(&self, pool: PoolKind, key: &TypeKey, lifetime: Lifetime) {
        for o in &self.observers {
            o.bound(pool, key, lifetime);
        }
    }

    pub(crate) fn rebound(&self, pool: PoolKind, key: &TypeKey) {
        for o in &self.observers {
            o.rebound(pool, key);
        }
    }

    pub(crate) fn ready(&self, bindings: usize) {
        for o in &self.observers {
            o.ready(bindings);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, request_id: u64, pool: PoolKind, key: &TypeKey, origin: Origin, elapsed: Duration) {
        for o in &self.observers {
            o.resolved(request_id, pool, key, origin, elapsed);
        }
    }

    pub(crate) fn released(&self, report: &ReleaseReport) {
        for o in &self.observers {
            o.released(report);
        }
    }

    pub(crate) fn hook_panicked(&self, request_id: u64, message: &str) {
        for o in &self.observers {
            o.hook_panicked(request_id, message);
        }
    }

    pub(crate) fn preheat_finished(&self) {
        for o in &self.observers {
            o.preheat_finished();
        }
    }

    pub(crate) fn preheat_failed(&self, message: &str) {
        for o in &self.observers {
            o.preheat_failed(message);
        }
    }
}
