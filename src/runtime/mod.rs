//! Per-request runtime contexts.
//!
//! A [`RuntimeContext`] is the private object graph of one request. Pools
//! memoize pooled instances into it, handlers resolve through it, and it is
//! released exactly once when the request ends.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::application::{AppInner, Application, Repository};
use crate::error::{PoolError, PoolResult};
use crate::internal::{panic_message, ReleaseBag};
use crate::key::SlotKey;
use crate::observer::Observers;
use crate::registration::{downcast, Instance, Recycler};
use crate::traits::Dispose;

pub mod lifecycle;

pub use lifecycle::{ReleaseReport, ScopeGuard};

/// Identity of the request owning a runtime context.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// Monotonically increasing per application, starting at 1
    pub id: u64,
    /// Free-form label such as `GET /users`
    pub label: Option<String>,
    pub started: Instant,
}

#[derive(Default)]
struct ScopeState {
    instances: HashMap<SlotKey, Instance, ahash::RandomState>,
    hooks: ReleaseBag,
    released: bool,
}

/// The private instance graph of one request.
///
/// Services, repositories and pooled components resolved through the same
/// context are memoized: asking twice yields the same `Arc`. Two contexts
/// never share a pooled instance. Single components bypass the context and
/// come from their process-wide slot.
///
/// The context is `Send + Sync`, so it can be held across `.await` points
/// or shared with spawned subtasks of the same request. Its map sits behind
/// a mutex that only its own request contends on.
///
/// Contexts are created through [`Application::open_scope`] and released
/// when their [`ScopeGuard`] is dropped. After release every resolution
/// fails with [`PoolError::ScopeReleased`].
///
/// # Examples
///
/// ```
/// use ferrous_scope::Application;
/// use std::sync::Arc;
///
/// struct OrderService;
///
/// let mut builder = Application::builder();
/// builder.bind_service(|| OrderService);
/// let app = builder.build().unwrap();
///
/// let scope = app.open_scope();
/// let a = scope.service::<OrderService>();
/// let b = scope.service::<OrderService>();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let other = app.open_scope();
/// assert!(!Arc::ptr_eq(&a, &other.service::<OrderService>()));
/// ```
pub struct RuntimeContext {
    app: Arc<AppInner>,
    info: RequestInfo,
    state: Mutex<ScopeState>,
}

impl RuntimeContext {
    pub(crate) fn new(app: Arc<AppInner>, info: RequestInfo) -> Self {
        Self {
            app,
            info,
            state: Mutex::new(ScopeState::default()),
        }
    }

    /// Resolves a service.
    ///
    /// # Panics
    ///
    /// Panics with the error's message if resolution fails, e.g. when the
    /// type is not bound. Use [`try_service`](Self::try_service) to handle
    /// the error instead.
    pub fn service<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        required(self.try_service())
    }

    pub fn try_service<T: ?Sized + Send + Sync + 'static>(&self) -> PoolResult<Arc<T>> {
        self.app.services.resolve::<T>(self)
    }

    /// Resolves a repository. Panics like [`service`](Self::service).
    pub fn repository<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        required(self.try_repository())
    }

    pub fn try_repository<T: ?Sized + Send + Sync + 'static>(&self) -> PoolResult<Arc<T>> {
        self.app.repositories.resolve::<T>(self)
    }

    /// Resolves a component. Panics like [`service`](Self::service).
    pub fn component<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        required(self.try_component())
    }

    pub fn try_component<T: ?Sized + Send + Sync + 'static>(&self) -> PoolResult<Arc<T>> {
        self.app.components.resolve::<T>(self)
    }

    /// Repository base handle tagged with this request.
    ///
    /// Gives repository factories access to installed resources.
    pub fn bare_repository(&self) -> Repository {
        Repository::new(self.app.resources.clone(), Some(self.info.id))
    }

    /// The application this context belongs to.
    pub fn application(&self) -> Application {
        Application::from_inner(self.app.clone())
    }

    /// Registers a hook run when the context is released.
    ///
    /// Hooks run in reverse registration order. A hook registered after
    /// release runs immediately.
    pub fn on_release<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        if state.released {
            drop(state);
            let mut late = ReleaseBag::default();
            late.push(Box::new(hook));
            let id = self.info.id;
            late.run_all_reverse(|message| self.app.observers.hook_panicked(id, message));
            return;
        }
        state.hooks.push(Box::new(hook));
    }

    /// Registers `value` to be disposed when the context is released.
    pub fn register_disposer<T: ?Sized + Dispose>(&self, value: Arc<T>) {
        self.on_release(move || value.dispose());
    }

    pub fn request_id(&self) -> u64 {
        self.info.id
    }

    pub fn info(&self) -> &RequestInfo {
        &self.info
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    /// Number of pooled instances memoized so far.
    pub fn resolved_count(&self) -> usize {
        self.state.lock().instances.len()
    }

    /// Releases the context.
    ///
    /// Runs release hooks in LIFO order, hands recyclable instances back to
    /// their free lists and drops everything else. Only the first call does
    /// any work and returns a report; later calls return `None`.
    pub fn release(&self) -> Option<ReleaseReport> {
        let (instances, mut hooks) = {
            let mut state = self.state.lock();
            if state.released {
                return None;
            }
            state.released = true;
            (std::mem::take(&mut state.instances), std::mem::take(&mut state.hooks))
        };

        let id = self.info.id;
        let observers = &self.app.observers;

        // Hooks first: disposers hold clones that would block recycling
        let hooks_run = hooks.run_all_reverse(|message| observers.hook_panicked(id, message));

        let released = instances.len();
        let (recyclable, dropped): (Vec<_>, Vec<_>) = instances
            .into_iter()
            .partition(|(slot, _)| self.recycler_for(slot).is_some());
        // Non-recyclable dependents go first so they release their clones
        drop(dropped);

        let mut recycled = 0;
        for (slot, instance) in recyclable {
            let Some(recycler) = self.recycler_for(&slot) else {
                continue;
            };
            match panic::catch_unwind(AssertUnwindSafe(|| recycler.give_back(instance))) {
                Ok(true) => recycled += 1,
                Ok(false) => {}
                Err(payload) => {
                    let message = format!(
                        "recycle of {} panicked: {}",
                        slot.key.display_name(),
                        panic_message(payload.as_ref())
                    );
                    observers.hook_panicked(id, &message);
                }
            }
        }

        let report = ReleaseReport {
            request_id: id,
            label: self.info.label.clone(),
            released,
            recycled,
            hooks: hooks_run,
            elapsed: self.info.started.elapsed(),
        };
        observers.released(&report);
        Some(report)
    }

    pub(crate) fn ensure_open(&self) -> PoolResult<()> {
        if self.state.lock().released {
            return Err(self.released_error());
        }
        Ok(())
    }

    pub(crate) fn memoized<T>(&self, slot: &SlotKey) -> PoolResult<Option<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let state = self.state.lock();
        if state.released {
            return Err(self.released_error());
        }
        state.instances.get(slot).map(downcast::<T>).transpose()
    }

    /// Stores a freshly built instance. If another resolution of the same
    /// slot finished first, the stored instance wins and `instance` is
    /// dropped outside the lock.
    pub(crate) fn memoize<T>(&self, slot: SlotKey, instance: Instance) -> PoolResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        if state.released {
            drop(state);
            drop(instance);
            return Err(self.released_error());
        }
        match state.instances.entry(slot) {
            Entry::Vacant(vacant) => downcast::<T>(vacant.insert(instance)),
            Entry::Occupied(occupied) => {
                let winner = downcast::<T>(occupied.get());
                drop(state);
                drop(instance);
                winner
            }
        }
    }

    fn recycler_for(&self, slot: &SlotKey) -> Option<&Recycler> {
        self.app
            .pool(slot.pool)
            .registry
            .get(&slot.key)
            .and_then(|binding| binding.recycler.as_ref())
    }

    pub(crate) fn belongs_to(&self, app: &Arc<AppInner>) -> bool {
        Arc::ptr_eq(&self.app, app)
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.app.observers
    }

    fn released_error(&self) -> PoolError {
        PoolError::ScopeReleased {
            request_id: self.info.id,
        }
    }
}

impl fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RuntimeContext")
            .field("info", &self.info)
            .field("instances", &state.instances.len())
            .field("released", &state.released)
            .finish()
    }
}

impl Drop for RuntimeContext {
    fn drop(&mut self) {
        self.release();
    }
}

fn required<T: ?Sized>(result: PoolResult<Arc<T>>) -> Arc<T> {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}
