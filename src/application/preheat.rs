//! Cache preheating outside any request.

#[cfg(feature = "async")]
use std::future::Future;

use crate::error::{BoxError, PoolError, PoolResult};

use super::{Application, Repository};

impl Application {
    /// Runs `f` against a bare [`Repository`] before serving.
    ///
    /// Used to warm installed caches from startup code, where no runtime
    /// context exists. A failure is logged through the observers and
    /// returned as [`PoolError::Preheat`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_scope::Application;
    /// use std::collections::HashMap;
    /// use std::sync::RwLock;
    ///
    /// #[derive(Default)]
    /// struct ProductCache(RwLock<HashMap<u32, String>>);
    ///
    /// let mut builder = Application::builder();
    /// builder.provide(ProductCache::default());
    /// let app = builder.build().unwrap();
    ///
    /// app.cache_preheat(|repo| {
    ///     let cache = repo.require::<ProductCache>()?;
    ///     cache.0.write().unwrap().insert(7, "lamp".to_string());
    ///     Ok(())
    /// })
    /// .unwrap();
    ///
    /// let cache = app.resource::<ProductCache>().unwrap();
    /// assert_eq!(cache.0.read().unwrap()[&7], "lamp");
    /// ```
    pub fn cache_preheat<F>(&self, f: F) -> PoolResult<()>
    where
        F: FnOnce(&Repository) -> Result<(), BoxError>,
    {
        let repo = Repository::new(self.inner.resources.clone(), None);
        match f(&repo) {
            Ok(()) => {
                self.inner.observers.preheat_finished();
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                self.inner.observers.preheat_failed(&message);
                Err(PoolError::Preheat(message))
            }
        }
    }

    /// Runs `f` on a detached tokio task.
    ///
    /// Errors and panics inside `f` are logged through the observers and
    /// never reach the caller. The returned handle completes once the
    /// outcome has been logged; dropping it does not cancel the work.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    #[cfg(feature = "async")]
    pub fn async_cache_preheat<F, Fut>(&self, f: F) -> tokio::task::JoinHandle<()>
    where
        F: FnOnce(Repository) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let repo = Repository::new(self.inner.resources.clone(), None);
        let app = self.clone();
        let work = tokio::spawn(async move { f(repo).await });

        tokio::spawn(async move {
            let observers = &app.inner.observers;
            match work.await {
                Ok(Ok(())) => observers.preheat_finished(),
                Ok(Err(err)) => observers.preheat_failed(&err.to_string()),
                Err(join) if join.is_panic() => {
                    let payload = join.into_panic();
                    let message = crate::internal::panic_message(payload.as_ref());
                    observers.preheat_failed(&format!("panicked: {message}"));
                }
                Err(_) => observers.preheat_failed("cancelled"),
            }
        })
    }
}
