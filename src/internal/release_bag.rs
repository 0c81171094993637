//! Release hooks collected during a request.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// LIFO container of hooks run when a runtime context is released.
#[derive(Default)]
pub(crate) struct ReleaseBag {
    hooks: Vec<Box<dyn FnOnce() + Send>>,
}

impl ReleaseBag {
    pub(crate) fn push(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.hooks.push(f);
    }

    /// Runs every hook in reverse order. A panicking hook does not stop
    /// the remaining ones; its message is handed to `on_panic`.
    ///
    /// Returns the number of hooks run.
    pub(crate) fn run_all_reverse(&mut self, mut on_panic: impl FnMut(&str)) -> usize {
        let mut ran = 0;
        while let Some(f) = self.hooks.pop() {
            ran += 1;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
                on_panic(&panic_message(payload.as_ref()));
            }
        }
        ran
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
