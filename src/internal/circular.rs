//! Circular dependency detection for factory chains.
//!
//! Factories run synchronously, so the chain of bindings currently being
//! constructed on a thread is exactly the resolution path. A thread-local
//! stack records it; entering a key already on the stack is a cycle.

use std::cell::RefCell;

use smallvec::SmallVec;

use crate::error::{PoolError, PoolResult};
use crate::key::SlotKey;

pub(crate) const MAX_DEPTH: usize = 1024;

thread_local! {
    static RESOLUTION_STACK: RefCell<SmallVec<[SlotKey; 8]>> = RefCell::new(SmallVec::new());
}

/// Marks a binding as under construction for the guard's lifetime.
///
/// Popped on drop, including while unwinding out of a panicking factory.
pub(crate) struct ResolutionGuard {
    key: SlotKey,
}

impl ResolutionGuard {
    pub(crate) fn enter(key: SlotKey) -> PoolResult<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if stack.iter().any(|k| *k == key) {
                let mut path: Vec<&'static str> =
                    stack.iter().map(|k| k.key.display_name()).collect();
                path.push(key.key.display_name());
                return Err(PoolError::Circular(path));
            }

            if stack.len() >= MAX_DEPTH {
                return Err(PoolError::DepthExceeded(stack.len()));
            }

            stack.push(key);
            Ok(Self { key })
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(last) = stack.pop() {
                debug_assert_eq!(last, self.key);
            }
        });
    }
}
