//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod release_bag;

pub(crate) use circular::ResolutionGuard;
pub(crate) use release_bag::{panic_message, ReleaseBag};
