//! Core traits implemented by bound types.

mod dispose;
mod recycle;

pub use dispose::Dispose;
pub use recycle::Recycle;
