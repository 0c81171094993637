//! # ferrous-scope
//!
//! Request-scoped dependency injection and object pooling for Rust services.
//!
//! Types are bound to factories once, at startup. Every inbound request then
//! gets a private [`RuntimeContext`] in which services, repositories and
//! components are materialized on demand, memoized for the rest of the
//! request, and reclaimed when it ends.
//!
//! ## Features
//!
//! - **Three pools**: services, repositories and components, each with its
//!   own namespace
//! - **Per-request memoization**: one instance per type per request, never
//!   shared with another request
//! - **Single components**: process-wide instances created exactly once,
//!   even under concurrent first use
//! - **Recycling**: opt-in free lists for objects worth reusing between
//!   requests
//! - **Guaranteed release**: contexts are released on return, error, panic
//!   and cancellation
//! - **Cache preheating**: synchronous or on a background tokio task
//! - **Axum integration**: a tower layer plus a request extractor
//!   (feature `axum-integration`)
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_scope::{Application, Component};
//! use std::sync::Arc;
//!
//! struct DbPool {
//!     url: String,
//! }
//!
//! struct UserRepository {
//!     db: Arc<DbPool>,
//! }
//!
//! struct UserService {
//!     users: Arc<UserRepository>,
//! }
//!
//! let mut builder = Application::builder();
//! builder.bind_component(Component::single(DbPool { url: "postgres://localhost".into() }));
//! builder.bind_repository_with(|ctx| UserRepository { db: ctx.component::<DbPool>() });
//! builder.bind_service_with(|ctx| UserService { users: ctx.repository::<UserRepository>() });
//! let app = builder.build().unwrap();
//!
//! // One runtime context per request
//! let scope = app.open_scope_labeled("GET /users");
//! let service = scope.service::<UserService>();
//! assert_eq!(service.users.db.url, "postgres://localhost");
//!
//! // Memoized within the request
//! assert!(Arc::ptr_eq(&service.users, &scope.repository::<UserRepository>()));
//! ```
//!
//! ## Lifetimes
//!
//! - **Pooled** (services, repositories, pooled components): one instance
//!   per runtime context
//! - **Single** (single components): one instance per process
//!
//! ## Trait Objects
//!
//! ```rust
//! use ferrous_scope::Application;
//! use std::sync::Arc;
//!
//! trait Notifier: Send + Sync {
//!     fn channel(&self) -> &'static str;
//! }
//!
//! struct EmailNotifier;
//! impl Notifier for EmailNotifier {
//!     fn channel(&self) -> &'static str { "email" }
//! }
//!
//! let mut builder = Application::builder();
//! builder.bind_service_shared::<dyn Notifier, _>(|_| Arc::new(EmailNotifier));
//! let app = builder.build().unwrap();
//!
//! let channel = app.scoped(|ctx| ctx.service::<dyn Notifier>().channel());
//! assert_eq!(channel, "email");
//! ```

pub mod application;
pub mod config;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod pool;
pub mod runtime;
pub mod traits;

#[cfg(feature = "axum-integration")]
pub mod axum_integration;

// Internal modules
mod internal;
mod registration;

pub use application::{Application, ApplicationBuilder, BindingInfo, Repository};
pub use config::{ConfigSource, ConfigValue, EngineConfig, EnvironmentConfigSource, MapConfigSource, RebindPolicy};
pub use error::{BoxError, PoolError, PoolResult};
pub use key::TypeKey;
pub use lifetime::{Lifetime, PoolKind};
pub use observer::{Origin, PoolObserver, TracingObserver};
pub use pool::{Binder, Component, Pool};
pub use runtime::{ReleaseReport, RequestInfo, RuntimeContext, ScopeGuard};
pub use traits::{Dispose, Recycle};
