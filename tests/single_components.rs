/// Single and pooled component tests
///
/// Single components are shared by every runtime context; pooled
/// components follow the per-request rule of services.

use ferrous_scope::{Application, Component, Lifetime, PoolKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

trait Cache: Send + Sync {
    fn backend(&self) -> &'static str;
}

struct RedisCache;

impl Cache for RedisCache {
    fn backend(&self) -> &'static str {
        "redis"
    }
}

struct HttpClient {
    timeout_ms: u64,
}

struct Accumulator {
    items: Vec<u32>,
}

#[test]
fn single_component_is_identical_in_every_context() {
    let mut builder = Application::builder();
    builder.bind_component(Component::single(HttpClient { timeout_ms: 250 }));
    let app = builder.build().unwrap();

    let a = app.open_scope();
    let b = app.open_scope();
    let from_a = a.component::<HttpClient>();
    let from_b = b.component::<HttpClient>();
    assert!(Arc::ptr_eq(&from_a, &from_b));
    assert_eq!(from_a.timeout_ms, 250);

    // Single components are not memoized into the context
    assert_eq!(a.resolved_count(), 0);
}

#[test]
fn shared_trait_object_component() {
    let mut builder = Application::builder();
    builder.bind_component(Component::<dyn Cache>::shared(Arc::new(RedisCache)));
    let app = builder.build().unwrap();

    let first = app.scoped(|ctx| ctx.component::<dyn Cache>());
    let second = app.scoped(|ctx| ctx.component::<dyn Cache>());
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.backend(), "redis");
}

#[test]
fn lazy_component_is_built_on_first_use() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();

    let mut builder = Application::builder();
    builder.bind_component(Component::lazy(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        HttpClient { timeout_ms: 30 }
    }));
    let app = builder.build().unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 0);

    for _ in 0..10 {
        app.scoped(|ctx| assert_eq!(ctx.component::<HttpClient>().timeout_ms, 30));
    }
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[test]
fn lazy_shared_trait_object() {
    let mut builder = Application::builder();
    builder.bind_component(Component::<dyn Cache>::lazy_shared(|| Arc::new(RedisCache)));
    let app = builder.build().unwrap();
    assert_eq!(app.scoped(|ctx| ctx.component::<dyn Cache>().backend()), "redis");
}

#[test]
fn pooled_component_follows_the_service_rule() {
    let mut builder = Application::builder();
    builder.bind_component(Component::pooled(|| Accumulator { items: Vec::new() }));
    let app = builder.build().unwrap();

    let a = app.open_scope();
    let b = app.open_scope();
    assert!(Arc::ptr_eq(&a.component::<Accumulator>(), &a.component::<Accumulator>()));
    assert!(!Arc::ptr_eq(&a.component::<Accumulator>(), &b.component::<Accumulator>()));
    assert!(a.component::<Accumulator>().items.is_empty());
    assert_eq!(a.resolved_count(), 1);
}

#[test]
fn pooled_component_can_depend_on_a_single_one() {
    struct Session {
        client: Arc<HttpClient>,
    }

    let mut builder = Application::builder();
    builder.bind_component(Component::single(HttpClient { timeout_ms: 5 }));
    builder.bind_component(Component::pooled_with(|ctx| Session {
        client: ctx.component::<HttpClient>(),
    }));
    let app = builder.build().unwrap();

    let a = app.scoped(|ctx| ctx.component::<Session>());
    let b = app.scoped(|ctx| ctx.component::<Session>());
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a.client, &b.client));
}

#[test]
fn bindings_report_component_lifetimes() {
    let mut builder = Application::builder();
    builder.bind_component(Component::single(HttpClient { timeout_ms: 1 }));
    builder.bind_component(Component::pooled(|| Accumulator { items: vec![] }));
    let app = builder.build().unwrap();

    let info = app.bindings();
    assert_eq!(info.len(), 2);
    assert!(info.iter().all(|b| b.pool == PoolKind::Component));
    let client = info.iter().find(|b| b.type_name.ends_with("HttpClient")).unwrap();
    assert_eq!(client.lifetime, Lifetime::Single);
    let acc = info.iter().find(|b| b.type_name.ends_with("Accumulator")).unwrap();
    assert_eq!(acc.lifetime, Lifetime::Pooled);
    assert!(app.pool(PoolKind::Component).is_bound::<HttpClient>());
}
