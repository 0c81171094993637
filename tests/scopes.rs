/// Runtime context isolation tests
///
/// Pooled instances are memoized per runtime context and never shared
/// between contexts; services and repositories live in separate pools.

use ferrous_scope::{Application, PoolError, PoolKind};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

struct RequestCounter(u32);

struct OrderRepository {
    id: u32,
}

struct OrderService {
    orders: Arc<OrderRepository>,
}

fn app() -> Application {
    let next = Arc::new(AtomicU32::new(0));
    let mut builder = Application::builder();
    builder.bind_service(move || RequestCounter(next.fetch_add(1, Ordering::SeqCst)));

    let ids = Arc::new(AtomicU32::new(100));
    builder.bind_repository(move || OrderRepository {
        id: ids.fetch_add(1, Ordering::SeqCst),
    });
    builder.bind_service_with(|ctx| OrderService {
        orders: ctx.repository::<OrderRepository>(),
    });
    builder.build().unwrap()
}

#[test]
fn same_context_yields_same_instance() {
    let app = app();
    let scope = app.open_scope();

    let a = scope.service::<RequestCounter>();
    let b = scope.service::<RequestCounter>();
    assert!(Arc::ptr_eq(&a, &b));

    let r1 = scope.repository::<OrderRepository>();
    let r2 = scope.repository::<OrderRepository>();
    assert!(Arc::ptr_eq(&r1, &r2));
}

#[test]
fn different_contexts_yield_distinct_instances() {
    let app = app();
    let first = app.open_scope();
    let second = app.open_scope();

    let a = first.service::<RequestCounter>();
    let b = second.service::<RequestCounter>();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_ne!(a.0, b.0);

    let r1 = first.repository::<OrderRepository>();
    let r2 = second.repository::<OrderRepository>();
    assert!(!Arc::ptr_eq(&r1, &r2));
    assert_ne!(r1.id, r2.id);
}

#[test]
fn nested_dependencies_share_the_request_graph() {
    let app = app();
    let scope = app.open_scope();

    let service = scope.service::<OrderService>();
    let repo = scope.repository::<OrderRepository>();
    assert!(Arc::ptr_eq(&service.orders, &repo));
    assert_eq!(scope.resolved_count(), 2);
}

#[test]
fn same_type_in_two_pools_does_not_collide() {
    #[derive(Debug)]
    struct Audit(&'static str);

    let mut builder = Application::builder();
    builder.bind_service(|| Audit("service"));
    builder.bind_repository(|| Audit("repository"));
    let app = builder.build().unwrap();

    let scope = app.open_scope();
    assert_eq!(scope.service::<Audit>().0, "service");
    assert_eq!(scope.repository::<Audit>().0, "repository");
    assert!(!Arc::ptr_eq(&scope.service::<Audit>(), &scope.repository::<Audit>()));
}

#[test]
fn services_are_not_visible_as_repositories() {
    let app = app();
    let scope = app.open_scope();
    match scope.try_repository::<RequestCounter>() {
        Err(PoolError::NotBound { pool, type_name }) => {
            assert_eq!(pool, PoolKind::Repository);
            assert!(type_name.contains("RequestCounter"));
        }
        other => panic!("expected NotBound, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn application_getters_resolve_through_the_context() {
    let app = app();
    let scope = app.open_scope();
    let via_app = app.get_service::<RequestCounter>(&scope).unwrap();
    assert!(Arc::ptr_eq(&via_app, &scope.service::<RequestCounter>()));
    let repo = app.get_repository::<OrderRepository>(&scope).unwrap();
    assert!(Arc::ptr_eq(&repo, &scope.repository::<OrderRepository>()));
}

#[test]
fn labels_and_ids_are_reported() {
    let app = app();
    let scope = app.open_scope_labeled("GET /orders");
    assert_eq!(scope.info().label.as_deref(), Some("GET /orders"));
    assert!(scope.request_id() >= 1);
    assert!(!scope.is_released());
}
