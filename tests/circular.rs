/// Circular dependency detection tests

use ferrous_scope::{Application, PoolError};
use std::sync::Arc;

struct A {
    _b: Arc<B>,
}

struct B {
    _a: Arc<A>,
}

struct Leaf;

struct Left {
    leaf: Arc<Leaf>,
}

struct Right {
    leaf: Arc<Leaf>,
}

struct Top {
    left: Arc<Left>,
    right: Arc<Right>,
}

#[test]
fn two_service_cycle_reports_the_path() {
    let mut builder = Application::builder();
    builder
        .services()
        .try_bind_with(|ctx| Ok(A { _b: ctx.try_service::<B>()? }))
        .try_bind_with(|ctx| Ok(B { _a: ctx.try_service::<A>()? }));
    let app = builder.build().unwrap();

    let scope = app.open_scope();
    match scope.try_service::<A>() {
        Err(PoolError::Circular(path)) => {
            assert_eq!(path.len(), 3);
            assert!(path[0].ends_with("::A"));
            assert!(path[1].ends_with("::B"));
            assert!(path[2].ends_with("::A"));
        }
        other => panic!("expected a cycle, got {:?}", other.map(|_| ())),
    }
    // Failed resolution memoizes nothing and leaves the context usable
    assert_eq!(scope.resolved_count(), 0);
    assert!(!scope.is_released());
}

#[test]
fn self_referencing_component_fails_instead_of_blocking() {
    struct SelfRef;

    let mut builder = Application::builder();
    builder
        .components()
        .try_bind_with(|ctx| ctx.try_component::<SelfRef>().map(|_| SelfRef));
    let app = builder.build().unwrap();

    let result = app.scoped(|ctx| ctx.try_component::<SelfRef>().map(|_| ()));
    assert!(matches!(result, Err(PoolError::Circular(_))));
}

#[test]
#[should_panic(expected = "Circular dependency")]
fn panicking_accessors_surface_the_cycle() {
    let mut builder = Application::builder();
    builder.bind_service_with(|ctx| A { _b: ctx.service::<B>() });
    builder.bind_service_with(|ctx| B { _a: ctx.service::<A>() });
    let app = builder.build().unwrap();

    let scope = app.open_scope();
    scope.service::<A>();
}

#[test]
fn diamond_without_cycle_resolves() {
    let mut builder = Application::builder();
    builder.bind_repository(|| Leaf);
    builder.bind_service_with(|ctx| Left { leaf: ctx.repository::<Leaf>() });
    builder.bind_service_with(|ctx| Right { leaf: ctx.repository::<Leaf>() });
    builder.bind_service_with(|ctx| Top {
        left: ctx.service::<Left>(),
        right: ctx.service::<Right>(),
    });
    let app = builder.build().unwrap();

    let top = app.scoped(|ctx| ctx.try_service::<Top>()).unwrap();
    assert!(Arc::ptr_eq(&top.left.leaf, &top.right.leaf));
}

#[test]
fn cycle_detection_resets_between_resolutions() {
    let mut builder = Application::builder();
    builder
        .services()
        .try_bind_with(|ctx| Ok(A { _b: ctx.try_service::<B>()? }))
        .try_bind_with(|ctx| Ok(B { _a: ctx.try_service::<A>()? }));
    builder.bind_repository(|| Leaf);
    let app = builder.build().unwrap();

    let scope = app.open_scope();
    assert!(scope.try_service::<A>().is_err());
    // A stale resolution stack would misreport this as a cycle
    assert!(scope.try_repository::<Leaf>().is_ok());
}
