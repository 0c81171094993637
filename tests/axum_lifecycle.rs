//! Axum lifecycle layer tests
//!
//! Every HTTP request gets its own runtime context, released when the
//! response is produced.

#![cfg(feature = "axum-integration")]

use axum::{body::Body, http::Request, http::StatusCode, routing::get, Router};
use ferrous_scope::axum_integration::{with_lifecycle, LifecycleLayer, RequestScope, ScopeRejection};
use ferrous_scope::{Application, Component, PoolObserver, ReleaseReport};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

struct RequestTag(u64);

struct Counter(AtomicU64);

#[derive(Default)]
struct Reports(Mutex<Vec<ReleaseReport>>);

struct Forward(Arc<Reports>);

impl PoolObserver for Forward {
    fn released(&self, report: &ReleaseReport) {
        self.0 .0.lock().unwrap().push(report.clone());
    }
}

fn app(reports: &Arc<Reports>) -> Application {
    let mut builder = Application::builder();
    builder.bind_component(Component::single(Counter(AtomicU64::new(0))));
    builder.bind_service_with(|ctx| RequestTag(ctx.request_id()));
    builder.add_observer(Forward(reports.clone()));
    builder.build().unwrap()
}

async fn tag(scope: RequestScope) -> String {
    let first = scope.service::<RequestTag>();
    let second = scope.service::<RequestTag>();
    assert!(Arc::ptr_eq(&first, &second));
    scope.component::<Counter>().0.fetch_add(1, Ordering::SeqCst);
    first.0.to_string()
}

async fn missing(scope: RequestScope) -> Result<String, ScopeRejection> {
    struct Unbound;
    scope.try_service::<Unbound>()?;
    Ok("unreachable".to_string())
}

async fn panicking(scope: RequestScope) -> String {
    struct Unbound;
    scope.service::<Unbound>();
    "unreachable".to_string()
}

fn router(app: Application) -> Router {
    Router::new()
        .route("/tag", get(tag))
        .route("/missing", get(missing))
        .route("/panicking", get(panicking))
        .layer(LifecycleLayer::new(app))
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn each_request_gets_its_own_context() {
    let reports = Arc::new(Reports::default());
    let app = app(&reports);
    let router = router(app.clone());

    let first = router
        .clone()
        .oneshot(Request::builder().uri("/tag").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let second = router
        .oneshot(Request::builder().uri("/tag").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let a = body_text(first).await;
    let b = body_text(second).await;
    assert_ne!(a, b);

    let reports = reports.0.lock().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].label.as_deref(), Some("GET /tag"));
    assert_eq!(reports[0].released, 1);

    let counter = app.scoped(|ctx| ctx.component::<Counter>());
    assert_eq!(counter.0.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn resolution_errors_become_500() {
    let reports = Arc::new(Reports::default());
    let router = router(app(&reports));

    let response = router
        .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("not bound"));
    assert_eq!(reports.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn panicking_accessor_becomes_500_and_releases() {
    let reports = Arc::new(Reports::default());
    let router = router(app(&reports));

    let task = tokio::spawn(
        router.oneshot(Request::builder().uri("/panicking").body(Body::empty()).unwrap()),
    );
    let response = task
        .await
        .expect("handler panic must not escape the layer")
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert!(body.contains("service not bound"));
    assert!(body.contains("Unbound"));

    let reports = reports.0.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].label.as_deref(), Some("GET /panicking"));
}

#[tokio::test]
async fn routes_without_the_layer_are_rejected() {
    let response = Router::new()
        .route("/tag", get(tag))
        .oneshot(Request::builder().uri("/tag").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn with_lifecycle_wraps_a_router() {
    let reports = Arc::new(Reports::default());
    let router = with_lifecycle(Router::new().route("/tag", get(tag)), app(&reports));

    let response = router
        .oneshot(Request::builder().uri("/tag").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(reports.0.lock().unwrap().len(), 1);
}
