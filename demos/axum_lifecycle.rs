//! Axum server with one runtime context per request
//!
//! Run with `cargo run --example axum_lifecycle --features axum-integration`
//! and try `curl localhost:3001/orders/7` a few times; the log shows each
//! context being opened and released.

use axum::{extract::Path, routing::get, Router};
use ferrous_scope::axum_integration::{RequestScope, ScopeRejection};
use ferrous_scope::{axum_integration::with_lifecycle, Application, Component, Dispose};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

struct Counter {
    hits: AtomicU64,
}

struct OrderRepository {
    lookups: Mutex<Vec<u64>>,
}

impl Dispose for OrderRepository {
    fn dispose(&self) {
        tracing::info!(lookups = ?self.lookups.lock().unwrap(), "order repository disposed");
    }
}

struct OrderService {
    orders: Arc<OrderRepository>,
    counter: Arc<Counter>,
}

impl OrderService {
    fn describe(&self, id: u64) -> String {
        self.orders.lookups.lock().unwrap().push(id);
        let hit = self.counter.hits.fetch_add(1, Ordering::Relaxed) + 1;
        format!("order {id} (hit #{hit})")
    }
}

async fn order(scope: RequestScope, Path(id): Path<u64>) -> Result<String, ScopeRejection> {
    let service = scope.try_service::<OrderService>()?;
    Ok(format!("request {}: {}", scope.request_id(), service.describe(id)))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let mut builder = Application::builder();
    builder.bind_component(Component::single(Counter {
        hits: AtomicU64::new(0),
    }));
    builder.bind_repository_shared::<OrderRepository, _>(|ctx| {
        let repo = Arc::new(OrderRepository {
            lookups: Mutex::new(Vec::new()),
        });
        ctx.register_disposer(repo.clone());
        repo
    });
    builder.bind_service_with(|ctx| OrderService {
        orders: ctx.repository::<OrderRepository>(),
        counter: ctx.component::<Counter>(),
    });
    let app = builder.build().expect("application should build");

    let router = with_lifecycle(Router::new().route("/orders/:id", get(order)), app);

    let listener = TcpListener::bind("127.0.0.1:3001")
        .await
        .expect("Failed to bind address");
    tracing::info!("listening on http://127.0.0.1:3001");
    axum::serve(listener, router).await.expect("server error");
}
