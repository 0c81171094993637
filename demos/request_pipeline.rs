//! Request pipeline walkthrough
//!
//! Builds an application with all three pools, installs a shared resource,
//! preheats a cache and then serves a handful of simulated requests, each in
//! its own runtime context.

use ferrous_scope::{Application, BoxError, Component, Dispose, EngineConfig, Recycle, RuntimeContext};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

// ===== Shared state (components and resources) =====

struct Database {
    users: Mutex<HashMap<u64, String>>,
}

struct Metrics {
    served: AtomicU64,
}

struct Cache {
    names: Mutex<HashMap<u64, String>>,
}

// ===== Per-request state (repositories and services) =====

struct UserRepository {
    db: Arc<Database>,
    cache: Arc<Cache>,
}

impl UserRepository {
    fn name(&self, id: u64) -> Option<String> {
        if let Some(name) = self.cache.names.lock().unwrap().get(&id) {
            return Some(name.clone());
        }
        self.db.users.lock().unwrap().get(&id).cloned()
    }
}

struct AuditTrail {
    request_id: u64,
    entries: Mutex<Vec<String>>,
}

impl Dispose for AuditTrail {
    fn dispose(&self) {
        for entry in self.entries.lock().unwrap().iter() {
            println!("  audit[{}]: {}", self.request_id, entry);
        }
    }
}

struct ResponseBuffer {
    body: String,
}

impl Recycle for ResponseBuffer {
    fn recycle(&mut self) {
        self.body.clear();
    }
}

struct GreetingService {
    users: Arc<UserRepository>,
    audit: Arc<AuditTrail>,
    buffer: Arc<ResponseBuffer>,
}

impl GreetingService {
    fn greet(&self, id: u64) -> String {
        self.audit.entries.lock().unwrap().push(format!("greet {id}"));
        match self.users.name(id) {
            Some(name) => format!("Hello, {name}! (buffer capacity {})", self.buffer.body.capacity()),
            None => format!("Unknown user {id}"),
        }
    }
}

fn build() -> Result<Application, BoxError> {
    let mut builder = Application::builder();
    builder.with_config(EngineConfig::from_env()?);

    builder.install(|| {
        let users = HashMap::from([(1, "Ada".to_string()), (2, "Grace".to_string())]);
        Ok(Database {
            users: Mutex::new(users),
        })
    });

    builder
        .bind_component(Component::single(Metrics {
            served: AtomicU64::new(0),
        }))
        .bind_component(Component::single(Cache {
            names: Mutex::new(HashMap::new()),
        }));

    builder.bind_repository_with(|ctx: &RuntimeContext| UserRepository {
        db: ctx.bare_repository().require::<Database>().unwrap(),
        cache: ctx.component::<Cache>(),
    });
    builder.bind_repository_shared::<AuditTrail, _>(|ctx| {
        let audit = Arc::new(AuditTrail {
            request_id: ctx.request_id(),
            entries: Mutex::new(Vec::new()),
        });
        ctx.register_disposer(audit.clone());
        audit
    });

    builder.bind_service_recycled(|| ResponseBuffer {
        body: String::with_capacity(1024),
    });
    builder.bind_service_with(|ctx| GreetingService {
        users: ctx.repository::<UserRepository>(),
        audit: ctx.repository::<AuditTrail>(),
        buffer: ctx.service::<ResponseBuffer>(),
    });

    builder.on_boot(|app| {
        let cache = app.scoped(|ctx| ctx.component::<Cache>());
        app.cache_preheat(move |repo| {
            let db = repo.require::<Database>()?;
            let mut names = cache.names.lock().unwrap();
            for (id, name) in db.users.lock().unwrap().iter() {
                names.insert(*id, name.clone());
            }
            Ok(())
        })
    });

    Ok(builder.build()?)
}

fn main() -> Result<(), BoxError> {
    println!("Request pipeline demo");

    let app = build()?;
    for binding in app.bindings() {
        println!("  bound {} {} ({:?})", binding.pool, binding.type_name, binding.lifetime);
    }

    for id in [1, 2, 3] {
        let scope = app.open_scope_labeled(format!("greet/{id}"));
        let service = scope.service::<GreetingService>();
        println!("request {}: {}", scope.request_id(), service.greet(id));
        scope.component::<Metrics>().served.fetch_add(1, Ordering::Relaxed);
        drop(service);

        if let Some(report) = scope.release() {
            println!(
                "  released {} instances, {} recycled, {} hooks in {:?}",
                report.released, report.recycled, report.hooks, report.elapsed
            );
        }
    }

    let served = app.scoped(|ctx| ctx.component::<Metrics>().served.load(Ordering::Relaxed));
    println!("served {served} requests");
    Ok(())
}
