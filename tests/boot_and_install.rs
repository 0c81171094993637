/// Startup hook tests: resource installs and boot hooks
///
/// Installs run in registration order during build; boot hooks see the
/// finished application; any failure aborts the build.

use ferrous_scope::{Application, BoxError, PoolError};
use std::sync::{Arc, Mutex};

struct Database {
    dsn: String,
}

struct RedisClient {
    url: String,
}

struct UserRepository {
    db: Arc<Database>,
}

#[test]
fn installed_resources_reach_repositories() {
    let mut builder = Application::builder();
    builder.install(|| {
        Ok(Database {
            dsn: "postgres://db/app".to_string(),
        })
    });
    builder.provide(RedisClient {
        url: "redis://cache".to_string(),
    });
    builder.bind_repository_with(|ctx| UserRepository {
        db: ctx.bare_repository().require::<Database>().unwrap(),
    });
    let app = builder.build().unwrap();

    let dsn = app.scoped(|ctx| ctx.repository::<UserRepository>().db.dsn.clone());
    assert_eq!(dsn, "postgres://db/app");
    assert_eq!(app.resource::<RedisClient>().unwrap().url, "redis://cache");

    // Resources are shared, not per request
    let a = app.scoped(|ctx| ctx.repository::<UserRepository>().db.clone());
    let b = app.scoped(|ctx| ctx.repository::<UserRepository>().db.clone());
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn install_hooks_run_in_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut builder = Application::builder();
    let first = order.clone();
    builder.install(move || {
        first.lock().unwrap().push("database");
        Ok(Database { dsn: String::new() })
    });
    let second = order.clone();
    builder.install(move || {
        second.lock().unwrap().push("redis");
        Ok(RedisClient { url: String::new() })
    });
    builder.build().unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["database", "redis"]);
}

#[test]
fn failing_install_aborts_build() {
    let mut builder = Application::builder();
    builder.install::<Database, _>(|| {
        let port: u16 = "not-a-port".parse()?;
        Ok(Database {
            dsn: format!("postgres://db:{port}"),
        })
    });
    let err = builder.build().unwrap_err();
    assert!(err.is_configuration());
    match err {
        PoolError::Install(message) => assert!(message.contains("Database")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn boot_hooks_see_the_built_application() {
    let booted = Arc::new(Mutex::new(Vec::new()));
    let mut builder = Application::builder();
    builder.provide(Database {
        dsn: "sqlite::memory:".to_string(),
    });
    let log = booted.clone();
    builder.on_boot(move |app| {
        let db = app
            .resource::<Database>()
            .ok_or(PoolError::ResourceMissing("Database"))?;
        log.lock().unwrap().push(db.dsn.clone());
        Ok(())
    });
    let log = booted.clone();
    builder.on_boot(move |app| {
        app.cache_preheat(|repo| {
            repo.require::<Database>()?;
            Ok(())
        })?;
        log.lock().unwrap().push("preheated".to_string());
        Ok(())
    });
    builder.build().unwrap();

    assert_eq!(
        *booted.lock().unwrap(),
        vec!["sqlite::memory:".to_string(), "preheated".to_string()]
    );
}

#[test]
fn first_failing_boot_hook_stops_the_rest() {
    let ran = Arc::new(Mutex::new(0));
    let mut builder = Application::builder();
    builder.on_boot(|_| Err(PoolError::Install("migrations failed".to_string())));
    let counter = ran.clone();
    builder.on_boot(move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });

    let err = builder.build().unwrap_err();
    assert!(err.to_string().contains("migrations failed"));
    assert_eq!(*ran.lock().unwrap(), 0);
}

#[test]
fn boxed_errors_convert_into_install_failures() {
    let mut builder = Application::builder();
    builder.install::<RedisClient, _>(|| Err(BoxError::from("connection refused")));
    assert!(matches!(builder.build(), Err(PoolError::Install(m)) if m.contains("connection refused")));
}
