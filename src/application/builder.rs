//! Startup-phase registration.

use std::any::type_name;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use crate::config::{EngineConfig, RebindPolicy};
use crate::error::{BoxError, PoolError, PoolResult};
use crate::lifetime::PoolKind;
use crate::observer::{Observers, PoolObserver, TracingObserver};
use crate::pool::{Binder, Component, Pool};
use crate::registration::Registry;
use crate::runtime::RuntimeContext;
use crate::traits::Recycle;

use super::{AppInner, Application, Resources};

type InstallHook = Box<dyn FnOnce(&mut Resources) -> PoolResult<()>>;
type BootHook = Box<dyn FnOnce(&Application) -> PoolResult<()>>;

/// Collects bindings, resource installs and boot hooks, then freezes them
/// into an [`Application`].
///
/// Binding a type twice in the same pool is resolved by the configured
/// [`RebindPolicy`]: the last binding wins by default, or `build()` fails
/// with [`PoolError::AlreadyBound`] under `RebindPolicy::Reject`.
///
/// # Examples
///
/// ```
/// use ferrous_scope::{Application, EngineConfig, PoolError, RebindPolicy};
///
/// struct Clock(u32);
///
/// let mut builder = Application::builder();
/// builder.bind_service(|| Clock(1));
/// builder.bind_service(|| Clock(2));
/// let app = builder.build().unwrap();
/// assert_eq!(app.scoped(|ctx| ctx.service::<Clock>().0), 2);
///
/// let mut strict = Application::builder();
/// strict.with_config(EngineConfig { rebind: RebindPolicy::Reject, ..Default::default() });
/// strict.bind_service(|| Clock(1));
/// strict.bind_service(|| Clock(2));
/// assert!(matches!(strict.build(), Err(PoolError::AlreadyBound { .. })));
/// ```
pub struct ApplicationBuilder {
    services: Registry,
    repositories: Registry,
    components: Registry,
    installs: Vec<InstallHook>,
    boots: Vec<BootHook>,
    observers: Observers,
    config: EngineConfig,
    tracing: bool,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self {
            services: Registry::new(PoolKind::Service),
            repositories: Registry::new(PoolKind::Repository),
            components: Registry::new(PoolKind::Component),
            installs: Vec::new(),
            boots: Vec::new(),
            observers: Observers::new(),
            config: EngineConfig::default(),
            tracing: true,
        }
    }

    pub fn with_config(&mut self, config: EngineConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Adds an observer notified of binding, resolution and release events.
    pub fn add_observer<O: PoolObserver + 'static>(&mut self, observer: O) -> &mut Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Skips the built-in [`TracingObserver`].
    pub fn without_tracing(&mut self) -> &mut Self {
        self.tracing = false;
        self
    }

    pub fn services(&mut self) -> Binder<'_> {
        Binder::new(&mut self.services)
    }

    pub fn repositories(&mut self) -> Binder<'_> {
        Binder::new(&mut self.repositories)
    }

    pub fn components(&mut self) -> Binder<'_> {
        Binder::new(&mut self.components)
    }

    // Services

    pub fn bind_service<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.services().bind(factory);
        self
    }

    pub fn bind_service_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&RuntimeContext) -> T + Send + Sync + 'static,
    {
        self.services().bind_with(factory);
        self
    }

    /// Binds a service under an unsized type, typically `dyn Trait`.
    pub fn bind_service_shared<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&RuntimeContext) -> Arc<T> + Send + Sync + 'static,
    {
        self.services().bind_shared(factory);
        self
    }

    pub fn bind_service_recycled<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Recycle,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.services().bind_recycled(factory);
        self
    }

    // Repositories

    pub fn bind_repository<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.repositories().bind(factory);
        self
    }

    pub fn bind_repository_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&RuntimeContext) -> T + Send + Sync + 'static,
    {
        self.repositories().bind_with(factory);
        self
    }

    pub fn bind_repository_shared<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&RuntimeContext) -> Arc<T> + Send + Sync + 'static,
    {
        self.repositories().bind_shared(factory);
        self
    }

    pub fn bind_repository_recycled<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Recycle,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.repositories().bind_recycled(factory);
        self
    }

    // Components

    /// Binds a component; [`Component`] selects single or pooled.
    pub fn bind_component<T>(&mut self, component: Component<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.components().component(component);
        self
    }

    /// Registers a resource install hook run by [`build`](Self::build).
    ///
    /// Hooks run in registration order. The value is stored as an installed
    /// resource reachable through [`Repository::resource`](crate::Repository::resource)
    /// and [`Application::resource`]. A failing hook aborts the build with
    /// [`PoolError::Install`].
    pub fn install<T, F>(&mut self, hook: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, BoxError> + 'static,
    {
        self.installs.push(Box::new(move |resources: &mut Resources| {
            let value = hook().map_err(|err| PoolError::Install(format!("{}: {err}", type_name::<T>())))?;
            resources.insert(Arc::new(value));
            Ok(())
        }));
        self
    }

    /// Installs an already constructed resource.
    pub fn provide<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.install(move || Ok(value))
    }

    /// Registers a hook run at the end of [`build`](Self::build), after
    /// resources are installed. The first failing hook aborts the build.
    pub fn on_boot<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnOnce(&Application) -> PoolResult<()> + 'static,
    {
        self.boots.push(Box::new(hook));
        self
    }

    /// Freezes the registries and runs install and boot hooks.
    pub fn build(self) -> PoolResult<Application> {
        let ApplicationBuilder {
            mut services,
            mut repositories,
            mut components,
            installs,
            boots,
            observers: extra,
            config,
            tracing,
        } = self;

        let mut observers = Observers::new();
        if tracing {
            observers.push(Arc::new(TracingObserver));
        }
        observers.extend(extra);

        for registry in [&mut services, &mut repositories, &mut components] {
            if let Some(key) = registry.rebound().first() {
                if config.rebind == RebindPolicy::Reject {
                    return Err(PoolError::AlreadyBound {
                        pool: registry.kind,
                        type_name: key.display_name(),
                    });
                }
            }
            for key in registry.rebound() {
                observers.rebound(registry.kind, key);
            }
            registry.finalize(config.recycle_capacity);
            for binding in registry.iter() {
                observers.bound(registry.kind, &binding.key, binding.lifetime);
            }
        }

        let mut resources = Resources::default();
        for install in installs {
            install(&mut resources)?;
        }

        let inner = AppInner {
            services: Pool::new(services),
            repositories: Pool::new(repositories),
            components: Pool::new(components),
            resources: Arc::new(resources),
            observers,
            config,
            next_request: AtomicU64::new(1),
        };
        let app = Application::from_inner(Arc::new(inner));

        for boot in boots {
            boot(&app)?;
        }

        let bindings = PoolKind::ALL
            .iter()
            .map(|kind| app.pool(*kind).registry.len())
            .sum();
        app.inner.observers.ready(bindings);
        Ok(app)
    }
}
