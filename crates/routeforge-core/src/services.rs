//! Service registration and lookup.
//!
//! Generated code registers endpoint types through [`ServiceRegistry`] and
//! resolves dependencies through [`ServiceLocator`]. Hosts can bring their
//! own container; [`ServiceCollection`] is a small one for tests and simple
//! applications.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::EndpointError;
use crate::routing::MapEndpoints;

pub type SharedService = Arc<dyn Any + Send + Sync>;

pub type ServiceFactory =
    Arc<dyn Fn(&dyn ServiceLocator) -> Result<SharedService, EndpointError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Built once, on first resolution.
    Singleton,
    /// Built on every resolution.
    Transient,
}

/// Resolves services by type.
pub trait ServiceLocator: Send + Sync {
    fn resolve_any(&self, type_id: TypeId) -> Option<Result<SharedService, EndpointError>>;
}

/// Accepts service registrations at startup.
pub trait ServiceRegistry {
    fn register(
        &mut self,
        type_id: TypeId,
        type_name: &'static str,
        lifetime: Lifetime,
        factory: ServiceFactory,
    );

    /// Register a source of routes, mapped once the host builds its router.
    fn add_endpoint_source(&mut self, source: Arc<dyn MapEndpoints>);
}

/// Resolve `T`, or `None` when it is not registered.
pub fn resolve<T: Any + Send + Sync>(
    locator: &dyn ServiceLocator,
) -> Result<Option<Arc<T>>, EndpointError> {
    let Some(service) = locator.resolve_any(TypeId::of::<T>()) else {
        return Ok(None);
    };
    service?
        .downcast::<T>()
        .map(Some)
        .map_err(|_| EndpointError::Custom(format!("service '{}' has the wrong type", type_name::<T>())))
}

/// Resolve `T`, failing when it is not registered.
pub fn require<T: Any + Send + Sync>(locator: &dyn ServiceLocator) -> Result<Arc<T>, EndpointError> {
    resolve::<T>(locator)?.ok_or(EndpointError::MissingService {
        type_name: type_name::<T>(),
    })
}

pub fn add_singleton<T, F>(registry: &mut dyn ServiceRegistry, factory: F)
where
    T: Any + Send + Sync,
    F: Fn(&dyn ServiceLocator) -> Result<T, EndpointError> + Send + Sync + 'static,
{
    registry.register(TypeId::of::<T>(), type_name::<T>(), Lifetime::Singleton, erase(factory));
}

pub fn add_transient<T, F>(registry: &mut dyn ServiceRegistry, factory: F)
where
    T: Any + Send + Sync,
    F: Fn(&dyn ServiceLocator) -> Result<T, EndpointError> + Send + Sync + 'static,
{
    registry.register(TypeId::of::<T>(), type_name::<T>(), Lifetime::Transient, erase(factory));
}

fn erase<T, F>(factory: F) -> ServiceFactory
where
    T: Any + Send + Sync,
    F: Fn(&dyn ServiceLocator) -> Result<T, EndpointError> + Send + Sync + 'static,
{
    Arc::new(move |locator: &dyn ServiceLocator| {
        factory(locator).map(|service| Arc::new(service) as SharedService)
    })
}

struct Registration {
    type_name: &'static str,
    lifetime: Lifetime,
    factory: ServiceFactory,
}

/// In-memory [`ServiceRegistry`].
#[derive(Default)]
pub struct ServiceCollection {
    registrations: HashMap<TypeId, Registration>,
    sources: Vec<Arc<dyn MapEndpoints>>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already built value as a singleton.
    pub fn add_instance<T: Any + Send + Sync>(&mut self, value: T) -> &mut Self {
        let shared: SharedService = Arc::new(value);
        self.register(
            TypeId::of::<T>(),
            type_name::<T>(),
            Lifetime::Singleton,
            Arc::new(move |_: &dyn ServiceLocator| {
                Ok::<_, EndpointError>(Arc::clone(&shared))
            }),
        );
        self
    }

    pub fn build(self) -> ServiceProvider {
        ServiceProvider {
            registrations: self.registrations,
            singletons: Mutex::new(HashMap::new()),
            sources: self.sources,
        }
    }
}

impl ServiceRegistry for ServiceCollection {
    fn register(
        &mut self,
        type_id: TypeId,
        type_name: &'static str,
        lifetime: Lifetime,
        factory: ServiceFactory,
    ) {
        tracing::trace!(service = type_name, ?lifetime, "registering service");
        self.registrations.insert(
            type_id,
            Registration {
                type_name,
                lifetime,
                factory,
            },
        );
    }

    fn add_endpoint_source(&mut self, source: Arc<dyn MapEndpoints>) {
        self.sources.push(source);
    }
}

/// In-memory [`ServiceLocator`] built from a [`ServiceCollection`].
pub struct ServiceProvider {
    registrations: HashMap<TypeId, Registration>,
    singletons: Mutex<HashMap<TypeId, SharedService>>,
    sources: Vec<Arc<dyn MapEndpoints>>,
}

impl ServiceProvider {
    /// Route sources added during registration.
    pub fn endpoint_sources(&self) -> &[Arc<dyn MapEndpoints>] {
        &self.sources
    }
}

impl ServiceLocator for ServiceProvider {
    fn resolve_any(&self, type_id: TypeId) -> Option<Result<SharedService, EndpointError>> {
        let registration = self.registrations.get(&type_id)?;
        if registration.lifetime == Lifetime::Transient {
            return Some((registration.factory)(self));
        }

        if let Ok(singletons) = self.singletons.lock()
            && let Some(existing) = singletons.get(&type_id)
        {
            return Some(Ok(Arc::clone(existing)));
        }
        // Built outside the lock so factories can resolve their own dependencies.
        let built = match (registration.factory)(self) {
            Ok(built) => built,
            Err(err) => return Some(Err(err)),
        };
        tracing::debug!(service = registration.type_name, "built singleton");
        let shared = match self.singletons.lock() {
            Ok(mut singletons) => Arc::clone(singletons.entry(type_id).or_insert(built)),
            Err(_) => built,
        };
        Some(Ok(shared))
    }
}
