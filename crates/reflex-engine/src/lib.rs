//! Reflex Dispatch Engine
//!
//! Runtime interception and dispatch caching over the `reflex-types` object
//! model:
//! - [`SingletonRegistry`]: lazily constructed single instances per class
//! - [`MethodCache`]: resolved method handles keyed by class, name and signature
//! - [`ProxyEngine`]: forwarding subtypes that route calls through an interceptor
//!
//! [`Reflex`] bundles the three with a [`TypeSystem`] and [`EngineOptions`].
//! Use [`Reflex::global`] for the process-wide instance or [`Reflex::new`]
//! for an isolated one.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod loader;
pub mod method_cache;
pub mod proxy;
pub mod singleton;

pub use config::{
    ConfigError, EngineOptions, MethodCacheOptions, ProxyCacheKey, ProxyOptions, SingletonOptions,
};
pub use loader::TypeSystem;
pub use method_cache::{BoundMethod, CacheStats, MethodCache, MethodHandle, MethodKey};
pub use proxy::{ForwardingSynthesizer, ProxyEngine, ProxyType, TypeSynthesizer};
pub use singleton::{SingletonKey, SingletonRegistry};

use std::sync::Arc;

use once_cell::sync::OnceCell;
use reflex_types::{CallResult, ClassRef, Instance, ParamType, ReflectResult, Value};

static GLOBAL: OnceCell<Reflex> = OnceCell::new();

/// Engine facade
#[derive(Debug)]
pub struct Reflex {
    options: EngineOptions,
    types: Arc<TypeSystem>,
    singletons: Arc<SingletonRegistry>,
    methods: MethodCache,
    proxies: ProxyEngine,
}

impl Reflex {
    /// Create an isolated engine
    pub fn new(options: EngineOptions) -> Self {
        Self::with_synthesizer(options, Box::new(ForwardingSynthesizer))
    }

    /// Create an isolated engine with a custom type synthesizer
    pub fn with_synthesizer(options: EngineOptions, synthesizer: Box<dyn TypeSynthesizer>) -> Self {
        let types = Arc::new(TypeSystem::new());
        let singletons = Arc::new(SingletonRegistry::new(options.singleton.clone()));
        let methods = MethodCache::new(options.methods.clone());
        let proxies = ProxyEngine::with_synthesizer(
            options.proxy.clone(),
            types.clone(),
            singletons.clone(),
            synthesizer,
        );
        Self {
            options,
            types,
            singletons,
            methods,
            proxies,
        }
    }

    /// Process-wide engine, created with default options on first use
    pub fn global() -> &'static Reflex {
        GLOBAL.get_or_init(|| Reflex::new(EngineOptions::default()))
    }

    /// Create the process-wide engine with `options`
    ///
    /// Fails once the global engine exists, including when [`Reflex::global`]
    /// created it first.
    pub fn install(options: EngineOptions) -> Result<&'static Reflex, ConfigError> {
        options.validate()?;
        GLOBAL
            .set(Reflex::new(options))
            .map_err(|_| ConfigError::AlreadyInstalled)?;
        GLOBAL.get().ok_or(ConfigError::AlreadyInstalled)
    }

    /// Effective options
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The type system synthesized types are loaded into
    pub fn types(&self) -> &TypeSystem {
        &self.types
    }

    /// The singleton registry
    pub fn singletons(&self) -> &SingletonRegistry {
        &self.singletons
    }

    /// The method resolution cache
    pub fn methods(&self) -> &MethodCache {
        &self.methods
    }

    /// The proxy engine
    pub fn proxies(&self) -> &ProxyEngine {
        &self.proxies
    }

    /// See [`SingletonRegistry::get_singleton`]
    pub fn get_singleton(&self, class: &ClassRef) -> ReflectResult<Instance> {
        self.singletons.get_singleton(class)
    }

    /// See [`SingletonRegistry::get_singleton_with`]
    pub fn get_singleton_with(
        &self,
        class: &ClassRef,
        args: &[Value],
        arg_types: &[ParamType],
    ) -> ReflectResult<Instance> {
        self.singletons.get_singleton_with(class, args, arg_types)
    }

    /// See [`SingletonRegistry::new_instance`]
    pub fn new_instance(&self, class: &ClassRef) -> ReflectResult<Instance> {
        self.singletons.new_instance(class)
    }

    /// See [`MethodCache::resolve_method`]
    pub fn resolve_method(
        &self,
        class: &ClassRef,
        name: &str,
        params: &[ParamType],
    ) -> ReflectResult<MethodHandle> {
        self.methods.resolve_method(class, name, params)
    }

    /// See [`MethodHandle::invoke`]
    pub fn invoke(&self, handle: &MethodHandle, receiver: Option<&Instance>, args: &[Value]) -> CallResult {
        self.methods.invoke(handle, receiver, args)
    }

    /// See [`ProxyEngine::get_or_create_proxy`]
    pub fn get_or_create_proxy(&self, interceptor: &ClassRef, target: &ClassRef) -> ReflectResult<Instance> {
        self.proxies.get_or_create_proxy(interceptor, target)
    }

    /// See [`ProxyEngine::new_proxy`]
    pub fn new_proxy(&self, interceptor: &ClassRef, target: &ClassRef) -> ReflectResult<Instance> {
        self.proxies.new_proxy(interceptor, target)
    }
}

impl Default for Reflex {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}
