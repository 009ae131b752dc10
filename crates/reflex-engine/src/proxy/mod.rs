//! Proxy / interception engine
//!
//! Synthesizes a forwarding subtype of a target class whose overridable
//! methods route through an interceptor, loads it into the [`TypeSystem`]
//! and caches it.
//!
//! Each cache slot is a [`OnceCell`]: the first caller synthesizes while
//! later callers for the same slot block, and callers for other slots
//! proceed. A failed synthesis leaves the slot empty and a blocked caller
//! retries it.
//!
//! Cached proxy types are loaded into the type system. Types built by
//! [`ProxyEngine::new_proxy`] are only checked against it, so they are
//! released together with the last proxy instance.
//!
//! By default slots are keyed by target class alone, so the first
//! interceptor requested for a target serves every later request for that
//! target. [`ProxyCacheKey::TargetAndInterceptor`] keys by the pair instead.

mod synth;

pub use synth::{ForwardingSynthesizer, TypeSynthesizer};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use reflex_types::{ClassId, ClassRef, Instance, ReflectError, ReflectResult};

use crate::config::{ProxyCacheKey, ProxyOptions};
use crate::loader::TypeSystem;
use crate::singleton::SingletonRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ProxyKey {
    Target(ClassId),
    Pair(ClassId, ClassId),
}

/// A synthesized forwarding subtype
#[derive(Debug, Clone)]
pub struct ProxyType {
    class: ClassRef,
    target: ClassRef,
    interceptor: ClassRef,
    handler: Instance,
}

impl ProxyType {
    /// The synthesized class
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// The class it extends
    pub fn target(&self) -> &ClassRef {
        &self.target
    }

    /// The interceptor class its methods route through
    pub fn interceptor(&self) -> &ClassRef {
        &self.interceptor
    }

    /// The interceptor instance every proxy of this type delegates to
    pub fn handler(&self) -> &Instance {
        &self.handler
    }
}

/// Proxy engine
pub struct ProxyEngine {
    options: ProxyOptions,
    synthesizer: Box<dyn TypeSynthesizer>,
    types: Arc<TypeSystem>,
    singletons: Arc<SingletonRegistry>,
    cache: DashMap<ProxyKey, Arc<OnceCell<ProxyType>>>,
    sequence: AtomicU64,
}

impl ProxyEngine {
    /// Create an engine using the [`ForwardingSynthesizer`]
    pub fn new(
        options: ProxyOptions,
        types: Arc<TypeSystem>,
        singletons: Arc<SingletonRegistry>,
    ) -> Self {
        Self::with_synthesizer(options, types, singletons, Box::new(ForwardingSynthesizer))
    }

    /// Create an engine using a custom synthesizer
    pub fn with_synthesizer(
        options: ProxyOptions,
        types: Arc<TypeSystem>,
        singletons: Arc<SingletonRegistry>,
        synthesizer: Box<dyn TypeSynthesizer>,
    ) -> Self {
        Self {
            options,
            synthesizer,
            types,
            singletons,
            cache: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Shared proxy of `target` intercepted by `interceptor`
    ///
    /// Synthesizes on the first request for the cache slot, then returns the
    /// proxy type's singleton instance.
    pub fn get_or_create_proxy(&self, interceptor: &ClassRef, target: &ClassRef) -> ReflectResult<Instance> {
        let proxy = self.cached_proxy_type(interceptor, target)?;
        if proxy.interceptor.id() != interceptor.id() {
            tracing::warn!(
                target_type = target.name(),
                requested = interceptor.name(),
                cached = proxy.interceptor.name(),
                "proxy slot already holds a different interceptor"
            );
        }
        self.singletons.get_singleton(&proxy.class)
    }

    /// Independent proxy of `target` with its own interceptor instance
    ///
    /// Neither reads nor populates the cache, and the synthesized type is not
    /// loaded into the type system.
    pub fn new_proxy(&self, interceptor: &ClassRef, target: &ClassRef) -> ReflectResult<Instance> {
        let proxy = self.synthesize(interceptor, target, false)?;
        self.singletons.new_instance(&proxy.class)
    }

    /// Number of populated cache slots
    pub fn cached_types(&self) -> usize {
        self.cache.iter().filter(|e| e.value().get().is_some()).count()
    }

    /// Proxy type cached for `target`
    ///
    /// Always `None` when slots are keyed by target and interceptor.
    pub fn proxy_type(&self, target: &ClassRef) -> Option<ProxyType> {
        self.cache
            .get(&ProxyKey::Target(target.id()))
            .and_then(|cell| cell.value().get().cloned())
    }

    fn cached_proxy_type(&self, interceptor: &ClassRef, target: &ClassRef) -> ReflectResult<ProxyType> {
        let key = match self.options.cache_key {
            ProxyCacheKey::Target => ProxyKey::Target(target.id()),
            ProxyCacheKey::TargetAndInterceptor => ProxyKey::Pair(target.id(), interceptor.id()),
        };
        if let Some(cell) = self.cache.get(&key) {
            if let Some(proxy) = cell.value().get() {
                return Ok(proxy.clone());
            }
        }

        let cell = self.cache.entry(key).or_default().clone();
        cell.get_or_try_init(|| self.synthesize(interceptor, target, true))
            .cloned()
    }

    fn synthesize(&self, interceptor: &ClassRef, target: &ClassRef, shared: bool) -> ReflectResult<ProxyType> {
        let failure = |reason: &str, cause: Option<ReflectError>| ReflectError::Synthesis {
            target: target.name().to_string(),
            interceptor: interceptor.name().to_string(),
            reason: reason.to_string(),
            cause: cause.map(Box::new),
        };

        if target.is_final() {
            return Err(failure("target type is final", None));
        }
        if !interceptor.is_interceptor() {
            return Err(failure("type does not implement an interceptor", None));
        }
        let handler = self
            .singletons
            .new_instance(interceptor)
            .map_err(|e| failure("interceptor cannot be instantiated", Some(e)))?;

        let name = format!(
            "{}{}{}",
            target.name(),
            self.options.name_suffix,
            self.sequence.fetch_add(1, Ordering::Relaxed)
        );
        let class = self
            .synthesizer
            .create_forwarding_subtype(target, handler.clone(), &name)?;
        if shared {
            self.types.load(&class)?;
        } else {
            self.types.check_load(&class)?;
        }

        tracing::info!(
            target_type = target.name(),
            interceptor = interceptor.name(),
            proxy = class.name(),
            shared,
            methods = class.declared_methods().len(),
            "synthesized proxy type"
        );
        Ok(ProxyType {
            class,
            target: target.clone(),
            interceptor: interceptor.clone(),
            handler,
        })
    }
}

impl std::fmt::Debug for ProxyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyEngine")
            .field("options", &self.options)
            .field("cached_types", &self.cached_types())
            .finish()
    }
}
