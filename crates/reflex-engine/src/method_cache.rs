//! Method resolution cache
//!
//! Maps (class, method name, parameter types) to a resolved [`MethodHandle`].
//! Resolution walks the class hierarchy; the cache turns repeated lookups
//! into a single hash lookup.
//!
//! Two threads missing on the same key may both resolve and insert; both
//! handles name the same method, so the last write wins harmlessly. Failed
//! lookups are never cached, so a method added to a class later resolves on
//! retry.
//!
//! Each handle records the [`Class::revision`] it was resolved at. A cached
//! handle whose class chain changed since is resolved again, so the cache
//! never serves a method that a fresh lookup would no longer pick.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use reflex_types::{
    check_arguments, render_signature, CallResult, Class, ClassId, ClassRef, CompositeHasher,
    Instance, Method, MethodDescriptor, ParamType, ReflectError, ReflectResult, Value, Visibility,
};

use crate::config::MethodCacheOptions;

/// Composite cache key
///
/// The combination hash is computed once on construction; equality still
/// compares every component, so colliding hashes never alias.
#[derive(Debug, Clone)]
pub struct MethodKey {
    class: ClassId,
    name: Arc<str>,
    params: Vec<ParamType>,
    hash: i64,
}

impl MethodKey {
    /// Key for `name(params)` resolved on `class`
    pub fn new(class: &Class, name: &str, params: &[ParamType]) -> Self {
        let mut hasher = CompositeHasher::new();
        hasher.add_u64(class.id().raw()).add_str(name);
        for param in params {
            hasher.add_str(param.name());
        }
        Self {
            class: class.id(),
            name: Arc::from(name),
            params: params.to_vec(),
            hash: hasher.finish(),
        }
    }

    /// Precomputed combination hash
    pub fn hash_value(&self) -> i64 {
        self.hash
    }
}

impl PartialEq for MethodKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.class == other.class
            && self.name == other.name
            && self.params == other.params
    }
}

impl Eq for MethodKey {}

impl Hash for MethodKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i64(self.hash);
    }
}

/// Resolved, invocable method
#[derive(Debug, Clone)]
pub struct MethodHandle {
    owner: ClassRef,
    method: Arc<Method>,
    /// Class in the owner's chain that declares `method`
    declaring: ClassId,
    /// Owner revision the method was resolved at
    revision: u64,
    accessible: bool,
}

impl MethodHandle {
    fn new(owner: ClassRef, declaring: ClassId, method: Arc<Method>, revision: u64) -> Self {
        let accessible = method.visibility() == Visibility::Public;
        Self {
            owner,
            method,
            declaring,
            revision,
            accessible,
        }
    }

    /// Class the method was resolved on
    pub fn owner(&self) -> &ClassRef {
        &self.owner
    }

    /// The resolved method
    pub fn method(&self) -> &Arc<Method> {
        &self.method
    }

    /// Descriptor of the resolved method
    pub fn descriptor(&self) -> &MethodDescriptor {
        self.method.descriptor()
    }

    /// Whether the owner's method tables are unchanged since resolution
    pub fn is_current(&self) -> bool {
        self.owner.revision() == self.revision
    }

    /// Whether invocation passes the access check
    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    /// Copy of this handle that may invoke non-public methods
    pub fn with_access_override(&self) -> Self {
        Self {
            accessible: true,
            ..self.clone()
        }
    }

    /// Invoke on `receiver` (`None` for static methods)
    ///
    /// Instance methods dispatch virtually: a receiver whose class overrides
    /// the method runs the override. Failures raised by the body are wrapped
    /// in [`ReflectError::Invocation`].
    pub fn invoke(&self, receiver: Option<&Instance>, args: &[Value]) -> CallResult {
        self.check_access()?;
        check_arguments(self.method.params(), args).map_err(|reason| {
            ReflectError::IllegalArgument(format!("{}: {}", self.descriptor(), reason))
        })?;
        let target = self.dispatch_target(receiver)?;
        target
            .call_body(receiver, args)
            .map_err(|source| self.invocation_error(source))
    }

    /// Bind this handle to a receiver
    ///
    /// Dispatch is resolved once here, so calls through the bound method skip
    /// the override lookup.
    pub fn bind(&self, receiver: Instance) -> ReflectResult<BoundMethod> {
        self.check_access()?;
        if self.method.is_static() {
            return Err(ReflectError::IllegalArgument(format!(
                "{} is static and cannot be bound to a receiver",
                self.descriptor()
            )));
        }
        let target = self.dispatch_target(Some(&receiver))?;
        Ok(BoundMethod {
            handle: self.clone(),
            target,
            receiver,
        })
    }

    fn check_access(&self) -> ReflectResult<()> {
        if self.accessible {
            Ok(())
        } else {
            Err(ReflectError::Access {
                member: self.descriptor().to_string(),
                visibility: self.method.visibility(),
            })
        }
    }

    fn dispatch_target(&self, receiver: Option<&Instance>) -> ReflectResult<Arc<Method>> {
        if self.method.is_static() {
            return Ok(self.method.clone());
        }
        let receiver = receiver.ok_or_else(|| {
            ReflectError::IllegalArgument(format!("{} needs a receiver", self.descriptor()))
        })?;
        let class = receiver.class();
        if Arc::ptr_eq(class, &self.owner) && self.is_current() {
            return Ok(self.method.clone());
        }
        if !class.ancestors().any(|c| c.id() == self.declaring) {
            return Err(ReflectError::IllegalArgument(format!(
                "receiver of class {} is not an instance of {}",
                class.name(),
                self.descriptor().declaring_class
            )));
        }
        Ok(class
            .find_method(self.method.name(), self.method.params())
            .unwrap_or_else(|| self.method.clone()))
    }

    fn invocation_error(&self, source: ReflectError) -> ReflectError {
        ReflectError::Invocation {
            method: self.descriptor().to_string(),
            source: Box::new(source),
        }
    }
}

/// Method handle bound to its receiver
#[derive(Debug, Clone)]
pub struct BoundMethod {
    handle: MethodHandle,
    target: Arc<Method>,
    receiver: Instance,
}

impl BoundMethod {
    /// Call with `args`
    pub fn call(&self, args: &[Value]) -> CallResult {
        check_arguments(self.target.params(), args).map_err(|reason| {
            ReflectError::IllegalArgument(format!("{}: {}", self.handle.descriptor(), reason))
        })?;
        self.target
            .call_body(Some(&self.receiver), args)
            .map_err(|source| self.handle.invocation_error(source))
    }

    /// The bound receiver
    pub fn receiver(&self) -> &Instance {
        &self.receiver
    }

    /// The handle this was bound from
    pub fn handle(&self) -> &MethodHandle {
        &self.handle
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that had to resolve
    pub misses: u64,
    /// Cached handles
    pub entries: usize,
}

/// Process-wide method resolution cache
#[derive(Debug, Default)]
pub struct MethodCache {
    entries: DashMap<MethodKey, MethodHandle>,
    hits: AtomicU64,
    misses: AtomicU64,
    options: MethodCacheOptions,
}

impl MethodCache {
    /// Create an empty cache
    pub fn new(options: MethodCacheOptions) -> Self {
        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            options,
        }
    }

    /// Resolve `name(params)` on `class`, including inherited methods
    pub fn resolve_method(
        &self,
        class: &ClassRef,
        name: &str,
        params: &[ParamType],
    ) -> ReflectResult<MethodHandle> {
        let key = MethodKey::new(class, name, params);
        if let Some(entry) = self.entries.get(&key) {
            let handle = entry.value();
            if handle.is_current() {
                self.record(&self.hits);
                return Ok(handle.clone());
            }
            tracing::trace!(
                class = class.name(),
                method = name,
                signature = %render_signature(params),
                "cached method is stale"
            );
        }

        self.record(&self.misses);
        tracing::trace!(
            class = class.name(),
            method = name,
            signature = %render_signature(params),
            "method cache miss"
        );
        let handle = self.find_method_uncached(class, name, params)?;
        self.entries.insert(key, handle.clone());
        Ok(handle)
    }

    /// Resolve without consulting or populating the cache
    pub fn find_method_uncached(
        &self,
        class: &ClassRef,
        name: &str,
        params: &[ParamType],
    ) -> ReflectResult<MethodHandle> {
        // Read before the lookup so a concurrent change makes the handle stale
        let revision = class.revision();
        class
            .ancestors()
            .find_map(|c| c.find_declared(name, params).map(|method| (c.id(), method)))
            .map(|(declaring, method)| MethodHandle::new(class.clone(), declaring, method, revision))
            .ok_or_else(|| ReflectError::MethodNotFound {
                class: class.name().to_string(),
                method: name.to_string(),
                signature: render_signature(params),
            })
    }

    /// Invoke a resolved handle; see [`MethodHandle::invoke`]
    pub fn invoke(&self, handle: &MethodHandle, receiver: Option<&Instance>, args: &[Value]) -> CallResult {
        handle.invoke(receiver, args)
    }

    /// Hit, miss and entry counts
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    /// Number of cached handles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    fn record(&self, counter: &AtomicU64) {
        if self.options.collect_stats {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}
