//! Singleton registry
//!
//! Hands out exactly one instance per class, or per class and constructor
//! argument hash. Each key owns its own [`OnceCell`], so construction of one
//! singleton never blocks lookups or construction of another.
//!
//! A failed construction leaves the cell empty: nothing is cached and the
//! next request retries. Constructors must not request their own singleton.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use reflex_types::{deep_hash, ClassId, ClassRef, Instance, ParamType, ReflectError, ReflectResult, Value};

use crate::config::SingletonOptions;

/// Registry key: class plus optional constructor argument hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SingletonKey {
    class: ClassId,
    arguments: Option<i64>,
}

impl SingletonKey {
    /// Key of the default-constructed singleton of `class`
    pub fn of(class: &ClassRef) -> Self {
        Self {
            class: class.id(),
            arguments: None,
        }
    }

    /// Key of the singleton of `class` built from `args`
    pub fn with_arguments(class: &ClassRef, args: &[Value]) -> Self {
        Self {
            class: class.id(),
            arguments: Some(deep_hash(args)),
        }
    }
}

/// Process-wide lazily created single-instance store
#[derive(Debug, Default)]
pub struct SingletonRegistry {
    entries: DashMap<SingletonKey, Arc<OnceCell<Instance>>>,
    options: SingletonOptions,
}

impl SingletonRegistry {
    /// Create an empty registry
    pub fn new(options: SingletonOptions) -> Self {
        Self {
            entries: DashMap::new(),
            options,
        }
    }

    /// Shared instance of `class`, built by its zero-argument constructor
    ///
    /// Constructor visibility is ignored.
    pub fn get_singleton(&self, class: &ClassRef) -> ReflectResult<Instance> {
        self.get_or_construct(SingletonKey::of(class), class, &[], &[])
    }

    /// Shared instance of `class` for this argument list
    ///
    /// Argument lists with equal [`deep_hash`] share one instance. The
    /// constructor is selected by `arg_types`.
    pub fn get_singleton_with(
        &self,
        class: &ClassRef,
        args: &[Value],
        arg_types: &[ParamType],
    ) -> ReflectResult<Instance> {
        if args.len() != arg_types.len() {
            return Err(ReflectError::IllegalArgument(format!(
                "{} arguments given for {} argument types",
                args.len(),
                arg_types.len()
            )));
        }
        self.get_or_construct(SingletonKey::with_arguments(class, args), class, arg_types, args)
    }

    /// Fresh, unshared instance of `class` built by its zero-argument constructor
    pub fn new_instance(&self, class: &ClassRef) -> ReflectResult<Instance> {
        self.construct(class, &[], &[])
    }

    /// Check if the default-constructed singleton of `class` exists
    pub fn contains(&self, class: &ClassRef) -> bool {
        self.entries
            .get(&SingletonKey::of(class))
            .is_some_and(|cell| cell.value().get().is_some())
    }

    /// Number of constructed singletons
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().get().is_some()).count()
    }

    /// Check if no singleton was constructed yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_construct(
        &self,
        key: SingletonKey,
        class: &ClassRef,
        params: &[ParamType],
        args: &[Value],
    ) -> ReflectResult<Instance> {
        if let Some(cell) = self.entries.get(&key) {
            if let Some(instance) = cell.value().get() {
                return Ok(instance.clone());
            }
        }

        // Clone the cell out so the shard lock is released before construction
        let cell = self.entries.entry(key).or_default().clone();
        cell.get_or_try_init(|| self.construct(class, params, args))
            .cloned()
    }

    fn construct(&self, class: &ClassRef, params: &[ParamType], args: &[Value]) -> ReflectResult<Instance> {
        match class.instantiate(params, args) {
            Ok(instance) => {
                tracing::debug!(class = class.name(), id = instance.id().raw(), "constructed instance");
                Ok(instance)
            }
            Err(err) => {
                if self.options.log_failures {
                    tracing::error!(class = class.name(), error = %err, "construction failed");
                }
                Err(err)
            }
        }
    }
}
