//! Type loader
//!
//! The running type system: a name to class table that synthesized types are
//! loaded into. Names are unique; loading a different class under a name
//! that is already taken is a [`ReflectError::Load`] failure.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use reflex_types::{ClassRef, ReflectError, ReflectResult};
use std::sync::Arc;

/// Name to class table
#[derive(Debug, Default)]
pub struct TypeSystem {
    classes: DashMap<String, ClassRef>,
}

impl TypeSystem {
    /// Create an empty type system
    pub fn new() -> Self {
        Self {
            classes: DashMap::new(),
        }
    }

    /// Load a class under its name
    ///
    /// Loading the same class twice is a no-op.
    pub fn load(&self, class: &ClassRef) -> ReflectResult<()> {
        match self.classes.entry(class.name().to_string()) {
            Entry::Occupied(existing) if Arc::ptr_eq(existing.get(), class) => Ok(()),
            Entry::Occupied(existing) => Err(name_conflict(class, existing.get())),
            Entry::Vacant(slot) => {
                slot.insert(class.clone());
                Ok(())
            }
        }
    }

    /// Check that `class` could be loaded, without holding on to it
    ///
    /// Used for short-lived types that must not shadow a loaded name.
    pub fn check_load(&self, class: &ClassRef) -> ReflectResult<()> {
        match self.classes.get(class.name()) {
            Some(existing) if !Arc::ptr_eq(existing.value(), class) => {
                Err(name_conflict(class, existing.value()))
            }
            _ => Ok(()),
        }
    }

    /// Look up a class by name
    pub fn get(&self, name: &str) -> Option<ClassRef> {
        self.classes.get(name).map(|c| c.value().clone())
    }

    /// Check if a class with this name is loaded
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Number of loaded classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if no classes are loaded
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

fn name_conflict(class: &ClassRef, existing: &ClassRef) -> ReflectError {
    ReflectError::Load {
        class: class.name().to_string(),
        reason: format!("name already bound to class {}", existing.id()),
    }
}
