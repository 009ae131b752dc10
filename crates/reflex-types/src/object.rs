//! Object instances

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::class::{Class, ClassRef};
use crate::error::{CallResult, ReflectError};
use crate::intercept::Interceptor;
use crate::method::StateBox;
use crate::value::Value;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique object identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric identity
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// An instance of a class
pub struct Object {
    id: ObjectId,
    class: ClassRef,
    state: StateBox,
}

/// Shared object handle
pub type Instance = Arc<Object>;

impl Object {
    pub(crate) fn new(class: ClassRef, state: StateBox) -> Instance {
        Arc::new(Object {
            id: ObjectId::next(),
            class,
            state,
        })
    }

    /// Object identity
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Runtime class
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Whether the runtime class is `class` or a descendant
    pub fn is_instance_of(&self, class: &Class) -> bool {
        self.class.is_subclass_of(class)
    }

    /// Native state, if it has type `T`
    pub fn state<T: Any>(&self) -> Option<&T> {
        (*self.state).downcast_ref::<T>()
    }

    /// This object as an interceptor, if its class exposes one
    pub fn as_interceptor(&self) -> Option<&dyn Interceptor> {
        let view = self.class.interceptor_view()?;
        view(self)
    }

    /// Invoke the most derived instance method named `name` that accepts `args`
    ///
    /// Visibility is not enforced for direct calls.
    pub fn call(self: &Arc<Self>, name: &str, args: &[Value]) -> CallResult {
        let method = self.class.select_overload(name, args).ok_or_else(|| {
            ReflectError::MethodNotFound {
                class: self.class.name().to_string(),
                method: name.to_string(),
                signature: args
                    .iter()
                    .map(Value::type_name)
                    .collect::<Vec<_>>()
                    .join(", "),
            }
        })?;
        method.call_body(Some(self), args)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.class.name(), self.id.0)
    }
}
