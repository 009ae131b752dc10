//! Methods, constructors and their descriptors

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::class::Visibility;
use crate::error::{CallResult, ReflectError, ReflectResult};
use crate::object::Instance;
use crate::param::{render_signature, ParamType};
use crate::value::Value;

/// Native state carried by an object
pub type StateBox = Box<dyn Any + Send + Sync>;

/// Body of an instance method: receiver plus arguments
pub type InstanceFn = dyn Fn(&Instance, &[Value]) -> CallResult + Send + Sync;

/// Body of a static method: arguments only
pub type StaticFn = dyn Fn(&[Value]) -> CallResult + Send + Sync;

/// Body of a constructor, producing the object's native state
pub type ConstructorFn = dyn Fn(&[Value]) -> ReflectResult<StateBox> + Send + Sync;

/// Identity of a method: declaring class, name, parameter and return types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Name of the class that declares the method
    pub declaring_class: Arc<str>,
    /// Method name
    pub name: Arc<str>,
    /// Ordered parameter types
    pub params: Vec<ParamType>,
    /// Declared return type
    pub return_type: ParamType,
}

impl MethodDescriptor {
    /// Whether name and parameter types match exactly
    pub fn matches(&self, name: &str, params: &[ParamType]) -> bool {
        &*self.name == name && self.params == params
    }

    /// Rendered parameter list, e.g. `i32, str`
    pub fn signature(&self) -> String {
        render_signature(&self.params)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}({}) -> {}",
            self.declaring_class,
            self.name,
            self.signature(),
            self.return_type
        )
    }
}

#[derive(Clone)]
enum MethodBody {
    Instance(Arc<InstanceFn>),
    Static(Arc<StaticFn>),
}

/// A method declared on a class
#[derive(Clone)]
pub struct Method {
    descriptor: MethodDescriptor,
    visibility: Visibility,
    is_final: bool,
    body: MethodBody,
}

impl Method {
    /// Create a public instance method
    pub fn instance<F>(name: &str, params: Vec<ParamType>, return_type: ParamType, body: F) -> Self
    where
        F: Fn(&Instance, &[Value]) -> CallResult + Send + Sync + 'static,
    {
        Self::with_body(name, params, return_type, MethodBody::Instance(Arc::new(body)))
    }

    /// Create a public static method
    pub fn function<F>(name: &str, params: Vec<ParamType>, return_type: ParamType, body: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult + Send + Sync + 'static,
    {
        Self::with_body(name, params, return_type, MethodBody::Static(Arc::new(body)))
    }

    fn with_body(name: &str, params: Vec<ParamType>, return_type: ParamType, body: MethodBody) -> Self {
        Self {
            descriptor: MethodDescriptor {
                declaring_class: Arc::from(""),
                name: Arc::from(name),
                params,
                return_type,
            },
            visibility: Visibility::Public,
            is_final: false,
            body,
        }
    }

    /// Set the visibility
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Mark as final (cannot be overridden)
    pub fn as_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub(crate) fn declared_by(mut self, class_name: &Arc<str>) -> Self {
        self.descriptor.declaring_class = class_name.clone();
        self
    }

    /// Method descriptor
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Ordered parameter types
    pub fn params(&self) -> &[ParamType] {
        &self.descriptor.params
    }

    /// Declared return type
    pub fn return_type(&self) -> &ParamType {
        &self.descriptor.return_type
    }

    /// Declared visibility
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether this is a static method
    pub fn is_static(&self) -> bool {
        matches!(self.body, MethodBody::Static(_))
    }

    /// Whether this method is final
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Whether a subclass may override this method
    pub fn is_overridable(&self) -> bool {
        !self.is_static() && !self.is_final && self.visibility != Visibility::Private
    }

    /// Run the body without argument checks or dispatch
    ///
    /// Instance methods require a receiver; static methods ignore it.
    pub fn call_body(&self, receiver: Option<&Instance>, args: &[Value]) -> CallResult {
        match &self.body {
            MethodBody::Static(body) => body(args),
            MethodBody::Instance(body) => match receiver {
                Some(receiver) => body(receiver, args),
                None => Err(ReflectError::IllegalArgument(format!(
                    "{} is an instance method and needs a receiver",
                    self.descriptor
                ))),
            },
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("descriptor", &self.descriptor.to_string())
            .field("visibility", &self.visibility)
            .field("is_static", &self.is_static())
            .field("is_final", &self.is_final)
            .finish()
    }
}

/// A constructor declared on a class
#[derive(Clone)]
pub struct Constructor {
    params: Vec<ParamType>,
    visibility: Visibility,
    body: Arc<ConstructorFn>,
}

impl Constructor {
    /// Create a public constructor
    pub fn new<F>(params: Vec<ParamType>, body: F) -> Self
    where
        F: Fn(&[Value]) -> ReflectResult<StateBox> + Send + Sync + 'static,
    {
        Self {
            params,
            visibility: Visibility::Public,
            body: Arc::new(body),
        }
    }

    /// Zero-argument constructor producing `T::default()`
    pub fn with_default<T>() -> Self
    where
        T: Default + Send + Sync + 'static,
    {
        Self::new(Vec::new(), |_| Ok(Box::new(T::default()) as StateBox))
    }

    /// Set the visibility
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Ordered parameter types
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Declared visibility
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub(crate) fn build_state(&self, args: &[Value]) -> ReflectResult<StateBox> {
        (self.body)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &render_signature(&self.params))
            .field("visibility", &self.visibility)
            .finish()
    }
}
