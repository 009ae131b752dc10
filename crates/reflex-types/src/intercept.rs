//! Interception contract
//!
//! An interceptor receives every overridable call made on a forwarding
//! subtype, together with a [`SuperCall`] that runs the original
//! implementation on the same receiver.

use crate::error::CallResult;
use crate::method::{Method, MethodDescriptor};
use crate::object::{Instance, Object};
use crate::value::Value;

/// Handler for intercepted calls
pub trait Interceptor: Send + Sync + 'static {
    /// Handle a call to `method` with `args`
    ///
    /// `super_call.call()` runs the overridden implementation. Errors returned
    /// here propagate to the caller unchanged.
    fn intercept(&self, super_call: &SuperCall<'_>, method: &MethodDescriptor, args: &[Value]) -> CallResult;
}

/// Exposes an object's state as an interceptor
pub type InterceptorView = fn(&Object) -> Option<&dyn Interceptor>;

pub(crate) fn view_as<I: Interceptor>(obj: &Object) -> Option<&dyn Interceptor> {
    obj.state::<I>().map(|i| i as &dyn Interceptor)
}

/// Invocation of the un-intercepted body of an intercepted method
pub struct SuperCall<'a> {
    method: &'a Method,
    receiver: &'a Instance,
    args: &'a [Value],
}

impl<'a> SuperCall<'a> {
    /// Bind the original method to its receiver and arguments
    pub fn new(method: &'a Method, receiver: &'a Instance, args: &'a [Value]) -> Self {
        Self {
            method,
            receiver,
            args,
        }
    }

    /// Run the un-intercepted body with the intercepted arguments
    pub fn call(&self) -> CallResult {
        self.method.call_body(Some(self.receiver), self.args)
    }

    /// Run the un-intercepted body with substituted arguments
    pub fn call_with(&self, args: &[Value]) -> CallResult {
        self.method.call_body(Some(self.receiver), args)
    }

    /// The intercepted receiver
    pub fn receiver(&self) -> &Instance {
        self.receiver
    }

    /// The overridden method
    pub fn method(&self) -> &Method {
        self.method
    }
}
