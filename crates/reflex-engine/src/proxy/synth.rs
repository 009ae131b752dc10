//! Forwarding subtype synthesis

use std::sync::Arc;

use reflex_types::{ClassBuilder, ClassRef, Instance, Method, ReflectError, ReflectResult, SuperCall};

/// Builds forwarding subtypes at runtime
pub trait TypeSynthesizer: Send + Sync {
    /// Create a subclass of `target` named `name` whose overridable methods
    /// route through `interceptor`
    ///
    /// The returned class is not yet loaded into any type system.
    fn create_forwarding_subtype(
        &self,
        target: &ClassRef,
        interceptor: Instance,
        name: &str,
    ) -> ReflectResult<ClassRef>;
}

/// Default synthesizer: one forwarding closure per overridable method
///
/// The subtype copies every constructor of the target, so proxies carry the
/// same native state and original bodies run unchanged through `SuperCall`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForwardingSynthesizer;

impl TypeSynthesizer for ForwardingSynthesizer {
    fn create_forwarding_subtype(
        &self,
        target: &ClassRef,
        interceptor: Instance,
        name: &str,
    ) -> ReflectResult<ClassRef> {
        if interceptor.as_interceptor().is_none() {
            return Err(ReflectError::Synthesis {
                target: target.name().to_string(),
                interceptor: interceptor.class().name().to_string(),
                reason: "instance does not expose an interceptor".to_string(),
                cause: None,
            });
        }

        let mut builder = ClassBuilder::new(name).extends(target);
        for ctor in target.constructors() {
            builder = builder.constructor(ctor.clone());
        }
        for original in target.overridable_methods() {
            builder = builder.method(forwarding_method(original, interceptor.clone()));
        }
        Ok(builder.build())
    }
}

fn forwarding_method(original: Arc<Method>, handler: Instance) -> Method {
    let descriptor = original.descriptor().clone();
    let visibility = original.visibility();
    let name = descriptor.name.clone();
    let params = descriptor.params.clone();
    let return_type = descriptor.return_type.clone();

    Method::instance(&name, params, return_type, move |this, args| {
        let interceptor = handler.as_interceptor().ok_or_else(|| {
            ReflectError::IllegalArgument(format!(
                "{} no longer exposes an interceptor",
                handler.class().name()
            ))
        })?;
        let super_call = SuperCall::new(&original, this, args);
        let result = interceptor.intercept(&super_call, &descriptor, args)?;
        if descriptor.return_type.accepts(&result) {
            Ok(result)
        } else {
            Err(ReflectError::TypeMismatch {
                expected: descriptor.return_type.to_string(),
                found: result.type_name(),
            })
        }
    })
    .with_visibility(visibility)
}
