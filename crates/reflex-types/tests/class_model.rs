//! Integration tests for the object model: inheritance, overloads,
//! interceptor views and super calls

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reflex_types::{
    CallResult, ClassBuilder, ClassRef, Constructor, Interceptor, Method, MethodDescriptor,
    ParamType, ReflectError, StateBox, SuperCall, Value,
};

struct Greeting {
    prefix: String,
}

fn greeter() -> ClassRef {
    ClassBuilder::new("Greeter")
        .constructor(Constructor::new(vec![ParamType::Str], |args| {
            let prefix = args[0].as_str().unwrap_or("Hello").to_string();
            Ok(Box::new(Greeting { prefix }) as StateBox)
        }))
        .method(Method::instance("greet", vec![ParamType::Str], ParamType::Str, |this, args| {
            let state = this.state::<Greeting>().ok_or("missing state")?;
            Ok(Value::str(format!("{}, {}", state.prefix, args[0])))
        }))
        .build()
}

#[derive(Default)]
struct Shouting {
    calls: AtomicUsize,
}

impl Interceptor for Shouting {
    fn intercept(&self, super_call: &SuperCall<'_>, method: &MethodDescriptor, _args: &[Value]) -> CallResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = super_call.call()?;
        if &*method.name == "greet" {
            if let Some(text) = result.as_str() {
                return Ok(Value::str(text.to_uppercase()));
            }
        }
        Ok(result)
    }
}

#[test]
fn test_constructor_arguments_reach_state() {
    let class = greeter();
    let obj = class.instantiate(&[ParamType::Str], &[Value::str("Hi")]).unwrap();
    assert_eq!(obj.call("greet", &[Value::str("Ada")]).unwrap(), Value::str("Hi, Ada"));
}

#[test]
fn test_constructor_argument_type_checked() {
    let class = greeter();
    let err = class.instantiate(&[ParamType::Str], &[Value::I32(1)]).unwrap_err();
    assert!(matches!(err, ReflectError::Construction { .. }));
}

#[test]
fn test_override_dispatches_to_most_derived() {
    let base = greeter();
    let polite = ClassBuilder::new("PoliteGreeter")
        .extends(&base)
        .constructor(Constructor::new(vec![ParamType::Str], |args| {
            let prefix = args[0].as_str().unwrap_or("Hello").to_string();
            Ok(Box::new(Greeting { prefix }) as StateBox)
        }))
        .method(Method::instance("greet", vec![ParamType::Str], ParamType::Str, |_, args| {
            Ok(Value::str(format!("Good day, {}", args[0])))
        }))
        .build();

    let obj = polite.instantiate(&[ParamType::Str], &[Value::str("Hi")]).unwrap();
    assert_eq!(obj.call("greet", &[Value::str("Ada")]).unwrap(), Value::str("Good day, Ada"));
    assert!(obj.is_instance_of(&base));
}

#[test]
fn test_interceptor_view_and_super_call() {
    let handler_class = ClassBuilder::new("Shouting")
        .default_constructor::<Shouting>()
        .interceptor::<Shouting>()
        .build();
    assert!(handler_class.is_interceptor());

    let handler = handler_class.instantiate(&[], &[]).unwrap();
    let interceptor = handler.as_interceptor().expect("interceptor view");

    let target = greeter();
    let receiver = target.instantiate(&[ParamType::Str], &[Value::str("Hi")]).unwrap();
    let method = target.find_method("greet", &[ParamType::Str]).unwrap();
    let args = [Value::str("Ada")];
    let super_call = SuperCall::new(&method, &receiver, &args);

    let result = interceptor.intercept(&super_call, method.descriptor(), &args).unwrap();
    assert_eq!(result, Value::str("HI, ADA"));
    assert_eq!(super_call.call_with(&[Value::str("Bo")]).unwrap(), Value::str("Hi, Bo"));
    assert_eq!(handler.state::<Shouting>().unwrap().calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_values_hold_objects() {
    let class = greeter();
    let obj = class.instantiate(&[ParamType::Str], &[Value::str("Hi")]).unwrap();
    let value = Value::from(Arc::clone(&obj));

    assert!(ParamType::object("Greeter").accepts(&value));
    assert!(!ParamType::object("Other").accepts(&value));
    assert_eq!(value.type_name(), "Greeter");
    assert_eq!(value, Value::Object(obj));
}
