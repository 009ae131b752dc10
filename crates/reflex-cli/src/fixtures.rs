//! Sample types used by `reflex demo` and `reflex bench`

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use reflex_types::{
    CallResult, ClassBuilder, ClassRef, Constructor, Interceptor, Method, MethodDescriptor,
    ParamType, StateBox, SuperCall, Value,
};

/// Native state of `Counter`
#[derive(Default)]
pub struct Counter {
    value: AtomicI64,
}

/// `Counter`: `add(i64) -> i64`, `get() -> i64`, static `zero() -> i64`
pub fn counter_class() -> ClassRef {
    ClassBuilder::new("Counter")
        .default_constructor::<Counter>()
        .method(Method::instance("add", vec![ParamType::I64], ParamType::I64, |this, args| {
            let counter = this.state::<Counter>().ok_or("not a Counter")?;
            let by = args[0].as_i64().unwrap_or(0);
            Ok(Value::I64(counter.value.fetch_add(by, Ordering::SeqCst) + by))
        }))
        .method(Method::instance("get", vec![], ParamType::I64, |this, _| {
            let counter = this.state::<Counter>().ok_or("not a Counter")?;
            Ok(Value::I64(counter.value.load(Ordering::SeqCst)))
        }))
        .method(Method::function("zero", vec![], ParamType::I64, |_| Ok(Value::I64(0))))
        .build()
}

struct Greeting {
    prefix: String,
}

/// `Greeter`: built with an optional prefix, `greet(str) -> str`
pub fn greeter_class() -> ClassRef {
    ClassBuilder::new("Greeter")
        .constructor(Constructor::new(vec![], |_| {
            Ok(Box::new(Greeting {
                prefix: "Hello".to_string(),
            }) as StateBox)
        }))
        .constructor(Constructor::new(vec![ParamType::Str], |args| {
            let prefix = args[0].as_str().unwrap_or("Hello").to_string();
            Ok(Box::new(Greeting { prefix }) as StateBox)
        }))
        .method(Method::instance("greet", vec![ParamType::Str], ParamType::Str, |this, args| {
            let greeting = this.state::<Greeting>().ok_or("not a Greeter")?;
            Ok(Value::str(format!("{}, {}!", greeting.prefix, args[0])))
        }))
        .build()
}

/// Logs every intercepted call, then forwards it
#[derive(Default)]
pub struct LoggingInterceptor {
    calls: AtomicUsize,
}

impl LoggingInterceptor {
    /// Number of calls seen so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Interceptor for LoggingInterceptor {
    fn intercept(&self, super_call: &SuperCall<'_>, method: &MethodDescriptor, args: &[Value]) -> CallResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::info!(method = %method, ?args, "intercepted call");
        let result = super_call.call()?;
        println!("  [intercept] {} {:?} -> {}", method, args, result);
        Ok(result)
    }
}

/// Interceptor type backed by [`LoggingInterceptor`]
pub fn logging_interceptor_class() -> ClassRef {
    ClassBuilder::new("LoggingInterceptor")
        .default_constructor::<LoggingInterceptor>()
        .interceptor::<LoggingInterceptor>()
        .build()
}
