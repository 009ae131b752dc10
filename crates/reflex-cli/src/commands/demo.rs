//! `reflex demo`: exercise the engine on the sample types.

use std::sync::Arc;

use reflex_engine::{EngineOptions, Reflex};
use reflex_types::{ParamType, Value};

use crate::fixtures::{self, LoggingInterceptor};

pub fn execute(options: EngineOptions) -> anyhow::Result<()> {
    let reflex = Reflex::install(options)?;

    let counter = fixtures::counter_class();
    let greeter = fixtures::greeter_class();
    let logging = fixtures::logging_interceptor_class();
    for class in [&counter, &greeter, &logging] {
        reflex.types().load(class)?;
    }
    println!("Loaded {} types", reflex.types().len());
    println!();

    // Singletons
    println!("Singletons:");
    let first = reflex.get_singleton(&counter)?;
    let second = reflex.get_singleton(&counter)?;
    println!(
        "  {} and {} identical: {}",
        Value::from(first.clone()),
        Value::from(second.clone()),
        Arc::ptr_eq(&first, &second)
    );

    let hi = reflex.get_singleton_with(&greeter, &[Value::str("Hi")], &[ParamType::Str])?;
    let hey = reflex.get_singleton_with(&greeter, &[Value::str("Hey")], &[ParamType::Str])?;
    println!("  {}", hi.call("greet", &[Value::str("Ada")])?);
    println!("  {}", hey.call("greet", &[Value::str("Ada")])?);
    println!("  registry holds {} instances", reflex.singletons().len());
    println!();

    // Cached dispatch
    println!("Method cache:");
    for by in 1..=3 {
        let handle = reflex.resolve_method(&counter, "add", &[ParamType::I64])?;
        let total = reflex.invoke(&handle, Some(&first), &[Value::I64(by)])?;
        println!("  {} -> {}", handle.descriptor(), total);
    }
    let zero = reflex.resolve_method(&counter, "zero", &[])?;
    println!("  {} -> {}", zero.descriptor(), zero.invoke(None, &[])?);
    match reflex.resolve_method(&counter, "reset", &[]) {
        Ok(_) => println!("  Counter::reset() unexpectedly resolved"),
        Err(e) => println!("  {}", e),
    }
    let stats = reflex.methods().stats();
    println!("  hits: {}, misses: {}, entries: {}", stats.hits, stats.misses, stats.entries);
    println!();

    // Interception
    println!("Proxies:");
    let proxy = reflex.get_or_create_proxy(&logging, &greeter)?;
    let again = reflex.get_or_create_proxy(&logging, &greeter)?;
    println!("  proxy type: {}", proxy.class().name());
    println!("  shared instance: {}", Arc::ptr_eq(&proxy, &again));
    let greeting = proxy.call("greet", &[Value::str("Grace")])?;
    println!("  proxied result: {}", greeting);

    if let Some(proxy_type) = reflex.proxies().proxy_type(&greeter) {
        let calls = proxy_type
            .handler()
            .state::<LoggingInterceptor>()
            .map(LoggingInterceptor::calls)
            .unwrap_or_default();
        println!("  interceptor saw {} call(s)", calls);
    }

    Ok(())
}
