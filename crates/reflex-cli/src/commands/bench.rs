//! `reflex bench`: time the dispatch paths against each other.
//!
//! A quick wall-clock comparison. The criterion suite under
//! `reflex-engine/benches` is the one to trust for numbers.

use std::hint::black_box;
use std::time::{Duration, Instant};

use reflex_engine::{EngineOptions, Reflex};
use reflex_types::{ParamType, Value};

use crate::fixtures;

fn measure<F>(label: &str, iterations: u64, mut f: F) -> anyhow::Result<Duration>
where
    F: FnMut() -> anyhow::Result<Value>,
{
    let start = Instant::now();
    for _ in 0..iterations {
        black_box(f()?);
    }
    let elapsed = start.elapsed();
    let per_call = elapsed.as_nanos() as f64 / iterations.max(1) as f64;
    println!("  {:<24} {:>10.1} ns/call", label, per_call);
    Ok(elapsed)
}

pub fn execute(options: EngineOptions, iterations: u64) -> anyhow::Result<()> {
    if iterations == 0 {
        anyhow::bail!("iterations must be greater than zero");
    }

    let reflex = Reflex::new(options);
    let counter = fixtures::counter_class();
    let receiver = reflex.new_instance(&counter)?;
    let params = [ParamType::I64];
    let args = [Value::I64(1)];

    println!("Dispatching Counter::add(i64) {} times", iterations);

    let uncached = measure("uncached resolve+invoke", iterations, || {
        let handle = reflex.methods().find_method_uncached(&counter, "add", &params)?;
        Ok(handle.invoke(Some(&receiver), &args)?)
    })?;

    let cached = measure("cached resolve+invoke", iterations, || {
        let handle = reflex.resolve_method(&counter, "add", &params)?;
        Ok(reflex.invoke(&handle, Some(&receiver), &args)?)
    })?;

    let bound = reflex.resolve_method(&counter, "add", &params)?.bind(receiver.clone())?;
    measure("bound handle", iterations, || Ok(bound.call(&args)?))?;

    measure("direct call", iterations, || Ok(receiver.call("add", &args)?))?;

    if !cached.is_zero() {
        println!();
        println!(
            "Cached lookups are {:.1}x the speed of uncached lookups",
            uncached.as_secs_f64() / cached.as_secs_f64()
        );
    }

    if reflex.options().methods.collect_stats {
        let stats = reflex.methods().stats();
        println!("Cache hits: {}, misses: {}", stats.hits, stats.misses);
    }

    Ok(())
}
