//! Concurrency tests: first-time requests racing on the same key must
//! converge on one constructed or synthesized value

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use reflex_engine::{EngineOptions, ForwardingSynthesizer, Reflex, TypeSynthesizer};
use reflex_types::{
    CallResult, ClassBuilder, ClassRef, Constructor, Instance, Interceptor, Method,
    MethodDescriptor, ParamType, ReflectError, ReflectResult, StateBox, SuperCall, Value,
};

const THREADS: usize = 16;

/// Run `f` on `THREADS` threads released together, collecting results
fn race<T, F>(f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(THREADS));
    let f = Arc::new(f);
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let barrier = barrier.clone();
            let f = f.clone();
            thread::spawn(move || {
                barrier.wait();
                f()
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn slow_class(name: &str, constructed: Arc<AtomicUsize>) -> ClassRef {
    ClassBuilder::new(name)
        .constructor(Constructor::new(vec![], move |_| {
            constructed.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(Box::new(()) as StateBox)
        }))
        .method(Method::instance("ping", vec![], ParamType::Str, |_, _| Ok(Value::str("pong"))))
        .build()
}

fn assert_all_identical(instances: &[Instance]) {
    let first = &instances[0];
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, first)));
}

#[test]
fn test_concurrent_get_singleton_constructs_once() {
    let reflex = Arc::new(Reflex::default());
    let constructed = Arc::new(AtomicUsize::new(0));
    let class = slow_class("Slow", constructed.clone());

    let instances = {
        let reflex = reflex.clone();
        race(move || reflex.get_singleton(&class).unwrap())
    };

    assert_eq!(instances.len(), THREADS);
    assert_all_identical(&instances);
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert_eq!(reflex.singletons().len(), 1);
}

#[test]
fn test_concurrent_singletons_of_different_classes() {
    let reflex = Arc::new(Reflex::default());
    let constructed = Arc::new(AtomicUsize::new(0));
    let classes: Arc<Vec<ClassRef>> = Arc::new(
        (0..4)
            .map(|i| slow_class(&format!("Slow{}", i), constructed.clone()))
            .collect(),
    );
    let next = Arc::new(AtomicUsize::new(0));

    {
        let reflex = reflex.clone();
        let classes = classes.clone();
        race(move || {
            let class = &classes[next.fetch_add(1, Ordering::SeqCst) % classes.len()];
            reflex.get_singleton(class).unwrap()
        });
    }

    assert_eq!(constructed.load(Ordering::SeqCst), 4);
    assert_eq!(reflex.singletons().len(), 4);
}

#[derive(Default)]
struct Forward;

impl Interceptor for Forward {
    fn intercept(&self, super_call: &SuperCall<'_>, _method: &MethodDescriptor, _args: &[Value]) -> CallResult {
        super_call.call()
    }
}

#[test]
fn test_concurrent_get_or_create_proxy_synthesizes_once() {
    let reflex = Arc::new(Reflex::default());
    let handlers = Arc::new(AtomicUsize::new(0));
    let counter = handlers.clone();
    let interceptor = ClassBuilder::new("Forward")
        .constructor(Constructor::new(vec![], move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(Box::new(Forward) as StateBox)
        }))
        .interceptor::<Forward>()
        .build();
    let target = slow_class("Remote", Arc::new(AtomicUsize::new(0)));

    let proxies = {
        let reflex = reflex.clone();
        let target = target.clone();
        race(move || reflex.get_or_create_proxy(&interceptor, &target).unwrap())
    };

    assert_all_identical(&proxies);
    assert_eq!(handlers.load(Ordering::SeqCst), 1);
    assert_eq!(reflex.proxies().cached_types(), 1);
    assert_eq!(reflex.types().len(), 1);
    assert_eq!(proxies[0].call("ping", &[]).unwrap(), Value::str("pong"));
}

/// Fails its first synthesis after a delay, then forwards
struct FailsOnce {
    attempts: Arc<AtomicUsize>,
}

impl TypeSynthesizer for FailsOnce {
    fn create_forwarding_subtype(
        &self,
        target: &ClassRef,
        interceptor: Instance,
        name: &str,
    ) -> ReflectResult<ClassRef> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            thread::sleep(Duration::from_millis(20));
            return Err(ReflectError::Synthesis {
                target: target.name().to_string(),
                interceptor: interceptor.class().name().to_string(),
                reason: "first attempt fails".to_string(),
                cause: None,
            });
        }
        ForwardingSynthesizer.create_forwarding_subtype(target, interceptor, name)
    }
}

#[test]
fn test_concurrent_callers_retry_after_failed_synthesis() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let synthesizer = FailsOnce {
        attempts: attempts.clone(),
    };
    let reflex = Arc::new(Reflex::with_synthesizer(EngineOptions::default(), Box::new(synthesizer)));
    let interceptor = ClassBuilder::new("Forward")
        .default_constructor::<Forward>()
        .interceptor::<Forward>()
        .build();
    let target = slow_class("Flaky", Arc::new(AtomicUsize::new(0)));

    let results = {
        let reflex = reflex.clone();
        let target = target.clone();
        race(move || reflex.get_or_create_proxy(&interceptor, &target))
    };

    let failures = results.iter().filter(|r| r.is_err()).count();
    let proxies: Vec<Instance> = results.into_iter().filter_map(Result::ok).collect();
    assert_eq!(failures, 1);
    assert_eq!(proxies.len(), THREADS - 1);
    assert_all_identical(&proxies);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(reflex.proxies().cached_types(), 1);
    assert_eq!(proxies[0].call("ping", &[]).unwrap(), Value::str("pong"));
}

#[test]
fn test_concurrent_method_resolution_converges() {
    let reflex = Arc::new(Reflex::default());
    let class = slow_class("Resolved", Arc::new(AtomicUsize::new(0)));
    let receiver = reflex.new_instance(&class).unwrap();

    let results = {
        let reflex = reflex.clone();
        race(move || {
            let handle = reflex.resolve_method(&class, "ping", &[]).unwrap();
            reflex.invoke(&handle, Some(&receiver), &[]).unwrap()
        })
    };

    assert!(results.iter().all(|r| *r == Value::str("pong")));
    assert_eq!(reflex.methods().len(), 1);
}
