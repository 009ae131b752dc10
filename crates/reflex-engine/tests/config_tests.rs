//! Integration tests for loading engine options from disk

use std::io::Write;

use reflex_engine::{ConfigError, EngineOptions, ProxyCacheKey, Reflex};
use reflex_types::{CallResult, ClassBuilder, Interceptor, MethodDescriptor, SuperCall, Value};
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_from_file() {
    let file = write_config(
        r#"
[methods]
collect_stats = false

[proxy]
cache_key = "target-and-interceptor"
name_suffix = "$Intercepted"
"#,
    );

    let options = EngineOptions::from_file(file.path()).unwrap();
    assert!(!options.methods.collect_stats);
    assert!(options.singleton.log_failures);
    assert_eq!(options.proxy.cache_key, ProxyCacheKey::TargetAndInterceptor);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = EngineOptions::from_file(&dir.path().join("reflex.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_malformed_file() {
    let file = write_config("[proxy\nname_suffix = 1");
    let err = EngineOptions::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_rendered_options_load_back() {
    let mut options = EngineOptions::default();
    options.singleton.log_failures = false;
    options.proxy.name_suffix = "$P".to_string();

    let file = write_config(&options.to_toml_string().unwrap());
    assert_eq!(EngineOptions::from_file(file.path()).unwrap(), options);
}

#[derive(Default)]
struct Noop;

impl Interceptor for Noop {
    fn intercept(&self, super_call: &SuperCall<'_>, _method: &MethodDescriptor, _args: &[Value]) -> CallResult {
        super_call.call()
    }
}

#[test]
fn test_options_shape_the_engine() {
    let file = write_config("[methods]\ncollect_stats = false\n\n[proxy]\nname_suffix = \"$Wrapped\"\n");
    let reflex = Reflex::new(EngineOptions::from_file(file.path()).unwrap());

    let target = ClassBuilder::new("Job").default_constructor::<()>().build();
    let noop = ClassBuilder::new("Noop")
        .default_constructor::<Noop>()
        .interceptor::<Noop>()
        .build();
    let proxy = reflex.get_or_create_proxy(&noop, &target).unwrap();
    assert_eq!(proxy.class().name(), "Job$Wrapped0");

    let _ = reflex.resolve_method(&target, "missing", &[]);
    assert_eq!(reflex.methods().stats().misses, 0);
}
