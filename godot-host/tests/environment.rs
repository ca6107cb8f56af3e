//! Checks that the engine sees the assembly directory only when it was
//! published before `Engine::create`.

mod common;

use std::ffi::OsStr;
use std::sync::{Arc, Mutex};

use godot_host::environment::{bootstrap_with, EnvSink};
use godot_host::{Engine, EnvironmentBridge, HostConfig, Result};

#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<String>>>,
}

impl EnvSink for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn set(&self, key: &str, _value: &OsStr) -> Result<()> {
        self.seen.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

#[test]
fn test_engine_does_not_see_unpublished_dir() {
    let registry = common::registry();
    let _engine = Engine::create(
        &registry,
        common::library(),
        common::args("env-none", &["--mock-env=GODOT_HOST_IT_UNSET"]),
    )
    .unwrap();

    assert_eq!(common::record("env-none").env_seen, None);
}

#[test]
fn test_host_only_view_is_not_enough() {
    let recorder = Recorder::default();
    let bridge = EnvironmentBridge::with_sinks(vec![Box::new(recorder.clone())]);
    bridge.propagate("GODOT_HOST_IT_RECORDED", "/only/recorded").unwrap();
    assert_eq!(*recorder.seen.lock().unwrap(), vec!["GODOT_HOST_IT_RECORDED".to_string()]);

    let registry = common::registry();
    let _engine = Engine::create(
        &registry,
        common::library(),
        common::args("env-recorded", &["--mock-env=GODOT_HOST_IT_RECORDED"]),
    )
    .unwrap();

    assert_eq!(common::record("env-recorded").env_seen, None);
}

#[test]
fn test_engine_sees_propagated_dir() {
    EnvironmentBridge::platform()
        .propagate("GODOT_HOST_IT_PROPAGATED", "/opt/game/assemblies")
        .unwrap();

    let registry = common::registry();
    let _engine = Engine::create(
        &registry,
        common::library(),
        common::args("env-set", &["--mock-env=GODOT_HOST_IT_PROPAGATED"]),
    )
    .unwrap();

    assert_eq!(
        common::record("env-set").env_seen.as_deref(),
        Some("/opt/game/assemblies")
    );
}

#[test]
fn test_bootstrap_before_create() {
    let dir = tempfile::tempdir().unwrap();
    let config = HostConfig {
        assembly_dir: Some(dir.path().to_path_buf()),
        assembly_dir_var: "GODOT_HOST_IT_BOOTSTRAP".to_string(),
        ..HostConfig::default()
    };
    let published = bootstrap_with(&EnvironmentBridge::platform(), &config).unwrap();
    assert_eq!(published.as_os_str(), dir.path().as_os_str());
    assert!(godot_host::environment::is_bootstrapped());

    let registry = common::registry();
    let _engine = Engine::create(
        &registry,
        common::library(),
        common::args("env-bootstrap", &["--mock-env=GODOT_HOST_IT_BOOTSTRAP"]),
    )
    .unwrap();

    let expected = dir.path().to_string_lossy().into_owned();
    assert_eq!(common::record("env-bootstrap").env_seen, Some(expected));
}
