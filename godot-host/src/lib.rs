//! Godot Host - embed a prebuilt engine library and drive its frame loop
//!
//! The host loads the engine as a shared library, creates exactly one engine
//! instance, and pumps frames explicitly instead of handing control to the
//! engine's own main loop.
//!
//! # Control flow
//! 1. [`environment::bootstrap`] publishes the assembly directory to the OS
//!    environment, before anything touches the engine.
//! 2. [`Engine::create`] calls the engine's create entry point; the engine
//!    calls back into the init handshake, which resolves the interface table
//!    and the method bind cache.
//! 3. [`Engine::start`] runs the cached `start` bind.
//! 4. [`InstancePump::iteration`] runs one frame per call.
//! 5. [`Engine::dispose`] destroys the instance.
//!
//! The engine exposes no `stop` through its reflection surface, so there is
//! no graceful mid-run shutdown beyond `dispose()`.

pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod ffi;
pub mod library;
pub mod project;
pub mod runner;

pub use config::HostConfig;
pub use engine::{Engine, EngineRegistry, EngineState, InstancePump};
pub use environment::{bootstrap, EnvironmentBridge};
pub use error::{HostError, InitError, Result};
pub use library::{EngineLibrary, EntryPoints};
pub use runner::{run_frames, RunLimits, RunSummary, StopReason};

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the tracing subscriber (`RUST_LOG`, default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok() {
        info!("Godot Host v{}", env!("CARGO_PKG_VERSION"));
    }
}
