//! Engine module - interop and lifecycle core
//!
//! The pieces that sit between the host and the native engine: the interface
//! table resolved from the init handshake, the method bind cache, the
//! lifecycle handle that owns the native instance, and the per-frame pump.

pub mod init;
pub mod interface;
pub mod lifecycle;
pub mod method_bind;
pub mod pump;

pub use init::Bindings;
pub use interface::ExtensionInterface;
pub use lifecycle::{Engine, EngineRegistry, EngineState};
pub use method_bind::{
    MethodBind, MethodBindCache, MethodKey, BOOL_NO_ARGS_HASH, GODOT_INSTANCE_ITERATION,
    GODOT_INSTANCE_START,
};
pub use pump::InstancePump;
