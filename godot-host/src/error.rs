//! Error taxonomy for the embedding host
//!
//! Every failure is reported synchronously to the immediate caller. Nothing
//! here is retried internally and nothing is logged-and-swallowed.

use std::path::PathBuf;
use thiserror::Error;

use crate::engine::EngineState;

/// Failures while building the interface table from the init handshake.
///
/// These are fatal: they indicate a mismatch between this host and the
/// engine library version.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("symbol `{0}` not found in engine library")]
    SymbolNotFound(String),

    #[error("symbol name {0:?} contains an interior NUL byte")]
    InvalidSymbolName(String),

    #[error("engine did not supply a get_proc_address callback")]
    MissingProcAddress,
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("initialization failed: {0}")]
    Initialization(#[from] InitError),

    #[error("an engine instance is already live in this process")]
    AlreadyRunning,

    #[error("native engine creation returned a null instance")]
    NativeCreate,

    #[error("native engine refused to start")]
    NativeStart,

    #[error("engine never completed the init handshake; interface table unavailable")]
    InterfaceUnavailable,

    #[error("method bind {class}::{method} was never resolved")]
    BindUnavailable {
        class: &'static str,
        method: &'static str,
    },

    #[error("`{operation}` is not permitted while the engine is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: EngineState,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to set environment variable `{name}` via {sink}: {reason}")]
    Environment {
        name: String,
        sink: &'static str,
        reason: String,
    },

    #[error("failed to load engine library from {path:?}")]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
}

pub type Result<T, E = HostError> = std::result::Result<T, E>;
