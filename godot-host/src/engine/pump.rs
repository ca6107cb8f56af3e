//! Instance Pump Handle
//!
//! A non-owning view of the engine instance used to drive one frame at a
//! time. It shares the owning [`Engine`](super::Engine)'s state cell, so it
//! goes invalid the moment the engine is disposed.
//!
//! Not reentrant. Call `iteration()` from one place, once per frame.

use std::rc::Rc;

use super::init::Bindings;
use super::lifecycle::{EngineState, InstanceCell};
use super::method_bind::GODOT_INSTANCE_ITERATION;
use crate::error::{HostError, Result};

pub struct InstancePump {
    cell: Rc<InstanceCell>,
    bindings: Option<Bindings>,
}

impl InstancePump {
    pub(crate) fn new(cell: Rc<InstanceCell>, bindings: Option<Bindings>) -> Self {
        Self { cell, bindings }
    }

    /// Run one engine frame.
    ///
    /// Returns `true` when the engine asks to quit. Fails with
    /// `InvalidState` unless the engine is `Running`.
    pub fn iteration(&self) -> Result<bool> {
        let state = self.cell.state.get();
        let instance = match (state, self.cell.instance.get()) {
            (EngineState::Running, Some(instance)) => instance,
            _ => {
                return Err(HostError::InvalidState {
                    operation: "iteration",
                    state,
                })
            }
        };

        let (interface, bind) = Bindings::lookup(self.bindings.as_ref(), GODOT_INSTANCE_ITERATION)?;
        Ok(unsafe { bind.call_bool(interface, instance) })
    }

    /// Whether the owning engine is `Running`
    pub fn is_valid(&self) -> bool {
        self.cell.state.get() == EngineState::Running
    }

    pub fn state(&self) -> EngineState {
        self.cell.state.get()
    }
}

impl std::fmt::Debug for InstancePump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstancePump")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn cell(state: EngineState) -> Rc<InstanceCell> {
        Rc::new(InstanceCell {
            state: Cell::new(state),
            instance: Cell::new(None),
        })
    }

    #[test]
    fn test_iteration_requires_running() {
        for state in [EngineState::Uninitialized, EngineState::Starting, EngineState::Disposed] {
            let pump = InstancePump::new(cell(state), None);
            assert!(!pump.is_valid());
            assert!(matches!(
                pump.iteration(),
                Err(HostError::InvalidState { operation: "iteration", state: s }) if s == state
            ));
        }
    }

    #[test]
    fn test_shared_state_invalidates_pump() {
        let shared = cell(EngineState::Running);
        let pump = InstancePump::new(shared.clone(), None);
        assert!(pump.is_valid());

        shared.state.set(EngineState::Disposed);
        assert!(!pump.is_valid());
        assert_eq!(pump.state(), EngineState::Disposed);
    }
}
