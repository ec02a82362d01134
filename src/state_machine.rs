//! Session controller state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod context;
mod effect;
pub mod event;
mod transition;


pub use context::SessionContext;
pub use effect::Effect;
pub use event::Event;
pub use transition::{transition, TransitionError};

#[cfg(test)]
pub use transition::ERROR_PREFIX;
