//! Session state: per-session actors and the registry that addresses them.

pub mod actor;
pub mod registry;

pub use actor::{SessionActor, SessionEvent};
pub use registry::Registry;
