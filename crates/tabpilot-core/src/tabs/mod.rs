//! Tab lifecycle management.
//!
//! The registry owns every tab record and its engine view. Engine change
//! notifications are translated into record mutations by a per-tab event
//! pump; nothing outside this module sees the engine's event shapes.

mod record;
mod registry;

pub use registry::{TabCloseHook, TabRegistry};

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
