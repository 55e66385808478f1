//! I/O helpers for runner integrations and startup wiring.

pub mod agents;
pub mod config;
pub mod path;
pub mod process;
