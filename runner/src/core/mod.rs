//! Deterministic, pure logic shared by the selection engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod capability;
pub mod classifier;
pub mod ordering;
pub mod prompt;
pub mod types;
