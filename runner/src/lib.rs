//! Delegation of agent tasks to interchangeable external CLI runners.
//!
//! A task arrives with an agent persona, a working directory and an optional
//! model pin. The [`selector::Selector`] picks which runner executes it, tries
//! alternates in a fixed order, and decides whether a failure should move on
//! to the next candidate (exhausted quota) or abort the call.
//!
//! - **[`core`]**: Pure, deterministic logic (model support, candidate
//!   ordering, failure classification, prompt assembly). No I/O.
//! - **[`io`]**: Side-effecting helpers (child processes, config and persona
//!   files, directory validation).
//! - **[`runners`]**: The execution contract and the codex, copilot and gemini
//!   integrations built on it.

pub mod core;
pub mod error;
pub mod io;
pub mod logging;
pub mod runners;
pub mod selector;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::types::{Agent, RunRequest};
pub use crate::error::{FailureKind, RunError, UsageLimitExceeded};
pub use crate::runners::{AgentRunner, RunnerRegistry};
pub use crate::selector::Selector;
