//! The execution contract and the registry of runner constructors.
//!
//! Each runner wraps one external AI command-line tool. The [`Selector`]
//! only sees [`AgentRunner`] trait objects; which concrete runners exist is
//! decided by the [`RunnerRegistry`] handed to it at construction, so tests
//! substitute scripted runners without touching process-wide state.
//!
//! [`Selector`]: crate::selector::Selector

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::types::RunRequest;
use crate::error::RunError;
use crate::io::config::RunnerEntry;

pub mod cli;
pub mod codex;
pub mod copilot;
pub mod gemini;

pub use cli::{CliRunner, CliTool, ExecSettings};
pub use codex::Codex;
pub use copilot::Copilot;
pub use gemini::Gemini;

/// Built-in runner order used when nothing is configured.
pub const DEFAULT_RUNNER_ORDER: &[&str] = &[Codex::NAME, Copilot::NAME, Gemini::NAME];

/// Executes a delegated task with one backend.
///
/// Implementations must honor `cancel` promptly and report
/// [`RunError::Cancelled`] when it fires. Quota exhaustion must be reported as
/// [`RunError::UsageLimit`]; every other failure is treated as fatal.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(
        &self,
        request: &RunRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, RunError>;
}

/// Builds a runner from its configuration entry and process limits.
pub type RunnerFactory =
    Arc<dyn Fn(&RunnerEntry, &ExecSettings) -> Arc<dyn AgentRunner> + Send + Sync>;

/// Name → constructor mapping passed explicitly into the selector.
#[derive(Clone, Default)]
pub struct RunnerRegistry {
    factories: BTreeMap<String, RunnerFactory>,
}

impl RunnerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the codex, copilot and gemini integrations.
    pub fn builtin() -> Self {
        Self::new()
            .with(Codex::NAME, cli_factory(|| Codex))
            .with(Copilot::NAME, cli_factory(|| Copilot))
            .with(Gemini::NAME, cli_factory(|| Gemini))
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&RunnerEntry, &ExecSettings) -> Arc<dyn AgentRunner> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&RunnerEntry, &ExecSettings) -> Arc<dyn AgentRunner> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Construct the runner for `entry`, or `None` if its name is unknown.
    pub fn build(
        &self,
        entry: &RunnerEntry,
        settings: &ExecSettings,
    ) -> Option<Arc<dyn AgentRunner>> {
        self.factories
            .get(&entry.name)
            .map(|factory| factory(entry, settings))
    }
}

impl fmt::Debug for RunnerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerRegistry")
            .field("runners", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn cli_factory<T, C>(
    make_tool: C,
) -> impl Fn(&RunnerEntry, &ExecSettings) -> Arc<dyn AgentRunner> + Send + Sync + 'static
where
    T: CliTool,
    C: Fn() -> T + Send + Sync + 'static,
{
    move |entry: &RunnerEntry, settings: &ExecSettings| -> Arc<dyn AgentRunner> {
        Arc::new(CliRunner::from_entry(make_tool(), entry, settings))
    }
}
