//! Test-only helpers: scripted runners, agents and temporary agent dirs.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::types::{Agent, RunRequest};
use crate::error::{RunError, UsageLimitExceeded};
use crate::io::config::RunnerEntry;
use crate::runners::{AgentRunner, ExecSettings, RunnerRegistry};

/// One recorded invocation of a [`ScriptedRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub agent: String,
    pub task: String,
    pub model: Option<String>,
}

/// An [`AgentRunner`] that replays queued outcomes and records every call.
///
/// When the queue runs dry the last outcome is repeated, so a runner scripted
/// with a single outcome behaves the same on every attempt.
#[derive(Default)]
pub struct ScriptedRunner {
    outcomes: Mutex<VecDeque<Outcome>>,
    last: Mutex<Option<Outcome>>,
    calls: Mutex<Vec<Call>>,
}

#[derive(Clone)]
enum Outcome {
    Ok(String),
    UsageLimit(UsageLimitExceeded),
    Fatal(String),
    Cancelled(String),
}

impl Outcome {
    fn from_result(result: Result<String, RunError>) -> Self {
        match result {
            Ok(out) => Self::Ok(out),
            Err(RunError::UsageLimit(limit)) => Self::UsageLimit(limit),
            Err(RunError::Cancelled { runner }) => Self::Cancelled(runner),
            Err(err) => Self::Fatal(err.to_string()),
        }
    }

    fn into_result(self) -> Result<String, RunError> {
        match self {
            Self::Ok(out) => Ok(out),
            Self::UsageLimit(limit) => Err(RunError::UsageLimit(limit)),
            Self::Cancelled(runner) => Err(RunError::Cancelled { runner }),
            Self::Fatal(stderr) => Err(RunError::ExecFailed {
                runner: "scripted".to_string(),
                status: "1".to_string(),
                stderr,
            }),
        }
    }
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn succeeding(output: &str) -> Arc<Self> {
        let runner = Self::new();
        runner.push(Ok(output.to_string()));
        runner
    }

    pub fn failing(err: RunError) -> Arc<Self> {
        let runner = Self::new();
        runner.push(Err(err));
        runner
    }

    /// Queue another outcome.
    ///
    /// Failures other than quota and cancellation are replayed as
    /// [`RunError::ExecFailed`] carrying the original message.
    pub fn push(&self, result: Result<String, RunError>) {
        lock(&self.outcomes).push_back(Outcome::from_result(result));
    }

    pub fn calls(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn recorded(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl AgentRunner for ScriptedRunner {
    async fn run(
        &self,
        request: &RunRequest<'_>,
        _cancel: &CancellationToken,
    ) -> Result<String, RunError> {
        lock(&self.calls).push(Call {
            agent: request.agent.name.clone(),
            task: request.task.to_string(),
            model: request.model.map(str::to_string),
        });

        let next = lock(&self.outcomes).pop_front();
        let outcome = match next {
            Some(outcome) => {
                *lock(&self.last) = Some(outcome.clone());
                outcome
            }
            None => lock(&self.last)
                .clone()
                .unwrap_or_else(|| Outcome::Fatal("no scripted outcome".to_string())),
        };
        outcome.into_result()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A quota failure as a CLI runner would report it.
pub fn quota(runner: &str) -> RunError {
    RunError::UsageLimit(UsageLimitExceeded {
        runner: runner.to_string(),
        message: "usage limit reached".to_string(),
    })
}

/// A non-quota failure.
pub fn fatal(runner: &str) -> RunError {
    RunError::ExecFailed {
        runner: runner.to_string(),
        status: "1".to_string(),
        stderr: "boom".to_string(),
    }
}

/// Deterministic agent with a persona and description derived from `name`.
pub fn agent(name: &str) -> Agent {
    Agent {
        name: name.to_string(),
        persona: format!("You are {name}."),
        description: format!("{name} agent"),
        model: None,
    }
}

/// Registry whose runners are [`ScriptedRunner`]s keyed by name.
///
/// Every name starts with no outcomes queued; script them through the
/// returned map before running. Factories ignore the configuration entry, so
/// model restrictions live only in the selector's capabilities.
pub fn scripted_registry(
    names: &[&str],
) -> (RunnerRegistry, BTreeMap<String, Arc<ScriptedRunner>>) {
    let mut registry = RunnerRegistry::new();
    let mut runners = BTreeMap::new();
    for name in names {
        let runner = ScriptedRunner::new();
        runners.insert((*name).to_string(), Arc::clone(&runner));
        registry.register(
            *name,
            move |_: &RunnerEntry, _: &ExecSettings| -> Arc<dyn AgentRunner> { runner.clone() },
        );
    }
    (registry, runners)
}

/// Write `<dir>/<name>.yaml` with the given persona and description.
pub fn write_agent(dir: &Path, name: &str, persona: &str, description: &str) {
    let body = format!("persona: {persona:?}\ndescription: {description:?}\n");
    std::fs::write(dir.join(format!("{name}.yaml")), body).expect("write agent file");
}

/// Temporary agents directory pre-populated with `(name, persona, description)` entries.
pub fn agents_dir(agents: &[(&str, &str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, persona, description) in agents {
        write_agent(dir.path(), name, persona, description);
    }
    dir
}
