//! Tool implementations behind `tools/call`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use subagents_runner::io::agents::AgentRepository;
use subagents_runner::io::path::resolve_dir;
use subagents_runner::{AgentRunner, RunRequest};

/// Arguments of the `delegate_task` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct DelegateArgs {
    pub agent: String,
    pub task: String,
    pub working_directory: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Serialize)]
struct AgentSummary<'a> {
    name: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct AgentList<'a> {
    agents: Vec<AgentSummary<'a>>,
}

/// Shared state for tool calls.
#[derive(Clone)]
pub struct Handlers {
    repo: Arc<dyn AgentRepository>,
    runner: Arc<dyn AgentRunner>,
}

impl Handlers {
    pub fn new(repo: Arc<dyn AgentRepository>, runner: Arc<dyn AgentRunner>) -> Self {
        Self { repo, runner }
    }

    /// JSON text `{"agents":[{"name","description"}]}`; personas stay private.
    pub fn list_agents(&self) -> Result<String> {
        let agents = self.repo.list_agents()?;
        let list = AgentList {
            agents: agents
                .iter()
                .map(|agent| AgentSummary {
                    name: &agent.name,
                    description: &agent.description,
                })
                .collect(),
        };
        serde_json::to_string(&list).context("marshal agents")
    }

    /// Run a task as the named agent and return the runner's reply.
    pub async fn delegate_task(
        &self,
        args: &DelegateArgs,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if args.agent.trim().is_empty() {
            return Err(anyhow!("agent is required"));
        }
        if args.task.trim().is_empty() {
            return Err(anyhow!("task is required"));
        }
        let workdir = resolve_dir(Path::new(&args.working_directory))
            .map_err(|err| anyhow!("working_directory invalid: {err}"))?;

        let agent = self
            .repo
            .find_agent(&args.agent)?
            .ok_or_else(|| anyhow!("agent {:?} not found", args.agent))?;

        let model = args
            .model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .or(agent.model.as_deref());

        info!(
            agent = %agent.name,
            workdir = %workdir.display(),
            model = model.unwrap_or(""),
            "delegating task"
        );
        let request = RunRequest::new(&agent, &args.task, &workdir).with_model(model);
        let output = self.runner.run(&request, cancel).await?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subagents_runner::io::agents::YamlAgentRepository;
    use subagents_runner::test_support::{ScriptedRunner, agents_dir, quota, write_agent};

    fn handlers(dir: &Path, runner: Arc<ScriptedRunner>) -> Handlers {
        Handlers::new(Arc::new(YamlAgentRepository::new(dir)), runner)
    }

    fn args(agent: &str, task: &str, workdir: &Path) -> DelegateArgs {
        DelegateArgs {
            agent: agent.to_string(),
            task: task.to_string(),
            working_directory: workdir.to_string_lossy().into_owned(),
            model: None,
        }
    }

    #[test]
    fn list_agents_hides_persona() {
        let dir = agents_dir(&[
            ("reviewer", "secret persona", "Reviews code"),
            ("planner", "another secret", "Plans work"),
        ]);
        let text = handlers(dir.path(), ScriptedRunner::new())
            .list_agents()
            .expect("list");

        assert_eq!(
            text,
            r#"{"agents":[{"name":"planner","description":"Plans work"},{"name":"reviewer","description":"Reviews code"}]}"#
        );
        assert!(!text.contains("secret"));
    }

    #[tokio::test]
    async fn delegates_to_runner_with_agent_model() {
        let dir = agents_dir(&[]);
        std::fs::write(
            dir.path().join("reviewer.yaml"),
            "persona: p\ndescription: d\nmodel: gpt-4o\n",
        )
        .expect("write");
        let work = tempfile::tempdir().expect("workdir");
        let runner = ScriptedRunner::succeeding("reviewed");

        let out = handlers(dir.path(), runner.clone())
            .delegate_task(&args("reviewer", "review", work.path()), &CancellationToken::new())
            .await
            .expect("delegate");

        assert_eq!(out, "reviewed");
        let calls = runner.recorded();
        assert_eq!(calls[0].model.as_deref(), Some("gpt-4o"));
        assert_eq!(calls[0].task, "review");
    }

    #[tokio::test]
    async fn request_model_overrides_agent_model() {
        let dir = agents_dir(&[]);
        std::fs::write(
            dir.path().join("reviewer.yaml"),
            "persona: p\ndescription: d\nmodel: gpt-4o\n",
        )
        .expect("write");
        let work = tempfile::tempdir().expect("workdir");
        let runner = ScriptedRunner::succeeding("ok");

        let mut request = args("reviewer", "review", work.path());
        request.model = Some(" claude ".to_string());
        handlers(dir.path(), runner.clone())
            .delegate_task(&request, &CancellationToken::new())
            .await
            .expect("delegate");

        assert_eq!(runner.recorded()[0].model.as_deref(), Some("claude"));
    }

    #[tokio::test]
    async fn unknown_agent_is_reported() {
        let dir = agents_dir(&[("reviewer", "p", "d")]);
        let work = tempfile::tempdir().expect("workdir");
        let runner = ScriptedRunner::succeeding("ok");

        let err = handlers(dir.path(), runner.clone())
            .delegate_task(&args("ghost", "t", work.path()), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "agent \"ghost\" not found");
        assert_eq!(runner.calls(), 0);
    }

    #[tokio::test]
    async fn invalid_workdir_never_reaches_runner() {
        let dir = agents_dir(&[("reviewer", "p", "d")]);
        let runner = ScriptedRunner::succeeding("ok");

        let err = handlers(dir.path(), runner.clone())
            .delegate_task(
                &args("reviewer", "t", Path::new("relative/dir")),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("working_directory invalid"));
        assert_eq!(runner.calls(), 0);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() {
        let dir = agents_dir(&[("reviewer", "p", "d")]);
        let work = tempfile::tempdir().expect("workdir");
        let handlers = handlers(dir.path(), ScriptedRunner::new());

        let err = handlers
            .delegate_task(&args("", "t", work.path()), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "agent is required");

        let err = handlers
            .delegate_task(&args("reviewer", " ", work.path()), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "task is required");
    }

    #[tokio::test]
    async fn runner_errors_keep_their_message() {
        let dir = agents_dir(&[]);
        write_agent(dir.path(), "reviewer", "p", "d");
        let work = tempfile::tempdir().expect("workdir");

        let err = handlers(dir.path(), ScriptedRunner::failing(quota("codex")))
            .delegate_task(&args("reviewer", "t", work.path()), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "codex: usage limit exceeded: usage limit reached");
    }
}
