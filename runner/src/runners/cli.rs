//! Shared execution path for runners that wrap a command-line tool.

use std::ffi::OsString;
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{field, info};

use crate::core::capability::ModelSet;
use crate::core::classifier::{Classification, UsageLimitPatterns, classify};
use crate::core::prompt::{build_agent_prompt, truncate};
use crate::core::types::RunRequest;
use crate::error::RunError;
use crate::io::config::{RunnerEntry, RunnersConfig};
use crate::io::path::resolve_dir;
use crate::io::process::{CommandOutput, ProcessEnd, run_command};

use super::AgentRunner;

const TASK_LOG_LIMIT: usize = 200;
const STDERR_LOG_LIMIT: usize = 2_000;

/// Per-attempt process limits shared by every CLI runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecSettings {
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl Default for ExecSettings {
    fn default() -> Self {
        Self::from(&RunnersConfig::default())
    }
}

impl From<&RunnersConfig> for ExecSettings {
    fn from(cfg: &RunnersConfig) -> Self {
        Self {
            timeout: cfg.timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }
}

/// How a specific external tool is invoked.
pub trait CliTool: Send + Sync + 'static {
    /// Runner identifier, also the default executable name.
    const NAME: &'static str;

    /// Built-in quota exhaustion patterns for this tool's output.
    fn usage_limit_patterns(&self) -> &'static [&'static str];

    /// Argument vector for one non-interactive invocation.
    fn args(&self, prompt: &str, workdir: &Path, model: Option<&str>) -> Vec<OsString>;

    /// Extract the reply from successful stdout.
    fn parse_output(&self, stdout: &str) -> String {
        stdout.trim().to_string()
    }
}

/// An [`AgentRunner`] that spawns a [`CliTool`] once per attempt.
pub struct CliRunner<T> {
    tool: T,
    program: String,
    models: ModelSet,
    patterns: UsageLimitPatterns,
    settings: ExecSettings,
}

impl<T: CliTool> CliRunner<T> {
    pub fn new(tool: T, settings: ExecSettings) -> Self {
        let patterns = UsageLimitPatterns::new(tool.usage_limit_patterns());
        Self {
            tool,
            program: T::NAME.to_string(),
            models: ModelSet::unrestricted(),
            patterns,
            settings,
        }
    }

    /// Build a runner from a configuration entry, applying its overrides.
    pub fn from_entry(tool: T, entry: &RunnerEntry, settings: &ExecSettings) -> Self {
        let mut runner =
            Self::new(tool, settings.clone()).with_models(ModelSet::from_models(&entry.models));
        if let Some(command) = &entry.command {
            runner = runner.with_program(command.clone());
        }
        if let Some(patterns) = &entry.usage_limit_patterns {
            runner = runner.with_patterns(UsageLimitPatterns::new(patterns));
        }
        runner
    }

    #[must_use]
    pub fn with_models(mut self, models: ModelSet) -> Self {
        self.models = models;
        self
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_patterns(mut self, patterns: UsageLimitPatterns) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    pub fn patterns(&self) -> &UsageLimitPatterns {
        &self.patterns
    }

    fn interpret(&self, output: &CommandOutput) -> Result<String, RunError> {
        match output.end {
            ProcessEnd::TimedOut => {
                return Err(RunError::TimedOut {
                    runner: T::NAME.to_string(),
                    timeout: self.settings.timeout,
                });
            }
            ProcessEnd::Cancelled => {
                return Err(RunError::Cancelled {
                    runner: T::NAME.to_string(),
                });
            }
            ProcessEnd::Exited => {}
        }

        if output.success() {
            let mut reply = self.tool.parse_output(&output.stdout_text());
            reply.push_str(&output.stdout_truncated_notice(T::NAME));
            return Ok(reply.trim_end().to_string());
        }

        match classify(T::NAME, &output.combined_text(), &self.patterns) {
            Classification::Retryable(err) => Err(RunError::UsageLimit(err)),
            Classification::Fatal => Err(RunError::ExecFailed {
                runner: T::NAME.to_string(),
                status: output.status_label(),
                stderr: output.stderr_text().trim().to_string(),
            }),
        }
    }
}

#[async_trait]
impl<T: CliTool> AgentRunner for CliRunner<T> {
    async fn run(
        &self,
        request: &RunRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, RunError> {
        if request.task.trim().is_empty() {
            return Err(RunError::EmptyTask);
        }
        let workdir = resolve_dir(request.workdir)?;
        if let Some(model) = request.model
            && !self.models.supports(Some(model))
        {
            return Err(RunError::ModelNotSupported {
                runner: T::NAME.to_string(),
                model: model.to_string(),
            });
        }

        let prompt = build_agent_prompt(&request.agent.persona, request.task);
        let mut cmd = Command::new(&self.program);
        cmd.args(self.tool.args(&prompt, &workdir, request.model))
            .current_dir(&workdir);

        let start = Instant::now();
        let result = run_command(
            cmd,
            self.settings.timeout,
            self.settings.output_limit_bytes,
            cancel,
        )
        .await;
        let duration = start.elapsed();

        let (outcome, exit_code, stderr) = match result {
            Ok(output) => (
                self.interpret(&output),
                output.status.code(),
                truncate(output.stderr_text().trim(), STDERR_LOG_LIMIT),
            ),
            Err(source) => (
                Err(RunError::Process {
                    runner: T::NAME.to_string(),
                    source,
                }),
                None,
                String::new(),
            ),
        };

        info!(
            runner = T::NAME,
            agent = %request.agent.name,
            workdir = %workdir.display(),
            task = %truncate(request.task, TASK_LOG_LIMIT),
            model = request.model.unwrap_or(""),
            duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            exit_code = ?exit_code,
            stderr = %stderr,
            error = outcome.as_ref().err().map(field::display),
            "delegate task completed"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Agent;

    struct EchoTool;

    impl CliTool for EchoTool {
        const NAME: &'static str = "echo";

        fn usage_limit_patterns(&self) -> &'static [&'static str] {
            &["usage limit"]
        }

        fn args(&self, prompt: &str, _workdir: &Path, _model: Option<&str>) -> Vec<OsString> {
            vec![prompt.into()]
        }
    }

    fn agent() -> Agent {
        Agent {
            name: "agent".to_string(),
            persona: "persona".to_string(),
            description: "desc".to_string(),
            model: None,
        }
    }

    #[tokio::test]
    async fn empty_task_is_rejected_before_spawning() {
        let runner = CliRunner::new(EchoTool, ExecSettings::default());
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = agent();
        let err = runner
            .run(
                &RunRequest::new(&agent, "  ", temp.path()),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::EmptyTask));
    }

    #[tokio::test]
    async fn relative_workdir_is_rejected() {
        let runner = CliRunner::new(EchoTool, ExecSettings::default());
        let agent = agent();
        let err = runner
            .run(
                &RunRequest::new(&agent, "task", Path::new("relative")),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::InvalidWorkdir(_)));
    }

    #[tokio::test]
    async fn unsupported_model_is_fatal() {
        let runner = CliRunner::new(EchoTool, ExecSettings::default())
            .with_models(ModelSet::from_models(["gemini-1.5"]));
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = agent();
        let err = runner
            .run(
                &RunRequest::new(&agent, "task", temp.path()).with_model(Some("other")),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::ModelNotSupported { .. }));
        assert!(!err.is_retryable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn success_returns_trimmed_stdout() {
        let runner = CliRunner::new(EchoTool, ExecSettings::default());
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = agent();
        let out = runner
            .run(
                &RunRequest::new(&agent, "do something", temp.path()),
                &CancellationToken::new(),
            )
            .await
            .expect("run");
        assert_eq!(out, "persona\n\nTask: do something");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn truncated_reply_carries_a_notice() {
        let settings = ExecSettings {
            output_limit_bytes: 8,
            ..ExecSettings::default()
        };
        let runner = CliRunner::new(EchoTool, settings);
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = agent();
        let out = runner
            .run(
                &RunRequest::new(&agent, "do something", temp.path()),
                &CancellationToken::new(),
            )
            .await
            .expect("run");
        // "persona\n\nTask: do something\n" is 28 bytes; 8 are kept.
        assert_eq!(out, "persona\n[echo stdout truncated 20 bytes]");
    }

    #[test]
    fn entry_overrides_program_models_and_patterns() {
        let mut entry = RunnerEntry::new("echo", 1)
            .with_models(["m1"])
            .with_command("/opt/echo");
        entry.usage_limit_patterns = Some(vec!["Too Many Requests".to_string()]);

        let runner = CliRunner::from_entry(EchoTool, &entry, &ExecSettings::default());
        assert_eq!(runner.program, "/opt/echo");
        assert!(runner.models().supports(Some("m1")));
        assert!(!runner.models().supports(Some("m2")));
        assert!(runner.patterns().matches("429 too many requests"));
        assert!(!runner.patterns().matches("usage limit"));
    }
}
