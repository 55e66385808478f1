//! Selection engine behavior across preferred runners, model filters and
//! quota fallback, using scripted runners in place of external CLIs.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use subagents_runner::io::config::{RunnerEntry, RunnersConfig};
use subagents_runner::test_support::{agent, fatal, quota, scripted_registry};
use subagents_runner::{RunError, RunRequest, Selector};

fn config(entries: Vec<RunnerEntry>) -> RunnersConfig {
    RunnersConfig {
        runners: entries,
        ..RunnersConfig::default()
    }
}

fn pinned_config() -> RunnersConfig {
    config(vec![
        RunnerEntry::new("codex", 2).with_models(["gpt-4o"]),
        RunnerEntry::new("copilot", 1).with_models(["claude"]),
    ])
}

async fn run(selector: &Selector, model: Option<&str>) -> Result<String, RunError> {
    let agent = agent("reviewer");
    let request = RunRequest::new(&agent, "review the diff", Path::new("/tmp")).with_model(model);
    selector.run(&request, &CancellationToken::new()).await
}

#[tokio::test]
async fn preferred_runner_serves_its_model() {
    let (registry, runners) = scripted_registry(&["codex", "copilot"]);
    runners["codex"].push(Ok("codex-out".to_string()));
    runners["copilot"].push(Ok("copilot-out".to_string()));

    let selector = Selector::new(&registry, &pinned_config(), Some("codex")).expect("selector");
    let out = run(&selector, Some("gpt-4o")).await.expect("run");

    assert_eq!(out, "codex-out");
    assert_eq!(runners["codex"].calls(), 1);
    assert_eq!(runners["copilot"].calls(), 0);
}

#[tokio::test]
async fn model_mismatch_skips_preferred_without_invoking_it() {
    let (registry, runners) = scripted_registry(&["codex", "copilot"]);
    runners["codex"].push(Ok("codex-out".to_string()));
    runners["copilot"].push(Ok("copilot-out".to_string()));

    let selector = Selector::new(&registry, &pinned_config(), Some("codex")).expect("selector");
    let out = run(&selector, Some("claude")).await.expect("run");

    assert_eq!(out, "copilot-out");
    assert_eq!(runners["codex"].calls(), 0);
    let calls = runners["copilot"].recorded();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model.as_deref(), Some("claude"));
    assert_eq!(calls[0].task, "review the diff");
}

#[tokio::test]
async fn unsupported_model_invokes_nobody() {
    let (registry, runners) = scripted_registry(&["codex", "copilot"]);
    let selector = Selector::new(&registry, &pinned_config(), None).expect("selector");

    let err = run(&selector, Some("llama")).await.unwrap_err();

    assert!(matches!(err, RunError::NoRunnerSupportsModel(ref m) if m == "llama"));
    assert_eq!(err.to_string(), "no runner supports model \"llama\"");
    assert_eq!(runners["codex"].calls(), 0);
    assert_eq!(runners["copilot"].calls(), 0);
}

#[tokio::test]
async fn first_success_wins() {
    let (registry, runners) = scripted_registry(&["codex", "copilot", "gemini"]);
    for runner in runners.values() {
        runner.push(Ok("done".to_string()));
    }
    let selector = Selector::new(&registry, &RunnersConfig::default(), None).expect("selector");

    run(&selector, None).await.expect("run");

    assert_eq!(runners["codex"].calls(), 1);
    assert_eq!(runners["copilot"].calls(), 0);
    assert_eq!(runners["gemini"].calls(), 0);
}

#[tokio::test]
async fn usage_limit_falls_back_to_next_candidate() {
    let (registry, runners) = scripted_registry(&["codex", "copilot", "gemini"]);
    runners["codex"].push(Err(quota("codex")));
    runners["copilot"].push(Ok("copilot-out".to_string()));
    runners["gemini"].push(Ok("gemini-out".to_string()));

    let selector = Selector::new(&registry, &RunnersConfig::default(), None).expect("selector");
    let out = run(&selector, None).await.expect("run");

    assert_eq!(out, "copilot-out");
    assert_eq!(runners["codex"].calls(), 1);
    assert_eq!(runners["gemini"].calls(), 0);
}

#[tokio::test]
async fn fatal_failure_stops_the_run() {
    let (registry, runners) = scripted_registry(&["codex", "copilot"]);
    runners["codex"].push(Err(fatal("codex")));
    runners["copilot"].push(Ok("copilot-out".to_string()));

    let selector = Selector::new(
        &registry,
        &config(vec![RunnerEntry::new("codex", 1), RunnerEntry::new("copilot", 2)]),
        None,
    )
    .expect("selector");
    let err = run(&selector, None).await.unwrap_err();

    assert!(matches!(err, RunError::ExecFailed { .. }));
    assert!(!err.is_retryable());
    assert_eq!(runners["copilot"].calls(), 0);
}

#[tokio::test]
async fn all_quota_failures_surface_the_last_one() {
    let (registry, runners) = scripted_registry(&["codex", "copilot", "gemini"]);
    for name in ["codex", "copilot", "gemini"] {
        runners[name].push(Err(quota(name)));
    }

    let selector = Selector::new(&registry, &RunnersConfig::default(), None).expect("selector");
    let err = run(&selector, None).await.unwrap_err();

    assert!(matches!(err, RunError::Exhausted(_)));
    let limit = err.usage_limit().expect("usage limit");
    assert_eq!(limit.runner, "gemini");
    assert_eq!(limit.message, "usage limit reached");
    assert!(
        err.to_string()
            .starts_with("all runners exhausted due to usage limits")
    );
    for runner in runners.values() {
        assert_eq!(runner.calls(), 1);
    }
}

#[tokio::test]
async fn quota_then_model_mismatch_still_reports_exhaustion() {
    let (registry, runners) = scripted_registry(&["codex", "copilot"]);
    runners["codex"].push(Err(quota("codex")));
    let cfg = config(vec![
        RunnerEntry::new("codex", 1).with_models(["gpt-4o"]),
        RunnerEntry::new("copilot", 2).with_models(["claude"]),
    ]);

    let selector = Selector::new(&registry, &cfg, None).expect("selector");
    let err = run(&selector, Some("gpt-4o")).await.unwrap_err();

    assert_eq!(err.usage_limit().map(|l| l.runner.as_str()), Some("codex"));
    assert_eq!(runners["copilot"].calls(), 0);
}

#[tokio::test]
async fn empty_candidate_list_reports_no_runner() {
    let (registry, _) = scripted_registry(&[]);
    let selector = Selector::new(&registry, &RunnersConfig::default(), None).expect("selector");
    assert!(selector.attempt_order().is_empty());

    let err = run(&selector, None).await.unwrap_err();
    assert!(matches!(err, RunError::NoRunnerAvailable));
}

#[tokio::test]
async fn cancellation_is_not_retried() {
    let (registry, runners) = scripted_registry(&["codex", "copilot"]);
    runners["codex"].push(Err(RunError::Cancelled {
        runner: "codex".to_string(),
    }));
    runners["copilot"].push(Ok("copilot-out".to_string()));

    let selector = Selector::new(&registry, &RunnersConfig::default(), None).expect("selector");
    let err = run(&selector, None).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(runners["copilot"].calls(), 0);
}

#[tokio::test]
async fn concurrent_runs_share_one_selector() {
    let (registry, runners) = scripted_registry(&["codex"]);
    runners["codex"].push(Ok("ok".to_string()));
    let selector = Selector::new(&registry, &RunnersConfig::default(), None).expect("selector");

    let (a, b) = tokio::join!(run(&selector, None), run(&selector, None));

    assert_eq!(a.expect("first"), "ok");
    assert_eq!(b.expect("second"), "ok");
    assert_eq!(runners["codex"].calls(), 2);
}
