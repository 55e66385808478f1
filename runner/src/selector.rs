//! Runner selection with quota-driven fallback.
//!
//! A [`Selector`] holds an optional preferred runner followed by fallbacks in
//! `(priority, name)` order. For each task it tries eligible candidates one at
//! a time: the first success wins, quota exhaustion moves on to the next
//! candidate, and any other failure (including cancellation) ends the run.
//!
//! The candidate lists are fixed at construction and never mutated, so a
//! single selector can serve concurrent runs.

use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::core::capability::{Capability, ModelSet};
use crate::core::ordering::{Ranked, rank, split_preferred};
use crate::core::types::RunRequest;
use crate::error::{FailureKind, RunError, UsageLimitExceeded};
use crate::io::config::{RunnerEntry, RunnersConfig};
use crate::runners::{AgentRunner, DEFAULT_RUNNER_ORDER, ExecSettings, RunnerRegistry};

/// A constructed runner and its static capability facts.
#[derive(Clone)]
pub struct Candidate {
    capability: Capability,
    runner: Arc<dyn AgentRunner>,
}

impl Candidate {
    pub fn new(capability: Capability, runner: Arc<dyn AgentRunner>) -> Self {
        Self { capability, runner }
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn supports_model(&self, model: Option<&str>) -> bool {
        self.capability.supports_model(model)
    }
}

impl Ranked for Candidate {
    fn name(&self) -> &str {
        &self.capability.name
    }

    fn priority(&self) -> u32 {
        self.capability.priority
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

/// Chooses and runs a concrete runner for each delegated task.
#[derive(Debug, Clone)]
pub struct Selector {
    preferred: Option<Candidate>,
    fallbacks: Vec<Candidate>,
}

impl Selector {
    /// Build a selector from configuration.
    ///
    /// Entries naming runners the registry does not know are skipped with a
    /// warning. Without a preferred runner and without entries, the built-in
    /// order is used. A preferred runner missing from the configuration is
    /// built without model restrictions and no fallbacks are added for it.
    pub fn new(
        registry: &RunnerRegistry,
        config: &RunnersConfig,
        preferred: Option<&str>,
    ) -> Result<Self> {
        let settings = ExecSettings::from(config);

        let mut entries = Vec::with_capacity(config.runners.len());
        for entry in &config.runners {
            if registry.contains(&entry.name) {
                entries.push(entry.clone());
            } else {
                warn!(runner = %entry.name, "ignoring unknown runner in config");
            }
        }
        for name in rank(&mut entries) {
            warn!(runner = %name, "ignoring duplicate runner in config");
        }

        let preferred = preferred.map(str::trim).filter(|name| !name.is_empty());
        let Some(preferred) = preferred else {
            if entries.is_empty() {
                entries = default_entries(registry);
            }
            let selector = Self {
                preferred: None,
                fallbacks: build_candidates(registry, &entries, &settings),
            };
            info!(order = ?selector.attempt_order(), "runner selector ready");
            return Ok(selector);
        };

        if !registry.contains(preferred) {
            return Err(anyhow!("invalid runner {preferred:?}"));
        }
        let (found, fallbacks) = split_preferred(entries, preferred);
        let preferred_entry = found.unwrap_or_else(|| RunnerEntry::new(preferred, 1));
        let preferred = build_candidate(registry, &preferred_entry, &settings)
            .ok_or_else(|| anyhow!("invalid runner {preferred:?}"))?;

        let selector = Self {
            preferred: Some(preferred),
            fallbacks: build_candidates(registry, &fallbacks, &settings),
        };
        info!(order = ?selector.attempt_order(), "runner selector ready");
        Ok(selector)
    }

    /// Build a selector from already constructed candidates.
    ///
    /// Fallbacks are ranked and deduplicated; the preferred candidate is
    /// removed from them if present.
    pub fn from_candidates(preferred: Option<Candidate>, mut fallbacks: Vec<Candidate>) -> Self {
        rank(&mut fallbacks);
        if let Some(preferred) = &preferred {
            let name = preferred.name().to_string();
            fallbacks.retain(|candidate| candidate.name() != name);
        }
        Self {
            preferred,
            fallbacks,
        }
    }

    pub fn preferred(&self) -> Option<&Candidate> {
        self.preferred.as_ref()
    }

    pub fn fallbacks(&self) -> &[Candidate] {
        &self.fallbacks
    }

    /// Candidates in attempt order: preferred first, then fallbacks.
    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.preferred.iter().chain(self.fallbacks.iter())
    }

    pub fn attempt_order(&self) -> Vec<&str> {
        self.candidates().map(Ranked::name).collect()
    }

    /// Run `request` on the first eligible candidate that does not run out
    /// of quota.
    ///
    /// Candidates that do not support the requested model are skipped without
    /// being invoked. Attempts are strictly sequential.
    #[instrument(skip_all, fields(agent = %request.agent.name, model = request.model.unwrap_or("")))]
    pub async fn run(
        &self,
        request: &RunRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, RunError> {
        let mut last_usage_limit: Option<UsageLimitExceeded> = None;

        for candidate in self.candidates() {
            let runner = candidate.name();
            if !candidate.supports_model(request.model) {
                debug!(runner, "skipping runner: model not supported");
                continue;
            }
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled {
                    runner: runner.to_string(),
                });
            }

            match candidate.runner.run(request, cancel).await {
                Ok(output) => {
                    info!(runner, "runner succeeded");
                    return Ok(output);
                }
                Err(err) => match (err.kind(), err) {
                    (FailureKind::Retryable, RunError::UsageLimit(limit)) => {
                        warn!(runner, error = %limit, "runner hit usage limit, trying next");
                        last_usage_limit = Some(limit);
                    }
                    (_, err) => {
                        info!(runner, error = %err, "runner failed");
                        return Err(err);
                    }
                },
            }
        }

        if let Some(limit) = last_usage_limit {
            warn!(runner = %limit.runner, "all runners exhausted due to usage limits");
            return Err(RunError::Exhausted(limit));
        }
        match request.model {
            Some(model) => Err(RunError::NoRunnerSupportsModel(model.to_string())),
            None => Err(RunError::NoRunnerAvailable),
        }
    }
}

/// A selector is itself a runner, so hosts can hold any `AgentRunner`.
#[async_trait]
impl AgentRunner for Selector {
    async fn run(
        &self,
        request: &RunRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, RunError> {
        Selector::run(self, request, cancel).await
    }
}

fn default_entries(registry: &RunnerRegistry) -> Vec<RunnerEntry> {
    DEFAULT_RUNNER_ORDER
        .iter()
        .filter(|name| registry.contains(name))
        .zip(1..)
        .map(|(name, priority)| RunnerEntry::new(*name, priority))
        .collect()
}

fn build_candidates(
    registry: &RunnerRegistry,
    entries: &[RunnerEntry],
    settings: &ExecSettings,
) -> Vec<Candidate> {
    entries
        .iter()
        .filter_map(|entry| build_candidate(registry, entry, settings))
        .collect()
}

fn build_candidate(
    registry: &RunnerRegistry,
    entry: &RunnerEntry,
    settings: &ExecSettings,
) -> Option<Candidate> {
    let runner = registry.build(entry, settings)?;
    let capability = Capability::new(
        entry.name.clone(),
        entry.priority,
        ModelSet::from_models(&entry.models),
    );
    Some(Candidate::new(capability, runner))
}
