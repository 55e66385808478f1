//! Shared types passed between the harness, the selector and each runner.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A delegateable persona loaded from the agents directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    /// Free-form instructions prepended to every task.
    pub persona: String,
    pub description: String,
    /// Model used when the caller does not pin one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// One delegated task, borrowed for the duration of a selection run.
///
/// `workdir` must already have passed directory validation; runners still
/// re-resolve it before spawning anything.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    pub agent: &'a Agent,
    pub task: &'a str,
    pub workdir: &'a Path,
    /// `None` means the caller did not pin a model.
    pub model: Option<&'a str>,
}

impl<'a> RunRequest<'a> {
    pub fn new(agent: &'a Agent, task: &'a str, workdir: &'a Path) -> Self {
        Self {
            agent,
            task,
            workdir,
            model: None,
        }
    }

    /// Pin a model. Blank values are treated as unset.
    pub fn with_model(mut self, model: Option<&'a str>) -> Self {
        self.model = model.map(str::trim).filter(|m| !m.is_empty());
        self
    }
}
