//! Agent persona discovery from a directory of YAML files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::debug;

use crate::core::types::Agent;

/// Source of delegateable agents.
pub trait AgentRepository: Send + Sync {
    fn list_agents(&self) -> Result<Vec<Agent>>;

    /// Look up a single agent by exact name.
    fn find_agent(&self, name: &str) -> Result<Option<Agent>> {
        Ok(self
            .list_agents()?
            .into_iter()
            .find(|agent| agent.name == name))
    }
}

/// Loads agents from `<dir>/*.yaml`, one agent per file, named by file stem.
///
/// The directory is re-read on every call so persona edits apply without a
/// restart.
#[derive(Debug, Clone)]
pub struct YamlAgentRepository {
    base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct AgentFile {
    #[serde(default)]
    persona: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

impl YamlAgentRepository {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl AgentRepository for YamlAgentRepository {
    fn list_agents(&self) -> Result<Vec<Agent>> {
        let entries = fs::read_dir(&self.base_dir)
            .with_context(|| format!("read agents dir {}", self.base_dir.display()))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.context("read agents dir entry")?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "yaml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut agents = Vec::with_capacity(paths.len());
        for path in paths {
            let agent = load_agent(&path).with_context(|| format!("load {}", path.display()))?;
            agents.push(agent);
        }
        debug!(count = agents.len(), dir = %self.base_dir.display(), "loaded agents");
        Ok(agents)
    }
}

fn load_agent(path: &Path) -> Result<Agent> {
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("agent file name is not valid UTF-8"))?;
    let contents = fs::read_to_string(path).context("read agent file")?;
    let raw: AgentFile = serde_yaml::from_str(&contents).context("parse agent yaml")?;

    let agent = Agent {
        name,
        persona: raw.persona.unwrap_or_default().trim().to_string(),
        description: raw.description.unwrap_or_default().trim().to_string(),
        model: raw
            .model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()),
    };
    validate_agent(&agent)?;
    Ok(agent)
}

/// Ensure required fields are present.
pub fn validate_agent(agent: &Agent) -> Result<()> {
    if agent.name.is_empty() {
        return Err(anyhow!("name is required"));
    }
    if agent.persona.is_empty() {
        return Err(anyhow!("persona is required for agent {:?}", agent.name));
    }
    if agent.description.is_empty() {
        return Err(anyhow!("description is required for agent {:?}", agent.name));
    }
    Ok(())
}
