//! Tool catalogue and argument validation.

use anyhow::{Result, anyhow};
use jsonschema::{Validator, validator_for};
use serde::Serialize;
use serde_json::{Value, json};

pub const LIST_AGENTS: &str = "list_agents";
pub const DELEGATE_TASK: &str = "delegate_task";

/// A tool as advertised by `tools/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

fn definitions() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: LIST_AGENTS,
            description: "List all available agents with name and description.",
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDef {
            name: DELEGATE_TASK,
            description: "Delegate a task to a specific agent with a working directory.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "agent": {"type": "string", "description": "Agent name to delegate to"},
                    "task": {"type": "string", "description": "Task to be executed"},
                    "working_directory": {
                        "type": "string",
                        "description": "Absolute workspace path for execution"
                    },
                    "model": {
                        "type": "string",
                        "description": "Optional model override; defaults to the agent's model"
                    }
                },
                "required": ["agent", "task", "working_directory"]
            }),
        },
    ]
}

struct Tool {
    def: ToolDef,
    validator: Validator,
}

/// Advertised tools with their compiled input schemas.
pub struct ToolSet {
    tools: Vec<Tool>,
}

impl ToolSet {
    pub fn new() -> Result<Self> {
        let tools = definitions()
            .into_iter()
            .map(|def| {
                let validator = validator_for(&def.input_schema)
                    .map_err(|err| anyhow!("invalid schema for {}: {}", def.name, err))?;
                Ok(Tool { def, validator })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { tools })
    }

    pub fn definitions(&self) -> Vec<&ToolDef> {
        self.tools.iter().map(|tool| &tool.def).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|tool| tool.def.name == name)
    }

    /// Check `arguments` against the named tool's input schema.
    ///
    /// Returns every violation joined into one message.
    pub fn validate(&self, name: &str, arguments: &Value) -> Result<()> {
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.def.name == name)
            .ok_or_else(|| anyhow!("tool not found"))?;
        if tool.validator.is_valid(arguments) {
            return Ok(());
        }
        let messages = tool
            .validator
            .iter_errors(arguments)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        Err(anyhow!(
            "invalid {} arguments: {}",
            name,
            messages.join("; ")
        ))
    }
}
