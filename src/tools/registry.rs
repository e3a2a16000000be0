//! Tool registry: advertisement and dispatch by name.

use super::{ParameterSpec, Tool, ToolArgs, ToolInvocation, ToolOutput, ToolSpec};
use crate::error::{MuseError, Result};
use crate::model::tool_definitions;
use async_openai::types::ChatCompletionTool;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Immutable set of tools available to the agent.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(MuseError::Config(format!("Tool '{}' registered twice", name)));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Builder-style registration.
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Result<Self> {
        self.register(tool)?;
        Ok(self)
    }

    /// Specs of all registered tools, in registration order.
    pub fn describe(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec()).collect()
    }

    /// Provider function-calling definitions for every registered tool.
    pub fn definitions(&self) -> Vec<ChatCompletionTool> {
        tool_definitions(&self.describe())
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate the raw JSON arguments and run the named tool.
    ///
    /// Never fails: unknown tools, bad arguments and handler errors all come
    /// back as [`ToolOutput::Error`].
    pub async fn invoke(&self, name: &str, arguments: &str) -> ToolInvocation {
        info!("Calling tool: {} with args: {}", name, arguments);

        let raw = parse_arguments(arguments);
        let arguments_value = raw.clone().unwrap_or(Value::Null);

        let Some(tool) = self.get(name) else {
            warn!("Model requested unknown tool '{}'", name);
            return ToolInvocation {
                name: name.to_string(),
                arguments: arguments_value,
                output: ToolOutput::Error(format!("Tool '{}' not found", name)),
            };
        };

        let args = match raw.and_then(|value| validate(&tool.parameters(), value)) {
            Ok(args) => args,
            Err(reason) => {
                warn!("Rejected arguments for '{}': {}", name, reason);
                return ToolInvocation {
                    name: name.to_string(),
                    arguments: arguments_value,
                    output: ToolOutput::Error(reason),
                };
            }
        };

        let output = match tool.invoke(&args).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Tool '{}' failed: {}", name, e);
                ToolOutput::Error(format!("Tool error: {}", e))
            }
        };

        ToolInvocation {
            name: name.to_string(),
            arguments: args.into_value(),
            output,
        }
    }
}

fn parse_arguments(arguments: &str) -> std::result::Result<Value, String> {
    if arguments.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(arguments).map_err(|e| format!("Invalid tool arguments: {}", e))
}

/// Check arguments against the parameter list and fill in defaults.
fn validate(params: &[ParameterSpec], raw: Value) -> std::result::Result<ToolArgs, String> {
    let mut values = match raw {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => return Err(format!("Tool arguments must be a JSON object, got {}", other)),
    };

    for param in params {
        match values.get(&param.name) {
            Some(value) if !value.is_null() => {
                if !param.param_type.matches(value) {
                    return Err(format!(
                        "Argument '{}' must be of type {}, got {}",
                        param.name,
                        param.param_type,
                        json_type_name(value)
                    ));
                }
            }
            _ => {
                if let Some(default) = &param.default {
                    values.insert(param.name.clone(), default.clone());
                } else if param.required {
                    return Err(format!("Missing required argument '{}'", param.name));
                }
            }
        }
    }

    Ok(ToolArgs::new(values))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
