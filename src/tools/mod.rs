//! Retrieval tools the model can invoke while answering.
//!
//! Each [`Tool`] describes itself with a [`ToolDefinition`] and turns a JSON
//! argument object into a text result. Failures are rendered as text too, since the
//! result goes straight back into the conversation.

mod outline;
mod registry;
mod search;

pub use outline::{format_course_outline, OutlineTool, OUTLINE_TOOL_NAME};
pub use registry::ToolRegistry;
pub use search::{ContentSearchTool, SEARCH_TOOL_NAME};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
}

/// A single named parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    pub description: String,
    pub required: bool,
}

/// Ordered parameter list for a function tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub parameters: Vec<Parameter>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required parameter.
    pub fn required(self, name: &str, kind: ParameterType, description: &str) -> Self {
        self.with(name, kind, description, true)
    }

    /// Add an optional parameter.
    pub fn optional(self, name: &str, kind: ParameterType, description: &str) -> Self {
        self.with(name, kind, description, false)
    }

    fn with(mut self, name: &str, kind: ParameterType, description: &str, required: bool) -> Self {
        self.parameters.push(Parameter {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required,
        });
        self
    }

    /// Render as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for parameter in &self.parameters {
            properties.insert(
                parameter.name.clone(),
                json!({
                    "type": parameter.kind,
                    "description": parameter.description,
                }),
            );
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A function the model can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

/// Machine-readable description of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "function", rename_all = "snake_case")]
pub enum ToolDefinition {
    Function(FunctionDefinition),
}

impl ToolDefinition {
    /// Build a function tool definition.
    pub fn function(name: &str, description: &str, parameters: ParameterSchema) -> Self {
        ToolDefinition::Function(FunctionDefinition {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        })
    }

    /// The name the model uses to invoke this tool.
    pub fn name(&self) -> &str {
        match self {
            ToolDefinition::Function(function) => &function.name,
        }
    }
}

/// A citation for one retrieved chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub link: Option<String>,
}

impl Source {
    /// The bracketed label without a link, e.g. `[Course - Lesson 2]`.
    pub fn label(&self) -> String {
        match self.lesson_number {
            Some(n) => format!("[{} - Lesson {}]", self.course_title, n),
            None => format!("[{}]", self.course_title),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.link {
            Some(link) => write!(f, "{}({})", self.label(), link),
            None => write!(f, "{}", self.label()),
        }
    }
}

/// A capability the model can request during a conversation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Describe the tool for the model.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool. Never fails: problems are reported in the returned text.
    async fn execute(&self, parameters: Value) -> String;

    /// Sources recorded by the most recent execution.
    fn last_sources(&self) -> Vec<Source> {
        Vec::new()
    }

    /// Forget recorded sources.
    fn reset_sources(&self) {}
}

/// Deserialize tool arguments, mapping failures to a model-readable message.
pub(crate) fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    parameters: Value,
) -> std::result::Result<T, String> {
    serde_json::from_value(parameters)
        .map_err(|e| format!("Invalid arguments for tool '{}': {}", tool_name, e))
}
