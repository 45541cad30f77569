//! Name-addressed collection of tools.

use super::{Source, Tool, ToolDefinition};
use crate::error::{CourseError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tools keyed by their definition name, in registration order.
///
/// Registering a name that already exists replaces the earlier tool in place.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<(String, Arc<dyn Tool>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool under the name from its definition.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.definition().name().trim().to_string();
        if name.is_empty() {
            return Err(CourseError::Config("Tool definition has no name".to_string()));
        }

        match self.tools.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => {
                debug!("Replacing tool '{}'", name);
                slot.1 = tool;
            }
            None => {
                debug!("Registered tool '{}'", name);
                self.tools.push((name, tool));
            }
        }
        Ok(())
    }

    /// Definitions of every registered tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|(_, tool)| tool.definition()).collect()
    }

    /// Run the named tool. Unknown names yield a message, not an error.
    pub async fn execute(&self, name: &str, arguments: Value) -> String {
        match self.get(name) {
            Some(tool) => tool.execute(arguments).await,
            None => {
                warn!("Model requested unknown tool '{}'", name);
                format!("Tool '{}' not found", name)
            }
        }
    }

    /// Sources from the first tool, in registration order, that has any.
    pub fn collect_sources(&self) -> Vec<Source> {
        self.tools
            .iter()
            .map(|(_, tool)| tool.last_sources())
            .find(|sources| !sources.is_empty())
            .unwrap_or_default()
    }

    /// Clear recorded sources on every tool.
    pub fn reset_sources(&self) {
        for (_, tool) in &self.tools {
            tool.reset_sources();
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, tool)| tool)
    }
}
