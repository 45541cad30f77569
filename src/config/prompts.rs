//! Prompt templates for Coursemate.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub assistant: AssistantPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for the course assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantPrompts {
    /// System instruction sent first in every conversation.
    pub system: String,
    /// Wraps the user's question; `{{query}}` is replaced with the question.
    pub query: String,
}

impl Default for AssistantPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI assistant specialized in course materials and educational content, with tools for looking up course information.

Available tools:
1. search_course_content: questions about specific course content, lessons, or detailed material
2. get_course_outline: questions about course structure, lesson lists, or course overviews

Tool usage:
- Outline or structure questions: use the outline tool to get the complete course structure with all lessons
- Specific content questions: use the content search tool
- At most one tool call per query
- Synthesize tool results into accurate, fact-based answers
- If a search yields no results, say so clearly without offering alternatives

Response protocol:
- General knowledge questions: answer from your own knowledge without tools
- Outline questions: give the course title (linked if available), the instructor, and the complete numbered lesson list
- Content questions: answer from the search results
- No meta-commentary: do not describe your reasoning or the tools, and do not say "based on the search results"

Every answer must be brief, educational, clear, and supported by examples when they help understanding.
Provide only the direct answer to what was asked."#
                .to_string(),

            query: "Answer this question about course materials: {{query}}".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let assistant_path = custom_path.join("assistant.toml");
            if assistant_path.exists() {
                let content = std::fs::read_to_string(&assistant_path)?;
                prompts.assistant = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is a single pass: inserted values are never rescanned, and
    /// unknown placeholders are left as written.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let placeholder = Regex::new(r"\{\{(\w+)\}\}").expect("Invalid regex");
        placeholder
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// The system instruction with custom variables applied.
    pub fn system_prompt(&self) -> String {
        Self::render(&self.assistant.system, &self.variables)
    }

    /// Wrap a user question in the query template.
    pub fn query_prompt(&self, query: &str) -> String {
        let mut vars = std::collections::HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        self.render_with_custom(&self.assistant.query, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.assistant.system.contains("get_course_outline"));
        assert!(prompts.assistant.system.contains("search_course_content"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} lessons.";
        let mut vars = std::collections::HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 lessons.");
    }

    #[test]
    fn test_query_prompt() {
        let prompts = Prompts::default();
        assert_eq!(
            prompts.query_prompt("What is MCP?"),
            "Answer this question about course materials: What is MCP?"
        );
    }

    #[test]
    fn test_query_text_is_not_rendered() {
        // Each fresh map gets its own iteration order.
        for _ in 0..50 {
            let mut vars = std::collections::HashMap::new();
            vars.insert("subject".to_string(), "Rust".to_string());
            let prompts = Prompts::load(None, Some(&vars)).unwrap();

            assert_eq!(
                prompts.query_prompt("What does {{subject}} mean in the template?"),
                "Answer this question about course materials: What does {{subject}} mean in the template?"
            );
        }
    }

    #[test]
    fn test_render_keeps_unknown_placeholders() {
        let vars = std::collections::HashMap::new();
        assert_eq!(Prompts::render("Hi {{missing}}", &vars), "Hi {{missing}}");
    }

    #[test]
    fn test_custom_prompt_file_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("assistant.toml"),
            "system = \"You teach {{subject}}.\"\n",
        )
        .unwrap();

        let mut vars = std::collections::HashMap::new();
        vars.insert("subject".to_string(), "Rust".to_string());

        let prompts = Prompts::load(dir.path().to_str(), Some(&vars)).unwrap();
        assert_eq!(prompts.system_prompt(), "You teach Rust.");
        // Fields missing from the file keep their defaults.
        assert!(prompts.assistant.query.contains("{{query}}"));
    }
}
