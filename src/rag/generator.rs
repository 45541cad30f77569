//! Tool-mediated response generation.

use crate::config::Settings;
use crate::error::Result;
use crate::llm::{ChatMessage, CompletionClient, CompletionRequest, ToolCallRequest, ToolChoice};
use crate::tools::{ToolDefinition, ToolRegistry};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Drives at most two completion round-trips per query: one that may request tools,
/// and one that answers with the tool output in view.
pub struct ResponseGenerator {
    client: Arc<dyn CompletionClient>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl ResponseGenerator {
    /// Create a generator with temperature 0 and an 800 token cap.
    pub fn new(client: Arc<dyn CompletionClient>, model: &str, system_prompt: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature: 0.0,
            max_tokens: 800,
            system_prompt: system_prompt.to_string(),
        }
    }

    /// Create a generator using the model parameters from settings.
    pub fn from_settings(client: Arc<dyn CompletionClient>, settings: &Settings, system_prompt: &str) -> Self {
        Self::new(client, &settings.openai.model, system_prompt)
            .with_temperature(settings.openai.temperature)
            .with_max_tokens(settings.openai.max_tokens)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Use a different model for subsequent requests.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer `query`, letting the model call tools from `registry` once.
    ///
    /// Tools are offered only when `tools` is non-empty. Tool calls are executed only
    /// when a registry is supplied; otherwise the first reply is returned as is.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn generate_response(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&[ToolDefinition]>,
        registry: Option<&ToolRegistry>,
    ) -> Result<String> {
        let mut messages = vec![ChatMessage::system(self.system_prompt.clone())];
        if let Some(history) = history.filter(|h| !h.trim().is_empty()) {
            messages.push(ChatMessage::system(format!("Previous conversation:\n{}", history)));
        }
        messages.push(ChatMessage::user(query));

        let tools: Vec<ToolDefinition> = tools.map(<[ToolDefinition]>::to_vec).unwrap_or_default();
        let tool_choice = (!tools.is_empty()).then_some(ToolChoice::Auto);

        let first = self
            .client
            .complete(self.request(messages.clone(), tools, tool_choice))
            .await?;

        let registry = match registry {
            Some(registry) if first.wants_tools() => registry,
            _ => return Ok(first.content.unwrap_or_default()),
        };

        info!("Model requested {} tool call(s)", first.tool_calls.len());

        messages.push(ChatMessage::assistant_tool_calls(
            first.content.clone(),
            first.tool_calls.clone(),
        ));

        for call in &first.tool_calls {
            let output = run_tool_call(registry, call).await;
            messages.push(ChatMessage::tool_result(call.id.clone(), output));
        }

        let second = self
            .client
            .complete(self.request(messages, Vec::new(), None))
            .await?;

        if second.wants_tools() {
            warn!("Model requested tools after the tool round; ignoring");
        }

        Ok(second.content.unwrap_or_default())
    }

    fn request(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
        tool_choice: Option<ToolChoice>,
    ) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages,
            tools,
            tool_choice,
        }
    }
}

async fn run_tool_call(registry: &ToolRegistry, call: &ToolCallRequest) -> String {
    let raw = call.arguments.trim();
    let arguments = if raw.is_empty() {
        Ok(Value::Object(Default::default()))
    } else {
        serde_json::from_str::<Value>(raw)
    };

    match arguments {
        Ok(arguments) => {
            debug!(tool = %call.name, "Executing tool call {}", call.id);
            registry.execute(&call.name, arguments).await
        }
        Err(e) => {
            warn!(tool = %call.name, "Tool call arguments are not valid JSON: {}", e);
            format!("Invalid arguments for tool '{}': {}", call.name, e)
        }
    }
}
