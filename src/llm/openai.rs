//! OpenAI chat completions backend.

use super::{ChatMessage, Completion, CompletionClient, CompletionRequest, FinishReason, Role, ToolCallRequest, ToolChoice};
use crate::config::Settings;
use crate::error::{CourseError, Result};
use crate::openai::create_client;
use crate::tools::ToolDefinition;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolChoiceOption, ChatCompletionToolType, CreateChatCompletionRequestArgs,
    FinishReason as OpenAIFinishReason, FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Completion client backed by the OpenAI chat completions API.
pub struct OpenAICompletionClient {
    client: Client<OpenAIConfig>,
}

impl OpenAICompletionClient {
    /// Create a client from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: create_client(settings)?,
        })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CompletionClient for OpenAICompletionClient {
    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len(), tools = request.tools.len()))]
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let request = build_request(&request)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| CourseError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CourseError::OpenAI("No choices in completion response".to_string()))?;

        let finish_reason = match choice.finish_reason {
            Some(OpenAIFinishReason::Stop) => FinishReason::Stop,
            Some(OpenAIFinishReason::Length) => FinishReason::Length,
            Some(OpenAIFinishReason::ToolCalls) => FinishReason::ToolCalls,
            Some(OpenAIFinishReason::ContentFilter) => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        };

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter(|call| matches!(call.r#type, ChatCompletionToolType::Function))
            .map(|call| ToolCallRequest {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect::<Vec<_>>();

        debug!(?finish_reason, tool_calls = tool_calls.len(), "Completion received");

        Ok(Completion {
            finish_reason,
            content: choice.message.content,
            tool_calls,
        })
    }
}

#[allow(deprecated)]
fn build_request(
    request: &CompletionRequest,
) -> Result<async_openai::types::CreateChatCompletionRequest> {
    let messages = request
        .messages
        .iter()
        .map(to_openai_message)
        .collect::<Result<Vec<_>>>()?;

    let mut builder = CreateChatCompletionRequestArgs::default();
    builder
        .model(&request.model)
        .messages(messages)
        .temperature(request.temperature)
        .max_tokens(request.max_tokens);

    if request.tools_enabled() {
        builder.tools(request.tools.iter().map(to_openai_tool).collect::<Vec<_>>());
        if let Some(choice) = request.tool_choice {
            builder.tool_choice(match choice {
                ToolChoice::Auto => ChatCompletionToolChoiceOption::Auto,
                ToolChoice::None => ChatCompletionToolChoiceOption::None,
            });
        }
    }

    builder.build().map_err(openai_error)
}

fn to_openai_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let content = message.content.clone().unwrap_or_default();

    let converted = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map_err(openai_error)?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(openai_error)?
            .into(),
        Role::Assistant => {
            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            if let Some(text) = &message.content {
                builder.content(text.clone());
            }
            if !message.tool_calls.is_empty() {
                builder.tool_calls(
                    message
                        .tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                );
            }
            builder.build().map_err(openai_error)?.into()
        }
        Role::Tool => {
            let tool_call_id = message.tool_call_id.clone().ok_or_else(|| {
                CourseError::InvalidInput("Tool message without a tool call id".to_string())
            })?;
            ChatCompletionRequestToolMessageArgs::default()
                .tool_call_id(tool_call_id)
                .content(content)
                .build()
                .map_err(openai_error)?
                .into()
        }
    };

    Ok(converted)
}

fn to_openai_tool(definition: &ToolDefinition) -> ChatCompletionTool {
    match definition {
        ToolDefinition::Function(function) => ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: function.name.clone(),
                description: Some(function.description.clone()),
                parameters: Some(function.parameters.to_json_schema()),
                strict: None,
            },
        },
    }
}

fn openai_error(e: async_openai::error::OpenAIError) -> CourseError {
    CourseError::OpenAI(e.to_string())
}
