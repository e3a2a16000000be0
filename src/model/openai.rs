//! OpenAI chat-completions implementation.

use super::{ChatModel, DeltaStream, ModelReply};
use crate::conversation::{Message, Role, ToolCallRequest};
use crate::error::{MuseError, Result};
use crate::tools::ToolSpec;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
    ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall,
    FunctionObject, ImageUrlArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use base64::Engine;
use futures::StreamExt;
use std::path::Path;
use tracing::{debug, instrument};

/// Chat model backed by the OpenAI chat-completions API.
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
}

impl OpenAIChatModel {
    pub fn new(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Convert conversation messages to the provider's request format.
    async fn request_messages(&self, messages: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut converted = Vec::with_capacity(messages.len());
        for message in messages {
            converted.push(to_request_message(message).await?);
        }
        Ok(converted)
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip(self, messages, tools), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<ModelReply> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(self.request_messages(messages).await?);
        if !tools.is_empty() {
            builder.tools(tool_definitions(tools));
        }
        if let Some(temperature) = self.temperature {
            builder.temperature(temperature);
        }
        let request = builder.build().map_err(|e| MuseError::Model(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| MuseError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| MuseError::Model("No response from model".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCallRequest {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect::<Vec<_>>();

        debug!("Model replied with {} tool call(s)", tool_calls.len());

        Ok(ModelReply {
            content: choice.message.content,
            tool_calls,
        })
    }

    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn stream(&self, messages: &[Message]) -> Result<DeltaStream> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(self.request_messages(messages).await?)
            .stream(true);
        if let Some(temperature) = self.temperature {
            builder.temperature(temperature);
        }
        let request = builder.build().map_err(|e| MuseError::Model(e.to_string()))?;

        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| MuseError::OpenAI(format!("Streaming API error: {}", e)))?;

        let deltas = stream.filter_map(|chunk| async move {
            match chunk {
                Ok(response) => response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                    .map(Ok),
                Err(e) => Some(Err(MuseError::OpenAI(format!("Stream error: {}", e)))),
            }
        });

        Ok(deltas.boxed())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

async fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let build_err = |e: async_openai::error::OpenAIError| MuseError::Model(e.to_string());

    let converted = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(build_err)?
            .into(),

        Role::User => match &message.image {
            None => ChatCompletionRequestUserMessageArgs::default()
                .content(message.content.clone())
                .build()
                .map_err(build_err)?
                .into(),
            Some(path) => {
                let text = ChatCompletionRequestMessageContentPartTextArgs::default()
                    .text(message.content.clone())
                    .build()
                    .map_err(build_err)?;
                let image = ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(
                        ImageUrlArgs::default()
                            .url(image_data_url(path).await?)
                            .build()
                            .map_err(build_err)?,
                    )
                    .build()
                    .map_err(build_err)?;

                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(vec![
                        ChatCompletionRequestUserMessageContentPart::Text(text),
                        ChatCompletionRequestUserMessageContentPart::ImageUrl(image),
                    ]))
                    .build()
                    .map_err(build_err)?
                    .into()
            }
        },

        Role::Assistant => {
            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            if !message.content.is_empty() || message.tool_calls.is_empty() {
                builder.content(message.content.clone());
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
            builder.build().map_err(build_err)?.into()
        }

        Role::Tool => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(message.tool_call_id.clone().unwrap_or_default())
            .content(message.content.clone())
            .build()
            .map_err(build_err)?
            .into(),
    };

    Ok(converted)
}

/// Provider function definitions for the given tool specs.
pub(crate) fn tool_definitions(tools: &[ToolSpec]) -> Vec<ChatCompletionTool> {
    tools
        .iter()
        .map(|spec| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: spec.name.clone(),
                description: Some(spec.description.clone()),
                parameters: Some(spec.json_schema()),
                strict: None,
            },
        })
        .collect()
}

/// Read an image file and encode it as a `data:` URL.
pub async fn image_data_url(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", mime_type(path), encoded))
}

/// Guess an image MIME type from the file extension, defaulting to JPEG.
fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParamType, ParameterSpec};

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type(Path::new("dish.PNG")), "image/png");
        assert_eq!(mime_type(Path::new("dish.jpeg")), "image/jpeg");
        assert_eq!(mime_type(Path::new("dish")), "image/jpeg");
    }

    #[tokio::test]
    async fn test_image_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pho.png");
        std::fs::write(&path, b"abc").unwrap();

        let url = image_data_url(&path).await.unwrap();
        assert_eq!(url, "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_tool_definitions() {
        let spec = ToolSpec {
            name: "delete_menu_item".to_string(),
            description: "Delete a dish".to_string(),
            parameters: vec![ParameterSpec::required("name", ParamType::String, "Dish name")],
        };
        let defs = tool_definitions(&[spec]);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].function.name, "delete_menu_item");
        let params = defs[0].function.parameters.as_ref().unwrap();
        assert_eq!(params["required"][0], "name");
    }

    #[tokio::test]
    async fn test_tool_message_conversion() {
        let converted = to_request_message(&Message::tool_result("call_9", "ok"))
            .await
            .unwrap();
        match converted {
            ChatCompletionRequestMessage::Tool(tool) => assert_eq!(tool.tool_call_id, "call_9"),
            other => panic!("Expected tool message, got {:?}", other),
        }
    }
}
