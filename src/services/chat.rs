//! Streamed chat with a fixed persona (poet, recruiter).

use crate::conversation::{Message, Role};
use crate::error::{MuseError, Result};
use crate::model::ChatModel;
use crate::stream::StreamingEmitter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One client-supplied message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Streams answers under a fixed system prompt.
#[derive(Clone)]
pub struct StreamingChat {
    model: Arc<dyn ChatModel>,
    system_prompt: String,
}

impl StreamingChat {
    pub fn new(model: Arc<dyn ChatModel>, system_prompt: impl Into<String>) -> Self {
        Self {
            model,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Prepend the system prompt to `input` and stream the answer.
    pub async fn stream(&self, input: &[ChatTurn]) -> Result<StreamingEmitter> {
        let messages = self.messages(input)?;
        debug!("Streaming chat with {} message(s)", messages.len());
        let deltas = self.model.stream(&messages).await?;
        Ok(StreamingEmitter::new(deltas))
    }

    fn messages(&self, input: &[ChatTurn]) -> Result<Vec<Message>> {
        if input.is_empty() {
            return Err(MuseError::Validation("input must not be empty".to_string()));
        }

        let mut messages = Vec::with_capacity(input.len() + 1);
        messages.push(Message::system(self.system_prompt.clone()));
        for turn in input {
            let message = match turn.role {
                Role::System => Message::system(turn.content.clone()),
                Role::User => Message::user(turn.content.clone()),
                Role::Assistant => Message::assistant(turn.content.clone()),
                Role::Tool => {
                    return Err(MuseError::Validation(
                        "tool messages are not accepted in chat input".to_string(),
                    ))
                }
            };
            messages.push(message);
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::FakeModel;

    #[tokio::test]
    async fn test_stream_prepends_system_prompt() {
        let model = Arc::new(FakeModel::streaming(&["Trăng ", "thu"]));
        let chat = StreamingChat::new(model.clone(), "You are a poet");

        let text = chat
            .stream(&[ChatTurn::user("Write about the moon")])
            .await
            .unwrap()
            .collect_text()
            .await
            .unwrap();
        assert_eq!(text, "Trăng thu");

        let seen = model.seen();
        assert_eq!(seen[0][0].role, Role::System);
        assert_eq!(seen[0][0].content, "You are a poet");
        assert_eq!(seen[0][1].content, "Write about the moon");
    }

    #[tokio::test]
    async fn test_rejects_empty_and_tool_input() {
        let chat = StreamingChat::new(Arc::new(FakeModel::streaming(&[])), "poet");

        assert!(matches!(chat.stream(&[]).await, Err(MuseError::Validation(_))));
        let tool = ChatTurn {
            role: Role::Tool,
            content: "x".to_string(),
        };
        assert!(matches!(
            chat.stream(&[tool]).await,
            Err(MuseError::Validation(_))
        ));
    }

    #[test]
    fn test_chat_turn_deserializes() {
        let turn: ChatTurn =
            serde_json::from_str(r#"{"role": "assistant", "content": "hi"}"#).unwrap();
        assert_eq!(turn.role, Role::Assistant);
    }
}
