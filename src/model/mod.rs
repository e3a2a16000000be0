//! Language-model abstraction.
//!
//! Everything that talks to the provider goes through [`ChatModel`], so the
//! agent loop and the services can run against scripted fakes in tests.

mod openai;

pub use openai::{image_data_url, OpenAIChatModel};
pub(crate) use openai::tool_definitions;

use crate::conversation::{Message, ToolCallRequest};
use crate::error::Result;
use crate::tools::ToolSpec;
use async_trait::async_trait;
use futures::stream::BoxStream;
use regex::Regex;
use std::sync::LazyLock;

/// Incremental text fragments of a streamed response.
pub type DeltaStream = BoxStream<'static, Result<String>>;

/// A complete (non-streamed) model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    /// Text produced by the model, if any.
    pub content: Option<String>,
    /// Tools the model wants invoked before it answers.
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelReply {
    /// A final text answer.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// A reply that requests a single tool.
    pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> Self {
        Self {
            content: None,
            tool_calls: vec![ToolCallRequest {
                id: id.to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
            }],
        }
    }

    pub fn requests_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Trait for chat-completion providers.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion. `tools` are advertised to the model; an empty
    /// slice disables tool calling.
    async fn complete(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<ModelReply>;

    /// Stream a completion as text deltas.
    async fn stream(&self, messages: &[Message]) -> Result<DeltaStream>;

    /// Name of the underlying model.
    fn model_name(&self) -> &str;
}

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("valid fence regex")
});

/// Strip a markdown code fence from a model answer, returning the inner text.
/// Answers without a fence are returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    match FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("Here you go:\n```\n{}\n```\nEnjoy"), "{}");
        assert_eq!(strip_code_fences("  [3]  "), "[3]");
    }

    #[test]
    fn test_model_reply_tool_call() {
        let reply = ModelReply::tool_call("c1", "read_menu", serde_json::json!({}));
        assert!(reply.requests_tools());
        assert_eq!(reply.tool_calls[0].arguments, "{}");
        assert!(!ModelReply::text("hi").requests_tools());
    }
}

/// Scripted model for tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::MuseError;
    use futures::StreamExt;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers `complete` calls from a script and streams fixed deltas.
    pub struct FakeModel {
        replies: Mutex<VecDeque<std::result::Result<String, String>>>,
        deltas: Vec<String>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl FakeModel {
        /// `Ok(text)` entries are answered, `Err(reason)` entries fail.
        pub fn script(replies: Vec<std::result::Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                deltas: Vec::new(),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn streaming(deltas: &[&str]) -> Self {
            Self {
                deltas: deltas.iter().map(|d| d.to_string()).collect(),
                ..Self::script(Vec::new())
            }
        }

        /// Messages of every call so far.
        pub fn seen(&self) -> Vec<Vec<Message>> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for FakeModel {
        async fn complete(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<ModelReply> {
            self.seen.lock().unwrap().push(messages.to_vec());
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(ModelReply::text(text)),
                Some(Err(reason)) => Err(MuseError::Model(reason)),
                None => Err(MuseError::Model("script exhausted".to_string())),
            }
        }

        async fn stream(&self, messages: &[Message]) -> Result<DeltaStream> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(futures::stream::iter(self.deltas.clone().into_iter().map(Ok)).boxed())
        }

        fn model_name(&self) -> &str {
            "fake"
        }
    }
}
