//! Conversation state for Muse.
//!
//! A conversation is an ordered, append-only list of messages plus the loop
//! checkpoint of the last turn. Stores are trait objects so the HTTP layer,
//! the CLI and tests can share one implementation or swap in another.

mod memory;

pub use memory::MemoryConversationStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool" => Ok(Role::Tool),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned call id, echoed back on the result message.
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Image sent alongside the text, referenced by path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    /// Tool calls requested by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Id of the call a tool message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            image: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// User message carrying an image for vision-capable models.
    pub fn user_with_image(content: impl Into<String>, image: impl Into<PathBuf>) -> Self {
        let mut message = Self::new(Role::User, content);
        message.image = Some(image.into());
        message
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant message that requests exactly one tool call.
    pub fn tool_call(content: impl Into<String>, call: ToolCallRequest) -> Self {
        let mut message = Self::new(Role::Assistant, content);
        message.tool_calls.push(call);
        message
    }

    /// Result of a tool call.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut message = Self::new(Role::Tool, content);
        message.tool_call_id = Some(call_id.into());
        message
    }

    /// Whether this message requests a tool.
    pub fn is_tool_call(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// State of the agent loop within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    AwaitingModel,
    ModelResponded,
    ToolRequested,
    ToolDispatched,
    Final,
}

/// Loop state saved after every transition, so a conversation can be
/// inspected or resumed from a later request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub state: LoopState,
    /// Model calls made so far in the current turn.
    pub iteration: usize,
    /// Most recently dispatched tool.
    pub last_tool: Option<String>,
    /// Set when the turn ended in failure.
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(state: LoopState, iteration: usize) -> Self {
        Self {
            state,
            iteration,
            last_tool: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether the last turn finished normally.
    pub fn is_complete(&self) -> bool {
        self.state == LoopState::Final && self.error.is_none()
    }
}

/// Exclusive right to run a turn on one conversation.
pub type TurnGuard = tokio::sync::OwnedMutexGuard<()>;

/// Trait for conversation store implementations.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Full history of a conversation. Unknown ids yield an empty history
    /// and are created on first reference.
    async fn get(&self, id: &str) -> Result<Vec<Message>>;

    /// Append a message to a conversation.
    async fn append(&self, id: &str, message: Message) -> Result<()>;

    /// Last saved loop checkpoint, if any turn has run.
    async fn checkpoint(&self, id: &str) -> Result<Option<Checkpoint>>;

    /// Replace the loop checkpoint.
    async fn set_checkpoint(&self, id: &str, checkpoint: Checkpoint) -> Result<()>;

    /// Wait for exclusive access to a conversation. Turns on the same id run
    /// one at a time in arrival order while the guard is held.
    async fn lock(&self, id: &str) -> TurnGuard;
}
