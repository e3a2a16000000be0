//! Agent runner with tool calling loop.

use crate::conversation::{Checkpoint, ConversationStore, LoopState, Message, Role};
use crate::error::{MuseError, Result};
use crate::media::Artifact;
use crate::model::ChatModel;
use crate::tools::ToolRegistry;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default system prompt for the agent.
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful restaurant assistant. Use the available tools to manage the menu and create promotional media.";

/// Result content recorded for a tool call that never got an answer.
const INTERRUPTED_RESULT: &str = "Error: the previous turn was interrupted before this tool returned";

/// Agent that answers a conversation turn, calling tools as the model asks.
pub struct AgentLoop {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    store: Arc<dyn ConversationStore>,
    system_prompt: String,
    max_iterations: usize,
}

impl AgentLoop {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            model,
            tools,
            store,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: 15,
        }
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set the maximum number of model calls per turn.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Run one turn of a conversation.
    ///
    /// Turns on the same conversation are serialized; the history gains the
    /// user message, every tool call with its result, and the final answer.
    #[instrument(skip(self, input, attachment), fields(conversation = %conversation_id))]
    pub async fn run(
        &self,
        conversation_id: &str,
        input: &str,
        attachment: Option<&Path>,
    ) -> Result<AgentTurn> {
        let conversation_id = conversation_id.trim();
        if conversation_id.is_empty() {
            return Err(MuseError::Validation("thread_id must not be empty".to_string()));
        }
        if input.trim().is_empty() {
            return Err(MuseError::Validation("prompt must not be empty".to_string()));
        }

        let _turn = self.store.lock(conversation_id).await;
        self.recover(conversation_id).await?;

        let content = match attachment {
            Some(path) => format!("{}\n\n(Image attached at: {})", input, path.display()),
            None => input.to_string(),
        };
        self.store
            .append(conversation_id, Message::user(content))
            .await?;
        self.transition(conversation_id, LoopState::AwaitingModel, 0, None)
            .await?;

        let specs = self.tools.describe();
        let mut turn = AgentTurn::new(conversation_id);

        loop {
            if turn.iterations >= self.max_iterations {
                let err = MuseError::LoopExceeded {
                    max: self.max_iterations,
                };
                warn!("{}", err);
                self.fail(conversation_id, turn.iterations, &err).await?;
                return Err(err);
            }
            turn.iterations += 1;
            debug!("Agent iteration {}", turn.iterations);

            let mut messages = vec![Message::system(self.system_prompt.clone())];
            messages.extend(self.store.get(conversation_id).await?);

            let reply = match self.model.complete(&messages, &specs).await {
                Ok(reply) => reply,
                Err(e) => {
                    self.fail(conversation_id, turn.iterations, &e).await?;
                    return Err(e);
                }
            };
            self.transition(conversation_id, LoopState::ModelResponded, turn.iterations, None)
                .await?;

            if !reply.requests_tools() {
                turn.content = reply.content.unwrap_or_default();
                self.store
                    .append(conversation_id, Message::assistant(turn.content.clone()))
                    .await?;
                self.transition(conversation_id, LoopState::Final, turn.iterations, None)
                    .await?;
                info!(
                    "Turn finished after {} model call(s), {} tool call(s)",
                    turn.iterations,
                    turn.tool_calls.len()
                );
                return Ok(turn);
            }

            self.transition(conversation_id, LoopState::ToolRequested, turn.iterations, None)
                .await?;

            // Text accompanying the tool request goes on the first call only.
            let mut preamble = reply.content.unwrap_or_default();
            for call in reply.tool_calls {
                self.store
                    .append(
                        conversation_id,
                        Message::tool_call(std::mem::take(&mut preamble), call.clone()),
                    )
                    .await?;

                let invocation = self.tools.invoke(&call.name, &call.arguments).await;
                self.store
                    .append(
                        conversation_id,
                        Message::tool_result(&call.id, invocation.output.content_for_model()),
                    )
                    .await?;
                self.transition(
                    conversation_id,
                    LoopState::ToolDispatched,
                    turn.iterations,
                    Some(&call.name),
                )
                .await?;

                if let Some(artifact) = invocation.output.artifact() {
                    turn.artifacts.push(artifact);
                }
                turn.tool_calls.push(ToolCallRecord {
                    name: invocation.name.clone(),
                    arguments: call.arguments,
                    result: invocation.output.content_for_model(),
                    success: invocation.success(),
                });
            }

            self.transition(conversation_id, LoopState::AwaitingModel, turn.iterations, None)
                .await?;
        }
    }

    /// Close any tool call left without a result by an interrupted turn.
    async fn recover(&self, conversation_id: &str) -> Result<()> {
        if let Some(checkpoint) = self.store.checkpoint(conversation_id).await? {
            if !checkpoint.is_complete() {
                warn!(
                    "Previous turn ended in state {:?} (error: {:?})",
                    checkpoint.state, checkpoint.error
                );
            }
        }

        let history = self.store.get(conversation_id).await?;
        for call_id in unanswered_calls(&history) {
            warn!("Closing unanswered tool call {}", call_id);
            self.store
                .append(conversation_id, Message::tool_result(call_id, INTERRUPTED_RESULT))
                .await?;
        }
        Ok(())
    }

    async fn transition(
        &self,
        conversation_id: &str,
        state: LoopState,
        iteration: usize,
        last_tool: Option<&str>,
    ) -> Result<()> {
        let mut checkpoint = Checkpoint::new(state, iteration);
        checkpoint.last_tool = last_tool.map(str::to_string);
        self.store.set_checkpoint(conversation_id, checkpoint).await
    }

    async fn fail(&self, conversation_id: &str, iteration: usize, err: &MuseError) -> Result<()> {
        let previous = self.store.checkpoint(conversation_id).await?;
        let mut checkpoint = Checkpoint::new(
            previous.as_ref().map(|c| c.state).unwrap_or(LoopState::AwaitingModel),
            iteration,
        );
        checkpoint.last_tool = previous.and_then(|c| c.last_tool);
        checkpoint.error = Some(err.to_string());
        self.store.set_checkpoint(conversation_id, checkpoint).await
    }
}

/// Ids of tool calls at the end of the history that have no result.
fn unanswered_calls(history: &[Message]) -> Vec<String> {
    let Some(last_request) = history.iter().rposition(Message::is_tool_call) else {
        return Vec::new();
    };

    let answered: Vec<&str> = history[last_request + 1..]
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();

    history[last_request]
        .tool_calls
        .iter()
        .filter(|call| !answered.contains(&call.id.as_str()))
        .map(|call| call.id.clone())
        .collect()
}

/// Response from one agent turn.
#[derive(Debug, Clone)]
pub struct AgentTurn {
    pub conversation_id: String,
    /// The final answer.
    pub content: String,
    /// Media produced during the turn.
    pub artifacts: Vec<Artifact>,
    /// Record of all tool calls made during the turn.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model calls used.
    pub iterations: usize,
}

impl AgentTurn {
    fn new(conversation_id: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            content: String::new(),
            artifacts: Vec::new(),
            tool_calls: Vec::new(),
            iterations: 0,
        }
    }
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned to the model.
    pub result: String,
    pub success: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
