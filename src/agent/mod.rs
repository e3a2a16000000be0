//! Tool-using conversational agent.
//!
//! The agent alternates between asking the model for the next step and
//! running the tools it requests, until the model answers without asking
//! for a tool or the per-turn limit on model calls is reached.

mod runner;

pub use runner::{AgentLoop, AgentTurn, ToolCallRecord};
