//! Configuration module for Muse.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, CvPrompts, PoemPrompts, PresentationPrompts, Prompts};
pub use settings::{
    AgentSettings, GeneralSettings, MediaSettings, MenuSettings, ModelSettings, PromptSettings,
    SearchSettings, ServerSettings, Settings,
};
