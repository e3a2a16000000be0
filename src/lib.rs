//! Muse - content generation services and a restaurant assistant
//!
//! Muse wraps a chat model in a handful of services:
//! - Streamed poems and recruiter chat, delivered as NDJSON deltas
//! - CV evaluation against weighted criteria
//! - Presentation outlines researched with web search, then enriched per slide
//! - A tool-using agent that manages a restaurant menu, reads dish photos,
//!   and generates food images and videos
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `conversation` - Message history, checkpoints and per-thread locking
//! - `model` - Chat model abstraction over the OpenAI API
//! - `tools` - Tool specs, argument validation and the tool registry
//! - `agent` - The bounded tool-calling loop
//! - `menu` - JSON-file menu store with atomic writes
//! - `media` - Image and video generation jobs
//! - `search` - Tavily web search client
//! - `stream` - NDJSON streaming
//! - `services` - Poem, CV and presentation services
//! - `orchestrator` - Component wiring
//!
//! # Example
//!
//! ```rust,no_run
//! use muse::config::Settings;
//! use muse::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let turn = orchestrator
//!         .agent()
//!         .run("table-7", "Add pho for 45000 VND", None)
//!         .await?;
//!     println!("{}", turn.content);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod media;
pub mod menu;
pub mod model;
pub mod openai;
pub mod orchestrator;
pub mod search;
pub mod services;
pub mod stream;
pub mod tools;

pub use error::{MuseError, Result};
