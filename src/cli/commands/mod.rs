//! CLI command implementations.

mod agent;
mod chat;
mod config;
mod doctor;
mod menu;
mod poem;
mod serve;

pub use agent::run_agent;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use menu::run_menu;
pub use poem::run_poem;
pub use serve::run_serve;
