//! CLI module for Muse.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Muse - content generation and a restaurant assistant
///
/// Streams poems and CV evaluations, drafts presentation outlines, and runs a
/// tool-using agent that manages a restaurant menu and creates food media.
#[derive(Parser, Debug)]
#[command(name = "muse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check configuration and API access
    Doctor,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Start an interactive session with the restaurant agent
    Chat {
        /// Conversation thread to continue
        #[arg(short, long)]
        thread: Option<String>,
    },

    /// Run a single agent turn
    Agent {
        /// What to ask the agent (e.g., "Add pho for 45000")
        prompt: String,

        /// Conversation thread
        #[arg(short, long, default_value = "cli")]
        thread: String,

        /// Image to attach to the request
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Stream a poem to stdout
    Poem {
        /// What the poem should be about
        topic: String,
    },

    /// Inspect or edit the menu file directly
    Menu {
        #[command(subcommand)]
        action: MenuAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum MenuAction {
    /// List all menu items
    List,

    /// Add an item
    Add {
        name: String,
        description: String,
        price: f64,
    },

    /// Change an item's description and/or price
    Edit {
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        price: Option<f64>,
    },

    /// Remove an item
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_agent_with_image() {
        let cli = Cli::parse_from(["muse", "-vv", "agent", "What is this?", "--image", "dish.jpg"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Agent { prompt, thread, image } => {
                assert_eq!(prompt, "What is this?");
                assert_eq!(thread, "cli");
                assert_eq!(image, Some(PathBuf::from("dish.jpg")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_menu_edit() {
        let cli = Cli::parse_from(["muse", "menu", "edit", "Pho", "--price", "50000"]);
        match cli.command {
            Commands::Menu {
                action: MenuAction::Edit { name, description, price },
            } => {
                assert_eq!(name, "Pho");
                assert_eq!(description, None);
                assert_eq!(price, Some(50000.0));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_serve_defaults_unset() {
        let cli = Cli::parse_from(["muse", "serve"]);
        assert!(matches!(cli.command, Commands::Serve { host: None, port: None }));
    }
}
