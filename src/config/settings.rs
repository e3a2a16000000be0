//! Configuration settings for Muse.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub agent: AgentSettings,
    pub media: MediaSettings,
    pub menu: MenuSettings,
    pub search: SearchSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.muse".to_string(),
            temp_dir: "/tmp/muse".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Language-model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Chat model used by the agent and the text services.
    pub chat_model: String,
    /// Model used to read food photos. Falls back to `chat_model` when empty.
    pub vision_model: String,
    /// Sampling temperature for the agent.
    pub temperature: f32,
    /// Base URL of an OpenAI-compatible API.
    pub api_base: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            chat_model: "gpt-4.1".to_string(),
            vision_model: "gpt-4.1-mini".to_string(),
            temperature: 0.0,
            api_base: "https://api.openai.com/v1".to_string(),
            timeout_seconds: 300,
        }
    }
}

impl ModelSettings {
    /// Model used for image understanding.
    pub fn vision_model(&self) -> &str {
        if self.vision_model.is_empty() {
            &self.chat_model
        } else {
            &self.vision_model
        }
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum model calls in one turn before the turn fails.
    pub max_iterations: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self { max_iterations: 15 }
    }
}

/// Image and video generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Image generation model.
    pub image_model: String,
    /// Image size requested from the provider.
    pub image_size: String,
    /// Video generation model.
    pub video_model: String,
    /// Directory where generated artifacts are written.
    pub output_dir: String,
    /// Seconds between video status checks.
    pub poll_interval_seconds: u64,
    /// Maximum seconds to wait for a video before giving up.
    pub max_wait_seconds: u64,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            image_model: "gpt-image-1".to_string(),
            image_size: "1024x1024".to_string(),
            video_model: "sora-2".to_string(),
            output_dir: "/tmp/muse/media".to_string(),
            poll_interval_seconds: 10,
            max_wait_seconds: 600,
        }
    }
}

impl MediaSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_seconds)
    }
}

/// Menu store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuSettings {
    /// Path to the JSON menu file.
    pub path: String,
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            path: "~/.muse/menu.json".to_string(),
        }
    }
}

/// Web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Tavily API key. Falls back to the TAVILY_API_KEY environment variable.
    pub api_key: Option<String>,
    /// Default number of results per query.
    pub max_results: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            max_results: 2,
        }
    }
}

impl SearchSettings {
    /// Resolve the API key from config or environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("TAVILY_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory for uploaded attachments. Files are removed after each turn.
    pub upload_dir: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            upload_dir: "/tmp/muse/uploads".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::MuseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("muse")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    pub fn menu_path(&self) -> PathBuf {
        Self::expand_path(&self.menu.path)
    }

    pub fn media_dir(&self) -> PathBuf {
        Self::expand_path(&self.media.output_dir)
    }

    pub fn upload_dir(&self) -> PathBuf {
        Self::expand_path(&self.server.upload_dir)
    }
}
