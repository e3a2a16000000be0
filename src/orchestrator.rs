//! Service wiring for Muse.
//!
//! Builds the model clients, stores, tools and services from [`Settings`]
//! and hands out shared references to the HTTP server and the CLI.

use crate::agent::AgentLoop;
use crate::config::{Prompts, Settings};
use crate::conversation::{ConversationStore, MemoryConversationStore};
use crate::error::Result;
use crate::media::{MediaGenerator, MediaProvider, OpenAIMediaProvider};
use crate::menu::MenuStore;
use crate::model::{ChatModel, OpenAIChatModel};
use crate::openai::{api_key, create_client_with, http_client};
use crate::search::TavilyClient;
use crate::services::{CvEvaluator, PresentationPlanner, StreamingChat};
use crate::tools::ToolRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Owns every long-lived component.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    store: Arc<dyn ConversationStore>,
    menu: Arc<MenuStore>,
    media: Arc<MediaGenerator>,
    agent: Arc<AgentLoop>,
    poet: StreamingChat,
    cv: Arc<CvEvaluator>,
    presentation: Arc<PresentationPlanner>,
}

impl Orchestrator {
    /// Create an orchestrator backed by the OpenAI API.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let client = create_client_with(&settings.model)?;
        let model: Arc<dyn ChatModel> = Arc::new(
            OpenAIChatModel::new(client.clone(), &settings.model.chat_model)
                .with_temperature(settings.model.temperature),
        );
        let vision: Arc<dyn ChatModel> =
            Arc::new(OpenAIChatModel::new(client, settings.model.vision_model()));
        info!(
            "Using chat model {} (vision: {})",
            settings.model.chat_model,
            settings.model.vision_model()
        );

        let http = http_client(Duration::from_secs(settings.model.timeout_seconds))?;
        let media_provider: Arc<dyn MediaProvider> = Arc::new(OpenAIMediaProvider::new(
            http.clone(),
            &settings.model.api_base,
            api_key()?,
            &settings.media,
        )?);

        let search = settings.search.resolve_api_key().map(|key| {
            info!("Web search enabled");
            Arc::new(TavilyClient::new(http, key, settings.search.max_results))
        });

        Self::with_components(settings, prompts, model, vision, media_provider, search)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        model: Arc<dyn ChatModel>,
        vision: Arc<dyn ChatModel>,
        media_provider: Arc<dyn MediaProvider>,
        search: Option<Arc<TavilyClient>>,
    ) -> Result<Self> {
        std::fs::create_dir_all(settings.temp_dir())?;
        std::fs::create_dir_all(settings.media_dir())?;
        std::fs::create_dir_all(settings.upload_dir())?;

        let menu = Arc::new(MenuStore::open(settings.menu_path()));
        let media = Arc::new(
            MediaGenerator::new(media_provider, settings.media_dir())
                .with_poll_interval(settings.media.poll_interval())
                .with_max_wait(settings.media.max_wait()),
        );

        let tools = Arc::new(ToolRegistry::restaurant(
            menu.clone(),
            vision,
            &prompts.render_with_custom(&prompts.agent.vision, &HashMap::new()),
            media.clone(),
            search.clone(),
        )?);
        info!("Registered tools: {}", tools.names().join(", "));

        let store: Arc<dyn ConversationStore> = Arc::new(MemoryConversationStore::new());
        let agent = Arc::new(
            AgentLoop::new(model.clone(), tools, store.clone())
                .with_system_prompt(
                    &prompts.render_with_custom(&prompts.agent.system, &HashMap::new()),
                )
                .with_max_iterations(settings.agent.max_iterations),
        );

        let poet = StreamingChat::new(
            model.clone(),
            prompts.render_with_custom(&prompts.poem.system, &HashMap::new()),
        );
        let cv = Arc::new(CvEvaluator::new(model.clone(), prompts.clone()));
        let presentation = Arc::new(PresentationPlanner::new(model, search, prompts.clone()));

        Ok(Self {
            settings,
            prompts,
            store,
            menu,
            media,
            agent,
            poet,
            cv,
            presentation,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    pub fn store(&self) -> Arc<dyn ConversationStore> {
        self.store.clone()
    }

    pub fn menu(&self) -> Arc<MenuStore> {
        self.menu.clone()
    }

    pub fn media(&self) -> Arc<MediaGenerator> {
        self.media.clone()
    }

    pub fn agent(&self) -> Arc<AgentLoop> {
        self.agent.clone()
    }

    pub fn poet(&self) -> &StreamingChat {
        &self.poet
    }

    pub fn cv(&self) -> Arc<CvEvaluator> {
        self.cv.clone()
    }

    pub fn presentation(&self) -> Arc<PresentationPlanner> {
        self.presentation.clone()
    }

    /// Cancel outstanding background work.
    pub fn shutdown(&self) {
        self.media.shutdown();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::MediaError;
    use crate::media::VideoStatus;
    use crate::model::testing::FakeModel;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// A provider that never produces media.
    pub struct NoMedia;

    #[async_trait]
    impl MediaProvider for NoMedia {
        async fn generate_image(&self, _prompt: &str) -> std::result::Result<Option<String>, MediaError> {
            Ok(None)
        }

        async fn submit_video(&self, _prompt: &str) -> std::result::Result<String, MediaError> {
            Err(MediaError::Provider("disabled".to_string()))
        }

        async fn video_status(&self, _id: &str) -> std::result::Result<VideoStatus, MediaError> {
            Err(MediaError::Provider("disabled".to_string()))
        }

        async fn download_video(&self, _id: &str) -> std::result::Result<Vec<u8>, MediaError> {
            Err(MediaError::Provider("disabled".to_string()))
        }
    }

    /// Settings with every path under `dir`.
    pub fn test_settings(dir: &TempDir) -> Settings {
        let root = dir.path().to_string_lossy().to_string();
        let mut settings = Settings::default();
        settings.general.data_dir = format!("{}/data", root);
        settings.general.temp_dir = format!("{}/tmp", root);
        settings.media.output_dir = format!("{}/media", root);
        settings.menu.path = format!("{}/data/menu.json", root);
        settings.server.upload_dir = format!("{}/uploads", root);
        settings
    }

    pub fn orchestrator(dir: &TempDir, model: Arc<FakeModel>) -> Orchestrator {
        Orchestrator::with_components(
            test_settings(dir),
            Prompts::default(),
            model.clone(),
            model,
            Arc::new(NoMedia),
            None,
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::orchestrator;
    use super::*;
    use crate::model::testing::FakeModel;
    use tempfile::TempDir;

    #[test]
    fn test_wires_builtin_tools() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir, Arc::new(FakeModel::script(Vec::new())));

        let agent = orchestrator.agent();
        let names = agent.tools().names();
        assert_eq!(names.len(), 8);
        assert!(names.contains(&"add_multiple_menu_items"));
        assert!(!names.contains(&"web_search"));
        assert!(dir.path().join("uploads").is_dir());
        assert!(dir.path().join("media").is_dir());
    }

    #[tokio::test]
    async fn test_agent_turn_through_orchestrator() {
        let dir = TempDir::new().unwrap();
        let model = Arc::new(FakeModel::script(vec![Ok("Xin chào!")]));
        let orchestrator = orchestrator(&dir, model.clone());

        let turn = orchestrator.agent().run("t1", "Hello", None).await.unwrap();
        assert_eq!(turn.content, "Xin chào!");

        let system = &model.seen()[0][0].content;
        assert_eq!(system, &Prompts::default().agent.system);
        assert_eq!(orchestrator.store().get("t1").await.unwrap().len(), 2);
    }
}
