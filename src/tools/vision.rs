//! Dish recognition from photos.

use super::{BuiltinTool, ParamType, ParameterSpec, Tool, ToolArgs, ToolOutput};
use crate::conversation::Message;
use crate::error::Result;
use crate::model::{strip_code_fences, ChatModel};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Asks a vision-capable model to describe the dishes in a photo.
pub struct ExtractFoodInfoTool {
    model: Arc<dyn ChatModel>,
    prompt: String,
}

impl ExtractFoodInfoTool {
    pub fn new(model: Arc<dyn ChatModel>, prompt: impl Into<String>) -> Self {
        Self {
            model,
            prompt: prompt.into(),
        }
    }
}

#[async_trait]
impl Tool for ExtractFoodInfoTool {
    fn name(&self) -> &str {
        BuiltinTool::ExtractFoodInfo.as_str()
    }

    fn description(&self) -> &str {
        "Analyse a photo of food and extract each dish's name, a short description and an estimated price. \
         Returns a JSON array."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "image_path",
            ParamType::String,
            "Path to the image file",
        )]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<ToolOutput> {
        let image_path = args.str("image_path")?;
        let path = Path::new(image_path);
        if !path.is_file() {
            return Ok(ToolOutput::Error(format!(
                "Image file not found: {}",
                image_path
            )));
        }

        debug!("Extracting dishes from {:?} with {}", path, self.model.model_name());
        let message = Message::user_with_image(self.prompt.clone(), path);
        let reply = self.model.complete(&[message], &[]).await?;

        let content = reply.content.unwrap_or_default();
        Ok(ToolOutput::Text(strip_code_fences(&content).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeltaStream, ModelReply};
    use crate::tools::ToolSpec;
    use std::sync::Mutex;

    struct FakeVision {
        seen: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl ChatModel for FakeVision {
        async fn complete(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<ModelReply> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            Ok(ModelReply::text(
                "```json\n[{\"name\": \"Pho\", \"price\": 50000}]\n```",
            ))
        }

        async fn stream(&self, _messages: &[Message]) -> Result<DeltaStream> {
            unimplemented!("not used by the vision tool")
        }

        fn model_name(&self) -> &str {
            "fake-vision"
        }
    }

    #[tokio::test]
    async fn test_extracts_and_strips_fences() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("pho.jpg");
        std::fs::write(&image, b"jpeg").unwrap();

        let model = Arc::new(FakeVision {
            seen: Mutex::new(Vec::new()),
        });
        let tool = ExtractFoodInfoTool::new(model.clone(), "Describe the dishes");
        let args = ToolArgs::new(
            serde_json::json!({"image_path": image.to_string_lossy()})
                .as_object()
                .unwrap()
                .clone(),
        );

        let output = tool.invoke(&args).await.unwrap();
        assert_eq!(
            output,
            ToolOutput::Text("[{\"name\": \"Pho\", \"price\": 50000}]".to_string())
        );

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].image.as_deref(), Some(image.as_path()));
        assert_eq!(seen[0].content, "Describe the dishes");
    }

    #[tokio::test]
    async fn test_missing_image() {
        let tool = ExtractFoodInfoTool::new(
            Arc::new(FakeVision {
                seen: Mutex::new(Vec::new()),
            }),
            "Describe",
        );
        let args = ToolArgs::new(
            serde_json::json!({"image_path": "/nonexistent/pho.jpg"})
                .as_object()
                .unwrap()
                .clone(),
        );

        let output = tool.invoke(&args).await.unwrap();
        assert!(output.is_error());
    }
}
