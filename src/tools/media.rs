//! Promotional image and video tools.

use super::{BuiltinTool, ParamType, ParameterSpec, Tool, ToolArgs, ToolOutput};
use crate::error::Result;
use crate::media::MediaGenerator;
use async_trait::async_trait;
use std::sync::Arc;

fn media_parameters(kind: &str) -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::required("food_name", ParamType::String, "Name of the dish"),
        ParameterSpec::required(
            "description",
            ParamType::String,
            &format!("Description used as inspiration for the {}", kind),
        ),
    ]
}

pub struct GenerateImageTool {
    generator: Arc<MediaGenerator>,
}

impl GenerateImageTool {
    pub fn new(generator: Arc<MediaGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> &str {
        BuiltinTool::GenerateImage.as_str()
    }

    fn description(&self) -> &str {
        "Create a promotional photo of a dish. Returns the path of the saved image."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        media_parameters("image")
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<ToolOutput> {
        let artifact = self
            .generator
            .generate_image(args.str("food_name")?, args.str("description")?)
            .await?;
        Ok(artifact.into())
    }
}

pub struct GenerateVideoTool {
    generator: Arc<MediaGenerator>,
}

impl GenerateVideoTool {
    pub fn new(generator: Arc<MediaGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Tool for GenerateVideoTool {
    fn name(&self) -> &str {
        BuiltinTool::GenerateVideo.as_str()
    }

    fn description(&self) -> &str {
        "Create a short promotional video of a dish. This can take several minutes. \
         Returns the path of the saved video."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        media_parameters("video")
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<ToolOutput> {
        let artifact = self
            .generator
            .generate_video(args.str("food_name")?, args.str("description")?)
            .await?;
        Ok(artifact.into())
    }
}
