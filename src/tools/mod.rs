//! Tools the agent can call.
//!
//! Each tool implements [`Tool`]: a name, a description, a typed parameter
//! list and an async handler. The [`ToolRegistry`] advertises them to the
//! model and dispatches calls by name after validating arguments.

mod media;
mod menu;
mod registry;
mod search;
mod vision;

pub use media::{GenerateImageTool, GenerateVideoTool};
pub use menu::{
    AddMenuItemTool, AddMultipleMenuItemsTool, DeleteMenuItemTool, EditMenuItemTool, ReadMenuTool,
};
pub use registry::ToolRegistry;
pub use search::WebSearchTool;
pub use vision::ExtractFoodInfoTool;

use crate::error::{MuseError, Result};
use crate::media::{Artifact, MediaGenerator, MediaKind};
use crate::menu::MenuStore;
use crate::model::ChatModel;
use crate::search::TavilyClient;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// Whether a JSON value has this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|n| n.fract() == 0.0)
            }
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes one tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// JSON schema of array elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,
}

impl ParameterSpec {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: true,
            default: None,
            items: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_items(mut self, items: Value) -> Self {
        self.items = Some(items);
        self
    }
}

/// Advertised description of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolSpec {
    /// JSON schema of the parameter object, as function-calling APIs expect.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut property = json!({
                "type": param.param_type.as_str(),
                "description": param.description,
            });
            if let Some(default) = &param.default {
                property["default"] = default.clone();
            }
            if let Some(items) = &param.items {
                property["items"] = items.clone();
            }
            properties.insert(param.name.clone(), property);
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Outcome of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ToolOutput {
    Text(String),
    ImageArtifact(PathBuf),
    VideoArtifact(PathBuf),
    Error(String),
}

impl ToolOutput {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutput::Error(_))
    }

    /// Media produced by the call, if any.
    pub fn artifact(&self) -> Option<Artifact> {
        match self {
            ToolOutput::ImageArtifact(path) => Some(Artifact::new(MediaKind::Image, path.clone())),
            ToolOutput::VideoArtifact(path) => Some(Artifact::new(MediaKind::Video, path.clone())),
            ToolOutput::Text(_) | ToolOutput::Error(_) => None,
        }
    }

    /// Text handed back to the model as the tool result.
    pub fn content_for_model(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::ImageArtifact(path) => {
                format!("Image generated and saved at {}", path.display())
            }
            ToolOutput::VideoArtifact(path) => {
                format!("Video generated and saved at {}", path.display())
            }
            ToolOutput::Error(reason) => format!("Error: {}", reason),
        }
    }
}

impl From<Artifact> for ToolOutput {
    fn from(artifact: Artifact) -> Self {
        match artifact.kind {
            MediaKind::Image => ToolOutput::ImageArtifact(artifact.path),
            MediaKind::Video => ToolOutput::VideoArtifact(artifact.path),
        }
    }
}

/// Record of one dispatched tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
    pub output: ToolOutput,
}

impl ToolInvocation {
    pub fn success(&self) -> bool {
        !self.output.is_error()
    }
}

/// Built-in tools. Additional tools can be registered through [`Tool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinTool {
    ReadMenu,
    AddMenuItem,
    EditMenuItem,
    DeleteMenuItem,
    AddMultipleMenuItems,
    ExtractFoodInfo,
    GenerateImage,
    GenerateVideo,
    WebSearch,
}

impl BuiltinTool {
    pub const ALL: [BuiltinTool; 9] = [
        BuiltinTool::ReadMenu,
        BuiltinTool::AddMenuItem,
        BuiltinTool::EditMenuItem,
        BuiltinTool::DeleteMenuItem,
        BuiltinTool::AddMultipleMenuItems,
        BuiltinTool::ExtractFoodInfo,
        BuiltinTool::GenerateImage,
        BuiltinTool::GenerateVideo,
        BuiltinTool::WebSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinTool::ReadMenu => "read_menu",
            BuiltinTool::AddMenuItem => "add_menu_item",
            BuiltinTool::EditMenuItem => "edit_menu_item",
            BuiltinTool::DeleteMenuItem => "delete_menu_item",
            BuiltinTool::AddMultipleMenuItems => "add_multiple_menu_items",
            BuiltinTool::ExtractFoodInfo => "extract_food_info_from_image",
            BuiltinTool::GenerateImage => "generate_image",
            BuiltinTool::GenerateVideo => "generate_video",
            BuiltinTool::WebSearch => "web_search",
        }
    }
}

impl std::str::FromStr for BuiltinTool {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        BuiltinTool::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| format!("Unknown tool: {}", s))
    }
}

/// Validated arguments passed to a tool handler.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    values: Map<String, Value>,
}

impl ToolArgs {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn str(&self, name: &str) -> Result<&str> {
        self.opt_str(name)
            .ok_or_else(|| MuseError::ToolDispatch(format!("Missing '{}' argument", name)))
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn f64(&self, name: &str) -> Result<f64> {
        self.opt_f64(name)
            .ok_or_else(|| MuseError::ToolDispatch(format!("Missing '{}' argument", name)))
    }

    pub fn opt_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn opt_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|n| n as u64)))
    }

    /// Deserialize one argument into a typed value.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self
            .get(name)
            .cloned()
            .ok_or_else(|| MuseError::ToolDispatch(format!("Missing '{}' argument", name)))?;
        serde_json::from_value(value)
            .map_err(|e| MuseError::ToolDispatch(format!("Invalid '{}' argument: {}", name, e)))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }
}

/// A capability the model may ask to invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// Natural-language description shown to the model.
    fn description(&self) -> &str;

    /// Parameters the tool accepts.
    fn parameters(&self) -> Vec<ParameterSpec>;

    /// Run the tool. Errors are reported to the model as error results.
    async fn invoke(&self, args: &ToolArgs) -> Result<ToolOutput>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

impl ToolRegistry {
    /// Registry with the built-in restaurant tools, in [`BuiltinTool::ALL`]
    /// order. `web_search` is only registered when a search client is given.
    pub fn restaurant(
        menu: Arc<MenuStore>,
        vision: Arc<dyn ChatModel>,
        vision_prompt: &str,
        media: Arc<MediaGenerator>,
        search: Option<Arc<TavilyClient>>,
    ) -> Result<Self> {
        let mut registry = ToolRegistry::new();
        for builtin in BuiltinTool::ALL {
            let tool: Arc<dyn Tool> = match builtin {
                BuiltinTool::ReadMenu => Arc::new(ReadMenuTool::new(menu.clone())),
                BuiltinTool::AddMenuItem => Arc::new(AddMenuItemTool::new(menu.clone())),
                BuiltinTool::EditMenuItem => Arc::new(EditMenuItemTool::new(menu.clone())),
                BuiltinTool::DeleteMenuItem => Arc::new(DeleteMenuItemTool::new(menu.clone())),
                BuiltinTool::AddMultipleMenuItems => {
                    Arc::new(AddMultipleMenuItemsTool::new(menu.clone()))
                }
                BuiltinTool::ExtractFoodInfo => {
                    Arc::new(ExtractFoodInfoTool::new(vision.clone(), vision_prompt))
                }
                BuiltinTool::GenerateImage => Arc::new(GenerateImageTool::new(media.clone())),
                BuiltinTool::GenerateVideo => Arc::new(GenerateVideoTool::new(media.clone())),
                BuiltinTool::WebSearch => match &search {
                    Some(client) => Arc::new(WebSearchTool::new(client.clone())),
                    None => continue,
                },
            };
            debug_assert_eq!(tool.name(), builtin.as_str());
            registry.register(tool)?;
        }

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_schema() {
        let spec = ToolSpec {
            name: "edit_menu_item".to_string(),
            description: "Edit a dish".to_string(),
            parameters: vec![
                ParameterSpec::required("name", ParamType::String, "Dish name"),
                ParameterSpec::optional("new_price", ParamType::Number, "New price"),
            ],
        };

        let schema = spec.json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["new_price"]["type"], "number");
        assert_eq!(schema["required"], json!(["name"]));
    }

    #[test]
    fn test_param_type_matches() {
        assert!(ParamType::Integer.matches(&json!(3)));
        assert!(ParamType::Integer.matches(&json!(3.0)));
        assert!(!ParamType::Integer.matches(&json!(3.5)));
        assert!(ParamType::Number.matches(&json!(3.5)));
        assert!(!ParamType::String.matches(&json!(3)));
    }

    #[test]
    fn test_tool_output_artifact() {
        let output = ToolOutput::ImageArtifact(PathBuf::from("/tmp/x.png"));
        let artifact = output.artifact().unwrap();
        assert_eq!(artifact.kind, MediaKind::Image);
        assert!(ToolOutput::Text("hi".to_string()).artifact().is_none());
        assert!(ToolOutput::Error("boom".to_string()).is_error());
    }

    #[test]
    fn test_builtin_names_roundtrip() {
        for tool in BuiltinTool::ALL {
            assert_eq!(tool.as_str().parse::<BuiltinTool>().unwrap(), tool);
        }
        assert!("launch_rocket".parse::<BuiltinTool>().is_err());
    }

    #[test]
    fn test_restaurant_registry_follows_builtin_order() {
        use crate::model::testing::FakeModel;
        use crate::orchestrator::testing::NoMedia;

        let dir = tempfile::tempdir().unwrap();
        let menu = Arc::new(MenuStore::open(dir.path().join("menu.json")));
        let vision = Arc::new(FakeModel::script(vec![]));
        let media = Arc::new(MediaGenerator::new(Arc::new(NoMedia), dir.path()));

        let registry = ToolRegistry::restaurant(menu, vision, "describe", media, None).unwrap();
        let expected: Vec<&str> = BuiltinTool::ALL
            .iter()
            .filter(|tool| **tool != BuiltinTool::WebSearch)
            .map(|tool| tool.as_str())
            .collect();
        assert_eq!(registry.names(), expected);
        for name in registry.names() {
            assert!(name.parse::<BuiltinTool>().is_ok(), "{} is not built in", name);
        }
    }

    #[test]
    fn test_tool_args_accessors() {
        let args = ToolArgs::new(
            json!({"name": "Pho", "price": 50000, "note": null})
                .as_object()
                .unwrap()
                .clone(),
        );
        assert_eq!(args.str("name").unwrap(), "Pho");
        assert_eq!(args.f64("price").unwrap(), 50000.0);
        assert!(args.get("note").is_none());
        assert!(args.str("missing").is_err());
    }
}
