//! Web search tool.

use super::{BuiltinTool, ParamType, ParameterSpec, Tool, ToolArgs, ToolOutput};
use crate::error::Result;
use crate::search::{SearchTopic, TavilyClient};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct WebSearchTool {
    client: Arc<TavilyClient>,
}

impl WebSearchTool {
    pub fn new(client: Arc<TavilyClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        BuiltinTool::WebSearch.as_str()
    }

    fn description(&self) -> &str {
        "Search the web, for example for dish origins, ingredient facts or food trends."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("query", ParamType::String, "Search query"),
            ParameterSpec::optional("topic", ParamType::String, "general, news or finance")
                .with_default(json!("general")),
            ParameterSpec::optional("max_results", ParamType::Integer, "Number of results")
                .with_default(json!(self.client.max_results())),
        ]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<ToolOutput> {
        let topic = match args.opt_str("topic").unwrap_or("general").parse::<SearchTopic>() {
            Ok(topic) => topic,
            Err(e) => return Ok(ToolOutput::Error(e)),
        };
        let max_results = args
            .opt_u64("max_results")
            .map(|n| n.clamp(1, 10) as u32)
            .unwrap_or(self.client.max_results());

        let response = self
            .client
            .search_with(args.str("query")?, topic, max_results)
            .await?;
        Ok(ToolOutput::Text(response.format_for_prompt()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_defaults() {
        let client = Arc::new(TavilyClient::new(reqwest::Client::new(), "key".to_string(), 3));
        let spec = WebSearchTool::new(client).spec();

        let schema = spec.json_schema();
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(schema["properties"]["max_results"]["default"], 3);
    }
}
