//! Web search through the Tavily API.

use crate::error::{MuseError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTopic {
    #[default]
    General,
    News,
    Finance,
}

impl std::str::FromStr for SearchTopic {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "general" => Ok(SearchTopic::General),
            "news" => Ok(SearchTopic::News),
            "finance" => Ok(SearchTopic::Finance),
            _ => Err(format!("Unknown search topic: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

impl SearchResponse {
    /// Render results as plain text for inclusion in a prompt.
    pub fn format_for_prompt(&self) -> String {
        if self.results.is_empty() {
            return "No search results.".to_string();
        }

        self.results
            .iter()
            .enumerate()
            .map(|(i, r)| format!("[{}] {} ({})\n{}", i + 1, r.title, r.url, r.content.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Client for the Tavily search API.
pub struct TavilyClient {
    http: reqwest::Client,
    api_key: String,
    max_results: u32,
}

impl TavilyClient {
    pub fn new(http: reqwest::Client, api_key: String, max_results: u32) -> Self {
        Self {
            http,
            api_key,
            max_results: max_results.max(1),
        }
    }

    pub fn max_results(&self) -> u32 {
        self.max_results
    }

    /// Search with the client's default result count.
    pub async fn search(&self, query: &str, topic: SearchTopic) -> Result<SearchResponse> {
        self.search_with(query, topic, self.max_results).await
    }

    #[instrument(skip(self), fields(query = %query))]
    pub async fn search_with(
        &self,
        query: &str,
        topic: SearchTopic,
        max_results: u32,
    ) -> Result<SearchResponse> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": max_results,
            "topic": topic,
            "include_raw_content": false,
        });

        let response = self.http.post(TAVILY_SEARCH_URL).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MuseError::ToolExecution(format!(
                "Web search failed ({}): {}",
                status, text
            )));
        }

        let results: SearchResponse = response.json().await?;
        debug!("Web search returned {} result(s)", results.results.len());
        Ok(results)
    }
}
