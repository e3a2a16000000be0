//! Presentation outlines with web research.

use crate::config::Prompts;
use crate::conversation::Message;
use crate::error::{MuseError, Result};
use crate::model::{strip_code_fences, ChatModel};
use crate::search::{SearchTopic, TavilyClient};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const NO_RESULTS: &str = "No search results.";

/// Search results requested per slide during enrichment.
const SLIDE_SEARCH_RESULTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    pub points: Vec<String>,
    #[serde(default)]
    pub image_suggestion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnrichedSlide {
    title: Option<String>,
    points: Option<Vec<String>>,
}

pub struct PresentationPlanner {
    model: Arc<dyn ChatModel>,
    search: Option<Arc<TavilyClient>>,
    prompts: Prompts,
}

impl PresentationPlanner {
    pub fn new(model: Arc<dyn ChatModel>, search: Option<Arc<TavilyClient>>, prompts: Prompts) -> Self {
        Self {
            model,
            search,
            prompts,
        }
    }

    /// Draft an outline for `topic`, using `source_text` as reference material.
    pub async fn generate_outline(&self, topic: &str, source_text: &str) -> Result<Vec<Slide>> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(MuseError::Validation("topic must not be empty".to_string()));
        }

        let search_results = match &self.search {
            Some(search) => search
                .search(
                    &format!("Outline for presentation on {}", topic),
                    SearchTopic::General,
                )
                .await?
                .format_for_prompt(),
            None => NO_RESULTS.to_string(),
        };

        let mut vars = HashMap::new();
        vars.insert("topic".to_string(), topic.to_string());
        vars.insert("context".to_string(), source_text.trim().to_string());
        vars.insert("search_results".to_string(), search_results);
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.presentation.outline, &vars);

        let reply = self.model.complete(&[Message::user(prompt)], &[]).await?;
        let outline = parse_outline(&reply.content.unwrap_or_default())?;
        info!("Generated outline with {} slide(s) for '{}'", outline.len(), topic);
        Ok(outline)
    }

    /// Expand each slide's points. A slide that cannot be enriched is kept
    /// as it was.
    pub async fn enrich_slides(&self, outline: Vec<Slide>) -> Vec<Slide> {
        join_all(outline.into_iter().map(|slide| async move {
            match self.enrich_slide(&slide).await {
                Ok(enriched) => enriched,
                Err(e) => {
                    warn!("Keeping slide '{}' unchanged: {}", slide.title, e);
                    slide
                }
            }
        }))
        .await
    }

    async fn enrich_slide(&self, slide: &Slide) -> Result<Slide> {
        let search_results = match &self.search {
            Some(search) => {
                let query = format!(
                    "Detailed information for a presentation slide titled '{}' covering points: {}",
                    slide.title,
                    slide.points.join(", ")
                );
                match search
                    .search_with(&query, SearchTopic::General, SLIDE_SEARCH_RESULTS)
                    .await
                {
                    Ok(results) => results.format_for_prompt(),
                    Err(e) => {
                        debug!("Search failed for slide '{}': {}", slide.title, e);
                        NO_RESULTS.to_string()
                    }
                }
            }
            None => NO_RESULTS.to_string(),
        };

        let points = slide
            .points
            .iter()
            .map(|p| format!("- {}", p))
            .collect::<Vec<_>>()
            .join("\n");
        let mut vars = HashMap::new();
        vars.insert("title".to_string(), slide.title.clone());
        vars.insert("points".to_string(), points);
        vars.insert("search_results".to_string(), search_results);
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.presentation.slide, &vars);

        let reply = self.model.complete(&[Message::user(prompt)], &[]).await?;
        let content = reply.content.unwrap_or_default();
        let enriched: EnrichedSlide = serde_json::from_str(strip_code_fences(&content))?;

        Ok(Slide {
            title: enriched
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| slide.title.clone()),
            points: enriched
                .points
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| slide.points.clone()),
            image_suggestion: slide.image_suggestion.clone(),
        })
    }
}

/// Parse a model answer into slides. Accepts a bare array or an object
/// wrapping one (e.g. `{"slides": [...]}`).
pub fn parse_outline(text: &str) -> Result<Vec<Slide>> {
    let value: Value = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| MuseError::Model(format!("Outline is not valid JSON: {}", e)))?;

    let array = match value {
        Value::Array(_) => value,
        Value::Object(map) => map
            .into_iter()
            .map(|(_, v)| v)
            .find(Value::is_array)
            .ok_or_else(|| MuseError::Model("Outline object contains no slide list".to_string()))?,
        _ => return Err(MuseError::Model("Outline must be a JSON array".to_string())),
    };

    let slides: Vec<Slide> = serde_json::from_value(array)
        .map_err(|e| MuseError::Model(format!("Malformed slide in outline: {}", e)))?;
    if slides.is_empty() {
        return Err(MuseError::Model("Outline contains no slides".to_string()));
    }
    Ok(slides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::FakeModel;

    const OUTLINE: &str = r#"```json
[
  {"title": "Origins", "points": ["Hanoi, early 1900s"], "image_suggestion": "Old Hanoi street"},
  {"title": "Broth", "points": ["Beef bones", "Star anise"]}
]
```"#;

    fn planner(model: Arc<FakeModel>) -> PresentationPlanner {
        PresentationPlanner::new(model, None, Prompts::default())
    }

    #[test]
    fn test_parse_outline_array_and_wrapped() {
        let slides = parse_outline(OUTLINE).unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[1].image_suggestion, None);

        let wrapped = parse_outline(r#"{"slides": [{"title": "A", "points": []}]}"#).unwrap();
        assert_eq!(wrapped[0].title, "A");
    }

    #[test]
    fn test_parse_outline_rejects_garbage() {
        assert!(parse_outline("Sorry, I cannot help").is_err());
        assert!(parse_outline("[]").is_err());
        assert!(parse_outline(r#"{"note": "none"}"#).is_err());
        assert!(parse_outline(r#"[{"points": []}]"#).is_err());
    }

    #[tokio::test]
    async fn test_generate_outline() {
        let model = Arc::new(FakeModel::script(vec![Ok(OUTLINE)]));
        let slides = planner(model.clone())
            .generate_outline("The history of pho", "Pho is a soup.")
            .await
            .unwrap();

        assert_eq!(slides[0].title, "Origins");
        let prompt = &model.seen()[0][0].content;
        assert!(prompt.contains("The history of pho"));
        assert!(prompt.contains("Pho is a soup."));
        assert!(prompt.contains(NO_RESULTS));
    }

    #[tokio::test]
    async fn test_generate_outline_requires_topic() {
        let model = Arc::new(FakeModel::script(Vec::new()));
        let result = planner(model).generate_outline("  ", "").await;
        assert!(matches!(result, Err(MuseError::Validation(_))));
    }

    #[tokio::test]
    async fn test_enrich_keeps_slide_on_failure() {
        let model = Arc::new(FakeModel::script(vec![
            Ok(r#"{"title": "Origins", "points": ["Pho appeared in northern Vietnam around 1900."]}"#),
            Err("rate limited"),
        ]));
        let outline = parse_outline(OUTLINE).unwrap();

        let enriched = planner(model).enrich_slides(outline.clone()).await;
        assert_eq!(enriched.len(), 2);
        assert_eq!(
            enriched[0].points,
            vec!["Pho appeared in northern Vietnam around 1900."]
        );
        assert_eq!(
            enriched[0].image_suggestion.as_deref(),
            Some("Old Hanoi street")
        );
        assert_eq!(enriched[1], outline[1]);
    }
}
