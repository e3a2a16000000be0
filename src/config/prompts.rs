//! Prompt templates for Muse.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    pub poem: PoemPrompts,
    pub cv: CvPrompts,
    pub presentation: PresentationPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the restaurant agent and its vision tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub system: String,
    pub vision: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are the assistant of a restaurant manager. You help maintain the menu and produce promotional media for dishes.

Guidelines:
- Use 'read_menu' before answering questions about the current menu
- Use 'add_menu_item', 'edit_menu_item' and 'delete_menu_item' for single changes
- Use 'add_multiple_menu_items' when several dishes should be added at once
- When the user attaches a photo, its path is given in the message; pass it to 'extract_food_info_from_image'
- Use 'generate_image' or 'generate_video' when the user asks for promotional media
- Report tool errors to the user plainly and suggest a fix

Keep answers short and confirm every change you made to the menu."#
                .to_string(),

            vision: r#"You are a culinary expert. Analyse this photo and describe the dishes in it.
Answer with a JSON array of objects with the keys "name" (dish name), "description" (a short, appetising description) and "price" (estimated retail price as a number).
Example: [{"name": "Beef Pho", "description": "Rich broth, soft rice noodles and thinly sliced rare beef.", "price": 50000}]"#
                .to_string(),
        }
    }
}

/// Prompts for the poem service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoemPrompts {
    pub system: String,
}

impl Default for PoemPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a gifted poet writing in the traditional luc bat form.

Form:
- Alternate a six-syllable line with an eight-syllable line, repeating throughout
- The last word of each six-syllable line rhymes with the sixth word of the following eight-syllable line
- The last word of each eight-syllable line rhymes with the last word of the next six-syllable line

Content:
- Stay close to the requested theme
- Write at least four lines
- Prefer soft, musical language and classical imagery; avoid modern or foreign words

Layout:
- Indent every six-syllable line with one tab
- Write eight-syllable lines without indentation

Check syllable counts and rhymes before answering."#
                .to_string(),
        }
    }
}

/// Prompts for CV evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CvPrompts {
    pub evaluation_system: String,
    pub evaluation_user: String,
    pub chat_system: String,
}

impl Default for CvPrompts {
    fn default() -> Self {
        Self {
            evaluation_system: r#"You are an experienced recruiter. Evaluate how well the CV below fits the job posting, using the weighted criteria provided.

JOB POSTING:
{{job_description}}

CRITERIA:
{{criteria}}

CV:
{{cv_text}}

For each criterion give a score from 0 to 10 with a one-line justification.
Apply the weights to compute an overall score from 0 to 10 and classify it:
Excellent (8.5-10), Good (7-8.4), Fair (5.5-6.9), Average (4-5.4), Weak (<4).

Format:
CV EVALUATION - [CANDIDATE NAME]

SCORES:
[criterion: score - justification]

OVERALL: [X.X]/10 - [classification]

STRENGTHS:
[list]

GAPS:
[list]

FIT: [Suitable/Not suitable] for the position

Be objective and fair."#
                .to_string(),

            evaluation_user: "Evaluate this CV against the criteria. Return only the scores and the conclusion."
                .to_string(),

            chat_system: "You are a recruiter who evaluates CVs. Answer recruitment and candidate questions professionally, and give only the conclusion and the fit assessment."
                .to_string(),
        }
    }
}

/// Prompts for presentation outlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationPrompts {
    pub outline: String,
    pub slide: String,
}

impl Default for PresentationPrompts {
    fn default() -> Self {
        Self {
            outline: r#"You create presentation content. Build a detailed outline from the topic, the reference material and the web search results.

Topic: {{topic}}

Reference material (may be empty):
{{context}}

Web search results:
{{search_results}}

Requirements:
1. Produce an outline of 5 to 10 slides.
2. Each slide has "title" (short), "points" (list of bullet points) and "image_suggestion" (an illustration idea).
3. Answer with a JSON array only, one object per slide.

Example:
[
  {"title": "Slide 1", "points": ["Point 1.1", "Point 1.2"], "image_suggestion": "Illustration for slide 1"}
]"#
                .to_string(),

            slide: r#"You write presentation content. Expand the slide below using the search results.

Slide title: {{title}}

Key points:
{{points}}

Web search results:
{{search_results}}

Keep the title. Turn each point into full sentences with examples or figures where available.
Answer with a JSON object with the keys "title" and "points"."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }

            let poem_path = custom_path.join("poem.toml");
            if poem_path.exists() {
                let content = std::fs::read_to_string(&poem_path)?;
                prompts.poem = toml::from_str(&content)?;
            }

            let cv_path = custom_path.join("cv.toml");
            if cv_path.exists() {
                let content = std::fs::read_to_string(&cv_path)?;
                prompts.cv = toml::from_str(&content)?;
            }

            let presentation_path = custom_path.join("presentation.toml");
            if presentation_path.exists() {
                let content = std::fs::read_to_string(&presentation_path)?;
                prompts.presentation = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.agent.system.is_empty());
        assert!(prompts.cv.evaluation_system.contains("{{cv_text}}"));
        assert!(prompts.presentation.outline.contains("{{topic}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut prompts = Prompts::default();
        prompts.variables.insert("restaurant".to_string(), "Config".to_string());
        prompts.variables.insert("city".to_string(), "Hanoi".to_string());

        let mut vars = HashMap::new();
        vars.insert("restaurant".to_string(), "Call".to_string());

        let result = prompts.render_with_custom("{{restaurant}} in {{city}}", &vars);
        assert_eq!(result, "Call in Hanoi");
    }

    #[test]
    fn test_custom_dir_overrides_poem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("poem.toml"), "system = \"Write haiku.\"\n").unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.poem.system, "Write haiku.");
        assert!(!prompts.agent.system.is_empty());
    }
}
