//! CV evaluation against weighted criteria.

use super::chat::StreamingChat;
use crate::config::Prompts;
use crate::conversation::Message;
use crate::error::{MuseError, Result};
use crate::model::ChatModel;
use crate::stream::StreamingEmitter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Allowed deviation of the weight sum from 1.0.
const WEIGHT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCriterion {
    pub name: String,
    pub weight: f64,
    pub description: String,
}

impl EvaluationCriterion {
    fn new(name: &str, weight: f64, description: &str) -> Self {
        Self {
            name: name.to_string(),
            weight,
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvEvaluationRequest {
    pub job_description: String,
    pub criteria: Vec<EvaluationCriterion>,
    #[serde(default)]
    pub cv_text: Option<String>,
}

impl CvEvaluationRequest {
    pub fn validate(&self) -> Result<()> {
        if self.cv_text.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(MuseError::Validation("CV text is missing".to_string()));
        }
        if self.job_description.trim().is_empty() {
            return Err(MuseError::Validation("job description is missing".to_string()));
        }
        if self.criteria.is_empty() {
            return Err(MuseError::Validation("evaluation criteria are missing".to_string()));
        }

        let total: f64 = self.criteria.iter().map(|c| c.weight).sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(MuseError::Validation(format!(
                "criteria weights must sum to 1.0, got {:.2}",
                total
            )));
        }
        Ok(())
    }
}

/// Criteria used when the client has none of its own.
pub fn default_criteria() -> Vec<EvaluationCriterion> {
    vec![
        EvaluationCriterion::new(
            "Technical skills",
            0.30,
            "Technical skills, programming languages, frameworks and tools relevant to the job",
        ),
        EvaluationCriterion::new(
            "Work experience",
            0.25,
            "Years of experience, past projects and previous positions",
        ),
        EvaluationCriterion::new(
            "Education",
            0.20,
            "Degrees, field of study, academic results and additional courses",
        ),
        EvaluationCriterion::new(
            "Soft skills",
            0.15,
            "Communication, teamwork, leadership and problem solving",
        ),
        EvaluationCriterion::new(
            "Other",
            0.10,
            "Languages, certificates, community activities and relevant interests",
        ),
    ]
}

/// Streams CV evaluations and recruiter chat.
pub struct CvEvaluator {
    model: Arc<dyn ChatModel>,
    prompts: Prompts,
}

impl CvEvaluator {
    pub fn new(model: Arc<dyn ChatModel>, prompts: Prompts) -> Self {
        Self { model, prompts }
    }

    /// System prompt for a validated request.
    pub fn build_prompt(&self, request: &CvEvaluationRequest) -> String {
        let criteria = request
            .criteria
            .iter()
            .map(|c| format!("- {} ({:.0}%): {}", c.name, c.weight * 100.0, c.description))
            .collect::<Vec<_>>()
            .join("\n");

        let mut vars = HashMap::new();
        vars.insert("job_description".to_string(), request.job_description.clone());
        vars.insert("criteria".to_string(), criteria);
        vars.insert(
            "cv_text".to_string(),
            request.cv_text.clone().unwrap_or_default(),
        );

        self.prompts
            .render_with_custom(&self.prompts.cv.evaluation_system, &vars)
    }

    pub async fn evaluate(&self, request: &CvEvaluationRequest) -> Result<StreamingEmitter> {
        request.validate()?;
        info!(
            "Evaluating CV against {} criteria",
            request.criteria.len()
        );

        let messages = [
            Message::system(self.build_prompt(request)),
            Message::user(self.prompts.cv.evaluation_user.clone()),
        ];
        let deltas = self.model.stream(&messages).await?;
        Ok(StreamingEmitter::new(deltas))
    }

    /// Free-form recruiter chat.
    pub fn chat(&self) -> StreamingChat {
        StreamingChat::new(self.model.clone(), self.prompts.cv.chat_system.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::FakeModel;

    fn request() -> CvEvaluationRequest {
        CvEvaluationRequest {
            job_description: "Senior Rust engineer".to_string(),
            criteria: default_criteria(),
            cv_text: Some("Ten years of systems programming".to_string()),
        }
    }

    #[test]
    fn test_default_criteria_sum_to_one() {
        let criteria = default_criteria();
        assert_eq!(criteria.len(), 5);
        let total: f64 = criteria.iter().map(|c| c.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_validation() {
        assert!(request().validate().is_ok());

        let mut missing_cv = request();
        missing_cv.cv_text = None;
        assert!(matches!(missing_cv.validate(), Err(MuseError::Validation(_))));

        let mut no_job = request();
        no_job.job_description = "  ".to_string();
        assert!(no_job.validate().is_err());

        let mut no_criteria = request();
        no_criteria.criteria.clear();
        assert!(no_criteria.validate().is_err());

        let mut bad_weights = request();
        bad_weights.criteria[0].weight = 0.5;
        let err = bad_weights.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn test_weights_within_tolerance() {
        let mut req = request();
        req.criteria[0].weight = 0.305;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_build_prompt() {
        let evaluator = CvEvaluator::new(Arc::new(FakeModel::script(Vec::new())), Prompts::default());
        let prompt = evaluator.build_prompt(&request());

        assert!(prompt.contains("Senior Rust engineer"));
        assert!(prompt.contains("- Technical skills (30%): Technical skills"));
        assert!(prompt.contains("Ten years of systems programming"));
        assert!(!prompt.contains("{{"));
    }

    #[tokio::test]
    async fn test_evaluate_streams() {
        let model = Arc::new(FakeModel::streaming(&["OVERALL: ", "8.7/10"]));
        let evaluator = CvEvaluator::new(model.clone(), Prompts::default());

        let text = evaluator
            .evaluate(&request())
            .await
            .unwrap()
            .collect_text()
            .await
            .unwrap();
        assert_eq!(text, "OVERALL: 8.7/10");
        assert_eq!(model.seen()[0].len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_model() {
        let model = Arc::new(FakeModel::streaming(&["x"]));
        let evaluator = CvEvaluator::new(model.clone(), Prompts::default());

        let mut req = request();
        req.criteria.pop();
        assert!(evaluator.evaluate(&req).await.is_err());
        assert!(model.seen().is_empty());
    }
}
