//! Image and video generation backends.

use crate::config::MediaSettings;
use crate::error::MediaError;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

type ProviderResult<T> = std::result::Result<T, MediaError>;

/// Progress of a submitted video job, as reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoStatus {
    Pending { progress: Option<u8> },
    Completed,
    Failed(String),
}

/// Trait for media-generation providers.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Generate one image. Returns the base64 payload, or `None` when the
    /// provider answered without image data.
    async fn generate_image(&self, prompt: &str) -> ProviderResult<Option<String>>;

    /// Submit a video job and return the provider's job id.
    async fn submit_video(&self, prompt: &str) -> ProviderResult<String>;

    async fn video_status(&self, job_id: &str) -> ProviderResult<VideoStatus>;

    /// Fetch the finished video.
    async fn download_video(&self, job_id: &str) -> ProviderResult<Vec<u8>>;
}

/// OpenAI images and videos endpoints.
pub struct OpenAIMediaProvider {
    http: reqwest::Client,
    base: Url,
    api_key: String,
    image_model: String,
    image_size: String,
    video_model: String,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoJob {
    id: String,
    status: String,
    progress: Option<f64>,
    error: Option<VideoJobError>,
}

#[derive(Debug, Deserialize)]
struct VideoJobError {
    message: String,
}

impl OpenAIMediaProvider {
    pub fn new(
        http: reqwest::Client,
        api_base: &str,
        api_key: String,
        settings: &MediaSettings,
    ) -> ProviderResult<Self> {
        // A trailing slash makes `Url::join` append rather than replace.
        let base = Url::parse(&format!("{}/", api_base.trim_end_matches('/')))
            .map_err(|e| MediaError::Provider(format!("Invalid API base '{}': {}", api_base, e)))?;

        Ok(Self {
            http,
            base,
            api_key,
            image_model: settings.image_model.clone(),
            image_size: settings.image_size.clone(),
            video_model: settings.video_model.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> ProviderResult<Url> {
        self.base
            .join(path)
            .map_err(|e| MediaError::Provider(format!("Invalid endpoint '{}': {}", path, e)))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ProviderResult<reqwest::Response> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| MediaError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Provider(format!("{}: {}", status, body)));
        }
        Ok(response)
    }

    async fn fetch_as_base64(&self, url: &str) -> ProviderResult<String> {
        let bytes = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| MediaError::Provider(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| MediaError::Provider(e.to_string()))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

#[async_trait]
impl MediaProvider for OpenAIMediaProvider {
    #[instrument(skip(self, prompt), fields(model = %self.image_model))]
    async fn generate_image(&self, prompt: &str) -> ProviderResult<Option<String>> {
        let mut body = json!({
            "model": self.image_model,
            "prompt": prompt,
            "size": self.image_size,
            "n": 1,
        });
        // gpt-image models always return base64 and reject this field.
        if self.image_model.starts_with("dall-e") {
            body["response_format"] = json!("b64_json");
        }

        let response = self
            .send(self.http.post(self.endpoint("images/generations")?).json(&body))
            .await?;
        let images: ImagesResponse = response
            .json()
            .await
            .map_err(|e| MediaError::InvalidPayload(e.to_string()))?;

        let Some(image) = images.data.into_iter().next() else {
            return Ok(None);
        };
        match (image.b64_json, image.url) {
            (Some(b64), _) => Ok(Some(b64)),
            (None, Some(url)) => {
                debug!("Image returned by URL, fetching");
                Ok(Some(self.fetch_as_base64(&url).await?))
            }
            (None, None) => Ok(None),
        }
    }

    #[instrument(skip(self, prompt), fields(model = %self.video_model))]
    async fn submit_video(&self, prompt: &str) -> ProviderResult<String> {
        let body = json!({
            "model": self.video_model,
            "prompt": prompt,
        });
        let job: VideoJob = self
            .send(self.http.post(self.endpoint("videos")?).json(&body))
            .await?
            .json()
            .await
            .map_err(|e| MediaError::InvalidPayload(e.to_string()))?;

        debug!("Submitted video job {} ({})", job.id, job.status);
        Ok(job.id)
    }

    async fn video_status(&self, job_id: &str) -> ProviderResult<VideoStatus> {
        let job: VideoJob = self
            .send(self.http.get(self.endpoint(&format!("videos/{}", job_id))?))
            .await?
            .json()
            .await
            .map_err(|e| MediaError::InvalidPayload(e.to_string()))?;

        Ok(parse_video_status(job))
    }

    async fn download_video(&self, job_id: &str) -> ProviderResult<Vec<u8>> {
        let bytes = self
            .send(
                self.http
                    .get(self.endpoint(&format!("videos/{}/content", job_id))?),
            )
            .await?
            .bytes()
            .await
            .map_err(|e| MediaError::Provider(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

fn parse_video_status(job: VideoJob) -> VideoStatus {
    match job.status.as_str() {
        "completed" => VideoStatus::Completed,
        "failed" | "cancelled" | "expired" => VideoStatus::Failed(
            job.error
                .map(|e| e.message)
                .unwrap_or_else(|| format!("job {}", job.status)),
        ),
        _ => VideoStatus::Pending {
            progress: job.progress.map(|p| p.clamp(0.0, 100.0) as u8),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(json: serde_json::Value) -> VideoJob {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_parse_video_status() {
        assert_eq!(
            parse_video_status(job(json!({"id": "v1", "status": "in_progress", "progress": 42}))),
            VideoStatus::Pending { progress: Some(42) }
        );
        assert_eq!(
            parse_video_status(job(json!({"id": "v1", "status": "completed"}))),
            VideoStatus::Completed
        );
        assert_eq!(
            parse_video_status(job(json!({
                "id": "v1",
                "status": "failed",
                "error": {"message": "moderation"}
            }))),
            VideoStatus::Failed("moderation".to_string())
        );
    }

    #[test]
    fn test_endpoint_joins_under_base() {
        let provider = OpenAIMediaProvider::new(
            reqwest::Client::new(),
            "https://api.openai.com/v1/",
            "sk-test".to_string(),
            &MediaSettings::default(),
        )
        .unwrap();

        assert_eq!(
            provider.endpoint("videos/abc/content").unwrap().as_str(),
            "https://api.openai.com/v1/videos/abc/content"
        );
    }

    #[test]
    fn test_invalid_base_rejected() {
        let result = OpenAIMediaProvider::new(
            reqwest::Client::new(),
            "not a url",
            String::new(),
            &MediaSettings::default(),
        );
        assert!(matches!(result, Err(MediaError::Provider(_))));
    }
}
