//! Image and video generation.
//!
//! Images are a single provider round trip. Videos are submitted, then
//! polled by a background task that is bounded by `max_wait` and can be
//! cancelled; its progress is published on a watch channel.

mod provider;

pub use provider::{MediaProvider, OpenAIMediaProvider, VideoStatus};

use crate::error::MediaError;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

type MediaResult<T> = std::result::Result<T, MediaError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: MediaKind,
    pub path: PathBuf,
}

impl Artifact {
    pub fn new(kind: MediaKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Legacy `<kind>_path:<path>` form.
    pub fn to_tagged(&self) -> String {
        format!("{}_path:{}", self.kind, self.path.display())
    }

    /// Parse the legacy `<kind>_path:<path>` form.
    pub fn from_tagged(tagged: &str) -> Option<Self> {
        let (tag, path) = tagged.trim().split_once(':')?;
        let kind = match tag {
            "image_path" => MediaKind::Image,
            "video_path" => MediaKind::Video,
            _ => return None,
        };
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        Some(Self::new(kind, path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Submitted,
    Polling,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

/// Lifecycle record of one generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationJob {
    pub id: Uuid,
    pub kind: MediaKind,
    pub subject: String,
    pub description: String,
    pub status: JobStatus,
    /// Provider-side job id, once submitted.
    pub provider_id: Option<String>,
    /// Number of status checks made.
    pub attempts: u32,
    pub progress: Option<u8>,
    pub transitions: Vec<JobStatus>,
    pub artifact: Option<PathBuf>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GenerationJob {
    pub fn new(kind: MediaKind, subject: &str, description: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            subject: subject.to_string(),
            description: description.to_string(),
            status: JobStatus::Submitted,
            provider_id: None,
            attempts: 0,
            progress: None,
            transitions: vec![JobStatus::Submitted],
            artifact: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Move to `status`. Terminal states are final; returns whether the
    /// transition happened.
    pub fn advance(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.transitions.push(status);
        true
    }

    pub fn complete(&mut self, path: PathBuf) {
        if self.advance(JobStatus::Done) {
            self.artifact = Some(path);
        }
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        if self.advance(JobStatus::Failed) {
            self.error = Some(error.into());
        }
    }
}

/// Handle to a background video job.
pub struct VideoJobHandle {
    status: watch::Receiver<GenerationJob>,
    cancel: CancellationToken,
    task: JoinHandle<MediaResult<Artifact>>,
}

impl VideoJobHandle {
    /// Latest job snapshot.
    pub fn job(&self) -> GenerationJob {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationJob> {
        self.status.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the job to finish.
    pub async fn wait(self) -> MediaResult<Artifact> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(MediaError::JobFailed(format!("video task aborted: {}", e))),
        }
    }
}

/// Generates media files through a [`MediaProvider`].
#[derive(Clone)]
pub struct MediaGenerator {
    provider: Arc<dyn MediaProvider>,
    output_dir: PathBuf,
    poll_interval: Duration,
    max_wait: Duration,
    shutdown: CancellationToken,
}

impl MediaGenerator {
    pub fn new(provider: Arc<dyn MediaProvider>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            output_dir: output_dir.into(),
            poll_interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(600),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Cancel every outstanding video job.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Generate an image and save it under the output directory.
    pub async fn generate_image(&self, subject: &str, description: &str) -> MediaResult<Artifact> {
        info!("Generating image for '{}'", subject);
        let payload = self
            .provider
            .generate_image(&image_prompt(subject, description))
            .await?
            .filter(|p| !p.is_empty())
            .ok_or(MediaError::NoImageData)?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| MediaError::InvalidPayload(e.to_string()))?;

        let path = self.output_dir.join(format!(
            "image_{}_{}.{}",
            slug(subject),
            timestamp(),
            image_extension(&bytes)
        ));
        write_atomically(&path, bytes).await?;

        info!("Image saved to {:?}", path);
        Ok(Artifact::new(MediaKind::Image, path))
    }

    /// Start a video job in the background.
    pub fn spawn_video(&self, subject: &str, description: &str) -> VideoJobHandle {
        let job = GenerationJob::new(MediaKind::Video, subject, description);
        let (tx, rx) = watch::channel(job.clone());
        let cancel = self.shutdown.child_token();

        let generator = self.clone();
        let prompt = video_prompt(subject, description);
        let token = cancel.clone();
        let task = tokio::spawn(async move { generator.run_video_job(job, prompt, tx, token).await });

        VideoJobHandle {
            status: rx,
            cancel,
            task,
        }
    }

    /// Generate a video and wait for it. Dropping the returned future
    /// cancels the job.
    pub async fn generate_video(&self, subject: &str, description: &str) -> MediaResult<Artifact> {
        info!("Generating video for '{}'", subject);
        let handle = self.spawn_video(subject, description);
        let _cancel_on_drop = handle.cancel.clone().drop_guard();
        handle.wait().await
    }

    async fn run_video_job(
        &self,
        mut job: GenerationJob,
        prompt: String,
        tx: watch::Sender<GenerationJob>,
        cancel: CancellationToken,
    ) -> MediaResult<Artifact> {
        let outcome = self.drive_video_job(&mut job, &prompt, &tx, &cancel).await;
        match &outcome {
            Ok(artifact) => {
                info!("Video job {} done: {:?}", job.id, artifact.path);
                job.complete(artifact.path.clone());
            }
            Err(e) => {
                warn!("Video job {} failed: {}", job.id, e);
                job.fail(e.to_string());
            }
        }
        tx.send_replace(job);
        outcome
    }

    async fn drive_video_job(
        &self,
        job: &mut GenerationJob,
        prompt: &str,
        tx: &watch::Sender<GenerationJob>,
        cancel: &CancellationToken,
    ) -> MediaResult<Artifact> {
        let provider_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MediaError::Cancelled),
            id = self.provider.submit_video(prompt) => id?,
        };
        job.provider_id = Some(provider_id.clone());
        tx.send_replace(job.clone());

        let deadline = Instant::now() + self.max_wait;
        loop {
            job.attempts += 1;
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MediaError::Cancelled),
                status = self.provider.video_status(&provider_id) => status?,
            };

            match status {
                VideoStatus::Pending { progress } => {
                    debug!(
                        "Video job {} pending (attempt {}, progress {:?})",
                        job.id, job.attempts, progress
                    );
                    job.progress = progress;
                    job.advance(JobStatus::Polling);
                    tx.send_replace(job.clone());
                }
                VideoStatus::Completed => {
                    let bytes = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(MediaError::Cancelled),
                        bytes = self.provider.download_video(&provider_id) => bytes?,
                    };
                    let path = self.output_dir.join(format!(
                        "video_{}_{}.mp4",
                        slug(&job.subject),
                        timestamp()
                    ));
                    write_atomically(&path, bytes).await?;
                    if cancel.is_cancelled() {
                        discard(&path).await;
                        return Err(MediaError::Cancelled);
                    }
                    return Ok(Artifact::new(MediaKind::Video, path));
                }
                VideoStatus::Failed(reason) => return Err(MediaError::JobFailed(reason)),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(MediaError::Timeout(self.max_wait));
            }
            let wait = self.poll_interval.min(deadline - now);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(MediaError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}

fn image_prompt(subject: &str, description: &str) -> String {
    format!(
        "A professional, appetizing food photograph of {}. {} Restaurant menu style, natural light, shallow depth of field.",
        subject, description
    )
}

fn video_prompt(subject: &str, description: &str) -> String {
    format!(
        "A short promotional video of {} being served in a restaurant. {} Slow camera movement, warm lighting, close-up details.",
        subject, description
    )
}

/// Write via a temp file in the target directory so readers never see a
/// partial file. The temp file is removed if anything fails.
async fn write_atomically(path: &Path, bytes: Vec<u8>) -> MediaResult<()> {
    let path = path.to_path_buf();
    let storage_err = |e: std::io::Error| MediaError::Storage(e.to_string());

    tokio::task::spawn_blocking(move || {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(storage_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(storage_err)?;
        tmp.write_all(&bytes).map_err(storage_err)?;
        tmp.persist(&path).map_err(|e| storage_err(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| MediaError::Storage(e.to_string()))?
}

/// Remove a file written for a job nobody is waiting on anymore.
async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Could not remove abandoned artifact {:?}: {}", path, e);
    }
}

fn image_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else if bytes.starts_with(b"GIF8") {
        "gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "webp"
    } else {
        "png"
    }
}

fn slug(text: &str) -> String {
    let mut slug = String::new();
    for c in text.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "media".to_string()
    } else {
        slug.chars().take(48).collect()
    }
}

fn timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string()
}
