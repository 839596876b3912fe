pub mod gemini;
pub mod prompts;

use crate::{
    analysis::{AnalysisResult, parse_ai_response},
    config::Config,
    error::ReviewError,
    extract::extract_text,
    workflow::{ContentType, ProjectRecord},
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    #[serde(alias = "STATE_UNSPECIFIED")]
    Unspecified,
    Processing,
    Active,
    Failed,
}

/// A media file held by the AI service for later prompting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    pub uri: String,
    pub mime_type: String,
    pub state: FileState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub display_name: String,
    pub supports_generate_content: bool,
}

/// The compliance model seam. Every call returns the model's raw text; parsing
/// happens in [`crate::analysis`].
pub trait Analyzer {
    fn analyze_text(&self, prompt: &str, content: &str) -> Result<String, ReviewError>;
    fn upload_file(&self, display_name: &str, bytes: &[u8], mime_type: &str)
        -> Result<RemoteFile, ReviewError>;
    fn get_file(&self, name: &str) -> Result<RemoteFile, ReviewError>;
    fn analyze_file(&self, prompt: &str, file: &RemoteFile) -> Result<String, ReviewError>;
    fn list_models(&self) -> Result<Vec<ModelInfo>, ReviewError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            interval: Duration::from_secs(cfg.ai.poll_interval_seconds),
            max_attempts: cfg.ai.max_poll_attempts.max(1),
            timeout: (cfg.ai.poll_timeout_seconds > 0)
                .then(|| Duration::from_secs(cfg.ai.poll_timeout_seconds)),
        }
    }
}

/// Re-checks `file` until the service stops processing it. Bounded by
/// `max_attempts` re-checks and the optional wall-clock timeout.
pub fn wait_until_processed(
    analyzer: &dyn Analyzer,
    mut file: RemoteFile,
    policy: &PollPolicy,
    sleep: &dyn Fn(Duration),
) -> Result<RemoteFile, ReviewError> {
    let started = Instant::now();
    let mut attempts = 0u32;

    while file.state == FileState::Processing {
        if attempts >= policy.max_attempts
            || policy.timeout.is_some_and(|t| started.elapsed() >= t)
        {
            warn!("{} still processing after {} checks", file.name, attempts);
            return Err(ReviewError::Timeout {
                what: format!("video processing of {}", file.name),
                attempts,
                elapsed: started.elapsed(),
            });
        }
        sleep(policy.interval);
        attempts += 1;
        file = analyzer.get_file(&file.name)?;
        debug!("poll {} state={:?} attempt={}", file.name, file.state, attempts);
    }

    if file.state == FileState::Failed {
        return Err(ReviewError::Ai(format!(
            "video processing failed for {}",
            file.name
        )));
    }
    Ok(file)
}

/// Extraction (or upload) plus the model call and response parsing for one
/// project. A parse failure carries the raw response.
pub fn analyze_project(
    analyzer: &dyn Analyzer,
    project: &ProjectRecord,
    cfg: &Config,
    sleep: &dyn Fn(Duration),
) -> Result<AnalysisResult, ReviewError> {
    let source = &project.source_file;
    let raw = match project.content_type {
        ContentType::Script => {
            let text = extract_text(&source.name, &source.bytes, &cfg.extract)?;
            info!("analysing script {} ({} chars)", source.name, text.len());
            analyzer.analyze_text(prompts::SCRIPT_REVIEW, &text)?
        }
        ContentType::Video => {
            info!("uploading video {} ({} bytes)", source.name, source.bytes.len());
            let uploaded = analyzer.upload_file(&source.name, &source.bytes, &source.mime_type)?;
            info!("uploaded as {} state={:?}", uploaded.name, uploaded.state);
            let ready = wait_until_processed(analyzer, uploaded, &PollPolicy::from_config(cfg), sleep)?;
            analyzer.analyze_file(prompts::VIDEO_AUDIT, &ready)?
        }
    };

    debug!("raw AI response: {raw}");
    parse_ai_response(&raw)
}
