use super::{Analyzer, FileState, ModelInfo, RemoteFile};
use crate::config::{Config, require_secret};
use crate::error::ReviewError;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("compliance-review/", env!("CARGO_PKG_VERSION"));

/// Gemini over its public REST API (`v1beta`).
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(cfg: &Config) -> Result<Self, ReviewError> {
        let api_key = require_secret(&cfg.ai.api_key_env, "Gemini API key")?;
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(cfg.ai.request_timeout_seconds))
            .build()
            .map_err(|e| ReviewError::Ai(e.to_string()))?;
        Ok(Self {
            http,
            base_url: cfg.ai.base_url.trim_end_matches('/').to_string(),
            model: cfg.ai.model.clone(),
            api_key,
            temperature: cfg.ai.temperature,
        })
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("x-goog-api-key", &self.api_key)
    }

    fn generate(&self, parts: serde_json::Value) -> Result<String, ReviewError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "temperature": self.temperature },
        });
        debug!("generateContent model={}", self.model);
        let resp = send(self.authed(self.http.post(&url).json(&body)))?;
        let parsed: GenerateResponse = resp
            .json()
            .map_err(|e| ReviewError::Ai(format!("decoding generateContent: {e}")))?;
        parsed.text()
    }
}

fn send(req: RequestBuilder) -> Result<Response, ReviewError> {
    let resp = req.send().map_err(|e| ReviewError::Ai(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(ReviewError::Ai(format!("HTTP {}: {}", status.as_u16(), body)));
    }
    Ok(resp)
}

impl Analyzer for GeminiClient {
    fn analyze_text(&self, prompt: &str, content: &str) -> Result<String, ReviewError> {
        self.generate(json!([{ "text": prompt }, { "text": content }]))
    }

    fn upload_file(
        &self,
        display_name: &str,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<RemoteFile, ReviewError> {
        let start = self
            .http
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }));
        let resp = send(self.authed(start))?;
        let upload_url = resp
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ReviewError::Ai("upload session returned no upload URL".into()))?
            .to_string();

        let finish = self
            .http
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes.to_vec());
        let uploaded: UploadResponse = send(finish)?
            .json()
            .map_err(|e| ReviewError::Ai(format!("decoding upload response: {e}")))?;
        Ok(uploaded.file.into())
    }

    fn get_file(&self, name: &str) -> Result<RemoteFile, ReviewError> {
        let url = format!("{}/v1beta/{}", self.base_url, name);
        let file: WireFile = send(self.authed(self.http.get(&url)))?
            .json()
            .map_err(|e| ReviewError::Ai(format!("decoding file status: {e}")))?;
        Ok(file.into())
    }

    fn analyze_file(&self, prompt: &str, file: &RemoteFile) -> Result<String, ReviewError> {
        self.generate(json!([
            { "text": prompt },
            { "fileData": { "mimeType": file.mime_type, "fileUri": file.uri } },
        ]))
    }

    fn list_models(&self) -> Result<Vec<ModelInfo>, ReviewError> {
        let url = format!("{}/v1beta/models?pageSize=1000", self.base_url);
        let listed: ModelList = send(self.authed(self.http.get(&url)))?
            .json()
            .map_err(|e| ReviewError::Ai(format!("decoding model list: {e}")))?;
        Ok(listed
            .models
            .into_iter()
            .map(|m| ModelInfo {
                supports_generate_content: m
                    .supported_generation_methods
                    .iter()
                    .any(|g| g == "generateContent"),
                name: m.name,
                display_name: m.display_name,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> Result<String, ReviewError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(ReviewError::Ai(format!(
                "model returned no candidates (feedback: {})",
                self.prompt_feedback.unwrap_or_default()
            )));
        };
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ReviewError::Ai(format!(
                "model returned an empty answer (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: WireFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    state: Option<FileState>,
}

impl From<WireFile> for RemoteFile {
    fn from(w: WireFile) -> Self {
        RemoteFile {
            name: w.name,
            uri: w.uri,
            mime_type: w.mime_type,
            state: w.state.unwrap_or(FileState::Unspecified),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<WireModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireModel {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}
