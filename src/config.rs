use crate::error::ReviewError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub extract: Extract,
    #[serde(default)]
    pub ai: Ai,
    #[serde(default)]
    pub drive: Drive,
    #[serde(default)]
    pub sheets: Sheets,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub review: Review,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub backup_dir: String,
    pub work_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            backup_dir: "archivos_guardados".into(),
            work_dir: ".compliance-review-work".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extract {
    pub normalize_unicode: bool,
    pub max_input_file_bytes: u64,
}
impl Default for Extract {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            max_input_file_bytes: 200 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ai {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: f32,
    pub request_timeout_seconds: u64,
    pub poll_interval_seconds: u64,
    pub max_poll_attempts: u32,
    /// Wall-clock cap for the video processing wait; 0 disables it.
    pub poll_timeout_seconds: u64,
}
impl Default for Ai {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-2.5-flash".into(),
            api_key_env: "GEMINI_API_KEY".into(),
            temperature: 0.0,
            request_timeout_seconds: 300,
            poll_interval_seconds: 5,
            max_poll_attempts: 120,
            poll_timeout_seconds: 900,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drive {
    pub base_url: String,
    pub upload_base_url: String,
    pub root_folder_id: String,
}
impl Default for Drive {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/drive/v3".into(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".into(),
            root_folder_id: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheets {
    pub base_url: String,
    pub spreadsheet_id: String,
    pub sheet_name: String,
}
impl Default for Sheets {
    fn default() -> Self {
        Self {
            base_url: "https://sheets.googleapis.com/v4".into(),
            spreadsheet_id: "".into(),
            sheet_name: "Sheet1".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auth {
    pub access_token_env: String,
    /// Shell-free argv used when the env var is unset, e.g.
    /// `["gcloud", "auth", "print-access-token"]`.
    pub token_command: Vec<String>,
    pub token_command_timeout_seconds: u64,
}
impl Default for Auth {
    fn default() -> Self {
        Self {
            access_token_env: "GOOGLE_ACCESS_TOKEN".into(),
            token_command: vec![
                "gcloud".into(),
                "auth".into(),
                "print-access-token".into(),
            ],
            token_command_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub brands: Vec<String>,
    pub versions: Vec<String>,
    pub default_reviewer: String,
}
impl Default for Review {
    fn default() -> Self {
        Self {
            brands: [
                "Heineken",
                "Tecate",
                "Dos Equis",
                "Indio",
                "Carta Blanca",
                "Bohemia",
                "Sol",
                "Amstel Ultra",
                "Miller High Life",
                "Superior",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            versions: [
                "V1 - First Draft",
                "V2 - Revisions",
                "V3 - Final",
                "Published/Witness",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            default_reviewer: "QA Team".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub reject_url_inputs: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
        }
    }
}

/// Reads a secret from the environment variable named by `env_name`.
pub fn require_secret(env_name: &str, what: &str) -> Result<String, ReviewError> {
    match std::env::var(env_name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ReviewError::configuration(
            format!("{what} is not set"),
            format!("export {env_name}=<value> before running, or point the config at another variable"),
        )),
    }
}

/// Fails when a required identifier was left empty in the config.
pub fn require_setting<'a>(value: &'a str, key: &str) -> Result<&'a str, ReviewError> {
    if value.trim().is_empty() {
        return Err(ReviewError::configuration(
            format!("{key} is empty"),
            format!("set {key} in compliance-review.toml"),
        ));
    }
    Ok(value.trim())
}
