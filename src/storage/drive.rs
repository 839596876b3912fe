use super::{DOCUMENT_MIME, FOLDER_MIME, FileStore, StoredFile, token::TokenSource};
use crate::config::Drive;
use crate::error::ReviewError;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const TARGET: &str = "drive";
const BOUNDARY: &str = "compliance_review_part_boundary";

/// Drive v3 over REST. Shared drives are supported through
/// `supportsAllDrives` on every call.
pub struct DriveStore {
    http: Client,
    base_url: String,
    upload_base_url: String,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveAbout {
    #[serde(default)]
    pub user: Option<DriveUser>,
    #[serde(default)]
    pub storage_quota: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveUser {
    #[serde(default)]
    pub email_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileRef {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    web_view_link: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

impl DriveStore {
    pub fn new(cfg: &Drive, tokens: Arc<dyn TokenSource>) -> Result<Self, ReviewError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ReviewError::archival(TARGET, e))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            upload_base_url: cfg.upload_base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn send(&self, req: RequestBuilder) -> Result<Response, ReviewError> {
        let token = self.tokens.access_token()?;
        let resp = req
            .bearer_auth(token)
            .send()
            .map_err(|e| ReviewError::archival(TARGET, e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ReviewError::archival(
                TARGET,
                format!("HTTP {}: {}", status.as_u16(), body),
            ));
        }
        Ok(resp)
    }

    fn json<T: for<'de> Deserialize<'de>>(&self, req: RequestBuilder) -> Result<T, ReviewError> {
        self.send(req)?
            .json()
            .map_err(|e| ReviewError::archival(TARGET, format!("decoding response: {e}")))
    }

    /// Account the token acts as, and its quota.
    pub fn about(&self) -> Result<DriveAbout, ReviewError> {
        let req = self
            .http
            .get(format!("{}/about", self.base_url))
            .query(&[("fields", "user,storageQuota")]);
        self.json(req)
    }

    /// Name of the root folder or shared drive, proving it is reachable.
    pub fn root_name(&self, root_id: &str) -> Result<String, ReviewError> {
        let req = if is_shared_drive_id(root_id) {
            self.http
                .get(format!("{}/drives/{}", self.base_url, root_id))
                .query(&[("fields", "id,name")])
        } else {
            self.http
                .get(format!("{}/files/{}", self.base_url, root_id))
                .query(&[("fields", "id,name"), ("supportsAllDrives", "true")])
        };
        let found: FileRef = self.json(req)?;
        Ok(found.name)
    }

    fn multipart_upload(
        &self,
        metadata: serde_json::Value,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<StoredFile, ReviewError> {
        let body = multipart_related(&metadata, bytes, mime_type);
        let req = self
            .http
            .post(format!("{}/files", self.upload_base_url))
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", "id,webViewLink"),
            ])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={BOUNDARY}"),
            )
            .body(body);
        let created: FileRef = self.json(req)?;
        Ok(StoredFile {
            id: created.id,
            web_view_link: created.web_view_link,
        })
    }
}

impl FileStore for DriveStore {
    fn find_or_create_folder(&self, name: &str, parent_id: &str) -> Result<String, ReviewError> {
        let q = format!(
            "mimeType='{FOLDER_MIME}' and name='{}' and '{}' in parents and trashed=false",
            escape_query(name),
            escape_query(parent_id)
        );
        let req = self.http.get(format!("{}/files", self.base_url)).query(&[
            ("q", q.as_str()),
            ("fields", "files(id)"),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ]);
        let found: FileList = self.json(req)?;
        if let Some(f) = found.files.into_iter().next() {
            debug!("folder {name} found: {}", f.id);
            return Ok(f.id);
        }

        let req = self
            .http
            .post(format!("{}/files", self.base_url))
            .query(&[("supportsAllDrives", "true"), ("fields", "id")])
            .json(&json!({
                "name": name,
                "mimeType": FOLDER_MIME,
                "parents": [parent_id],
            }));
        let created: FileRef = self.json(req)?;
        info!("folder {name} created: {}", created.id);
        Ok(created.id)
    }

    fn upload_file(
        &self,
        name: &str,
        bytes: &[u8],
        mime_type: &str,
        folder_id: &str,
    ) -> Result<StoredFile, ReviewError> {
        let metadata = json!({ "name": name, "parents": [folder_id] });
        self.multipart_upload(metadata, bytes, mime_type)
    }

    fn create_document(
        &self,
        title: &str,
        content: &str,
        folder_id: &str,
    ) -> Result<StoredFile, ReviewError> {
        let metadata = json!({
            "name": title,
            "mimeType": DOCUMENT_MIME,
            "parents": [folder_id],
        });
        self.multipart_upload(metadata, content.as_bytes(), "text/plain; charset=UTF-8")
    }

    fn folder_link(&self, folder_id: &str) -> String {
        format!("https://drive.google.com/drive/folders/{folder_id}")
    }
}

/// Shared drive IDs start with `0A`.
pub fn is_shared_drive_id(id: &str) -> bool {
    id.starts_with("0A") && id.len() > 10
}

fn escape_query(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn multipart_related(metadata: &serde_json::Value, bytes: &[u8], mime_type: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{BOUNDARY}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}
