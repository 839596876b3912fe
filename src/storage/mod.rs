pub mod drive;
pub mod local;
pub mod sheets;
pub mod token;

use crate::error::ReviewError;
use serde::{Deserialize, Serialize};

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: String,
    pub web_view_link: String,
}

/// Remote file storage organised as a folder tree.
pub trait FileStore {
    /// Folder named `name` directly under `parent_id`, created when absent.
    /// Lookup and creation are two calls; concurrent callers may both create.
    fn find_or_create_folder(&self, name: &str, parent_id: &str) -> Result<String, ReviewError>;

    fn upload_file(
        &self,
        name: &str,
        bytes: &[u8],
        mime_type: &str,
        folder_id: &str,
    ) -> Result<StoredFile, ReviewError>;

    /// A text document created natively in the store (a Google Doc on Drive).
    fn create_document(
        &self,
        title: &str,
        content: &str,
        folder_id: &str,
    ) -> Result<StoredFile, ReviewError>;

    fn folder_link(&self, folder_id: &str) -> String;
}

/// Append-only tabular record of completed reviews.
pub trait Ledger {
    /// Writes `header` as the first row unless it is already there.
    fn ensure_header(&self, header: &[&str]) -> Result<(), ReviewError>;

    /// Appends a row and returns its 1-based row number when known.
    fn append_row(&self, row: &[LedgerCell]) -> Result<Option<u32>, ReviewError>;

    /// Colours the score cell of `row`. Cosmetic; callers ignore failures.
    fn format_score_cell(&self, _row: u32, _band: crate::analysis::ScoreBand) -> Result<(), ReviewError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LedgerCell {
    Text(String),
    Number(f64),
    /// Rendered as a `HYPERLINK` formula; empty URLs become empty cells.
    Link { url: String, label: String },
}

impl LedgerCell {
    pub fn to_cell_value(&self) -> serde_json::Value {
        match self {
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Number(n) => serde_json::json!(n),
            Self::Link { url, .. } if url.trim().is_empty() => serde_json::Value::String(String::new()),
            Self::Link { url, label } => serde_json::Value::String(format!(
                "=HYPERLINK(\"{}\", \"{}\")",
                url.replace('"', "\"\""),
                label.replace('"', "\"\"")
            )),
        }
    }
}

/// Drive reports quota problems for service accounts with a dedicated reason.
pub fn is_quota_error(err: &ReviewError) -> bool {
    let msg = err.to_string();
    msg.contains("storageQuotaExceeded") || msg.contains("do not have storage quota")
}

pub const QUOTA_REMEDIATION: &str = "Service accounts have no Drive storage quota of their own. Use a shared drive as drive.root_folder_id, or have your Workspace admin enable domain-wide delegation so the access token is minted for a real user. The local backup is kept and the ledger row is still recorded.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_cells_escape_quotes() {
        let cell = LedgerCell::Link {
            url: "https://x/?q=\"a\"".into(),
            label: "Open Folder".into(),
        };
        assert_eq!(
            cell.to_cell_value(),
            serde_json::json!("=HYPERLINK(\"https://x/?q=\"\"a\"\"\", \"Open Folder\")")
        );
    }

    #[test]
    fn empty_link_is_empty_cell() {
        let cell = LedgerCell::Link {
            url: " ".into(),
            label: "View File".into(),
        };
        assert_eq!(cell.to_cell_value(), serde_json::json!(""));
    }
}
