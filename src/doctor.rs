//! Connection self-test: each external dependency is probed on its own and
//! reported as `{ "ok": bool, "detail": ... }`.

use crate::{
    ai::{Analyzer, gemini::GeminiClient},
    config::{Config, require_setting},
    error::ReviewError,
    storage::{
        drive::{DriveStore, is_shared_drive_id},
        sheets::SheetsLedger,
        token::{AccessTokenProvider, TokenSource},
    },
    util::{ensure_dir, now_rfc3339},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub ok: bool,
    pub detail: Value,
}

impl Check {
    fn pass(detail: Value) -> Self {
        Self { ok: true, detail }
    }

    fn fail(err: impl std::fmt::Display) -> Self {
        Self {
            ok: false,
            detail: json!(err.to_string()),
        }
    }

    fn from_result(r: Result<Value, ReviewError>) -> Self {
        r.map_or_else(Self::fail, Self::pass)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    pub checked_at: String,
    pub backup_dir: Check,
    pub gemini: Check,
    pub access_token: Check,
    pub drive: Check,
    pub drive_root: Check,
    pub sheets: Check,
}

impl DoctorReport {
    pub fn all_ok(&self) -> bool {
        [
            &self.backup_dir,
            &self.gemini,
            &self.access_token,
            &self.drive,
            &self.drive_root,
            &self.sheets,
        ]
        .iter()
        .all(|c| c.ok)
    }
}

pub fn run(cfg: &Config) -> DoctorReport {
    let tokens: Arc<dyn TokenSource> = Arc::new(AccessTokenProvider::new(&cfg.auth));
    let access_token = Check::from_result(
        tokens
            .access_token()
            .map(|t| json!({ "length": t.len() })),
    );

    let drive = DriveStore::new(&cfg.drive, tokens.clone());
    let drive_check = Check::from_result(drive.as_ref().map_err(clone_err).and_then(|d| {
        let about = d.about()?;
        Ok(json!({
            "user": about.user.map(|u| u.email_address),
            "storage_quota": about.storage_quota,
        }))
    }));
    let drive_root = Check::from_result(drive.as_ref().map_err(clone_err).and_then(|d| {
        let root = require_setting(&cfg.drive.root_folder_id, "drive.root_folder_id")?;
        let name = d.root_name(root)?;
        Ok(json!({
            "id": root,
            "name": name,
            "shared_drive": is_shared_drive_id(root),
        }))
    }));

    let sheets = Check::from_result(
        require_setting(&cfg.sheets.spreadsheet_id, "sheets.spreadsheet_id").and_then(|id| {
            let ledger = SheetsLedger::new(&cfg.sheets, id, tokens.clone())?;
            let sheet_id = ledger.check_access()?;
            Ok(json!({ "sheet": cfg.sheets.sheet_name, "sheet_id": sheet_id }))
        }),
    );

    let gemini = Check::from_result(GeminiClient::new(cfg).and_then(|g| {
        let models = g.list_models()?;
        let configured = models
            .iter()
            .any(|m| m.name.trim_start_matches("models/") == cfg.ai.model);
        Ok(json!({
            "model": cfg.ai.model,
            "model_available": configured,
            "generate_content_models": models.iter().filter(|m| m.supports_generate_content).count(),
        }))
    }));

    let backup_dir = match ensure_dir(Path::new(&cfg.paths.backup_dir)) {
        Ok(()) => Check::pass(json!(cfg.paths.backup_dir)),
        Err(e) => Check::fail(format!("{e:#}")),
    };

    DoctorReport {
        checked_at: now_rfc3339(),
        backup_dir,
        gemini,
        access_token,
        drive: drive_check,
        drive_root,
        sheets,
    }
}

fn clone_err(e: &ReviewError) -> ReviewError {
    ReviewError::archival("drive", e)
}
