//! Persisting a finalized review: local backup, remote folder tree with the
//! original file and the report document, and one ledger row.
//!
//! Every target is attempted regardless of the others. Failures become
//! warnings in the outcome; nothing already written is rolled back.

use crate::{
    analysis::AnalysisResult,
    error::ReviewError,
    report::{self, ArchiveLinks, LEDGER_HEADER},
    storage::{FileStore, Ledger, QUOTA_REMEDIATION, is_quota_error, local::LocalBackup},
    workflow::ProjectRecord,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveOutcome {
    pub backup_path: Option<PathBuf>,
    pub folder_link: String,
    pub file_link: String,
    pub report_link: String,
    pub ledger_appended: bool,
    pub warnings: Vec<String>,
}

impl ArchiveOutcome {
    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }

    fn warn_remote(&mut self, what: &str, err: &ReviewError) {
        if is_quota_error(err) {
            self.warn(format!("{what}: {QUOTA_REMEDIATION}"));
        } else {
            self.warn(format!("{what}: {err}"));
        }
    }

    fn links(&self) -> ArchiveLinks {
        ArchiveLinks {
            folder: self.folder_link.clone(),
            file: self.file_link.clone(),
            report: self.report_link.clone(),
        }
    }
}

pub struct Archiver<'a> {
    backup: LocalBackup,
    store: Option<(&'a dyn FileStore, String)>,
    ledger: Option<&'a dyn Ledger>,
    unavailable: Vec<String>,
}

impl<'a> Archiver<'a> {
    pub fn new(backup: LocalBackup) -> Self {
        Self {
            backup,
            store: None,
            ledger: None,
            unavailable: Vec::new(),
        }
    }

    pub fn with_store(mut self, store: &'a dyn FileStore, root_folder_id: impl Into<String>) -> Self {
        self.store = Some((store, root_folder_id.into()));
        self
    }

    pub fn with_ledger(mut self, ledger: &'a dyn Ledger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Records why a target could not be set up; reported in every outcome.
    pub fn target_unavailable(&mut self, target: &str, err: &ReviewError) {
        self.unavailable.push(format!("{target} skipped: {err}"));
    }

    pub fn archive(
        &self,
        project: &ProjectRecord,
        analysis: &AnalysisResult,
        email_body: &str,
        reviewed_at: &str,
    ) -> ArchiveOutcome {
        let mut outcome = ArchiveOutcome::default();
        for note in &self.unavailable {
            outcome.warn(note.clone());
        }

        match self.backup.save(project) {
            Ok(path) => {
                info!("local backup written: {}", path.display());
                outcome.backup_path = Some(path);
            }
            Err(e) => outcome.warn(format!("local backup failed: {e:#}")),
        }

        if let Some((store, root)) = &self.store {
            let document = report::report_document(project, analysis, email_body, reviewed_at);
            self.store_remote(*store, root, project, &document, &mut outcome);
        }

        if let Some(ledger) = self.ledger {
            let row = report::ledger_row(project, analysis, &outcome.links(), reviewed_at);
            if let Err(e) = ledger.ensure_header(&LEDGER_HEADER) {
                outcome.warn(format!("ledger header check failed: {e}"));
            }
            match ledger.append_row(&row) {
                Ok(row_number) => {
                    outcome.ledger_appended = true;
                    info!("ledger row appended: {row_number:?}");
                    if let Some(n) = row_number {
                        if let Err(e) = ledger.format_score_cell(n, analysis.score_band()) {
                            debug!("score cell formatting skipped: {e}");
                        }
                    }
                }
                Err(e) => outcome.warn(format!("ledger append failed: {e}")),
            }
        }

        outcome
    }

    fn store_remote(
        &self,
        store: &dyn FileStore,
        root: &str,
        project: &ProjectRecord,
        document: &str,
        outcome: &mut ArchiveOutcome,
    ) {
        let folder = [
            project.campaign.as_str(),
            project.influencer.as_str(),
            project.version.as_str(),
        ]
        .into_iter()
        .try_fold(root.to_string(), |parent, name| {
            store.find_or_create_folder(name, &parent)
        });
        let folder_id = match folder {
            Ok(id) => id,
            Err(e) => {
                outcome.warn_remote("remote folders could not be prepared", &e);
                return;
            }
        };
        outcome.folder_link = store.folder_link(&folder_id);

        let source = &project.source_file;
        match store.upload_file(&source.name, &source.bytes, &source.mime_type, &folder_id) {
            Ok(f) => {
                info!("original uploaded: {}", f.id);
                outcome.file_link = f.web_view_link;
            }
            Err(e) => outcome.warn_remote("original file upload failed", &e),
        }

        match store.create_document(&report::report_title(project), document, &folder_id) {
            Ok(f) => {
                info!("report document created: {}", f.id);
                outcome.report_link = f.web_view_link;
            }
            Err(e) => outcome.warn_remote("report document failed", &e),
        }
    }
}
