use compliance_review::{
    analysis::{AnalysisResult, ScoreBand},
    archive::Archiver,
    error::ReviewError,
    report::{LEDGER_HEADER, report_document, report_title},
    storage::{FileStore, Ledger, LedgerCell, StoredFile, local::LocalBackup},
    workflow::{ContentType, ProjectRecord, SourceFile},
};
use std::cell::RefCell;

const QUOTA_BODY: &str = "HTTP 403: {\"error\": {\"errors\": [{\"reason\": \"storageQuotaExceeded\", \"message\": \"Service Accounts do not have storage quota.\"}]}}";

#[derive(Default)]
struct MemoryStore {
    folders: RefCell<Vec<(String, String, String)>>,
    files: RefCell<Vec<(String, String)>>,
    fail_folders: bool,
    quota_exceeded: bool,
}

impl FileStore for MemoryStore {
    fn find_or_create_folder(&self, name: &str, parent_id: &str) -> Result<String, ReviewError> {
        if self.fail_folders {
            return Err(ReviewError::archival("drive", "HTTP 404: File not found"));
        }
        let mut folders = self.folders.borrow_mut();
        if let Some((id, _, _)) = folders.iter().find(|(_, n, p)| n == name && p == parent_id) {
            return Ok(id.clone());
        }
        let id = format!("folder{}", folders.len() + 1);
        folders.push((id.clone(), name.to_string(), parent_id.to_string()));
        Ok(id)
    }

    fn upload_file(&self, name: &str, _: &[u8], _: &str, folder_id: &str) -> Result<StoredFile, ReviewError> {
        if self.quota_exceeded {
            return Err(ReviewError::archival("drive", QUOTA_BODY));
        }
        self.files.borrow_mut().push((name.to_string(), folder_id.to_string()));
        Ok(StoredFile {
            id: format!("file-{name}"),
            web_view_link: format!("https://drive.example/file-{name}"),
        })
    }

    fn create_document(&self, title: &str, _content: &str, folder_id: &str) -> Result<StoredFile, ReviewError> {
        self.upload_file(title, &[], "text/plain", folder_id)
    }

    fn folder_link(&self, folder_id: &str) -> String {
        format!("https://drive.example/folders/{folder_id}")
    }
}

#[derive(Default)]
struct MemoryLedger {
    header: RefCell<Option<Vec<String>>>,
    rows: RefCell<Vec<Vec<LedgerCell>>>,
    colored: RefCell<Vec<(u32, ScoreBand)>>,
    fail_append: bool,
}

impl Ledger for MemoryLedger {
    fn ensure_header(&self, header: &[&str]) -> Result<(), ReviewError> {
        let mut current = self.header.borrow_mut();
        if current.is_none() {
            *current = Some(header.iter().map(|h| h.to_string()).collect());
        }
        Ok(())
    }

    fn append_row(&self, row: &[LedgerCell]) -> Result<Option<u32>, ReviewError> {
        if self.fail_append {
            return Err(ReviewError::archival("sheets", "HTTP 403: The caller does not have permission"));
        }
        let mut rows = self.rows.borrow_mut();
        rows.push(row.to_vec());
        Ok(Some(rows.len() as u32 + 1))
    }

    fn format_score_cell(&self, row: u32, band: ScoreBand) -> Result<(), ReviewError> {
        self.colored.borrow_mut().push((row, band));
        Ok(())
    }
}

fn project() -> ProjectRecord {
    ProjectRecord {
        brand: "Heineken".into(),
        campaign: "Verano".into(),
        influencer: "@ana".into(),
        version: "V1 - First Draft".into(),
        reviewer_name: "Marta".into(),
        content_type: ContentType::Script,
        source_file: SourceFile::new("guion.txt", b"ANA: Salud.".to_vec()),
    }
}

fn analysis() -> AnalysisResult {
    AnalysisResult {
        score: 55,
        findings: Vec::new(),
        recommendations: vec!["Add the legal line".into()],
        email_draft: "Hola equipo.\n\nBest regards,".into(),
        final_recommendations: "- Add the legal line\n- Remove the shot".into(),
    }
}

fn link_url(cell: &LedgerCell) -> &str {
    match cell {
        LedgerCell::Link { url, .. } => url,
        other => panic!("expected a link cell, got {other:?}"),
    }
}

#[test]
fn everything_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::default();
    let ledger = MemoryLedger::default();
    let archiver = Archiver::new(LocalBackup::new(dir.path()))
        .with_store(&store, "root")
        .with_ledger(&ledger);

    let outcome = archiver.archive(&project(), &analysis(), "Hola equipo.", "2025-06-01 10:00:00");

    let backup = outcome.backup_path.clone().unwrap();
    assert_eq!(
        backup.file_name().unwrap().to_str().unwrap(),
        "Verano_@ana_V1 - First Draft_guion.txt"
    );
    assert_eq!(std::fs::read(&backup).unwrap(), b"ANA: Salud.");

    let folders = store.folders.borrow();
    assert_eq!(folders[0], ("folder1".into(), "Verano".into(), "root".into()));
    assert_eq!(folders[2].1, "V1 - First Draft");
    assert_eq!(outcome.folder_link, "https://drive.example/folders/folder3");
    assert!(outcome.file_link.ends_with("guion.txt"));
    assert!(outcome.report_link.ends_with("Reporte_V1 - First Draft_Verano"));
    assert!(outcome.warnings.is_empty());

    assert!(outcome.ledger_appended);
    assert_eq!(ledger.header.borrow().as_ref().unwrap().len(), LEDGER_HEADER.len());
    let rows = ledger.rows.borrow();
    assert_eq!(rows[0].len(), LEDGER_HEADER.len());
    assert_eq!(rows[0][5], LedgerCell::Number(55.0));
    assert_eq!(
        rows[0][6],
        LedgerCell::Text("- Add the legal line - Remove the shot".into())
    );
    assert_eq!(*ledger.colored.borrow(), vec![(2, ScoreBand::Fail)]);
}

#[test]
fn quota_error_still_records_ledger_row() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore {
        quota_exceeded: true,
        ..Default::default()
    };
    let ledger = MemoryLedger::default();
    let archiver = Archiver::new(LocalBackup::new(dir.path()))
        .with_store(&store, "root")
        .with_ledger(&ledger);

    let outcome = archiver.archive(&project(), &analysis(), "Hola equipo.", "2025-06-01 10:00:00");

    assert!(outcome.backup_path.is_some());
    assert!(outcome.file_link.is_empty());
    assert!(outcome.report_link.is_empty());
    assert!(outcome.ledger_appended);
    assert!(outcome.warnings.iter().any(|w| w.contains("domain-wide delegation")));

    let rows = ledger.rows.borrow();
    assert_eq!(link_url(&rows[0][8]), "");
    assert_eq!(link_url(&rows[0][9]), "");
    assert_eq!(rows[0][8].to_cell_value(), serde_json::json!(""));
}

#[test]
fn unreachable_folders_leave_all_links_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore {
        fail_folders: true,
        ..Default::default()
    };
    let ledger = MemoryLedger::default();
    let archiver = Archiver::new(LocalBackup::new(dir.path()))
        .with_store(&store, "root")
        .with_ledger(&ledger);

    let outcome = archiver.archive(&project(), &analysis(), "", "2025-06-01 10:00:00");

    assert!(outcome.folder_link.is_empty());
    assert!(store.files.borrow().is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.ledger_appended);
    assert_eq!(link_url(&ledger.rows.borrow()[0][7]), "");
}

#[test]
fn ledger_failure_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::default();
    let ledger = MemoryLedger {
        fail_append: true,
        ..Default::default()
    };
    let archiver = Archiver::new(LocalBackup::new(dir.path()))
        .with_store(&store, "root")
        .with_ledger(&ledger);

    let outcome = archiver.archive(&project(), &analysis(), "Hola.", "2025-06-01 10:00:00");

    assert!(!outcome.ledger_appended);
    assert!(!outcome.file_link.is_empty());
    assert!(outcome.warnings[0].contains("ledger append failed"));
}

#[test]
fn unavailable_targets_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut archiver = Archiver::new(LocalBackup::new(dir.path()));
    archiver.target_unavailable(
        "drive",
        &ReviewError::configuration("drive.root_folder_id is empty", "set it"),
    );

    let outcome = archiver.archive(&project(), &analysis(), "Hola.", "2025-06-01 10:00:00");

    assert!(outcome.backup_path.is_some());
    assert!(!outcome.ledger_appended);
    assert!(outcome.warnings[0].starts_with("drive skipped"));
}

#[test]
fn report_ends_with_one_sign_off() {
    let doc = report_document(&project(), &analysis(), "Hola equipo.\n\nBest regards,", "2025-06-01 10:00:00");
    assert!(doc.starts_with("REVIEW REPORT - Verano\n\nPROJECT INFORMATION\n"));
    assert!(doc.contains("Score: 55/100\n"));
    assert!(doc.contains("Reviewed by: Marta\n"));
    assert_eq!(doc.matches("Best regards,").count(), 1);
    assert!(doc.ends_with("Best regards,\nMarta\n"));
    assert_eq!(report_title(&project()), "Reporte_V1 - First Draft_Verano");
}
